//! SurrealDB implementation of [`ScopeRepository`].

use reservo_core::error::ReservoResult;
use reservo_core::models::scope::{CreateScope, Scope, ScopeKind};
use reservo_core::repository::ScopeRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::parse_uuid;
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct ScopeRow {
    record_id: String,
    code: String,
    description: String,
}

impl ScopeRow {
    fn try_into_scope(self) -> Result<Scope, DbError> {
        Ok(Scope {
            id: parse_uuid("scope", &self.record_id)?,
            code: self
                .code
                .parse()
                .map_err(|e: reservo_core::ReservoError| DbError::InvalidRow(e.to_string()))?,
            description: self.description,
        })
    }
}

/// SurrealDB implementation of the Scope repository.
#[derive(Clone)]
pub struct SurrealScopeRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealScopeRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> ScopeRepository for SurrealScopeRepository<C> {
    async fn create(&self, input: CreateScope) -> ReservoResult<Scope> {
        let id = Uuid::new_v4();

        self.db
            .query(
                "CREATE type::record('scope', $id) SET \
                 code = $code, description = $description",
            )
            .bind(("id", id.to_string()))
            .bind(("code", input.code.as_str().to_string()))
            .bind(("description", input.description))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::statement)?;

        self.get_by_id(id).await
    }

    async fn get_by_id(&self, id: Uuid) -> ReservoResult<Scope> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM type::record('scope', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ScopeRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "scope".into(),
            id: id_str,
        })?;

        Ok(row.try_into_scope()?)
    }

    async fn get_by_code(&self, code: ScopeKind) -> ReservoResult<Scope> {
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM scope WHERE code = $code")
            .bind(("code", code.as_str().to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ScopeRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "scope".into(),
            id: format!("code={code}"),
        })?;

        Ok(row.try_into_scope()?)
    }

    async fn list(&self) -> ReservoResult<Vec<Scope>> {
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM scope ORDER BY code ASC")
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ScopeRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(ScopeRow::try_into_scope)
            .collect::<Result<Vec<_>, DbError>>()?)
    }
}
