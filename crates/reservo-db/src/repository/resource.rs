//! SurrealDB implementation of [`ResourceRepository`].

use chrono::{DateTime, Utc};
use reservo_core::error::ReservoResult;
use reservo_core::models::resource::{CreateResource, Resource};
use reservo_core::repository::ResourceRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::parse_uuid;
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
pub(super) struct ResourceRow {
    record_id: String,
    code: String,
    name: String,
    created_at: DateTime<Utc>,
}

impl ResourceRow {
    pub(super) fn try_into_resource(self) -> Result<Resource, DbError> {
        Ok(Resource {
            id: parse_uuid("resource", &self.record_id)?,
            code: self.code,
            name: self.name,
            created_at: self.created_at,
        })
    }
}

/// SurrealDB implementation of the Resource repository.
#[derive(Clone)]
pub struct SurrealResourceRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealResourceRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> ResourceRepository for SurrealResourceRepository<C> {
    async fn create(&self, input: CreateResource) -> ReservoResult<Resource> {
        let id = Uuid::new_v4();

        self.db
            .query("CREATE type::record('resource', $id) SET code = $code, name = $name")
            .bind(("id", id.to_string()))
            .bind(("code", input.code))
            .bind(("name", input.name))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::statement)?;

        self.get_by_id(id).await
    }

    async fn get_by_id(&self, id: Uuid) -> ReservoResult<Resource> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM type::record('resource', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ResourceRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "resource".into(),
            id: id_str,
        })?;

        Ok(row.try_into_resource()?)
    }

    async fn get_by_code(&self, code: &str) -> ReservoResult<Resource> {
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM resource WHERE code = $code")
            .bind(("code", code.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ResourceRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "resource".into(),
            id: format!("code={code}"),
        })?;

        Ok(row.try_into_resource()?)
    }

    async fn list(&self) -> ReservoResult<Vec<Resource>> {
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM resource ORDER BY code ASC")
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ResourceRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(ResourceRow::try_into_resource)
            .collect::<Result<Vec<_>, DbError>>()?)
    }
}
