//! SurrealDB implementation of [`BusinessTypeRepository`].

use chrono::{DateTime, Utc};
use reservo_core::error::ReservoResult;
use reservo_core::models::business::{BusinessType, CreateBusinessType};
use reservo_core::repository::BusinessTypeRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::parse_uuid;
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct BusinessTypeRow {
    record_id: String,
    code: String,
    name: String,
    created_at: DateTime<Utc>,
}

impl BusinessTypeRow {
    fn try_into_business_type(self) -> Result<BusinessType, DbError> {
        Ok(BusinessType {
            id: parse_uuid("business_type", &self.record_id)?,
            code: self.code,
            name: self.name,
            created_at: self.created_at,
        })
    }
}

/// SurrealDB implementation of the BusinessType repository.
#[derive(Clone)]
pub struct SurrealBusinessTypeRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealBusinessTypeRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> BusinessTypeRepository for SurrealBusinessTypeRepository<C> {
    async fn create(&self, input: CreateBusinessType) -> ReservoResult<BusinessType> {
        let id = Uuid::new_v4();

        self.db
            .query("CREATE type::record('business_type', $id) SET code = $code, name = $name")
            .bind(("id", id.to_string()))
            .bind(("code", input.code))
            .bind(("name", input.name))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::statement)?;

        self.get_by_id(id).await
    }

    async fn get_by_id(&self, id: Uuid) -> ReservoResult<BusinessType> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM type::record('business_type', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<BusinessTypeRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "business_type".into(),
            id: id_str,
        })?;

        Ok(row.try_into_business_type()?)
    }

    async fn get_by_code(&self, code: &str) -> ReservoResult<BusinessType> {
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM business_type WHERE code = $code")
            .bind(("code", code.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<BusinessTypeRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "business_type".into(),
            id: format!("code={code}"),
        })?;

        Ok(row.try_into_business_type()?)
    }

    async fn list(&self) -> ReservoResult<Vec<BusinessType>> {
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM business_type ORDER BY code ASC")
            .await
            .map_err(DbError::from)?;

        let rows: Vec<BusinessTypeRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(BusinessTypeRow::try_into_business_type)
            .collect::<Result<Vec<_>, DbError>>()?)
    }
}
