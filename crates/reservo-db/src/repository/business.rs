//! SurrealDB implementation of [`BusinessRepository`].

use chrono::{DateTime, Utc};
use reservo_core::error::ReservoResult;
use reservo_core::models::business::{Business, CreateBusiness, UpdateBusiness};
use reservo_core::repository::{BusinessRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::parse_uuid;
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
pub(super) struct BusinessRow {
    record_id: String,
    code: String,
    name: String,
    business_type_id: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BusinessRow {
    pub(super) fn try_into_business(self) -> Result<Business, DbError> {
        Ok(Business {
            id: parse_uuid("business", &self.record_id)?,
            code: self.code,
            name: self.name,
            business_type_id: parse_uuid("business_type_id", &self.business_type_id)?,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

#[derive(Debug, SurrealValue)]
struct IdRow {
    record_id: String,
}

/// SurrealDB implementation of the Business repository.
#[derive(Clone)]
pub struct SurrealBusinessRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealBusinessRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> BusinessRepository for SurrealBusinessRepository<C> {
    async fn create(&self, input: CreateBusiness) -> ReservoResult<Business> {
        let id = Uuid::new_v4();

        self.db
            .query(
                "CREATE type::record('business', $id) SET \
                 code = $code, name = $name, \
                 business_type_id = $business_type_id, is_active = true",
            )
            .bind(("id", id.to_string()))
            .bind(("code", input.code))
            .bind(("name", input.name))
            .bind(("business_type_id", input.business_type_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::statement)?;

        self.get_by_id(id).await
    }

    async fn get_by_id(&self, id: Uuid) -> ReservoResult<Business> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM type::record('business', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<BusinessRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "business".into(),
            id: id_str,
        })?;

        Ok(row.try_into_business()?)
    }

    async fn get_by_code(&self, code: &str) -> ReservoResult<Business> {
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM business WHERE code = $code")
            .bind(("code", code.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<BusinessRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "business".into(),
            id: format!("code={code}"),
        })?;

        Ok(row.try_into_business()?)
    }

    async fn update(&self, id: Uuid, input: UpdateBusiness) -> ReservoResult<Business> {
        self.get_by_id(id).await?;

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.business_type_id.is_some() {
            sets.push("business_type_id = $business_type_id");
        }
        if input.is_active.is_some() {
            sets.push("is_active = $is_active");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('business', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id.to_string()));
        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(business_type_id) = input.business_type_id {
            builder = builder.bind(("business_type_id", business_type_id.to_string()));
        }
        if let Some(is_active) = input.is_active {
            builder = builder.bind(("is_active", is_active));
        }

        builder
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::statement)?;

        self.get_by_id(id).await
    }

    async fn list(&self, pagination: Pagination) -> ReservoResult<PaginatedResult<Business>> {
        let mut count_result = self
            .db
            .query("SELECT count() AS total FROM business GROUP ALL")
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM business \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<BusinessRow> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(BusinessRow::try_into_business)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn list_ids_by_type(&self, business_type_id: Uuid) -> ReservoResult<Vec<Uuid>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id FROM business \
                 WHERE business_type_id = $business_type_id",
            )
            .bind(("business_type_id", business_type_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<IdRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .iter()
            .map(|r| parse_uuid("business", &r.record_id))
            .collect::<Result<Vec<_>, DbError>>()?)
    }
}
