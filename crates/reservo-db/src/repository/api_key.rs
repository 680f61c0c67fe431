//! SurrealDB implementation of [`ApiKeyRepository`].
//!
//! Only key metadata is stored. The signed token itself is never
//! persisted; verification re-reads the row by the id embedded in it.

use chrono::{DateTime, Utc};
use reservo_core::error::{ReservoError, ReservoResult};
use reservo_core::models::api_key::{ApiKey, CreateApiKey};
use reservo_core::repository::ApiKeyRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::parse_uuid;
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct ApiKeyRow {
    record_id: String,
    business_id: String,
    user_id: String,
    name: String,
    role_codes: Vec<String>,
    expires_at: Option<DateTime<Utc>>,
    revoked: bool,
    revoked_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl ApiKeyRow {
    fn try_into_api_key(self) -> Result<ApiKey, DbError> {
        Ok(ApiKey {
            id: parse_uuid("api_key", &self.record_id)?,
            business_id: parse_uuid("business_id", &self.business_id)?,
            user_id: parse_uuid("user_id", &self.user_id)?,
            name: self.name,
            role_codes: self.role_codes,
            expires_at: self.expires_at,
            revoked: self.revoked,
            revoked_at: self.revoked_at,
            created_at: self.created_at,
        })
    }
}

/// SurrealDB implementation of the ApiKey repository.
#[derive(Clone)]
pub struct SurrealApiKeyRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealApiKeyRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> ApiKeyRepository for SurrealApiKeyRepository<C> {
    async fn create(&self, input: CreateApiKey) -> ReservoResult<ApiKey> {
        let id = Uuid::new_v4();

        self.db
            .query(
                "CREATE type::record('api_key', $id) SET \
                 business_id = $business_id, user_id = $user_id, \
                 name = $name, role_codes = $role_codes, \
                 expires_at = $expires_at, revoked = false, revoked_at = NONE",
            )
            .bind(("id", id.to_string()))
            .bind(("business_id", input.business_id.to_string()))
            .bind(("user_id", input.user_id.to_string()))
            .bind(("name", input.name))
            .bind(("role_codes", input.role_codes))
            .bind(("expires_at", input.expires_at))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::statement)?;

        self.get_by_id(id).await
    }

    async fn get_by_id(&self, id: Uuid) -> ReservoResult<ApiKey> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM type::record('api_key', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ApiKeyRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "api_key".into(),
            id: id_str,
        })?;

        Ok(row.try_into_api_key()?)
    }

    async fn revoke(&self, business_id: Uuid, id: Uuid) -> ReservoResult<ApiKey> {
        let key = self.get_by_id(id).await?;
        if key.business_id != business_id {
            // Keys of other businesses are invisible, not forbidden.
            return Err(ReservoError::not_found("api_key", id));
        }

        self.db
            .query(
                "UPDATE type::record('api_key', $id) SET \
                 revoked = true, revoked_at = time::now() \
                 WHERE revoked = false",
            )
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::statement)?;

        self.get_by_id(id).await
    }

    async fn list_by_business(&self, business_id: Uuid) -> ReservoResult<Vec<ApiKey>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM api_key \
                 WHERE business_id = $business_id ORDER BY created_at ASC",
            )
            .bind(("business_id", business_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ApiKeyRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(ApiKeyRow::try_into_api_key)
            .collect::<Result<Vec<_>, DbError>>()?)
    }
}
