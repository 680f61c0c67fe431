//! SurrealDB implementation of [`RoleRepository`].

use chrono::{DateTime, Utc};
use reservo_core::error::{ReservoError, ReservoResult};
use reservo_core::models::role::{CreateRole, Role, UpdateRole};
use reservo_core::models::scope::ScopeKind;
use reservo_core::repository::RoleRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::parse_uuid;
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct RoleRow {
    record_id: String,
    code: String,
    name: String,
    level: i64,
    scope: String,
    is_system: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RoleRow {
    fn try_into_role(self) -> Result<Role, DbError> {
        let scope = self
            .scope
            .parse::<ScopeKind>()
            .map_err(|e| DbError::InvalidRow(e.to_string()))?;
        let level = i32::try_from(self.level)
            .map_err(|e| DbError::InvalidRow(format!("role level out of range: {e}")))?;
        Ok(Role {
            id: parse_uuid("role", &self.record_id)?,
            code: self.code,
            name: self.name,
            level,
            scope,
            is_system: self.is_system,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn collect(rows: Vec<RoleRow>) -> Result<Vec<Role>, DbError> {
    rows.into_iter().map(RoleRow::try_into_role).collect()
}

/// SurrealDB implementation of the Role repository.
#[derive(Clone)]
pub struct SurrealRoleRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealRoleRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn fetch_one(
        &self,
        query: &str,
        key: &'static str,
        value: String,
    ) -> Result<Role, DbError> {
        let mut result = self.db.query(query).bind((key, value.clone())).await?;
        let rows: Vec<RoleRow> = result.take(0)?;
        rows.into_iter()
            .next()
            .ok_or(DbError::NotFound {
                entity: "role".into(),
                id: value,
            })?
            .try_into_role()
    }
}

impl<C: Connection> RoleRepository for SurrealRoleRepository<C> {
    async fn create(&self, input: CreateRole) -> ReservoResult<Role> {
        let id = Uuid::new_v4();

        self.db
            .query(
                "CREATE type::record('role', $id) SET \
                 code = $code, name = $name, level = $level, \
                 scope = $scope, is_system = $is_system",
            )
            .bind(("id", id.to_string()))
            .bind(("code", input.code))
            .bind(("name", input.name))
            .bind(("level", i64::from(input.level)))
            .bind(("scope", input.scope.as_str().to_string()))
            .bind(("is_system", input.is_system))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::statement)?;

        self.get_by_id(id).await
    }

    async fn get_by_id(&self, id: Uuid) -> ReservoResult<Role> {
        Ok(self
            .fetch_one(
                "SELECT meta::id(id) AS record_id, * FROM type::record('role', $id)",
                "id",
                id.to_string(),
            )
            .await?)
    }

    async fn get_by_code(&self, code: &str) -> ReservoResult<Role> {
        Ok(self
            .fetch_one(
                "SELECT meta::id(id) AS record_id, * FROM role WHERE code = $code",
                "code",
                code.to_string(),
            )
            .await?)
    }

    async fn get_by_codes(&self, codes: &[String]) -> ReservoResult<Vec<Role>> {
        if codes.is_empty() {
            return Ok(Vec::new());
        }
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM role \
                 WHERE code IN $codes ORDER BY level ASC",
            )
            .bind(("codes", codes.to_vec()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleRow> = result.take(0).map_err(DbError::from)?;
        Ok(collect(rows)?)
    }

    async fn update(&self, id: Uuid, input: UpdateRole) -> ReservoResult<Role> {
        let current = self.get_by_id(id).await?;
        if current.is_system
            && let Some(code) = input.code.as_deref()
            && code != current.code
        {
            return Err(ReservoError::validation(format!(
                "system role code '{}' is immutable",
                current.code
            )));
        }

        let mut sets = Vec::new();
        if input.code.is_some() {
            sets.push("code = $code");
        }
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.level.is_some() {
            sets.push("level = $level");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('role', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id.to_string()));
        if let Some(code) = input.code {
            builder = builder.bind(("code", code));
        }
        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(level) = input.level {
            builder = builder.bind(("level", i64::from(level)));
        }

        builder
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::statement)?;

        self.get_by_id(id).await
    }

    async fn delete(&self, id: Uuid) -> ReservoResult<()> {
        let role = self.get_by_id(id).await?;
        if role.is_system {
            return Err(ReservoError::validation(format!(
                "system role '{}' cannot be deleted",
                role.code
            )));
        }

        let id_str = id.to_string();
        // Delete associated edges first, then the role record.
        let query = format!(
            "DELETE has_role WHERE out = role:`{id_str}`; \
             DELETE grants WHERE in = role:`{id_str}`; \
             DELETE type::record('role', $id);"
        );

        self.db
            .query(query)
            .bind(("id", id_str))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::statement)?;

        Ok(())
    }

    async fn list(&self) -> ReservoResult<Vec<Role>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM role \
                 ORDER BY level ASC, code ASC",
            )
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleRow> = result.take(0).map_err(DbError::from)?;
        Ok(collect(rows)?)
    }

    async fn assign_to_user(&self, user_id: Uuid, role_id: Uuid) -> ReservoResult<()> {
        self.get_by_id(role_id).await?;

        let user_id_str = user_id.to_string();
        let role_id_str = role_id.to_string();
        // Re-assigning is a no-op rather than a duplicate edge.
        let query = format!(
            "DELETE has_role WHERE \
             in = user:`{user_id_str}` AND out = role:`{role_id_str}`; \
             RELATE user:`{user_id_str}` -> has_role -> role:`{role_id_str}`;"
        );

        self.db
            .query(query)
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::statement)?;

        Ok(())
    }

    async fn unassign_from_user(&self, user_id: Uuid, role_id: Uuid) -> ReservoResult<()> {
        self.db
            .query(
                "DELETE has_role WHERE \
                 in = type::record('user', $user_id) AND \
                 out = type::record('role', $role_id)",
            )
            .bind(("user_id", user_id.to_string()))
            .bind(("role_id", role_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::statement)?;

        Ok(())
    }

    async fn get_user_roles(&self, user_id: Uuid) -> ReservoResult<Vec<Role>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM role \
                 WHERE id IN (SELECT VALUE out FROM has_role \
                 WHERE in = type::record('user', $user_id)) \
                 ORDER BY level ASC",
            )
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleRow> = result.take(0).map_err(DbError::from)?;
        Ok(collect(rows)?)
    }
}
