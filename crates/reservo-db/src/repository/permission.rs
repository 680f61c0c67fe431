//! SurrealDB implementation of [`PermissionRepository`].

use chrono::{DateTime, Utc};
use reservo_core::error::{ReservoError, ReservoResult};
use reservo_core::models::permission::{Action, CreatePermission, Permission, UpdatePermission};
use reservo_core::repository::PermissionRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::parse_uuid;
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct PermissionRow {
    record_id: String,
    code: String,
    resource: String,
    action: String,
    scope_id: String,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PermissionRow {
    fn try_into_permission(self) -> Result<Permission, DbError> {
        let action = self
            .action
            .parse::<Action>()
            .map_err(|e| DbError::InvalidRow(e.to_string()))?;
        Ok(Permission {
            id: parse_uuid("permission", &self.record_id)?,
            code: self.code,
            resource: self.resource,
            action,
            scope_id: parse_uuid("scope_id", &self.scope_id)?,
            description: self.description,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn collect(rows: Vec<PermissionRow>) -> Result<Vec<Permission>, DbError> {
    rows.into_iter()
        .map(PermissionRow::try_into_permission)
        .collect()
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// SurrealDB implementation of the Permission repository.
#[derive(Clone)]
pub struct SurrealPermissionRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealPermissionRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn grant_count(&self, id: Uuid) -> Result<u64, DbError> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM grants \
                 WHERE out = type::record('permission', $id) GROUP ALL",
            )
            .bind(("id", id.to_string()))
            .await?;
        let rows: Vec<CountRow> = result.take(0)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0))
    }
}

impl<C: Connection> PermissionRepository for SurrealPermissionRepository<C> {
    async fn create(&self, input: CreatePermission) -> ReservoResult<Permission> {
        let id = Uuid::new_v4();

        self.db
            .query(
                "CREATE type::record('permission', $id) SET \
                 code = $code, resource = $resource, action = $action, \
                 scope_id = $scope_id, description = $description",
            )
            .bind(("id", id.to_string()))
            .bind(("code", input.code))
            .bind(("resource", input.resource))
            .bind(("action", input.action.as_str().to_string()))
            .bind(("scope_id", input.scope_id.to_string()))
            .bind(("description", input.description))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::statement)?;

        self.get_by_id(id).await
    }

    async fn get_by_id(&self, id: Uuid) -> ReservoResult<Permission> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM type::record('permission', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PermissionRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "permission".into(),
            id: id_str,
        })?;

        Ok(row.try_into_permission()?)
    }

    async fn get_by_code(&self, code: &str) -> ReservoResult<Permission> {
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM permission WHERE code = $code")
            .bind(("code", code.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PermissionRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "permission".into(),
            id: format!("code={code}"),
        })?;

        Ok(row.try_into_permission()?)
    }

    async fn update(&self, id: Uuid, input: UpdatePermission) -> ReservoResult<Permission> {
        let current = self.get_by_id(id).await?;
        if let Some(code) = input.code.as_deref()
            && code != current.code
            && self.grant_count(id).await? > 0
        {
            return Err(ReservoError::validation(format!(
                "permission code '{}' is granted and cannot change",
                current.code
            )));
        }

        let mut sets = Vec::new();
        if input.code.is_some() {
            sets.push("code = $code");
        }
        if input.description.is_some() {
            sets.push("description = $description");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('permission', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id.to_string()));
        if let Some(code) = input.code {
            builder = builder.bind(("code", code));
        }
        if let Some(description) = input.description {
            builder = builder.bind(("description", description));
        }

        builder
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::statement)?;

        self.get_by_id(id).await
    }

    async fn delete(&self, id: Uuid) -> ReservoResult<()> {
        self.get_by_id(id).await?;

        let id_str = id.to_string();
        let query = format!(
            "DELETE grants WHERE out = permission:`{id_str}`; \
             DELETE type::record('permission', $id);"
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

    async fn list_all(&self) -> ReservoResult<Vec<Permission>> {
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM permission ORDER BY code ASC")
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PermissionRow> = result.take(0).map_err(DbError::from)?;
        Ok(collect(rows)?)
    }

    async fn grant_to_role(&self, role_id: Uuid, permission_id: Uuid) -> ReservoResult<()> {
        self.get_by_id(permission_id).await?;

        let role_id_str = role_id.to_string();
        let perm_id_str = permission_id.to_string();
        let query = format!(
            "DELETE grants WHERE \
             in = role:`{role_id_str}` AND out = permission:`{perm_id_str}`; \
             RELATE role:`{role_id_str}` -> grants -> permission:`{perm_id_str}`;"
        );

        self.db
            .query(query)
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::statement)?;

        Ok(())
    }

    async fn revoke_from_role(&self, role_id: Uuid, permission_id: Uuid) -> ReservoResult<()> {
        self.db
            .query(
                "DELETE grants WHERE \
                 in = type::record('role', $role_id) AND \
                 out = type::record('permission', $permission_id)",
            )
            .bind(("role_id", role_id.to_string()))
            .bind(("permission_id", permission_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::statement)?;

        Ok(())
    }

    async fn get_role_permissions(&self, role_id: Uuid) -> ReservoResult<Vec<Permission>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM permission \
                 WHERE id IN (SELECT VALUE out FROM grants \
                 WHERE in = type::record('role', $role_id)) \
                 ORDER BY code ASC",
            )
            .bind(("role_id", role_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PermissionRow> = result.take(0).map_err(DbError::from)?;
        Ok(collect(rows)?)
    }
}
