//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode for data integrity.
//! UUIDs are stored as strings. Enums are stored as strings with
//! ASSERT constraints for validation.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1: identity and entitlement tables
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Users (global; email stored lowercased)
-- =======================================================================
DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD email ON TABLE user TYPE string;
DEFINE FIELD password_hash ON TABLE user TYPE string;
DEFINE FIELD is_active ON TABLE user TYPE bool DEFAULT true;
DEFINE FIELD last_login_at ON TABLE user TYPE option<datetime>;
DEFINE FIELD deleted_at ON TABLE user TYPE option<datetime>;
DEFINE FIELD created_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_user_email ON TABLE user COLUMNS email UNIQUE;

-- =======================================================================
-- Business types and businesses (tenants)
-- =======================================================================
DEFINE TABLE business_type SCHEMAFULL;
DEFINE FIELD code ON TABLE business_type TYPE string;
DEFINE FIELD name ON TABLE business_type TYPE string;
DEFINE FIELD created_at ON TABLE business_type TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_business_type_code ON TABLE business_type \
    COLUMNS code UNIQUE;

DEFINE TABLE business SCHEMAFULL;
DEFINE FIELD code ON TABLE business TYPE string;
DEFINE FIELD name ON TABLE business TYPE string;
DEFINE FIELD business_type_id ON TABLE business TYPE string;
DEFINE FIELD is_active ON TABLE business TYPE bool DEFAULT true;
DEFINE FIELD created_at ON TABLE business TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE business TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_business_code ON TABLE business COLUMNS code UNIQUE;
DEFINE INDEX idx_business_type ON TABLE business \
    COLUMNS business_type_id;

-- =======================================================================
-- Resources and scopes
-- =======================================================================
DEFINE TABLE resource SCHEMAFULL;
DEFINE FIELD code ON TABLE resource TYPE string;
DEFINE FIELD name ON TABLE resource TYPE string;
DEFINE FIELD created_at ON TABLE resource TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_resource_code ON TABLE resource COLUMNS code UNIQUE;

DEFINE TABLE scope SCHEMAFULL;
DEFINE FIELD code ON TABLE scope TYPE string \
    ASSERT $value IN ['platform', 'business'];
DEFINE FIELD description ON TABLE scope TYPE string;
DEFINE INDEX idx_scope_code ON TABLE scope COLUMNS code UNIQUE;

-- =======================================================================
-- Roles and permissions
-- =======================================================================
DEFINE TABLE role SCHEMAFULL;
DEFINE FIELD code ON TABLE role TYPE string;
DEFINE FIELD name ON TABLE role TYPE string;
DEFINE FIELD level ON TABLE role TYPE int;
DEFINE FIELD scope ON TABLE role TYPE string \
    ASSERT $value IN ['platform', 'business'];
DEFINE FIELD is_system ON TABLE role TYPE bool DEFAULT false;
DEFINE FIELD created_at ON TABLE role TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE role TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_role_code ON TABLE role COLUMNS code UNIQUE;

DEFINE TABLE permission SCHEMAFULL;
DEFINE FIELD code ON TABLE permission TYPE string;
DEFINE FIELD resource ON TABLE permission TYPE string;
DEFINE FIELD action ON TABLE permission TYPE string \
    ASSERT $value IN ['create', 'read', 'update', 'delete', 'manage'];
DEFINE FIELD scope_id ON TABLE permission TYPE string;
DEFINE FIELD description ON TABLE permission TYPE string;
DEFINE FIELD created_at ON TABLE permission TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE permission TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_permission_code ON TABLE permission \
    COLUMNS code UNIQUE;

-- =======================================================================
-- API keys (business scope)
-- =======================================================================
DEFINE TABLE api_key SCHEMAFULL;
DEFINE FIELD business_id ON TABLE api_key TYPE string;
DEFINE FIELD user_id ON TABLE api_key TYPE string;
DEFINE FIELD name ON TABLE api_key TYPE string;
DEFINE FIELD role_codes ON TABLE api_key TYPE array<string>;
DEFINE FIELD expires_at ON TABLE api_key TYPE option<datetime>;
DEFINE FIELD revoked ON TABLE api_key TYPE bool DEFAULT false;
DEFINE FIELD revoked_at ON TABLE api_key TYPE option<datetime>;
DEFINE FIELD created_at ON TABLE api_key TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_api_key_business ON TABLE api_key \
    COLUMNS business_id;

-- =======================================================================
-- Graph Edge Tables (relations)
-- =======================================================================

-- User -> Role assignment
DEFINE TABLE has_role TYPE RELATION SCHEMAFULL;

-- Role -> Permission grants
DEFINE TABLE grants TYPE RELATION SCHEMAFULL;

-- User -> Business membership
DEFINE TABLE member_of TYPE RELATION SCHEMAFULL;
DEFINE FIELD created_at ON TABLE member_of TYPE datetime \
    DEFAULT time::now();

-- BusinessType -> Resource (maximal set a type may enable)
DEFINE TABLE permits TYPE RELATION SCHEMAFULL;

-- Business -> Resource (subset a business has turned on)
DEFINE TABLE configures TYPE RELATION SCHEMAFULL;
DEFINE FIELD is_active ON TABLE configures TYPE bool DEFAULT true;
DEFINE FIELD updated_at ON TABLE configures TYPE datetime \
    DEFAULT time::now();
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
/// All DEFINE statements are idempotent so re-running is safe.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    // Ensure migration tracking table exists (idempotent).
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    // Determine current schema version.
    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            db.query(migration.sql).await?.check().map_err(|e| {
                DbError::Migration(format!(
                    "Migration v{} '{}' failed: {}",
                    migration.version, migration.name, e,
                ))
            })?;

            // Record the applied migration.
            db.query(
                "CREATE _migration SET version = $version, \
                 name = $name",
            )
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;

            info!(
                version = migration.version,
                "Migration applied successfully"
            );
        }
    }

    Ok(())
}

/// Returns the raw schema DDL for version 1.
///
/// Exposed for testing with in-memory SurrealDB instances that
/// bypass the migration runner.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_v1_defines_every_edge_table() {
        for edge in ["has_role", "grants", "member_of", "permits", "configures"] {
            assert!(
                SCHEMA_V1.contains(&format!("DEFINE TABLE {edge} TYPE RELATION")),
                "missing edge table {edge}"
            );
        }
    }

    #[test]
    fn migrations_are_ordered() {
        for window in MIGRATIONS.windows(2) {
            assert!(
                window[0].version < window[1].version,
                "Migrations must be in ascending version order"
            );
        }
    }
}
