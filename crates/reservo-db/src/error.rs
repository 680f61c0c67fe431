//! Database-specific error types and conversions.

use reservo_core::error::ReservoError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query rejected: {0}")]
    Query(String),

    #[error("Invalid row: {0}")]
    InvalidRow(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },
}

impl DbError {
    /// Wrap the error reported by a failed statement.
    pub(crate) fn statement(err: impl ToString) -> Self {
        DbError::Query(err.to_string())
    }
}

impl From<DbError> for ReservoError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ReservoError::NotFound { entity, id },
            DbError::Surreal(e) if e.is_connection() => ReservoError::Unavailable {
                reason: format!("database unreachable: {e}"),
            },
            DbError::Query(msg) if msg.contains("already contains") => {
                ReservoError::AlreadyExists { entity: msg }
            }
            DbError::InvalidRow(msg) => ReservoError::Internal(msg),
            other => ReservoError::Database(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_index_violation_maps_to_already_exists() {
        let err: ReservoError = DbError::statement(
            "Database index `idx_role_code` already contains 'host', with record `role:x`",
        )
        .into();
        assert!(matches!(err, ReservoError::AlreadyExists { .. }));
    }

    #[test]
    fn not_found_is_preserved() {
        let err: ReservoError = DbError::NotFound {
            entity: "business".into(),
            id: "7".into(),
        }
        .into();
        assert!(matches!(err, ReservoError::NotFound { .. }));
    }

    #[test]
    fn connection_failures_are_unavailable() {
        let err: ReservoError = DbError::Surreal(surrealdb::Error::connection(
            "websocket closed".into(),
            surrealdb_types::ConnectionError::ConnectionFailed,
        ))
        .into();
        assert!(matches!(err, ReservoError::Unavailable { .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn rejected_statements_are_not_retryable() {
        let err: ReservoError =
            DbError::statement("Found 'write' for field `action`, but expected a string").into();
        assert!(matches!(err, ReservoError::Database(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn corrupt_rows_are_internal() {
        let err: ReservoError = DbError::InvalidRow("unknown action: write".into()).into();
        assert!(matches!(err, ReservoError::Internal(_)));
    }
}
