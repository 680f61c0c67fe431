//! Error types for the Reservo platform.
//!
//! The taxonomy is transport-agnostic: calling services map each variant
//! to their own response codes.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReservoError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Entity is inactive: {entity} with id {id}")]
    Inactive { entity: String, id: String },

    #[error("Entity already exists: {entity}")]
    AlreadyExists { entity: String },

    #[error("Unauthenticated: {reason}")]
    Unauthenticated { reason: String },

    #[error("Forbidden: {reason}")]
    Forbidden { reason: String },

    #[error("Credential revoked: {reason}")]
    Revoked { reason: String },

    #[error("Backing store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Cryptography error: {0}")]
    Crypto(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ReservoError {
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn inactive(entity: impl Into<String>, id: impl ToString) -> Self {
        Self::Inactive {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Whether a caller may reasonably retry the failed call.
    ///
    /// Nothing in this workspace retries internally; this only informs
    /// the calling service.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

pub type ReservoResult<T> = Result<T, ReservoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_store_failures_are_retryable() {
        assert!(ReservoError::unavailable("timeout").is_retryable());
        assert!(!ReservoError::Database("parse error".into()).is_retryable());
        assert!(
            !ReservoError::Forbidden {
                reason: "nope".into()
            }
            .is_retryable()
        );
        assert!(!ReservoError::not_found("user", 7).is_retryable());
    }

    #[test]
    fn constructors_render_ids() {
        let err = ReservoError::inactive("business", "b-1");
        assert_eq!(err.to_string(), "Entity is inactive: business with id b-1");
    }
}
