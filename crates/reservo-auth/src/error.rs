//! Authentication error types.

use reservo_core::error::ReservoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("malformed token: {0}")]
    MalformedToken(String),

    #[error("token signature is invalid")]
    SignatureInvalid,

    #[error("token has expired")]
    TokenExpired,

    #[error("credential has been revoked")]
    Revoked,

    #[error("cryptography error: {0}")]
    Crypto(String),
}

impl From<AuthError> for ReservoError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Revoked => ReservoError::Revoked {
                reason: err.to_string(),
            },
            AuthError::Crypto(msg) => ReservoError::Crypto(msg),
            AuthError::InvalidCredentials
            | AuthError::MalformedToken(_)
            | AuthError::SignatureInvalid
            | AuthError::TokenExpired => ReservoError::Unauthenticated {
                reason: err.to_string(),
            },
        }
    }
}
