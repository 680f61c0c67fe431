//! Authentication and authorization configuration.

use std::time::Duration;

use jsonwebtoken::Algorithm;
use reservo_core::models::role::SUPER_ADMIN_ROLE_CODE;

/// Upper bound on how long an entitlement set may be served from cache.
pub const MAX_ENTITLEMENT_CACHE_TTL_SECS: u64 = 60;

/// Configuration for token issuance and permission resolution.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Shared HMAC secret for signing session and API key tokens.
    pub jwt_secret: String,
    /// Only this algorithm is accepted on verification. Must be HS256,
    /// HS384 or HS512.
    pub jwt_algorithm: Algorithm,
    /// JWT issuer (`iss` claim).
    pub jwt_issuer: String,
    /// Session token lifetime in seconds (default: 86_400 = 24 hours).
    pub session_lifetime_secs: u64,
    /// Clock skew tolerated when checking `exp` (default: 0).
    pub token_leeway_secs: u64,
    /// Optional pepper prepended to passwords before Argon2id verification.
    pub pepper: Option<String>,
    /// Role code that bypasses business entitlement filtering.
    pub super_admin_role_code: String,
    /// Entitlement cache TTL in seconds (default: 30, capped at 60).
    pub entitlement_cache_ttl_secs: u64,
    /// Deadline for a single permission resolution in milliseconds.
    pub resolution_timeout_ms: u64,
    /// Minimum password length for newly registered users.
    pub min_password_length: usize,
}

impl AuthConfig {
    pub fn entitlement_cache_ttl(&self) -> Duration {
        Duration::from_secs(
            self.entitlement_cache_ttl_secs
                .min(MAX_ENTITLEMENT_CACHE_TTL_SECS),
        )
    }

    pub fn resolution_timeout(&self) -> Duration {
        Duration::from_millis(self.resolution_timeout_ms)
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            jwt_algorithm: Algorithm::HS256,
            jwt_issuer: "reservo".into(),
            session_lifetime_secs: 86_400,
            token_leeway_secs: 0,
            pepper: None,
            super_admin_role_code: SUPER_ADMIN_ROLE_CODE.into(),
            entitlement_cache_ttl_secs: 30,
            resolution_timeout_ms: 2_000,
            min_password_length: 12,
        }
    }
}
