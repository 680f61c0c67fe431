//! Server configuration loaded from the environment.

use std::str::FromStr;

use anyhow::{Context, bail};
use jsonwebtoken::Algorithm;
use reservo_auth::AuthConfig;
use reservo_db::DbConfig;

/// Shortest HMAC secret accepted outside tests.
pub const MIN_JWT_SECRET_LEN: usize = 32;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub db: DbConfig,
    pub auth: AuthConfig,
}

impl ServerConfig {
    /// Load configuration from process environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`, which returns the value of a
    /// variable or `None` when unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |name: &str| lookup(name).filter(|v| !v.is_empty());

        let db_defaults = DbConfig::default();
        let db = DbConfig {
            url: var("RESERVO_DB_URL").unwrap_or(db_defaults.url),
            namespace: var("RESERVO_DB_NAMESPACE").unwrap_or(db_defaults.namespace),
            database: var("RESERVO_DB_DATABASE").unwrap_or(db_defaults.database),
            username: var("RESERVO_DB_USERNAME").unwrap_or(db_defaults.username),
            password: var("RESERVO_DB_PASSWORD").unwrap_or(db_defaults.password),
        };

        let jwt_secret = var("RESERVO_JWT_SECRET").context("RESERVO_JWT_SECRET must be set")?;
        if jwt_secret.len() < MIN_JWT_SECRET_LEN {
            bail!("RESERVO_JWT_SECRET must be at least {MIN_JWT_SECRET_LEN} bytes");
        }

        let defaults = AuthConfig::default();
        let auth = AuthConfig {
            jwt_secret,
            jwt_algorithm: match var("RESERVO_JWT_ALGORITHM") {
                Some(alg) => Algorithm::from_str(&alg)
                    .with_context(|| format!("RESERVO_JWT_ALGORITHM: unknown algorithm {alg}"))?,
                None => defaults.jwt_algorithm,
            },
            jwt_issuer: var("RESERVO_JWT_ISSUER").unwrap_or(defaults.jwt_issuer),
            session_lifetime_secs: parse(&var, "RESERVO_SESSION_LIFETIME_SECS")?
                .unwrap_or(defaults.session_lifetime_secs),
            token_leeway_secs: parse(&var, "RESERVO_TOKEN_LEEWAY_SECS")?
                .unwrap_or(defaults.token_leeway_secs),
            pepper: var("RESERVO_PASSWORD_PEPPER"),
            super_admin_role_code: var("RESERVO_SUPER_ADMIN_ROLE")
                .unwrap_or(defaults.super_admin_role_code),
            entitlement_cache_ttl_secs: parse(&var, "RESERVO_ENTITLEMENT_CACHE_TTL_SECS")?
                .unwrap_or(defaults.entitlement_cache_ttl_secs),
            resolution_timeout_ms: parse(&var, "RESERVO_RESOLUTION_TIMEOUT_MS")?
                .unwrap_or(defaults.resolution_timeout_ms),
            min_password_length: parse(&var, "RESERVO_MIN_PASSWORD_LENGTH")?
                .unwrap_or(defaults.min_password_length),
        };

        Ok(Self { db, auth })
    }
}

fn parse<T>(var: &impl Fn(&str) -> Option<String>, name: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    var(name)
        .map(|v| v.parse::<T>().with_context(|| format!("{name}: invalid value {v:?}")))
        .transpose()
}
