//! Session and API key token issuance and verification.
//!
//! Both flavors are HMAC-signed JWS compact tokens. Verification pins the
//! configured algorithm, so a token signed with any other algorithm is
//! rejected even when the secret matches.

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::AuthError;

const API_KEY_SUBJECT_PREFIX: &str = "api_key:";

/// Claims carried by a session token.
///
/// `role_codes` is a snapshot taken at issue time. Authorization always
/// re-resolves roles from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject: the user id.
    pub sub: String,
    pub user_id: Uuid,
    pub email: String,
    pub role_codes: Vec<String>,
    /// Business selected at login, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_id: Option<Uuid>,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

impl SessionClaims {
    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// Claims carried by an API key token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiKeyClaims {
    /// `api_key:<key id>`.
    pub sub: String,
    /// Nil for machine keys.
    pub user_id: Uuid,
    pub business_id: Uuid,
    pub role_codes: Vec<String>,
    pub iss: String,
    pub iat: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

impl ApiKeyClaims {
    /// The key id embedded in the subject.
    pub fn key_id(&self) -> Result<Uuid, AuthError> {
        self.sub
            .strip_prefix(API_KEY_SUBJECT_PREFIX)
            .and_then(|id| Uuid::parse_str(id).ok())
            .ok_or_else(|| AuthError::MalformedToken(format!("bad api key subject: {}", self.sub)))
    }
}

/// Mints and verifies tokens with one HMAC secret.
pub struct TokenIssuer {
    algorithm: Algorithm,
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    session_lifetime: Duration,
    leeway_secs: u64,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("algorithm", &self.algorithm)
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Result<Self, AuthError> {
        if !matches!(
            config.jwt_algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            return Err(AuthError::Crypto(format!(
                "unsupported signing algorithm {:?}; expected HMAC",
                config.jwt_algorithm
            )));
        }
        if config.jwt_secret.is_empty() {
            return Err(AuthError::Crypto("JWT secret is empty".into()));
        }
        let lifetime = i64::try_from(config.session_lifetime_secs)
            .map_err(|_| AuthError::Crypto("session lifetime out of range".into()))?;

        Ok(Self {
            algorithm: config.jwt_algorithm,
            encoding: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            issuer: config.jwt_issuer.clone(),
            session_lifetime: Duration::seconds(lifetime),
            leeway_secs: config.token_leeway_secs,
        })
    }

    /// Issue a session token valid for the configured lifetime.
    pub fn issue_session(
        &self,
        user_id: Uuid,
        email: &str,
        role_codes: Vec<String>,
        business_id: Option<Uuid>,
    ) -> Result<(String, SessionClaims), AuthError> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: user_id.to_string(),
            user_id,
            email: email.to_string(),
            role_codes,
            business_id,
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: (now + self.session_lifetime).timestamp(),
        };
        let token = self.sign(&claims)?;
        Ok((token, claims))
    }

    pub fn verify_session(&self, token: &str) -> Result<SessionClaims, AuthError> {
        self.decode(token, &["sub", "exp", "iat", "iss"])
    }

    /// Re-issue a still-valid session token with a fresh expiry.
    ///
    /// Identity, role snapshot and business are carried over unchanged.
    pub fn refresh_session(&self, token: &str) -> Result<(String, SessionClaims), AuthError> {
        let claims = self.verify_session(token)?;
        self.issue_session(claims.user_id, &claims.email, claims.role_codes, claims.business_id)
    }

    pub fn issue_api_key(
        &self,
        key_id: Uuid,
        user_id: Uuid,
        business_id: Uuid,
        role_codes: Vec<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<String, AuthError> {
        let claims = ApiKeyClaims {
            sub: format!("{API_KEY_SUBJECT_PREFIX}{key_id}"),
            user_id,
            business_id,
            role_codes,
            iss: self.issuer.clone(),
            iat: Utc::now().timestamp(),
            exp: expires_at.map(|t| t.timestamp()),
        };
        self.sign(&claims)
    }

    /// Check signature, algorithm, issuer and (when present) expiry.
    ///
    /// Revocation lives in the store and is checked by the caller.
    pub fn verify_api_key(&self, token: &str) -> Result<ApiKeyClaims, AuthError> {
        let claims: ApiKeyClaims = self.decode(token, &["sub", "iat", "iss"])?;
        if !claims.sub.starts_with(API_KEY_SUBJECT_PREFIX) {
            return Err(AuthError::MalformedToken("not an api key token".into()));
        }
        Ok(claims)
    }

    fn sign<T: Serialize>(&self, claims: &T) -> Result<String, AuthError> {
        jsonwebtoken::encode(&Header::new(self.algorithm), claims, &self.encoding)
            .map_err(|e| AuthError::Crypto(format!("JWT encode: {e}")))
    }

    fn decode<T: DeserializeOwned>(&self, token: &str, required: &[&str]) -> Result<T, AuthError> {
        let mut validation = Validation::new(self.algorithm);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(required);
        validation.leeway = self.leeway_secs;

        jsonwebtoken::decode::<T>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    AuthError::SignatureInvalid
                }
                _ => AuthError::MalformedToken(e.to_string()),
            })
    }
}
