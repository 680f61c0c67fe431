//! API key domain model.
//!
//! API keys are long-lived, business-scoped credentials. The signed token
//! handed to the holder cannot change after issuance, so revocation is
//! tracked here and checked on every verification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKey {
    pub id: Uuid,
    pub business_id: Uuid,
    /// `Uuid::nil()` for machine keys not bound to a user.
    pub user_id: Uuid,
    pub name: String,
    pub role_codes: Vec<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub revoked: bool,
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ApiKey {
    pub fn is_machine_key(&self) -> bool {
        self.user_id.is_nil()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateApiKey {
    pub business_id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub role_codes: Vec<String>,
    pub expires_at: Option<DateTime<Utc>>,
}
