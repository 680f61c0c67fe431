//! Business (tenant) and business type domain models.
//!
//! A business is the tenant boundary: every permission check and every
//! resource entitlement is evaluated relative to one business id. Its
//! type declares the maximal set of resources it may ever enable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Business {
    pub id: Uuid,
    /// URL-safe unique identifier (e.g., `casa-luna`).
    pub code: String,
    pub name: String,
    pub business_type_id: Uuid,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to create a new business.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBusiness {
    pub code: String,
    pub name: String,
    pub business_type_id: Uuid,
}

/// Fields that can be updated on an existing business.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateBusiness {
    pub name: Option<String>,
    pub business_type_id: Option<Uuid>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessType {
    pub id: Uuid,
    /// Unique code (e.g., `restaurant`, `hotel`).
    pub code: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBusinessType {
    pub code: String,
    pub name: String,
}
