//! Entitlement links between business types, businesses and resources.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::resource::Resource;

/// A resource a specific business has configured, active or not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfiguredResource {
    pub business_id: Uuid,
    pub resource: Resource,
    pub is_active: bool,
}
