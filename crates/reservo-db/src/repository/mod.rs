//! SurrealDB repository implementations.
//!
//! Record ids are UUIDv4 strings; every row struct reads them back via
//! `meta::id(id) AS record_id`.

mod api_key;
mod business;
mod business_type;
mod entitlement;
mod membership;
mod permission;
mod resource;
mod role;
mod scope;
mod store;
mod user;

pub use api_key::SurrealApiKeyRepository;
pub use business::SurrealBusinessRepository;
pub use business_type::SurrealBusinessTypeRepository;
pub use entitlement::SurrealEntitlementRepository;
pub use membership::SurrealMembershipRepository;
pub use permission::SurrealPermissionRepository;
pub use resource::SurrealResourceRepository;
pub use role::SurrealRoleRepository;
pub use scope::SurrealScopeRepository;
pub use store::SurrealStore;
pub use user::SurrealUserRepository;

use uuid::Uuid;

use crate::error::DbError;

/// Parse a UUID column, naming the column on failure.
pub(crate) fn parse_uuid(column: &str, value: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(value).map_err(|e| DbError::InvalidRow(format!("invalid {column} UUID: {e}")))
}
