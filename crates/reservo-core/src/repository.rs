//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. The identity store (users,
//! roles, permissions, memberships, API keys) is global; entitlement
//! links are keyed by business type or business id.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::ReservoResult;
use crate::models::{
    api_key::{ApiKey, CreateApiKey},
    business::{Business, BusinessType, CreateBusiness, CreateBusinessType, UpdateBusiness},
    entitlement::ConfiguredResource,
    permission::{CreatePermission, Permission, UpdatePermission},
    resource::{CreateResource, Resource},
    role::{CreateRole, Role, UpdateRole},
    scope::{CreateScope, Scope, ScopeKind},
    user::{CreateUser, UpdateUser, User},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Identity store
// ---------------------------------------------------------------------------

pub trait UserRepository: Send + Sync {
    fn create(&self, input: CreateUser) -> impl Future<Output = ReservoResult<User>> + Send;
    /// Tombstoned users are reported as `NotFound`.
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = ReservoResult<User>> + Send;
    /// Case-insensitive lookup.
    fn get_by_email(&self, email: &str) -> impl Future<Output = ReservoResult<User>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateUser,
    ) -> impl Future<Output = ReservoResult<User>> + Send;
    /// Soft-delete: sets the tombstone and deactivates the user.
    fn delete(&self, id: Uuid) -> impl Future<Output = ReservoResult<()>> + Send;
    /// Stamp the last successful login and return the stored timestamp.
    fn record_login(&self, id: Uuid)
    -> impl Future<Output = ReservoResult<DateTime<Utc>>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = ReservoResult<PaginatedResult<User>>> + Send;
}

pub trait RoleRepository: Send + Sync {
    fn create(&self, input: CreateRole) -> impl Future<Output = ReservoResult<Role>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = ReservoResult<Role>> + Send;
    fn get_by_code(&self, code: &str) -> impl Future<Output = ReservoResult<Role>> + Send;
    /// Roles whose code is in `codes`; unknown codes are skipped.
    fn get_by_codes(
        &self,
        codes: &[String],
    ) -> impl Future<Output = ReservoResult<Vec<Role>>> + Send;
    /// Rejects code changes on system roles.
    fn update(
        &self,
        id: Uuid,
        input: UpdateRole,
    ) -> impl Future<Output = ReservoResult<Role>> + Send;
    /// Rejects deletion of system roles.
    fn delete(&self, id: Uuid) -> impl Future<Output = ReservoResult<()>> + Send;
    fn list(&self) -> impl Future<Output = ReservoResult<Vec<Role>>> + Send;

    /// Assign a role to a user (creates a `has_role` edge).
    fn assign_to_user(
        &self,
        user_id: Uuid,
        role_id: Uuid,
    ) -> impl Future<Output = ReservoResult<()>> + Send;

    /// Remove a role assignment from a user.
    fn unassign_from_user(
        &self,
        user_id: Uuid,
        role_id: Uuid,
    ) -> impl Future<Output = ReservoResult<()>> + Send;

    /// Get all roles assigned to a user.
    fn get_user_roles(&self, user_id: Uuid) -> impl Future<Output = ReservoResult<Vec<Role>>> + Send;
}

pub trait PermissionRepository: Send + Sync {
    fn create(
        &self,
        input: CreatePermission,
    ) -> impl Future<Output = ReservoResult<Permission>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = ReservoResult<Permission>> + Send;
    fn get_by_code(&self, code: &str) -> impl Future<Output = ReservoResult<Permission>> + Send;
    /// Rejects code changes once the permission is granted to any role.
    fn update(
        &self,
        id: Uuid,
        input: UpdatePermission,
    ) -> impl Future<Output = ReservoResult<Permission>> + Send;
    fn delete(&self, id: Uuid) -> impl Future<Output = ReservoResult<()>> + Send;
    /// Every permission in the system.
    fn list_all(&self) -> impl Future<Output = ReservoResult<Vec<Permission>>> + Send;

    /// Grant a permission to a role (creates a `grants` edge).
    fn grant_to_role(
        &self,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> impl Future<Output = ReservoResult<()>> + Send;

    /// Revoke a permission from a role.
    fn revoke_from_role(
        &self,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> impl Future<Output = ReservoResult<()>> + Send;

    /// Get all permissions granted to a role.
    fn get_role_permissions(
        &self,
        role_id: Uuid,
    ) -> impl Future<Output = ReservoResult<Vec<Permission>>> + Send;
}

pub trait ScopeRepository: Send + Sync {
    fn create(&self, input: CreateScope) -> impl Future<Output = ReservoResult<Scope>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = ReservoResult<Scope>> + Send;
    fn get_by_code(&self, code: ScopeKind) -> impl Future<Output = ReservoResult<Scope>> + Send;
    fn list(&self) -> impl Future<Output = ReservoResult<Vec<Scope>>> + Send;
}

/// User ↔ business association.
pub trait MembershipRepository: Send + Sync {
    fn add_member(
        &self,
        user_id: Uuid,
        business_id: Uuid,
    ) -> impl Future<Output = ReservoResult<()>> + Send;
    fn remove_member(
        &self,
        user_id: Uuid,
        business_id: Uuid,
    ) -> impl Future<Output = ReservoResult<()>> + Send;
    /// Businesses the user belongs to, oldest business first.
    fn get_user_businesses(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = ReservoResult<Vec<Business>>> + Send;
    fn is_member(
        &self,
        user_id: Uuid,
        business_id: Uuid,
    ) -> impl Future<Output = ReservoResult<bool>> + Send;
}

pub trait ApiKeyRepository: Send + Sync {
    fn create(&self, input: CreateApiKey) -> impl Future<Output = ReservoResult<ApiKey>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = ReservoResult<ApiKey>> + Send;
    /// Mark the key revoked. Revoking twice keeps the first timestamp.
    fn revoke(
        &self,
        business_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = ReservoResult<ApiKey>> + Send;
    fn list_by_business(
        &self,
        business_id: Uuid,
    ) -> impl Future<Output = ReservoResult<Vec<ApiKey>>> + Send;
}

// ---------------------------------------------------------------------------
// Businesses & entitlement store
// ---------------------------------------------------------------------------

pub trait BusinessRepository: Send + Sync {
    fn create(&self, input: CreateBusiness)
    -> impl Future<Output = ReservoResult<Business>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = ReservoResult<Business>> + Send;
    fn get_by_code(&self, code: &str) -> impl Future<Output = ReservoResult<Business>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateBusiness,
    ) -> impl Future<Output = ReservoResult<Business>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = ReservoResult<PaginatedResult<Business>>> + Send;
    /// Ids of every business of the given type.
    fn list_ids_by_type(
        &self,
        business_type_id: Uuid,
    ) -> impl Future<Output = ReservoResult<Vec<Uuid>>> + Send;
}

pub trait BusinessTypeRepository: Send + Sync {
    fn create(
        &self,
        input: CreateBusinessType,
    ) -> impl Future<Output = ReservoResult<BusinessType>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = ReservoResult<BusinessType>> + Send;
    fn get_by_code(&self, code: &str)
    -> impl Future<Output = ReservoResult<BusinessType>> + Send;
    fn list(&self) -> impl Future<Output = ReservoResult<Vec<BusinessType>>> + Send;
}

pub trait ResourceRepository: Send + Sync {
    fn create(&self, input: CreateResource)
    -> impl Future<Output = ReservoResult<Resource>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = ReservoResult<Resource>> + Send;
    fn get_by_code(&self, code: &str) -> impl Future<Output = ReservoResult<Resource>> + Send;
    fn list(&self) -> impl Future<Output = ReservoResult<Vec<Resource>>> + Send;
}

pub trait EntitlementRepository: Send + Sync {
    /// Allow every business of a type to enable a resource.
    fn permit_resource(
        &self,
        business_type_id: Uuid,
        resource_id: Uuid,
    ) -> impl Future<Output = ReservoResult<()>> + Send;
    fn forbid_resource(
        &self,
        business_type_id: Uuid,
        resource_id: Uuid,
    ) -> impl Future<Output = ReservoResult<()>> + Send;
    fn get_permitted_resources(
        &self,
        business_type_id: Uuid,
    ) -> impl Future<Output = ReservoResult<Vec<Resource>>> + Send;

    /// Upsert the configured state of a resource for one business.
    ///
    /// Performs no validation against the type's permitted set; callers
    /// that need the write-time check go through the auth layer.
    fn configure_resource(
        &self,
        business_id: Uuid,
        resource_id: Uuid,
        is_active: bool,
    ) -> impl Future<Output = ReservoResult<()>> + Send;
    fn remove_configured_resource(
        &self,
        business_id: Uuid,
        resource_id: Uuid,
    ) -> impl Future<Output = ReservoResult<()>> + Send;
    /// Every configured row for the business, active or not.
    fn get_configured_resources(
        &self,
        business_id: Uuid,
    ) -> impl Future<Output = ReservoResult<Vec<ConfiguredResource>>> + Send;
}

// ---------------------------------------------------------------------------
// Store bundles
// ---------------------------------------------------------------------------

/// The identity store as consumed by authorization: one handle exposing
/// every identity repository.
pub trait IdentityStore: Send + Sync {
    type Users: UserRepository;
    type Roles: RoleRepository;
    type Permissions: PermissionRepository;
    type Memberships: MembershipRepository;
    type ApiKeys: ApiKeyRepository;

    fn users(&self) -> &Self::Users;
    fn roles(&self) -> &Self::Roles;
    fn permissions(&self) -> &Self::Permissions;
    fn memberships(&self) -> &Self::Memberships;
    fn api_keys(&self) -> &Self::ApiKeys;
}

/// The entitlement store: businesses plus their resource links.
pub trait EntitlementStore: Send + Sync {
    type Businesses: BusinessRepository;
    type Entitlements: EntitlementRepository;

    fn businesses(&self) -> &Self::Businesses;
    fn entitlements(&self) -> &Self::Entitlements;
}
