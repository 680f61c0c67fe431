//! One handle over every SurrealDB repository.

use reservo_core::repository::{EntitlementStore, IdentityStore};
use surrealdb::{Connection, Surreal};

use super::{
    SurrealApiKeyRepository, SurrealBusinessRepository, SurrealBusinessTypeRepository,
    SurrealEntitlementRepository, SurrealMembershipRepository, SurrealPermissionRepository,
    SurrealResourceRepository, SurrealRoleRepository, SurrealScopeRepository,
    SurrealUserRepository,
};

/// Every repository sharing a single client.
///
/// Implements both [`IdentityStore`] and [`EntitlementStore`] so the
/// authorization layer can be built over one value. Cloning is cheap;
/// the client is reference-counted.
#[derive(Clone)]
pub struct SurrealStore<C: Connection> {
    users: SurrealUserRepository<C>,
    roles: SurrealRoleRepository<C>,
    permissions: SurrealPermissionRepository<C>,
    scopes: SurrealScopeRepository<C>,
    memberships: SurrealMembershipRepository<C>,
    api_keys: SurrealApiKeyRepository<C>,
    businesses: SurrealBusinessRepository<C>,
    business_types: SurrealBusinessTypeRepository<C>,
    resources: SurrealResourceRepository<C>,
    entitlements: SurrealEntitlementRepository<C>,
}

impl<C: Connection> SurrealStore<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self::build(SurrealUserRepository::new(db.clone()), db)
    }

    /// Like [`SurrealStore::new`], hashing passwords with a server-side
    /// pepper.
    pub fn with_pepper(db: Surreal<C>, pepper: String) -> Self {
        Self::build(SurrealUserRepository::with_pepper(db.clone(), pepper), db)
    }

    fn build(users: SurrealUserRepository<C>, db: Surreal<C>) -> Self {
        Self {
            users,
            roles: SurrealRoleRepository::new(db.clone()),
            permissions: SurrealPermissionRepository::new(db.clone()),
            scopes: SurrealScopeRepository::new(db.clone()),
            memberships: SurrealMembershipRepository::new(db.clone()),
            api_keys: SurrealApiKeyRepository::new(db.clone()),
            businesses: SurrealBusinessRepository::new(db.clone()),
            business_types: SurrealBusinessTypeRepository::new(db.clone()),
            resources: SurrealResourceRepository::new(db.clone()),
            entitlements: SurrealEntitlementRepository::new(db),
        }
    }

    pub fn scopes(&self) -> &SurrealScopeRepository<C> {
        &self.scopes
    }

    pub fn business_types(&self) -> &SurrealBusinessTypeRepository<C> {
        &self.business_types
    }

    pub fn resources(&self) -> &SurrealResourceRepository<C> {
        &self.resources
    }
}

impl<C: Connection> IdentityStore for SurrealStore<C> {
    type Users = SurrealUserRepository<C>;
    type Roles = SurrealRoleRepository<C>;
    type Permissions = SurrealPermissionRepository<C>;
    type Memberships = SurrealMembershipRepository<C>;
    type ApiKeys = SurrealApiKeyRepository<C>;

    fn users(&self) -> &Self::Users {
        &self.users
    }

    fn roles(&self) -> &Self::Roles {
        &self.roles
    }

    fn permissions(&self) -> &Self::Permissions {
        &self.permissions
    }

    fn memberships(&self) -> &Self::Memberships {
        &self.memberships
    }

    fn api_keys(&self) -> &Self::ApiKeys {
        &self.api_keys
    }
}

impl<C: Connection> EntitlementStore for SurrealStore<C> {
    type Businesses = SurrealBusinessRepository<C>;
    type Entitlements = SurrealEntitlementRepository<C>;

    fn businesses(&self) -> &Self::Businesses {
        &self.businesses
    }

    fn entitlements(&self) -> &Self::Entitlements {
        &self.entitlements
    }
}
