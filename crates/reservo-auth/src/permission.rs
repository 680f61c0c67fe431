//! Effective permission resolution.
//!
//! Effective permissions are what a principal may exercise inside one
//! business: the union of its roles' permissions, restricted by scope
//! and by the business's entitled resources. Holders of the super-admin
//! role skip the entitlement filter entirely.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use reservo_core::error::{ReservoError, ReservoResult};
use reservo_core::models::permission::{Action, Permission};
use reservo_core::models::role::Role;
use reservo_core::repository::{
    EntitlementStore, IdentityStore, MembershipRepository, PermissionRepository, RoleRepository,
    UserRepository,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::deadline::within;
use crate::entitlement::EntitlementResolver;

/// The resolved permission set of one principal in one business.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EffectivePermissions {
    /// Deduplicated, ordered by code.
    pub permissions: Vec<Permission>,
    pub is_super_admin: bool,
}

impl EffectivePermissions {
    /// Whether any permission grants `action` (directly or via `manage`)
    /// on `resource`.
    pub fn allows(&self, resource: &str, action: Action) -> bool {
        self.permissions.iter().any(|p| p.allows(resource, action))
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.permissions.iter().map(|p| p.code.as_str())
    }

    pub fn contains(&self, code: &str) -> bool {
        self.codes().any(|c| c == code)
    }

    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }
}

/// Union `granted` by code and keep only entitled resources.
pub fn merge_entitled(
    granted: impl IntoIterator<Item = Permission>,
    entitled: &BTreeSet<String>,
) -> Vec<Permission> {
    let mut by_code = BTreeMap::new();
    for permission in granted {
        if entitled.contains(&permission.resource) {
            by_code.entry(permission.code.clone()).or_insert(permission);
        }
    }
    by_code.into_values().collect()
}

/// Roles that count towards a business: platform roles always, business
/// roles only for members.
fn contributing(roles: Vec<Role>, is_member: bool) -> Vec<Role> {
    roles
        .into_iter()
        .filter(|r| r.is_platform_scoped() || is_member)
        .collect()
}

pub struct PermissionResolver<S> {
    store: Arc<S>,
    entitlements: Arc<EntitlementResolver<S>>,
    super_admin_role_code: String,
    timeout: Duration,
}

impl<S: IdentityStore + EntitlementStore> PermissionResolver<S> {
    pub fn new(store: Arc<S>, entitlements: Arc<EntitlementResolver<S>>, config: &AuthConfig) -> Self {
        Self {
            store,
            entitlements,
            super_admin_role_code: config.super_admin_role_code.clone(),
            timeout: config.resolution_timeout(),
        }
    }

    pub fn entitlements(&self) -> &Arc<EntitlementResolver<S>> {
        &self.entitlements
    }

    /// Effective permissions of `user_id` in `business_id`.
    ///
    /// `NotFound` if the user is absent or deleted, `Inactive` if the user
    /// is disabled. Business `NotFound`/`Inactive` surface from the
    /// entitlement lookup for non-super-admins.
    pub async fn resolve_effective_permissions(
        &self,
        user_id: Uuid,
        business_id: Uuid,
    ) -> ReservoResult<EffectivePermissions> {
        within(
            "permission resolution",
            self.timeout,
            None,
            self.resolve_user(user_id, Some(business_id)),
        )
        .await
    }

    pub async fn resolve_effective_permissions_until(
        &self,
        user_id: Uuid,
        business_id: Uuid,
        cancel: &CancellationToken,
    ) -> ReservoResult<EffectivePermissions> {
        within(
            "permission resolution",
            self.timeout,
            Some(cancel),
            self.resolve_user(user_id, Some(business_id)),
        )
        .await
    }

    /// Permissions of a user with no business context.
    ///
    /// Only super-admins hold anything here; there is no business to
    /// entitle resources against.
    pub async fn resolve_without_business(&self, user_id: Uuid) -> ReservoResult<EffectivePermissions> {
        within(
            "permission resolution",
            self.timeout,
            None,
            self.resolve_user(user_id, None),
        )
        .await
    }

    /// Permissions carried by a machine API key bound to `business_id`.
    ///
    /// Business roles contribute because the key belongs to the business.
    /// Keys never receive the super-admin bypass.
    pub async fn resolve_for_roles(
        &self,
        role_codes: &[String],
        business_id: Uuid,
    ) -> ReservoResult<EffectivePermissions> {
        within("permission resolution", self.timeout, None, async {
            let roles = self.store.roles().get_by_codes(role_codes).await?;
            let permissions = self.collect(roles, business_id).await?;
            Ok(EffectivePermissions {
                permissions,
                is_super_admin: false,
            })
        })
        .await
    }

    /// Permissions carried by a user-bound API key in `business_id`.
    ///
    /// Only the key's own roles count, and only while the user still
    /// holds them. The super-admin role never contributes, so a key can
    /// not reach past the business entitlement filter.
    pub async fn resolve_for_user_key(
        &self,
        user_id: Uuid,
        role_codes: &[String],
        business_id: Uuid,
    ) -> ReservoResult<EffectivePermissions> {
        within("permission resolution", self.timeout, None, async {
            self.active_user(user_id).await?;
            let roles: Vec<Role> = self
                .store
                .roles()
                .get_user_roles(user_id)
                .await?
                .into_iter()
                .filter(|r| r.code != self.super_admin_role_code && role_codes.contains(&r.code))
                .collect();
            let is_member = self
                .store
                .memberships()
                .is_member(user_id, business_id)
                .await?;
            let permissions = self
                .collect(contributing(roles, is_member), business_id)
                .await?;
            Ok(EffectivePermissions {
                permissions,
                is_super_admin: false,
            })
        })
        .await
    }

    /// Whether the user currently holds the super-admin role.
    pub async fn is_super_admin(&self, user_id: Uuid) -> ReservoResult<bool> {
        within("role lookup", self.timeout, None, async {
            let roles = self.store.roles().get_user_roles(user_id).await?;
            Ok(self.holds_super_admin(&roles))
        })
        .await
    }

    fn holds_super_admin(&self, roles: &[Role]) -> bool {
        roles.iter().any(|r| r.code == self.super_admin_role_code)
    }

    async fn resolve_user(
        &self,
        user_id: Uuid,
        business_id: Option<Uuid>,
    ) -> ReservoResult<EffectivePermissions> {
        self.active_user(user_id).await?;

        let roles = self.store.roles().get_user_roles(user_id).await?;
        if self.holds_super_admin(&roles) {
            let permissions = self.store.permissions().list_all().await?;
            info!(
                target: "reservo::audit",
                %user_id,
                business_id = ?business_id,
                granted = permissions.len(),
                "super-admin bypass of entitlement filtering"
            );
            return Ok(EffectivePermissions {
                permissions,
                is_super_admin: true,
            });
        }

        let Some(business_id) = business_id else {
            return Ok(EffectivePermissions::default());
        };

        let is_member = self
            .store
            .memberships()
            .is_member(user_id, business_id)
            .await?;
        let permissions = self
            .collect(contributing(roles, is_member), business_id)
            .await?;

        Ok(EffectivePermissions {
            permissions,
            is_super_admin: false,
        })
    }

    /// `NotFound` for absent or deleted users, `Inactive` for disabled ones.
    async fn active_user(&self, user_id: Uuid) -> ReservoResult<()> {
        let user = self.store.users().get_by_id(user_id).await?;
        if !user.is_active {
            return Err(ReservoError::inactive("user", user_id));
        }
        Ok(())
    }

    async fn collect(&self, roles: Vec<Role>, business_id: Uuid) -> ReservoResult<Vec<Permission>> {
        // Resolve entitlements first so an absent or disabled business
        // fails even when no role contributes.
        let entitled = self.entitlements.resolve_cached(business_id).await?;

        let mut granted = Vec::new();
        for role in &roles {
            granted.extend(self.store.permissions().get_role_permissions(role.id).await?);
        }

        Ok(merge_entitled(granted, &entitled))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use reservo_core::models::scope::ScopeKind;

    use super::*;

    fn permission(code: &str, resource: &str, action: Action) -> Permission {
        Permission {
            id: Uuid::new_v4(),
            code: code.into(),
            resource: resource.into(),
            action,
            scope_id: Uuid::nil(),
            description: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn role(code: &str, scope: ScopeKind) -> Role {
        Role {
            id: Uuid::new_v4(),
            code: code.into(),
            name: code.into(),
            level: 10,
            scope,
            is_system: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn entitled(codes: &[&str]) -> BTreeSet<String> {
        codes.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn duplicates_collapse_by_code() {
        let read = permission("reservations:read", "reservations", Action::Read);
        let merged = merge_entitled(
            vec![read.clone(), read.clone(), read],
            &entitled(&["reservations"]),
        );
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn unentitled_resources_are_dropped() {
        let merged = merge_entitled(
            vec![
                permission("reservations:read", "reservations", Action::Read),
                permission("reservations:manage", "reservations", Action::Manage),
                permission("tables:read", "tables", Action::Read),
            ],
            &entitled(&["reservations"]),
        );
        let codes: Vec<_> = merged.iter().map(|p| p.code.as_str()).collect();
        assert_eq!(codes, ["reservations:manage", "reservations:read"]);
    }

    #[test]
    fn business_roles_need_membership() {
        let roles = vec![
            role("auditor", ScopeKind::Platform),
            role("host", ScopeKind::Business),
        ];
        let outside = contributing(roles.clone(), false);
        assert_eq!(outside.len(), 1);
        assert_eq!(outside[0].code, "auditor");
        assert_eq!(contributing(roles, true).len(), 2);
    }

    #[test]
    fn manage_allows_every_action() {
        let set = EffectivePermissions {
            permissions: vec![permission(
                "reservations:manage",
                "reservations",
                Action::Manage,
            )],
            is_super_admin: false,
        };
        assert!(set.allows("reservations", Action::Delete));
        assert!(!set.allows("tables", Action::Read));
        assert!(set.contains("reservations:manage"));
    }
}
