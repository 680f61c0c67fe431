//! Integration tests for entitlement and permission resolution.

mod common;

use common::Fixture;
use reservo_core::ReservoError;
use reservo_core::models::permission::Action;
use reservo_core::models::scope::ScopeKind;
use reservo_core::models::user::UpdateUser;
use reservo_core::repository::{
    IdentityStore, MembershipRepository, PermissionRepository, RoleRepository, UserRepository,
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

fn codes(set: &reservo_auth::EffectivePermissions) -> Vec<&str> {
    set.codes().collect()
}

#[tokio::test]
async fn host_in_business_7_sees_only_configured_resources() {
    let fx = Fixture::new().await;

    let effective = fx
        .permissions
        .resolve_effective_permissions(fx.host, fx.business_7)
        .await
        .unwrap();

    assert!(!effective.is_super_admin);
    assert_eq!(codes(&effective), ["reservations:manage", "reservations:read"]);
}

#[tokio::test]
async fn entitled_resources_are_configured_intersect_permitted() {
    let fx = Fixture::new().await;

    let entitled = fx
        .entitlement_resolver
        .resolve_entitled_resources(fx.business_7)
        .await
        .unwrap();
    assert_eq!(entitled.iter().collect::<Vec<_>>(), ["reservations"]);

    let other = fx
        .entitlement_resolver
        .resolve_entitled_resources(fx.other_business)
        .await
        .unwrap();
    assert_eq!(other.iter().collect::<Vec<_>>(), ["reservations", "tables"]);
}

#[tokio::test]
async fn super_admin_gets_every_permission_regardless_of_entitlement() {
    let fx = Fixture::new().await;

    let effective = fx
        .permissions
        .resolve_effective_permissions(fx.admin, fx.business_7)
        .await
        .unwrap();

    let all = fx.store.permissions().list_all().await.unwrap();
    assert!(effective.is_super_admin);
    assert_eq!(effective.len(), all.len());
    assert!(effective.contains("tables:read"));

    // Even for a business id that does not exist.
    let anywhere = fx
        .permissions
        .resolve_effective_permissions(fx.admin, Uuid::new_v4())
        .await
        .unwrap();
    assert_eq!(anywhere.len(), all.len());
}

#[tokio::test]
async fn business_roles_do_not_leak_into_other_businesses() {
    let fx = Fixture::new().await;

    let effective = fx
        .permissions
        .resolve_effective_permissions(fx.host, fx.other_business)
        .await
        .unwrap();
    assert!(effective.is_empty());
}

#[tokio::test]
async fn platform_roles_apply_everywhere_but_stay_entitlement_filtered() {
    let fx = Fixture::new().await;
    let auditor = fx.role("auditor", ScopeKind::Platform).await;
    let tables_read = fx
        .store
        .permissions()
        .get_by_code("tables:read")
        .await
        .unwrap();
    let reservations_read = fx
        .store
        .permissions()
        .get_by_code("reservations:read")
        .await
        .unwrap();
    for p in [&tables_read, &reservations_read] {
        fx.store
            .permissions()
            .grant_to_role(auditor.id, p.id)
            .await
            .unwrap();
    }
    let user = fx.user("auditor@example.com").await;
    fx.store.roles().assign_to_user(user, auditor.id).await.unwrap();

    let in_7 = fx
        .permissions
        .resolve_effective_permissions(user, fx.business_7)
        .await
        .unwrap();
    assert_eq!(codes(&in_7), ["reservations:read"]);

    let in_8 = fx
        .permissions
        .resolve_effective_permissions(user, fx.other_business)
        .await
        .unwrap();
    assert_eq!(codes(&in_8), ["reservations:read", "tables:read"]);
}

#[tokio::test]
async fn permissions_shared_by_roles_appear_once() {
    let fx = Fixture::new().await;
    let shift_lead = fx.role("shift_lead", ScopeKind::Business).await;
    let read = fx
        .store
        .permissions()
        .get_by_code("reservations:read")
        .await
        .unwrap();
    fx.store
        .permissions()
        .grant_to_role(shift_lead.id, read.id)
        .await
        .unwrap();
    fx.store
        .roles()
        .assign_to_user(fx.host, shift_lead.id)
        .await
        .unwrap();

    let effective = fx
        .permissions
        .resolve_effective_permissions(fx.host, fx.business_7)
        .await
        .unwrap();
    assert_eq!(codes(&effective), ["reservations:manage", "reservations:read"]);
}

#[tokio::test]
async fn user_without_roles_resolves_to_empty_set() {
    let fx = Fixture::new().await;
    let user = fx.user("guest@example.com").await;
    fx.store
        .memberships()
        .add_member(user, fx.business_7)
        .await
        .unwrap();

    let effective = fx
        .permissions
        .resolve_effective_permissions(user, fx.business_7)
        .await
        .unwrap();
    assert!(effective.is_empty());
}

#[tokio::test]
async fn missing_deleted_and_disabled_users_fail() {
    let fx = Fixture::new().await;

    assert!(matches!(
        fx.permissions
            .resolve_effective_permissions(Uuid::new_v4(), fx.business_7)
            .await,
        Err(ReservoError::NotFound { .. })
    ));

    fx.store
        .users()
        .update(
            fx.host,
            UpdateUser {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(matches!(
        fx.permissions
            .resolve_effective_permissions(fx.host, fx.business_7)
            .await,
        Err(ReservoError::Inactive { .. })
    ));

    fx.store.users().delete(fx.host).await.unwrap();
    assert!(matches!(
        fx.permissions
            .resolve_effective_permissions(fx.host, fx.business_7)
            .await,
        Err(ReservoError::NotFound { .. })
    ));
}

#[tokio::test]
async fn missing_and_inactive_businesses_fail() {
    let fx = Fixture::new().await;

    assert!(matches!(
        fx.entitlement_resolver
            .resolve_entitled_resources(Uuid::new_v4())
            .await,
        Err(ReservoError::NotFound { .. })
    ));

    fx.entitlements
        .set_business_active(fx.business_7, false)
        .await
        .unwrap();
    assert!(matches!(
        fx.permissions
            .resolve_effective_permissions(fx.host, fx.business_7)
            .await,
        Err(ReservoError::Inactive { .. })
    ));
}

#[tokio::test]
async fn configuring_an_unpermitted_resource_is_rejected() {
    let fx = Fixture::new().await;
    fx.entitlements
        .forbid_resource(fx.restaurant_type, fx.tables)
        .await
        .unwrap();

    let result = fx
        .entitlements
        .configure_resource(fx.business_7, fx.tables, true)
        .await;
    assert!(matches!(result, Err(ReservoError::Validation { .. })));

    // Rows configured before the type withdrew the resource are ignored.
    let other = fx
        .entitlement_resolver
        .resolve_entitled_resources(fx.other_business)
        .await
        .unwrap();
    assert_eq!(other.iter().collect::<Vec<_>>(), ["reservations"]);
}

#[tokio::test]
async fn entitlement_writes_invalidate_the_cache() {
    let fx = Fixture::new().await;

    let before = fx
        .permissions
        .resolve_effective_permissions(fx.host, fx.business_7)
        .await
        .unwrap();
    assert!(!before.allows("tables", Action::Read));

    fx.entitlements
        .configure_resource(fx.business_7, fx.tables, true)
        .await
        .unwrap();

    let after = fx
        .permissions
        .resolve_effective_permissions(fx.host, fx.business_7)
        .await
        .unwrap();
    assert!(after.allows("tables", Action::Read));

    // Type-level changes reach every business of the type.
    fx.entitlements
        .forbid_resource(fx.restaurant_type, fx.tables)
        .await
        .unwrap();
    let forbidden = fx
        .permissions
        .resolve_effective_permissions(fx.host, fx.business_7)
        .await
        .unwrap();
    assert!(!forbidden.allows("tables", Action::Read));
}

#[tokio::test]
async fn role_changes_take_effect_on_next_resolution() {
    let fx = Fixture::new().await;

    fx.store
        .roles()
        .unassign_from_user(fx.host, fx.host_role.id)
        .await
        .unwrap();

    let effective = fx
        .permissions
        .resolve_effective_permissions(fx.host, fx.business_7)
        .await
        .unwrap();
    assert!(effective.is_empty());
}

#[tokio::test]
async fn cancelled_resolution_is_unavailable() {
    let fx = Fixture::new().await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = fx
        .permissions
        .resolve_effective_permissions_until(fx.host, fx.business_7, &cancel)
        .await;
    assert!(matches!(result, Err(ReservoError::Unavailable { .. })));
    assert!(result.unwrap_err().is_retryable());
}
