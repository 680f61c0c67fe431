//! Integration tests for the identity repositories using in-memory
//! SurrealDB.

use reservo_core::ReservoError;
use reservo_core::models::api_key::CreateApiKey;
use reservo_core::models::business::{CreateBusiness, CreateBusinessType};
use reservo_core::models::permission::{Action, CreatePermission, UpdatePermission};
use reservo_core::models::role::{CreateRole, UpdateRole};
use reservo_core::models::scope::{CreateScope, ScopeKind};
use reservo_core::models::user::{CreateUser, UpdateUser};
use reservo_core::repository::{
    ApiKeyRepository, BusinessRepository, BusinessTypeRepository, EntitlementStore,
    IdentityStore, MembershipRepository, Pagination, PermissionRepository, RoleRepository,
    ScopeRepository, UserRepository,
};
use reservo_db::SurrealStore;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

async fn setup() -> SurrealStore<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    reservo_db::run_migrations(&db).await.unwrap();
    SurrealStore::with_pepper(db, "test-pepper".into())
}

async fn business(store: &SurrealStore<Db>, code: &str) -> Uuid {
    let ty = match store.business_types().get_by_code("restaurant").await {
        Ok(ty) => ty,
        Err(_) => store
            .business_types()
            .create(CreateBusinessType {
                code: "restaurant".into(),
                name: "Restaurant".into(),
            })
            .await
            .unwrap(),
    };
    store
        .businesses()
        .create(CreateBusiness {
            code: code.into(),
            name: code.into(),
            business_type_id: ty.id,
        })
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn users_are_looked_up_case_insensitively_and_tombstoned() {
    let store = setup().await;
    let users = store.users();

    let user = users
        .create(CreateUser {
            email: "Alice@Example.com".into(),
            password: "correct horse battery".into(),
        })
        .await
        .unwrap();
    assert_eq!(user.email, "alice@example.com");
    assert!(user.is_active);
    assert!(user.password_hash.starts_with("$argon2id$"));
    assert!(!user.password_hash.contains("correct horse"));

    let found = users.get_by_email("ALICE@example.COM").await.unwrap();
    assert_eq!(found.id, user.id);

    let dup = users
        .create(CreateUser {
            email: "alice@example.com".into(),
            password: "another one".into(),
        })
        .await;
    assert!(matches!(dup, Err(ReservoError::AlreadyExists { .. })));

    let updated = users
        .update(
            user.id,
            UpdateUser {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(!updated.is_active);

    users.delete(user.id).await.unwrap();
    assert!(matches!(
        users.get_by_id(user.id).await,
        Err(ReservoError::NotFound { .. })
    ));
    assert!(matches!(
        users.get_by_email("alice@example.com").await,
        Err(ReservoError::NotFound { .. })
    ));
    assert_eq!(users.list(Pagination::default()).await.unwrap().total, 0);
}

#[tokio::test]
async fn record_login_stamps_timestamp() {
    let store = setup().await;
    let user = store
        .users()
        .create(CreateUser {
            email: "bob@example.com".into(),
            password: "pw-pw-pw-pw".into(),
        })
        .await
        .unwrap();
    assert!(user.last_login_at.is_none());

    let stamped = store.users().record_login(user.id).await.unwrap();
    let reloaded = store.users().get_by_id(user.id).await.unwrap();
    assert_eq!(reloaded.last_login_at, Some(stamped));

    store.users().delete(user.id).await.unwrap();
    assert!(matches!(
        store.users().record_login(user.id).await,
        Err(ReservoError::NotFound { .. })
    ));
}

#[tokio::test]
async fn system_roles_are_protected() {
    let store = setup().await;
    let roles = store.roles();

    let host = roles
        .create(CreateRole {
            code: "host".into(),
            name: "Host".into(),
            level: 30,
            scope: ScopeKind::Business,
            is_system: true,
        })
        .await
        .unwrap();

    let rename = roles
        .update(
            host.id,
            UpdateRole {
                code: Some("greeter".into()),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(rename, Err(ReservoError::Validation { .. })));

    let renamed = roles
        .update(
            host.id,
            UpdateRole {
                name: Some("Front of house".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.name, "Front of house");
    assert_eq!(renamed.code, "host");

    assert!(matches!(
        roles.delete(host.id).await,
        Err(ReservoError::Validation { .. })
    ));

    let custom = roles
        .create(CreateRole {
            code: "sommelier".into(),
            name: "Sommelier".into(),
            level: 40,
            scope: ScopeKind::Business,
            is_system: false,
        })
        .await
        .unwrap();
    roles.delete(custom.id).await.unwrap();
    assert!(matches!(
        roles.get_by_id(custom.id).await,
        Err(ReservoError::NotFound { .. })
    ));
}

#[tokio::test]
async fn role_assignment_and_grants_round_trip() {
    let store = setup().await;
    let scope = store
        .scopes()
        .create(CreateScope {
            code: ScopeKind::Business,
            description: "Within one business".into(),
        })
        .await
        .unwrap();
    assert_eq!(
        store.scopes().get_by_code(ScopeKind::Business).await.unwrap().id,
        scope.id
    );

    let user = store
        .users()
        .create(CreateUser {
            email: "host@example.com".into(),
            password: "pw-pw-pw-pw".into(),
        })
        .await
        .unwrap();
    let role = store
        .roles()
        .create(CreateRole {
            code: "host".into(),
            name: "Host".into(),
            level: 30,
            scope: ScopeKind::Business,
            is_system: true,
        })
        .await
        .unwrap();
    let perm = store
        .permissions()
        .create(CreatePermission {
            code: "reservations:read".into(),
            resource: "reservations".into(),
            action: Action::Read,
            scope_id: scope.id,
            description: "Read reservations".into(),
        })
        .await
        .unwrap();

    store.roles().assign_to_user(user.id, role.id).await.unwrap();
    // Second assignment does not duplicate the edge.
    store.roles().assign_to_user(user.id, role.id).await.unwrap();
    store.permissions().grant_to_role(role.id, perm.id).await.unwrap();
    store.permissions().grant_to_role(role.id, perm.id).await.unwrap();

    let user_roles = store.roles().get_user_roles(user.id).await.unwrap();
    assert_eq!(user_roles.len(), 1);
    assert_eq!(user_roles[0].code, "host");

    let granted = store.permissions().get_role_permissions(role.id).await.unwrap();
    assert_eq!(granted.len(), 1);
    assert_eq!(granted[0].action, Action::Read);

    // Granted permissions keep their code.
    let rename = store
        .permissions()
        .update(
            perm.id,
            UpdatePermission {
                code: Some("bookings:read".into()),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(rename, Err(ReservoError::Validation { .. })));

    store.permissions().revoke_from_role(role.id, perm.id).await.unwrap();
    assert!(store.permissions().get_role_permissions(role.id).await.unwrap().is_empty());

    store.roles().unassign_from_user(user.id, role.id).await.unwrap();
    assert!(store.roles().get_user_roles(user.id).await.unwrap().is_empty());

    let by_codes = store
        .roles()
        .get_by_codes(&["host".into(), "nobody".into()])
        .await
        .unwrap();
    assert_eq!(by_codes.len(), 1);
}

#[tokio::test]
async fn membership_links_users_to_businesses() {
    let store = setup().await;
    let b1 = business(&store, "casa-luna").await;
    let b2 = business(&store, "el-faro").await;
    let user = Uuid::new_v4();

    store.memberships().add_member(user, b1).await.unwrap();
    store.memberships().add_member(user, b1).await.unwrap();
    assert!(store.memberships().is_member(user, b1).await.unwrap());
    assert!(!store.memberships().is_member(user, b2).await.unwrap());

    let businesses = store.memberships().get_user_businesses(user).await.unwrap();
    assert_eq!(businesses.len(), 1);
    assert_eq!(businesses[0].id, b1);

    store.memberships().remove_member(user, b1).await.unwrap();
    assert!(!store.memberships().is_member(user, b1).await.unwrap());
}

#[tokio::test]
async fn api_key_revocation_is_scoped_and_sticky() {
    let store = setup().await;
    let b1 = business(&store, "casa-luna").await;
    let b2 = business(&store, "el-faro").await;

    let key = store
        .api_keys()
        .create(CreateApiKey {
            business_id: b1,
            user_id: Uuid::nil(),
            name: "pos-terminal".into(),
            role_codes: vec!["host".into()],
            expires_at: None,
        })
        .await
        .unwrap();
    assert!(key.is_machine_key());
    assert!(!key.revoked);
    assert_eq!(key.role_codes, vec!["host".to_string()]);

    assert!(matches!(
        store.api_keys().revoke(b2, key.id).await,
        Err(ReservoError::NotFound { .. })
    ));

    let revoked = store.api_keys().revoke(b1, key.id).await.unwrap();
    assert!(revoked.revoked);
    let first = revoked.revoked_at.unwrap();

    let again = store.api_keys().revoke(b1, key.id).await.unwrap();
    assert_eq!(again.revoked_at, Some(first));

    assert_eq!(store.api_keys().list_by_business(b1).await.unwrap().len(), 1);
    assert!(store.api_keys().list_by_business(b2).await.unwrap().is_empty());
}
