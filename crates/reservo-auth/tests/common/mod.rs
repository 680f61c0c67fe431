//! Shared fixture: an in-memory store seeded with one restaurant
//! ("business 7") and the services wired over it.

#![allow(dead_code)]

use std::sync::Arc;

use reservo_auth::config::AuthConfig;
use reservo_auth::{
    AuthService, AuthorizationGate, EntitlementResolver, EntitlementService, PermissionResolver,
    TokenIssuer,
};
use reservo_core::models::business::{CreateBusiness, CreateBusinessType};
use reservo_core::models::permission::{Action, CreatePermission, Permission, permission_code};
use reservo_core::models::resource::CreateResource;
use reservo_core::models::role::{CreateRole, Role, SystemRole};
use reservo_core::models::scope::{CreateScope, ScopeKind};
use reservo_core::models::user::CreateUser;
use reservo_core::repository::{
    BusinessRepository, BusinessTypeRepository, EntitlementStore, IdentityStore,
    MembershipRepository, PermissionRepository, ResourceRepository, RoleRepository,
    ScopeRepository, UserRepository,
};
use reservo_db::SurrealStore;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

pub type Store = SurrealStore<Db>;

pub const PASSWORD: &str = "correct horse battery staple";
pub const SECRET: &str = "0123456789abcdef0123456789abcdef";

pub fn test_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: SECRET.into(),
        jwt_issuer: "reservo-test".into(),
        pepper: Some("test-pepper".into()),
        ..Default::default()
    }
}

pub struct Fixture {
    pub store: Arc<Store>,
    pub config: AuthConfig,
    pub tokens: Arc<TokenIssuer>,
    pub entitlement_resolver: Arc<EntitlementResolver<Store>>,
    pub entitlements: EntitlementService<Store>,
    pub permissions: Arc<PermissionResolver<Store>>,
    pub gate: AuthorizationGate<Store>,
    pub auth: AuthService<Store>,

    pub restaurant_type: Uuid,
    pub business_7: Uuid,
    pub other_business: Uuid,
    pub reservations: Uuid,
    pub tables: Uuid,
    pub business_scope: Uuid,
    pub host_role: Role,
    pub super_admin_role: Role,
    pub host: Uuid,
    pub admin: Uuid,
}

impl Fixture {
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(config: AuthConfig) -> Self {
        let db = Surreal::new::<Mem>(()).await.unwrap();
        db.use_ns("test").use_db("test").await.unwrap();
        reservo_db::run_migrations(&db).await.unwrap();
        let store = Arc::new(SurrealStore::with_pepper(
            db,
            config.pepper.clone().unwrap_or_default(),
        ));

        let tokens = Arc::new(TokenIssuer::new(&config).unwrap());
        let entitlement_resolver = Arc::new(EntitlementResolver::new(store.clone(), &config));
        let entitlements = EntitlementService::new(store.clone(), entitlement_resolver.clone());
        let permissions = Arc::new(PermissionResolver::new(
            store.clone(),
            entitlement_resolver.clone(),
            &config,
        ));
        let gate = AuthorizationGate::new(store.clone(), tokens.clone(), permissions.clone());
        let auth = AuthService::new(
            store.clone(),
            tokens.clone(),
            permissions.clone(),
            config.clone(),
        );

        // Scopes.
        store
            .scopes()
            .create(CreateScope {
                code: ScopeKind::Platform,
                description: "Platform-wide".into(),
            })
            .await
            .unwrap();
        let business_scope = store
            .scopes()
            .create(CreateScope {
                code: ScopeKind::Business,
                description: "Within one business".into(),
            })
            .await
            .unwrap()
            .id;

        // Resources and the restaurant type permitting both.
        let reservations = create_resource(&store, "reservations").await;
        let tables = create_resource(&store, "tables").await;
        let restaurant_type = store
            .business_types()
            .create(CreateBusinessType {
                code: "restaurant".into(),
                name: "Restaurant".into(),
            })
            .await
            .unwrap()
            .id;
        entitlements
            .permit_resource(restaurant_type, reservations)
            .await
            .unwrap();
        entitlements
            .permit_resource(restaurant_type, tables)
            .await
            .unwrap();

        // Business 7 configured with reservations only.
        let business_7 = create_business(&store, "business-7", restaurant_type).await;
        let other_business = create_business(&store, "business-8", restaurant_type).await;
        entitlements
            .configure_resource(business_7, reservations, true)
            .await
            .unwrap();
        entitlements
            .configure_resource(other_business, reservations, true)
            .await
            .unwrap();
        entitlements
            .configure_resource(other_business, tables, true)
            .await
            .unwrap();

        // Roles.
        let host_role = create_role(&store, SystemRole::Host, 30).await;
        let super_admin_role = create_role(&store, SystemRole::SuperAdmin, 0).await;

        let read = create_permission(&store, "reservations", Action::Read, business_scope).await;
        let manage = create_permission(&store, "reservations", Action::Manage, business_scope).await;
        let tables_read = create_permission(&store, "tables", Action::Read, business_scope).await;
        for p in [&read, &manage, &tables_read] {
            store
                .permissions()
                .grant_to_role(host_role.id, p.id)
                .await
                .unwrap();
        }

        // Users.
        let host = create_user(&store, "host@example.com").await;
        store
            .roles()
            .assign_to_user(host, host_role.id)
            .await
            .unwrap();
        store
            .memberships()
            .add_member(host, business_7)
            .await
            .unwrap();

        let admin = create_user(&store, "admin@example.com").await;
        store
            .roles()
            .assign_to_user(admin, super_admin_role.id)
            .await
            .unwrap();

        Self {
            store,
            config,
            tokens,
            entitlement_resolver,
            entitlements,
            permissions,
            gate,
            auth,
            restaurant_type,
            business_7,
            other_business,
            reservations,
            tables,
            business_scope,
            host_role,
            super_admin_role,
            host,
            admin,
        }
    }

    pub async fn user(&self, email: &str) -> Uuid {
        create_user(&self.store, email).await
    }

    pub async fn permission(&self, resource: &str, action: Action) -> Permission {
        create_permission(&self.store, resource, action, self.business_scope).await
    }

    pub async fn role(&self, code: &str, scope: ScopeKind) -> Role {
        self.store
            .roles()
            .create(CreateRole {
                code: code.into(),
                name: code.into(),
                level: 50,
                scope,
                is_system: false,
            })
            .await
            .unwrap()
    }
}

async fn create_resource(store: &Store, code: &str) -> Uuid {
    store
        .resources()
        .create(CreateResource {
            code: code.into(),
            name: code.into(),
        })
        .await
        .unwrap()
        .id
}

async fn create_business(store: &Store, code: &str, business_type_id: Uuid) -> Uuid {
    store
        .businesses()
        .create(CreateBusiness {
            code: code.into(),
            name: code.into(),
            business_type_id,
        })
        .await
        .unwrap()
        .id
}

async fn create_role(store: &Store, role: SystemRole, level: i32) -> Role {
    store
        .roles()
        .create(CreateRole {
            code: role.code().into(),
            name: role.code().into(),
            level,
            scope: role.scope(),
            is_system: true,
        })
        .await
        .unwrap()
}

async fn create_permission(store: &Store, resource: &str, action: Action, scope_id: Uuid) -> Permission {
    store
        .permissions()
        .create(CreatePermission {
            code: permission_code(resource, action),
            resource: resource.into(),
            action,
            scope_id,
            description: String::new(),
        })
        .await
        .unwrap()
}

async fn create_user(store: &Store, email: &str) -> Uuid {
    store
        .users()
        .create(CreateUser {
            email: email.into(),
            password: PASSWORD.into(),
        })
        .await
        .unwrap()
        .id
}
