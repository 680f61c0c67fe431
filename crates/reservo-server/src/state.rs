//! Shared application state.
//!
//! Holds every service built over one store. Transport layers take an
//! `Arc<AppState<_>>` and call into the services directly.

use std::sync::Arc;

use reservo_auth::{
    AuthConfig, AuthError, AuthService, AuthorizationGate, EntitlementResolver,
    EntitlementService, PermissionResolver, TokenIssuer,
};
use reservo_db::SurrealStore;
use surrealdb::Connection;

type Store<C> = SurrealStore<C>;

#[allow(dead_code)]
pub struct AppState<C: Connection> {
    pub store: Arc<Store<C>>,
    pub tokens: Arc<TokenIssuer>,
    pub entitlements: EntitlementService<Store<C>>,
    pub permissions: Arc<PermissionResolver<Store<C>>>,
    pub gate: AuthorizationGate<Store<C>>,
    pub auth: AuthService<Store<C>>,
}

impl<C: Connection> AppState<C> {
    pub fn build(store: Store<C>, config: &AuthConfig) -> Result<Self, AuthError> {
        let store = Arc::new(store);
        let tokens = Arc::new(TokenIssuer::new(config)?);
        let entitlement_resolver = Arc::new(EntitlementResolver::new(store.clone(), config));
        let entitlements = EntitlementService::new(store.clone(), entitlement_resolver.clone());
        let permissions = Arc::new(PermissionResolver::new(
            store.clone(),
            entitlement_resolver,
            config,
        ));
        let gate = AuthorizationGate::new(store.clone(), tokens.clone(), permissions.clone());
        let auth = AuthService::new(
            store.clone(),
            tokens.clone(),
            permissions.clone(),
            config.clone(),
        );

        Ok(Self {
            store,
            tokens,
            entitlements,
            permissions,
            gate,
            auth,
        })
    }
}

#[cfg(test)]
mod tests {
    use reservo_auth::{Credential, Decision, DenyReason, LoginInput};
    use reservo_core::models::permission::Action;
    use surrealdb::Surreal;
    use surrealdb::engine::local::{Db, Mem};

    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    async fn state() -> AppState<Db> {
        let db = Surreal::new::<Mem>(()).await.unwrap();
        db.use_ns("test").use_db("test").await.unwrap();
        reservo_db::run_migrations(&db).await.unwrap();
        let config = AuthConfig {
            jwt_secret: SECRET.into(),
            ..Default::default()
        };
        AppState::build(SurrealStore::new(db), &config).unwrap()
    }

    #[tokio::test]
    async fn wired_services_sign_and_verify_tokens() {
        let state = state().await;
        let user = state
            .auth
            .register("ops@example.com", "a long enough password")
            .await
            .unwrap();

        let out = state
            .auth
            .login(LoginInput {
                email: "ops@example.com".into(),
                password: "a long enough password".into(),
                business_id: None,
            })
            .await
            .unwrap();
        assert_eq!(state.auth.verify_session(&out.token).unwrap().user_id, user.id);

        let decision = state
            .gate
            .authorize(&Credential::Session(out.token), "reservations", Action::Read)
            .await
            .unwrap();
        assert!(matches!(
            decision,
            Decision::Deny(DenyReason::Forbidden { .. })
        ));
    }

    #[tokio::test]
    async fn empty_secret_is_refused() {
        let db = Surreal::new::<Mem>(()).await.unwrap();
        db.use_ns("test").use_db("test").await.unwrap();
        let result = AppState::build(SurrealStore::new(db), &AuthConfig::default());
        assert!(result.is_err());
    }
}
