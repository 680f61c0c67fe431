//! Authentication service: registration, login, token refresh and API
//! key lifecycle.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use reservo_core::error::{ReservoError, ReservoResult};
use reservo_core::models::api_key::{ApiKey, CreateApiKey};
use reservo_core::models::user::{CreateUser, User};
use reservo_core::repository::{
    ApiKeyRepository, BusinessRepository, EntitlementStore, IdentityStore, MembershipRepository,
    RoleRepository, UserRepository,
};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::password;
use crate::permission::{EffectivePermissions, PermissionResolver};
use crate::token::{SessionClaims, TokenIssuer};

/// Input for the login flow.
#[derive(Debug)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
    /// Business to bind the session to.
    pub business_id: Option<Uuid>,
}

/// What a client may know about the logged-in user.
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub email: String,
    pub role_codes: Vec<String>,
    pub business_id: Option<Uuid>,
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Successful login or refresh.
#[derive(Debug)]
pub struct LoginOutput {
    /// Signed session token.
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserSummary,
}

/// Input for issuing an API key.
#[derive(Debug)]
pub struct IssueApiKeyInput {
    pub business_id: Uuid,
    /// `None` issues a machine key.
    pub user_id: Option<Uuid>,
    pub name: String,
    pub role_codes: Vec<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// A freshly issued API key. The token is only ever returned here.
#[derive(Debug)]
pub struct IssuedApiKey {
    pub key: ApiKey,
    pub token: String,
}

/// Authentication service.
///
/// Generic over the store so the auth layer has no dependency on the
/// database crate.
pub struct AuthService<S> {
    store: Arc<S>,
    tokens: Arc<TokenIssuer>,
    permissions: Arc<PermissionResolver<S>>,
    config: AuthConfig,
}

impl<S: IdentityStore + EntitlementStore> AuthService<S> {
    pub fn new(
        store: Arc<S>,
        tokens: Arc<TokenIssuer>,
        permissions: Arc<PermissionResolver<S>>,
        config: AuthConfig,
    ) -> Self {
        Self {
            store,
            tokens,
            permissions,
            config,
        }
    }

    /// Create a user after checking the password policy.
    pub async fn register(&self, email: &str, password: &str) -> ReservoResult<User> {
        password::check_policy(password, self.config.min_password_length)?;
        let user = self
            .store
            .users()
            .create(CreateUser {
                email: email.to_string(),
                password: password.to_string(),
            })
            .await?;
        info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// Authenticate with email and password and issue a session token.
    ///
    /// Unknown email, wrong password and disabled account are
    /// indistinguishable to the caller.
    pub async fn login(&self, input: LoginInput) -> ReservoResult<LoginOutput> {
        let pepper = self.config.pepper.as_deref();

        // 1. Look up user.
        let user = match self.store.users().get_by_email(&input.email).await {
            Ok(user) => user,
            Err(ReservoError::NotFound { .. }) => {
                password::verify_dummy(&input.password, pepper);
                debug!("login failed: unknown email");
                return Err(AuthError::InvalidCredentials.into());
            }
            Err(e) => return Err(e),
        };

        // 2. Verify password.
        if !password::verify_password(&input.password, &user.password_hash, pepper)? {
            debug!(user_id = %user.id, "login failed: wrong password");
            return Err(AuthError::InvalidCredentials.into());
        }

        // 3. Check account status.
        if !user.is_active {
            debug!(user_id = %user.id, "login failed: account inactive");
            return Err(AuthError::InvalidCredentials.into());
        }

        // 4. Bind to the requested business.
        let roles = self.store.roles().get_user_roles(user.id).await?;
        let role_codes: Vec<String> = roles.into_iter().map(|r| r.code).collect();
        if let Some(business_id) = input.business_id {
            let is_super_admin = role_codes
                .iter()
                .any(|c| *c == self.config.super_admin_role_code);
            if !is_super_admin
                && !self
                    .store
                    .memberships()
                    .is_member(user.id, business_id)
                    .await?
            {
                return Err(ReservoError::Forbidden {
                    reason: format!("user is not a member of business {business_id}"),
                });
            }
        }

        // 5. Issue token.
        let last_login_at = self.store.users().record_login(user.id).await?;
        let (token, claims) =
            self.tokens
                .issue_session(user.id, &user.email, role_codes, input.business_id)?;

        info!(
            user_id = %user.id,
            business_id = ?input.business_id,
            "user logged in"
        );

        Ok(LoginOutput {
            token,
            expires_at: claims.expires_at(),
            user: UserSummary {
                id: user.id,
                email: user.email,
                role_codes: claims.role_codes,
                business_id: claims.business_id,
                last_login_at: Some(last_login_at),
            },
        })
    }

    /// Verify a session token without touching the store.
    pub fn verify_session(&self, token: &str) -> ReservoResult<SessionClaims> {
        Ok(self.tokens.verify_session(token)?)
    }

    /// Re-issue a still-valid session token with a fresh expiry.
    ///
    /// The user must still exist and be active; role codes and business
    /// are carried over from the presented token.
    pub async fn refresh_token(&self, token: &str) -> ReservoResult<LoginOutput> {
        let presented = self.tokens.verify_session(token)?;
        let user = self.store.users().get_by_id(presented.user_id).await?;
        if !user.is_active {
            return Err(ReservoError::inactive("user", user.id));
        }

        let (token, claims) = self.tokens.refresh_session(token)?;
        debug!(user_id = %user.id, "session refreshed");

        Ok(LoginOutput {
            token,
            expires_at: claims.expires_at(),
            user: UserSummary {
                id: user.id,
                email: user.email,
                role_codes: claims.role_codes,
                business_id: claims.business_id,
                last_login_at: user.last_login_at,
            },
        })
    }

    /// Create an API key bound to one business and sign its token.
    pub async fn issue_api_key(&self, input: IssueApiKeyInput) -> ReservoResult<IssuedApiKey> {
        let business = self.store.businesses().get_by_id(input.business_id).await?;
        if !business.is_active {
            return Err(ReservoError::inactive("business", business.id));
        }

        let roles = self.store.roles().get_by_codes(&input.role_codes).await?;
        if let Some(unknown) = input
            .role_codes
            .iter()
            .find(|code| !roles.iter().any(|r| &r.code == *code))
        {
            return Err(ReservoError::validation(format!("unknown role code '{unknown}'")));
        }
        if roles.iter().any(|r| r.code == self.config.super_admin_role_code) {
            return Err(ReservoError::validation(
                "API keys cannot carry the super-admin role",
            ));
        }

        let user_id = match input.user_id {
            Some(user_id) => {
                self.store.users().get_by_id(user_id).await?;
                if !self
                    .store
                    .memberships()
                    .is_member(user_id, business.id)
                    .await?
                {
                    return Err(ReservoError::validation(format!(
                        "user {user_id} is not a member of business {}",
                        business.id
                    )));
                }
                let held = self.store.roles().get_user_roles(user_id).await?;
                if let Some(missing) = input
                    .role_codes
                    .iter()
                    .find(|code| !held.iter().any(|r| &r.code == *code))
                {
                    return Err(ReservoError::validation(format!(
                        "user {user_id} does not hold role '{missing}'"
                    )));
                }
                user_id
            }
            None => Uuid::nil(),
        };

        let key = self
            .store
            .api_keys()
            .create(CreateApiKey {
                business_id: business.id,
                user_id,
                name: input.name,
                role_codes: input.role_codes,
                expires_at: input.expires_at,
            })
            .await?;

        let token = self.tokens.issue_api_key(
            key.id,
            key.user_id,
            key.business_id,
            key.role_codes.clone(),
            key.expires_at,
        )?;

        info!(
            api_key_id = %key.id,
            business_id = %key.business_id,
            machine = key.is_machine_key(),
            "api key issued"
        );
        Ok(IssuedApiKey { key, token })
    }

    /// Revoke a key of `business_id`. Takes effect on the next verify.
    pub async fn revoke_api_key(&self, business_id: Uuid, key_id: Uuid) -> ReservoResult<ApiKey> {
        let key = self.store.api_keys().revoke(business_id, key_id).await?;
        warn!(api_key_id = %key_id, %business_id, "api key revoked");
        Ok(key)
    }

    /// Effective permissions for UIs rendering visible features.
    pub async fn get_effective_permissions(
        &self,
        user_id: Uuid,
        business_id: Uuid,
    ) -> ReservoResult<EffectivePermissions> {
        self.permissions
            .resolve_effective_permissions(user_id, business_id)
            .await
    }
}
