//! The single authorization enforcement point.
//!
//! Every decision re-resolves permissions from the store; the role
//! snapshot inside a session token is never trusted for access.

use std::sync::Arc;

use chrono::Utc;
use reservo_core::error::{ReservoError, ReservoResult};
use reservo_core::models::permission::Action;
use reservo_core::repository::{ApiKeyRepository, EntitlementStore, IdentityStore};
use tracing::debug;
use uuid::Uuid;

use crate::error::AuthError;
use crate::permission::{EffectivePermissions, PermissionResolver};
use crate::token::TokenIssuer;

/// A bearer credential as presented by a caller.
#[derive(Debug, Clone)]
pub enum Credential {
    Session(String),
    ApiKey(String),
}

/// Who a verified credential speaks for.
#[derive(Debug, Clone)]
pub struct Principal {
    /// Nil for machine API keys.
    pub user_id: Uuid,
    /// Set when the credential is an API key.
    pub api_key_id: Option<Uuid>,
    /// Business the credential is bound to, if any.
    pub business_id: Option<Uuid>,
    pub permissions: EffectivePermissions,
}

impl Principal {
    pub fn is_super_admin(&self) -> bool {
        self.permissions.is_super_admin
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    Unauthenticated(String),
    Revoked,
    Inactive { entity: String, id: String },
    NotFound { entity: String, id: String },
    Forbidden { resource: String, action: Action },
    BusinessMismatch { requested: Uuid, bound: Option<Uuid> },
}

#[derive(Debug, Clone)]
pub enum Decision {
    Allow(Principal),
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow(_))
    }

    /// Collapse into the error taxonomy callers return to their clients.
    pub fn into_result(self) -> ReservoResult<Principal> {
        match self {
            Decision::Allow(principal) => Ok(principal),
            Decision::Deny(reason) => Err(match reason {
                DenyReason::Unauthenticated(reason) => ReservoError::Unauthenticated { reason },
                DenyReason::Revoked => ReservoError::Revoked {
                    reason: "credential has been revoked".into(),
                },
                DenyReason::Inactive { entity, id } => ReservoError::Inactive { entity, id },
                DenyReason::NotFound { entity, id } => ReservoError::NotFound { entity, id },
                DenyReason::Forbidden { resource, action } => ReservoError::Forbidden {
                    reason: format!("missing {resource}:{action}"),
                },
                DenyReason::BusinessMismatch { requested, bound } => ReservoError::Forbidden {
                    reason: match bound {
                        Some(bound) => format!(
                            "credential is bound to business {bound}, not {requested}"
                        ),
                        None => format!("credential is not bound to business {requested}"),
                    },
                },
            }),
        }
    }
}

/// A verified credential before permissions are attached.
struct Verified {
    user_id: Uuid,
    api_key_id: Option<Uuid>,
    business_id: Option<Uuid>,
    role_codes: Vec<String>,
}

impl Verified {
    fn is_api_key(&self) -> bool {
        self.api_key_id.is_some()
    }
}

/// Turn credential failures into denials; pass infrastructure errors on.
fn deny_or_fail(err: ReservoError) -> ReservoResult<Decision> {
    match err {
        ReservoError::Unauthenticated { reason } => {
            Ok(Decision::Deny(DenyReason::Unauthenticated(reason)))
        }
        ReservoError::Revoked { .. } => Ok(Decision::Deny(DenyReason::Revoked)),
        ReservoError::Inactive { entity, id } => {
            Ok(Decision::Deny(DenyReason::Inactive { entity, id }))
        }
        ReservoError::NotFound { entity, id } => {
            Ok(Decision::Deny(DenyReason::NotFound { entity, id }))
        }
        other => Err(other),
    }
}

pub struct AuthorizationGate<S> {
    store: Arc<S>,
    tokens: Arc<TokenIssuer>,
    permissions: Arc<PermissionResolver<S>>,
}

impl<S: IdentityStore + EntitlementStore> AuthorizationGate<S> {
    pub fn new(
        store: Arc<S>,
        tokens: Arc<TokenIssuer>,
        permissions: Arc<PermissionResolver<S>>,
    ) -> Self {
        Self {
            store,
            tokens,
            permissions,
        }
    }

    /// Allow when the credential's effective permissions in its own
    /// business grant `action` on `resource`.
    ///
    /// Credential problems come back as `Deny`; `Err` is reserved for
    /// store failures and deadlines.
    pub async fn authorize(
        &self,
        credential: &Credential,
        resource: &str,
        action: Action,
    ) -> ReservoResult<Decision> {
        let verified = match self.verify(credential).await {
            Ok(v) => v,
            Err(e) => return deny_or_fail(e),
        };
        let target = verified.business_id;
        self.decide(verified, target, resource, action).await
    }

    /// Like [`Self::authorize`] for an explicit target business.
    ///
    /// Denies with `BusinessMismatch` when the credential is bound to a
    /// different business. Sessions of super-admins may cross businesses;
    /// API keys never leave the business they were issued for.
    pub async fn authorize_in(
        &self,
        credential: &Credential,
        business_id: Uuid,
        resource: &str,
        action: Action,
    ) -> ReservoResult<Decision> {
        let verified = match self.verify(credential).await {
            Ok(v) => v,
            Err(e) => return deny_or_fail(e),
        };

        if verified.business_id != Some(business_id) {
            let bypass = !verified.is_api_key()
                && match self.permissions.is_super_admin(verified.user_id).await {
                    Ok(bypass) => bypass,
                    Err(e) => return deny_or_fail(e),
                };
            if !bypass {
                debug!(
                    requested = %business_id,
                    bound = ?verified.business_id,
                    "business mismatch"
                );
                return Ok(Decision::Deny(DenyReason::BusinessMismatch {
                    requested: business_id,
                    bound: verified.business_id,
                }));
            }
        }

        self.decide(verified, Some(business_id), resource, action)
            .await
    }

    async fn decide(
        &self,
        verified: Verified,
        business_id: Option<Uuid>,
        resource: &str,
        action: Action,
    ) -> ReservoResult<Decision> {
        let resolved = match (verified.is_api_key(), business_id) {
            (true, Some(business_id)) if verified.user_id.is_nil() => {
                self.permissions
                    .resolve_for_roles(&verified.role_codes, business_id)
                    .await
            }
            (true, Some(business_id)) => {
                self.permissions
                    .resolve_for_user_key(verified.user_id, &verified.role_codes, business_id)
                    .await
            }
            (false, Some(business_id)) => {
                self.permissions
                    .resolve_effective_permissions(verified.user_id, business_id)
                    .await
            }
            (false, None) => {
                self.permissions
                    .resolve_without_business(verified.user_id)
                    .await
            }
            // API keys always carry a business.
            (true, None) => Ok(EffectivePermissions::default()),
        };
        let permissions = match resolved {
            Ok(p) => p,
            Err(e) => return deny_or_fail(e),
        };

        if !permissions.allows(resource, action) {
            debug!(
                user_id = %verified.user_id,
                business_id = ?business_id,
                resource,
                %action,
                "authorization denied"
            );
            return Ok(Decision::Deny(DenyReason::Forbidden {
                resource: resource.to_string(),
                action,
            }));
        }

        Ok(Decision::Allow(Principal {
            user_id: verified.user_id,
            api_key_id: verified.api_key_id,
            business_id,
            permissions,
        }))
    }

    async fn verify(&self, credential: &Credential) -> ReservoResult<Verified> {
        match credential {
            Credential::Session(token) => {
                let claims = self.tokens.verify_session(token)?;
                Ok(Verified {
                    user_id: claims.user_id,
                    api_key_id: None,
                    business_id: claims.business_id,
                    role_codes: claims.role_codes,
                })
            }
            Credential::ApiKey(token) => {
                let claims = self.tokens.verify_api_key(token)?;
                let key_id = claims.key_id()?;

                let key = match self.store.api_keys().get_by_id(key_id).await {
                    Ok(key) => key,
                    Err(ReservoError::NotFound { .. }) => {
                        return Err(AuthError::MalformedToken(format!("unknown api key {key_id}")).into());
                    }
                    Err(e) => return Err(e),
                };
                if key.revoked {
                    return Err(AuthError::Revoked.into());
                }
                if key.business_id != claims.business_id || key.user_id != claims.user_id {
                    return Err(AuthError::MalformedToken("api key claims do not match record".into()).into());
                }
                if key.expires_at.is_some_and(|t| t <= Utc::now()) {
                    return Err(AuthError::TokenExpired.into());
                }

                Ok(Verified {
                    user_id: key.user_id,
                    api_key_id: Some(key.id),
                    business_id: Some(key.business_id),
                    role_codes: key.role_codes,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deny_reasons_map_to_error_taxonomy() {
        let forbidden = Decision::Deny(DenyReason::Forbidden {
            resource: "tables".into(),
            action: Action::Update,
        });
        assert!(matches!(
            forbidden.into_result(),
            Err(ReservoError::Forbidden { .. })
        ));

        let mismatch = Decision::Deny(DenyReason::BusinessMismatch {
            requested: Uuid::new_v4(),
            bound: None,
        });
        assert!(matches!(
            mismatch.into_result(),
            Err(ReservoError::Forbidden { .. })
        ));

        let expired = Decision::Deny(DenyReason::Unauthenticated("token has expired".into()));
        assert!(matches!(
            expired.into_result(),
            Err(ReservoError::Unauthenticated { .. })
        ));

        assert!(matches!(
            Decision::Deny(DenyReason::Revoked).into_result(),
            Err(ReservoError::Revoked { .. })
        ));
    }

    #[test]
    fn infrastructure_errors_are_not_denials() {
        assert!(deny_or_fail(ReservoError::unavailable("timeout")).is_err());
        assert!(matches!(
            deny_or_fail(ReservoError::inactive("user", 1)),
            Ok(Decision::Deny(DenyReason::Inactive { .. }))
        ));
    }
}
