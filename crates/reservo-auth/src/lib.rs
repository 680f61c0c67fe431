//! Reservo Auth: password login, session and API key tokens, and
//! tenant-scoped permission resolution.

pub mod cache;
pub mod config;
mod deadline;
pub mod entitlement;
pub mod error;
pub mod gate;
pub mod password;
pub mod permission;
pub mod service;
pub mod token;

pub use config::AuthConfig;
pub use entitlement::{EntitlementResolver, EntitlementService};
pub use error::AuthError;
pub use gate::{AuthorizationGate, Credential, Decision, DenyReason, Principal};
pub use permission::{EffectivePermissions, PermissionResolver};
pub use service::{AuthService, IssueApiKeyInput, IssuedApiKey, LoginInput, LoginOutput, UserSummary};
pub use token::{ApiKeyClaims, SessionClaims, TokenIssuer};
