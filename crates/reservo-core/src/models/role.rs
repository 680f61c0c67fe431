//! Role domain model.

use core::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::scope::ScopeKind;

/// Code of the role that bypasses business entitlement filtering.
pub const SUPER_ADMIN_ROLE_CODE: &str = "super_admin";

/// Roles the platform itself depends on.
///
/// Every service compares against these instead of spelling role codes
/// inline, so "what counts as super-admin" lives in one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemRole {
    SuperAdmin,
    BusinessOwner,
    Host,
}

impl SystemRole {
    pub const ALL: [SystemRole; 3] = [
        SystemRole::SuperAdmin,
        SystemRole::BusinessOwner,
        SystemRole::Host,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            SystemRole::SuperAdmin => SUPER_ADMIN_ROLE_CODE,
            SystemRole::BusinessOwner => "business_owner",
            SystemRole::Host => "host",
        }
    }

    pub fn scope(&self) -> ScopeKind {
        match self {
            SystemRole::SuperAdmin => ScopeKind::Platform,
            SystemRole::BusinessOwner | SystemRole::Host => ScopeKind::Business,
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.code() == code)
    }
}

impl fmt::Display for SystemRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    /// Lower means more authority.
    pub level: i32,
    pub scope: ScopeKind,
    /// System roles cannot be deleted and their code is immutable.
    pub is_system: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Role {
    pub fn is_platform_scoped(&self) -> bool {
        self.scope == ScopeKind::Platform
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRole {
    pub code: String,
    pub name: String,
    pub level: i32,
    pub scope: ScopeKind,
    pub is_system: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateRole {
    pub code: Option<String>,
    pub name: Option<String>,
    pub level: Option<i32>,
}
