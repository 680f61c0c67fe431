//! Permission domain model.

use core::fmt;
use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ReservoError;

/// Operation a permission grants on its resource.
///
/// `Manage` implies every other action on the same resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
    Manage,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Manage => "manage",
        }
    }

    /// Whether holding `self` satisfies a requirement for `required`.
    pub fn satisfies(&self, required: Action) -> bool {
        *self == required || *self == Action::Manage
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = ReservoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Action::Create),
            "read" => Ok(Action::Read),
            "update" => Ok(Action::Update),
            "delete" => Ok(Action::Delete),
            "manage" => Ok(Action::Manage),
            other => Err(ReservoError::validation(format!("unknown action: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Permission {
    pub id: Uuid,
    /// Globally unique, e.g. `reservations:read`. Immutable once granted.
    pub code: String,
    /// Code of the resource this permission applies to.
    pub resource: String,
    pub action: Action,
    pub scope_id: Uuid,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Permission {
    pub fn allows(&self, resource: &str, action: Action) -> bool {
        self.resource == resource && self.action.satisfies(action)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePermission {
    pub code: String,
    pub resource: String,
    pub action: Action,
    pub scope_id: Uuid,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdatePermission {
    pub code: Option<String>,
    pub description: Option<String>,
}

/// Conventional permission code for a resource/action pair.
pub fn permission_code(resource: &str, action: Action) -> String {
    format!("{resource}:{action}")
}
