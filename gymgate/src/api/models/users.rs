//! User-facing identity models.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account roles on the gym platform. Single-valued per account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Trainer,
    Trainee,
}

impl Role {
    /// The authority string consumed by downstream authorization layers,
    /// e.g. `ROLE_TRAINER`.
    pub fn authority(&self) -> &'static str {
        match self {
            Role::Trainer => "ROLE_TRAINER",
            Role::Trainee => "ROLE_TRAINEE",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Trainer => "TRAINER",
            Role::Trainee => "TRAINEE",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TRAINER" => Ok(Role::Trainer),
            "TRAINEE" => Ok(Role::Trainee),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity attached to a request by the request gate after the bearer token
/// has passed the composite validation check.
#[derive(Debug, Clone, Serialize)]
pub struct AuthenticatedUser {
    pub account_id: Uuid,
    pub username: String,
    pub role: Role,
}

impl AuthenticatedUser {
    pub fn authority(&self) -> &'static str {
        self.role.authority()
    }
}
