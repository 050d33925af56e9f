use core::str::FromStr;

use serde::{Deserialize, Serialize};

use casebridge_core::DomainError;

/// Role of an authenticated user.
///
/// Serialized in uppercase both on the wire and in the `users.role` column.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Client,
    Lawyer,
    Admin,
}

/// Every role; used by routes open to any signed-in user.
pub const ANY_ROLE: &[Role] = &[Role::Client, Role::Lawyer, Role::Admin];

/// Firm staff (lawyers and administrators).
pub const STAFF: &[Role] = &[Role::Lawyer, Role::Admin];

pub const ADMIN_ONLY: &[Role] = &[Role::Admin];

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "CLIENT",
            Role::Lawyer => "LAWYER",
            Role::Admin => "ADMIN",
        }
    }

    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Lawyer | Role::Admin)
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "CLIENT" => Ok(Role::Client),
            "LAWYER" => Ok(Role::Lawyer),
            "ADMIN" => Ok(Role::Admin),
            other => Err(DomainError::validation(format!(
                "role must be one of CLIENT, LAWYER, ADMIN (got '{other}')"
            ))),
        }
    }
}
