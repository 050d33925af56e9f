//! Session tokens and the record stored behind them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use casebridge_core::UserId;

use crate::Role;

/// Opaque bearer token identifying a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionToken(String);

impl SessionToken {
    /// Mint a new random token (two v4 UUIDs, 244 random bits).
    pub fn generate() -> Self {
        Self(format!(
            "{}{}",
            Uuid::new_v4().simple(),
            Uuid::new_v4().simple()
        ))
    }

    /// Accept a token presented by a client. Rejects anything that could not have
    /// been minted by [`SessionToken::generate`].
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.len() == 64 && raw.chars().all(|c| c.is_ascii_hexdigit()) {
            Some(Self(raw.to_ascii_lowercase()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key under which the session record is stored.
    pub fn storage_key(&self) -> String {
        format!("session:{}", self.0)
    }
}

/// What the session store keeps for each live token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub user_id: UserId,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn new(user_id: UserId, role: Role, created_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            role,
            created_at,
        }
    }
}
