use serde::Serialize;

use casebridge_core::UserId;

use crate::Role;

/// A fully resolved principal for authorization decisions.
///
/// Built by the HTTP layer from a live session plus the user's current row, so
/// a role change takes effect on the next request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub user_id: UserId,
    pub email: String,
    pub role: Role,
}

impl Principal {
    pub fn new(user_id: UserId, email: impl Into<String>, role: Role) -> Self {
        Self {
            user_id,
            email: email.into(),
            role,
        }
    }

    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }
}
