use thiserror::Error;

use casebridge_core::UserId;

use crate::{Principal, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("forbidden: role '{role}' is not permitted (requires one of {allowed})")]
    Forbidden { role: Role, allowed: String },

    #[error("forbidden: resource belongs to another client")]
    NotOwner,
}

/// Assert that the principal's role is in the route's allowed set.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
pub fn require_role(principal: &Principal, allowed: &[Role]) -> Result<(), AuthzError> {
    if allowed.contains(&principal.role) {
        return Ok(());
    }

    tracing::debug!(
        user_id = %principal.user_id,
        role = %principal.role,
        "role guard rejected request"
    );

    Err(AuthzError::Forbidden {
        role: principal.role,
        allowed: allowed
            .iter()
            .map(Role::as_str)
            .collect::<Vec<_>>()
            .join(", "),
    })
}

/// Staff may touch any client's rows; clients only their own.
pub fn require_owner_or_staff(principal: &Principal, owner: UserId) -> Result<(), AuthzError> {
    if principal.is_staff() || principal.user_id == owner {
        Ok(())
    } else {
        Err(AuthzError::NotOwner)
    }
}
