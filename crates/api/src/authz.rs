//! Route-level guards on top of the auth crate's policy checks.

use casebridge_auth::{Role, require_owner_or_staff, require_role};
use casebridge_core::UserId;

use crate::app::errors::ApiError;
use crate::context::CurrentUser;

/// Reject the request unless the caller's role is in `allowed`.
pub fn require(user: &CurrentUser, allowed: &[Role]) -> Result<(), ApiError> {
    require_role(&user.principal(), allowed).map_err(ApiError::from)
}

/// Clients may only reach rows they own.
pub fn require_owner(user: &CurrentUser, owner: UserId) -> Result<(), ApiError> {
    require_owner_or_staff(&user.principal(), owner).map_err(ApiError::from)
}

/// Listing filter: clients are limited to their own rows, staff see all.
pub fn client_scope(user: &CurrentUser) -> Option<UserId> {
    (user.role() == Role::Client).then(|| user.id())
}

/// `?include_inactive=true` only widens the listing for roles allowed to see
/// inactive rows; everyone else silently gets the active set.
pub fn may_include_inactive(user: &CurrentUser, requested: Option<bool>, allowed: &[Role]) -> bool {
    requested.unwrap_or(false) && allowed.contains(&user.role())
}
