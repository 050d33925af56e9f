use casebridge_auth::{Principal, Role, SessionToken, User};
use casebridge_core::UserId;

/// The authenticated user for a request, inserted by the auth middleware.
///
/// The user row is re-read on every request, so role changes and deletions
/// take effect without waiting for the session to expire.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    user: User,
    token: SessionToken,
}

impl CurrentUser {
    pub fn new(user: User, token: SessionToken) -> Self {
        Self { user, token }
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn token(&self) -> &SessionToken {
        &self.token
    }

    pub fn id(&self) -> UserId {
        self.user.id
    }

    pub fn role(&self) -> Role {
        self.user.role
    }

    pub fn principal(&self) -> Principal {
        Principal::new(self.user.id, self.user.email.clone(), self.user.role)
    }
}
