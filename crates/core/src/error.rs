//! Errors raised by validation and state rules in the practice domain.

use thiserror::Error;

use crate::entity::Entity;

pub type DomainResult<T> = Result<T, DomainError>;

/// Failures a domain constructor or transition can report.
///
/// The `Display` text is what API clients see in the `message` field, so it
/// is written for a person filling in a form.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Missing, blank or malformed request input.
    #[error("{0}")]
    Validation(String),

    /// A status change the current state does not allow.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// Text that does not parse as one of the typed ids.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    /// Duplicate natural key such as a user email or provider id.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Missing row of entity `E`, named by [`Entity::NAME`].
    pub fn missing<E: Entity>() -> Self {
        Self::NotFound(E::NAME)
    }
}
