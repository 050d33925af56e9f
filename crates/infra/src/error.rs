//! Storage error model.
//!
//! SQLx errors are mapped as follows:
//!
//! | SQLx error | SQLite code | `StoreError` |
//! |---|---|---|
//! | Database (unique violation) | `2067` / `1555` | `Conflict` |
//! | Database (foreign key violation) | `787` | `Domain(Validation)` |
//! | anything else | n/a | `Database` |

use thiserror::Error;

use casebridge_auth::PasswordError;
use casebridge_core::{DomainError, Entity};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Password(#[from] PasswordError),

    /// A stored row could not be mapped back into a domain value.
    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("database error in {operation}: {source}")]
    Database {
        operation: &'static str,
        #[source]
        source: sqlx::Error,
    },
}

impl StoreError {
    /// `NotFound` named after the entity (e.g. "matter not found").
    pub fn not_found<E: Entity>() -> Self {
        Self::NotFound(E::NAME)
    }

    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::Corrupt(msg.into())
    }
}

/// Map an SQLx error raised during `operation`, turning constraint failures
/// into the caller-facing variants.
pub fn map_sqlx_error(operation: &'static str, err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return StoreError::Conflict(unique_violation_message(db_err.message()));
        }
        if db_err.is_foreign_key_violation() {
            return StoreError::Domain(DomainError::validation(
                "referenced record does not exist",
            ));
        }
    }
    StoreError::Database {
        operation,
        source: err,
    }
}

/// "UNIQUE constraint failed: users.email" -> "users.email already exists".
fn unique_violation_message(raw: &str) -> String {
    match raw.split_once("UNIQUE constraint failed:") {
        Some((_, cols)) => format!("{} already exists", cols.trim()),
        None => raw.to_string(),
    }
}
