//! User accounts (clients, lawyers, administrators).

use chrono::{DateTime, Utc};
use serde::Serialize;

use casebridge_core::{DomainError, DomainResult, EmailAddress, Entity, UserId, optional_text};

use crate::{MIN_PASSWORD_LEN, Role};

/// A user row as exposed to the rest of the system. The password hash never
/// leaves the storage layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// "First Last", falling back to the email when no name is on file.
    pub fn display_name(&self) -> String {
        display_name(
            self.first_name.as_deref(),
            self.last_name.as_deref(),
            &self.email,
        )
    }
}

impl Entity for User {
    type Id = UserId;
    const NAME: &'static str = "user";

    fn id(&self) -> &UserId {
        &self.id
    }
}

pub fn display_name(first: Option<&str>, last: Option<&str>, fallback: &str) -> String {
    let joined = [first, last]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if joined.is_empty() {
        fallback.to_string()
    } else {
        joined
    }
}

/// Validated input for creating a user. `password` is plaintext until the
/// storage layer hashes it.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: EmailAddress,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub role: Role,
}

impl NewUser {
    pub fn new(
        email: Option<&str>,
        password: Option<&str>,
        role: Option<&str>,
        first_name: Option<&str>,
        last_name: Option<&str>,
        phone: Option<&str>,
    ) -> DomainResult<Self> {
        let email = EmailAddress::parse(email.unwrap_or_default())?;
        let password = validate_password(password)?;
        let role = role
            .ok_or_else(|| DomainError::validation("role is required"))?
            .parse::<Role>()?;

        Ok(Self {
            email,
            password,
            first_name: optional_text(first_name),
            last_name: optional_text(last_name),
            phone: optional_text(phone),
            role,
        })
    }
}

fn validate_password(password: Option<&str>) -> DomainResult<String> {
    let password = password.unwrap_or_default();
    if password.is_empty() {
        return Err(DomainError::validation("password is required"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(DomainError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(password.to_string())
}

/// Partial update of a user. `None` leaves the column untouched; for the
/// nullable name/phone columns an empty string clears the value.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub email: Option<EmailAddress>,
    pub password: Option<String>,
    pub first_name: Option<Option<String>>,
    pub last_name: Option<Option<String>>,
    pub phone: Option<Option<String>>,
    pub role: Option<Role>,
}

impl UserPatch {
    pub fn new(
        email: Option<&str>,
        password: Option<&str>,
        role: Option<&str>,
        first_name: Option<&str>,
        last_name: Option<&str>,
        phone: Option<&str>,
    ) -> DomainResult<Self> {
        Ok(Self {
            email: email.map(EmailAddress::parse).transpose()?,
            password: password.map(|p| validate_password(Some(p))).transpose()?,
            role: role.map(str::parse::<Role>).transpose()?,
            first_name: first_name.map(|v| optional_text(Some(v))),
            last_name: last_name.map(|v| optional_text(Some(v))),
            phone: phone.map(|v| optional_text(Some(v))),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.password.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.phone.is_none()
            && self.role.is_none()
    }
}
