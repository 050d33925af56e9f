//! Validated values shared by several practice areas (emails, money) and the
//! text normalization every request field goes through.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Marker for types compared by value rather than by id.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}

/// A normalized (trimmed, lowercased) email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmailAddress(String);

impl EmailAddress {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let normalized = raw.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(DomainError::validation("email is required"));
        }

        let valid = match normalized.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty()
                    && domain.contains('.')
                    && !domain.starts_with('.')
                    && !domain.ends_with('.')
                    && !domain.contains('@')
            }
            None => false,
        };
        if !valid || normalized.chars().any(char::is_whitespace) {
            return Err(DomainError::validation(format!(
                "'{}' is not a valid email address",
                raw.trim()
            )));
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl core::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl ValueObject for EmailAddress {}

/// A positive amount in the smallest currency unit (e.g. cents).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub amount_cents: i64,
    pub currency: String,
}

impl Money {
    pub const DEFAULT_CURRENCY: &'static str = "USD";

    pub fn new(amount_cents: i64, currency: Option<&str>) -> DomainResult<Self> {
        if amount_cents <= 0 {
            return Err(DomainError::validation("amount_cents must be greater than zero"));
        }

        let currency = currency
            .map(|c| c.trim().to_uppercase())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| Self::DEFAULT_CURRENCY.to_string());
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(DomainError::validation(
                "currency must be a three-letter ISO code",
            ));
        }

        Ok(Self {
            amount_cents,
            currency,
        })
    }
}

impl ValueObject for Money {}

/// Require a non-blank text field, returning the trimmed value.
pub fn required_text(value: Option<&str>, field: &str) -> DomainResult<String> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(DomainError::validation(format!("{field} is required"))),
    }
}

/// Normalize an optional text field: blank becomes `None`.
pub fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
