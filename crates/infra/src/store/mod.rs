//! SQLite repositories, one per table family.
//!
//! Identifiers and status enums are persisted as TEXT and parsed back on read;
//! a value that fails to parse surfaces as [`StoreError::Corrupt`].

mod categories;
mod conversations;
mod documents;
mod google_drive;
mod journeys;
mod lawpay;
mod matters;
mod oauth_providers;
mod payments;
mod snapshots;
mod users;

pub use categories::ServiceCategoryStore;
pub use conversations::{ConversationScope, ConversationStore};
pub use documents::DocumentStore;
pub use google_drive::GoogleDriveStore;
pub use journeys::JourneyStore;
pub use lawpay::LawPayStore;
pub use matters::MatterStore;
pub use oauth_providers::OAuthProviderStore;
pub use payments::PaymentStore;
pub use snapshots::SnapshotStore;
pub use users::UserStore;

use core::fmt::Display;
use core::str::FromStr;

use crate::error::{StoreError, StoreResult};

/// Parse a TEXT column into a typed value.
pub(crate) fn parse_column<T>(raw: &str, column: &'static str) -> StoreResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    raw.parse::<T>()
        .map_err(|e| StoreError::corrupt(format!("{column}: {e}")))
}

pub(crate) fn parse_optional_column<T>(
    raw: Option<String>,
    column: &'static str,
) -> StoreResult<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    raw.as_deref().map(|v| parse_column(v, column)).transpose()
}

/// Client display name for joined rows: "First Last" or the email.
pub(crate) fn joined_name(
    first: Option<String>,
    last: Option<String>,
    email: Option<String>,
) -> Option<String> {
    let email = email?;
    Some(casebridge_auth::display_name(
        first.as_deref(),
        last.as_deref(),
        &email,
    ))
}
