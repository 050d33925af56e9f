//! Typed row identifiers.
//!
//! Each id wraps a UUIDv7, so ids sort by creation time, and is stored as
//! hyphenated TEXT. Parsing failures name the id type, which ends up in the
//! 400 body when a path segment is garbage.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

macro_rules! typed_ids {
    ($( $(#[$doc:meta])* $name:ident; )+) => {$(
        $(#[$doc])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0.hyphenated(), f)
            }
        }

        impl FromStr for $name {
            type Err = DomainError;

            fn from_str(raw: &str) -> Result<Self, DomainError> {
                Uuid::parse_str(raw.trim()).map(Self).map_err(|e| {
                    DomainError::invalid_id(format!(concat!(stringify!($name), ": {}"), e))
                })
            }
        }
    )+};
}

typed_ids! {
    /// Client, lawyer or admin account.
    UserId;
    MatterId;
    DocumentId;
    /// One saved version of a document.
    SnapshotId;
    JourneyId;
    JourneyStepId;
    ServiceCategoryId;
    /// Row in `oauth_providers`, not the provider's own slug.
    OAuthProviderId;
    PaymentId;
    /// Bridge conversation between a client and the firm.
    ConversationId;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_output_parses_back() {
        let id = MatterId::new();
        let parsed: MatterId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn garbage_is_reported_with_the_type_name() {
        let err = "not-a-uuid".parse::<DocumentId>().unwrap_err();
        match err {
            DomainError::InvalidId(msg) => assert!(msg.starts_with("DocumentId: ")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        let id = PaymentId::new();
        let parsed: PaymentId = format!("  {id} ").parse().unwrap();
        assert_eq!(id, parsed);
    }
}
