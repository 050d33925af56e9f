//! Third-party integration settings: OAuth login providers and the Google
//! Drive document-storage configuration.
//!
//! Secrets stored here are never serialized back to clients; every public view
//! goes through a redacting `Serialize` implementation.

pub mod google_drive;
pub mod oauth_provider;

pub use google_drive::{DriveConfigUpdate, GoogleDriveConfig};
pub use oauth_provider::{NewOAuthProvider, OAuthProvider, OAuthProviderPatch, PublicProvider};

/// Placeholder returned in place of stored secrets.
pub const REDACTED: &str = "********";
