//! Google Drive storage configuration (singleton).

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer, ser::SerializeStruct};

use casebridge_core::{DomainError, DomainResult, EmailAddress, optional_text};

use crate::REDACTED;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleDriveConfig {
    pub is_enabled: bool,
    pub service_account_email: Option<String>,
    /// Service account JSON key.
    pub service_account_key: Option<String>,
    pub root_folder_id: Option<String>,
    pub shared_drive_id: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Serialize for GoogleDriveConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("GoogleDriveConfig", 7)?;
        s.serialize_field("is_enabled", &self.is_enabled)?;
        s.serialize_field("service_account_email", &self.service_account_email)?;
        s.serialize_field(
            "service_account_key",
            &self.service_account_key.as_ref().map(|_| REDACTED),
        )?;
        s.serialize_field("has_service_account_key", &self.service_account_key.is_some())?;
        s.serialize_field("root_folder_id", &self.root_folder_id)?;
        s.serialize_field("shared_drive_id", &self.shared_drive_id)?;
        s.serialize_field("updated_at", &self.updated_at)?;
        s.end()
    }
}

/// Upsert request, merged over the stored config (if any).
///
/// `None` keeps the stored value; an empty string clears it. The redaction
/// placeholder for the key also means "keep".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriveConfigUpdate {
    pub is_enabled: Option<bool>,
    pub service_account_email: Option<Option<String>>,
    pub service_account_key: Option<Option<String>>,
    pub root_folder_id: Option<Option<String>>,
    pub shared_drive_id: Option<Option<String>>,
}

impl DriveConfigUpdate {
    pub fn new(
        is_enabled: Option<bool>,
        service_account_email: Option<&str>,
        service_account_key: Option<&str>,
        root_folder_id: Option<&str>,
        shared_drive_id: Option<&str>,
    ) -> DomainResult<Self> {
        let service_account_email = service_account_email
            .map(|v| {
                optional_text(Some(v))
                    .map(|e| EmailAddress::parse(&e).map(EmailAddress::into_inner))
                    .transpose()
            })
            .transpose()?;

        let service_account_key = service_account_key
            .filter(|v| *v != REDACTED)
            .map(|v| optional_text(Some(v)).map(validate_key).transpose())
            .transpose()?;

        Ok(Self {
            is_enabled,
            service_account_email,
            service_account_key,
            root_folder_id: root_folder_id.map(|v| optional_text(Some(v))),
            shared_drive_id: shared_drive_id.map(|v| optional_text(Some(v))),
        })
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge over `current` and check the result is usable when enabled.
    pub fn apply(
        self,
        current: Option<&GoogleDriveConfig>,
        now: DateTime<Utc>,
    ) -> DomainResult<GoogleDriveConfig> {
        fn pick(update: Option<Option<String>>, old: Option<&Option<String>>) -> Option<String> {
            match update {
                Some(v) => v,
                None => old.cloned().flatten(),
            }
        }

        let merged = GoogleDriveConfig {
            is_enabled: self
                .is_enabled
                .unwrap_or_else(|| current.is_some_and(|c| c.is_enabled)),
            service_account_email: pick(
                self.service_account_email,
                current.map(|c| &c.service_account_email),
            ),
            service_account_key: pick(
                self.service_account_key,
                current.map(|c| &c.service_account_key),
            ),
            root_folder_id: pick(self.root_folder_id, current.map(|c| &c.root_folder_id)),
            shared_drive_id: pick(self.shared_drive_id, current.map(|c| &c.shared_drive_id)),
            updated_at: now,
        };

        if merged.is_enabled {
            let mut missing = Vec::new();
            if merged.service_account_email.is_none() {
                missing.push("service_account_email");
            }
            if merged.service_account_key.is_none() {
                missing.push("service_account_key");
            }
            if merged.root_folder_id.is_none() {
                missing.push("root_folder_id");
            }
            if !missing.is_empty() {
                return Err(DomainError::validation(format!(
                    "cannot enable Google Drive without {}",
                    missing.join(", ")
                )));
            }
        }

        Ok(merged)
    }
}

/// The key must be a service-account JSON document.
fn validate_key(raw: String) -> DomainResult<String> {
    let parsed: serde_json::Value = serde_json::from_str(&raw)
        .map_err(|_| DomainError::validation("service_account_key must be a JSON key file"))?;
    let has_private_key = parsed
        .get("private_key")
        .and_then(|v| v.as_str())
        .is_some_and(|s| !s.is_empty());
    if !has_private_key {
        return Err(DomainError::validation(
            "service_account_key is missing private_key",
        ));
    }
    Ok(raw)
}
