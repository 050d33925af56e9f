use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use casebridge_core::{
    DomainError, DomainResult, Entity, MatterId, UserId, optional_text, required_text,
    status_enum,
};

/// Matter lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MatterStatus {
    Open,
    Pending,
    Closed,
}

status_enum!(MatterStatus, "status", {
    Open => "OPEN",
    Pending => "PENDING",
    Closed => "CLOSED",
});

/// A legal matter for one client, optionally led by a lawyer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Matter {
    pub id: MatterId,
    pub client_id: UserId,
    /// Display name of the client (joined from `users`).
    pub client_name: Option<String>,
    pub lead_lawyer_id: Option<UserId>,
    pub title: String,
    pub matter_number: Option<String>,
    pub description: Option<String>,
    pub status: MatterStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Matter {
    type Id = MatterId;
    const NAME: &'static str = "matter";

    fn id(&self) -> &MatterId {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMatter {
    pub client_id: UserId,
    pub lead_lawyer_id: Option<UserId>,
    pub title: String,
    pub matter_number: Option<String>,
    pub description: Option<String>,
    pub status: MatterStatus,
}

impl NewMatter {
    pub fn new(
        client_id: Option<&str>,
        title: Option<&str>,
        lead_lawyer_id: Option<&str>,
        matter_number: Option<&str>,
        description: Option<&str>,
        status: Option<&str>,
    ) -> DomainResult<Self> {
        let client_id = client_id
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| DomainError::validation("client_id is required"))?
            .parse::<UserId>()?;
        let title = required_text(title, "title")?;
        let lead_lawyer_id = optional_text(lead_lawyer_id)
            .map(|s| s.parse::<UserId>())
            .transpose()?;
        let status = status
            .map(str::parse::<MatterStatus>)
            .transpose()?
            .unwrap_or(MatterStatus::Open);

        Ok(Self {
            client_id,
            lead_lawyer_id,
            title,
            matter_number: optional_text(matter_number),
            description: optional_text(description),
            status,
        })
    }
}

/// Partial update of a matter. `Some(None)` clears a nullable column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatterPatch {
    pub title: Option<String>,
    pub lead_lawyer_id: Option<Option<UserId>>,
    pub matter_number: Option<Option<String>>,
    pub description: Option<Option<String>>,
    pub status: Option<MatterStatus>,
}

impl MatterPatch {
    pub fn new(
        title: Option<&str>,
        lead_lawyer_id: Option<&str>,
        matter_number: Option<&str>,
        description: Option<&str>,
        status: Option<&str>,
    ) -> DomainResult<Self> {
        Ok(Self {
            title: title.map(|t| required_text(Some(t), "title")).transpose()?,
            lead_lawyer_id: lead_lawyer_id
                .map(|v| optional_text(Some(v)).map(|s| s.parse::<UserId>()).transpose())
                .transpose()?,
            matter_number: matter_number.map(|v| optional_text(Some(v))),
            description: description.map(|v| optional_text(Some(v))),
            status: status.map(str::parse::<MatterStatus>).transpose()?,
        })
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_matter_requires_client_and_title() {
        let err = NewMatter::new(None, Some("Estate plan"), None, None, None, None).unwrap_err();
        assert_eq!(err.to_string(), "client_id is required");

        let client = UserId::new().to_string();
        let err = NewMatter::new(Some(&client), Some("  "), None, None, None, None).unwrap_err();
        assert_eq!(err.to_string(), "title is required");
    }

    #[test]
    fn new_matter_defaults_to_open() {
        let client = UserId::new();
        let m = NewMatter::new(
            Some(&client.to_string()),
            Some("Smith Family Trust"),
            Some(""),
            Some("2024-001"),
            None,
            None,
        )
        .unwrap();
        assert_eq!(m.client_id, client);
        assert_eq!(m.status, MatterStatus::Open);
        assert_eq!(m.lead_lawyer_id, None);
        assert_eq!(m.matter_number.as_deref(), Some("2024-001"));
    }

    #[test]
    fn new_matter_rejects_bad_ids_and_status() {
        assert!(matches!(
            NewMatter::new(Some("nope"), Some("t"), None, None, None, None),
            Err(DomainError::InvalidId(_))
        ));
        let client = UserId::new().to_string();
        assert!(NewMatter::new(Some(&client), Some("t"), None, None, None, Some("ARCHIVED")).is_err());
    }

    #[test]
    fn patch_can_clear_lead_lawyer() {
        let patch = MatterPatch::new(None, Some(""), None, None, Some("closed")).unwrap();
        assert_eq!(patch.lead_lawyer_id, Some(None));
        assert_eq!(patch.status, Some(MatterStatus::Closed));
        assert!(MatterPatch::new(None, None, None, None, None).unwrap().is_empty());
    }
}
