use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use casebridge_core::{
    DocumentId, DomainError, DomainResult, Entity, MatterId, UserId, optional_text,
    required_text, status_enum,
};

/// Estate-plan document workflow.
///
/// ```text
/// DRAFT -> IN_REVIEW -> READY_FOR_SIGNATURE -> SIGNED -> COMPLETED
///   ^________|________________|
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentStatus {
    Draft,
    InReview,
    ReadyForSignature,
    Signed,
    Completed,
}

status_enum!(DocumentStatus, "status", {
    Draft => "DRAFT",
    InReview => "IN_REVIEW",
    ReadyForSignature => "READY_FOR_SIGNATURE",
    Signed => "SIGNED",
    Completed => "COMPLETED",
});

impl DocumentStatus {
    /// Documents move forward one stage at a time; unsigned documents can be
    /// sent back to draft. Setting the current status again is a no-op.
    pub fn can_transition_to(self, next: DocumentStatus) -> bool {
        use DocumentStatus::*;
        matches!(
            (self, next),
            (Draft, Draft)
                | (InReview, InReview)
                | (ReadyForSignature, ReadyForSignature)
                | (Signed, Signed)
                | (Completed, Completed)
                | (Draft, InReview)
                | (InReview, ReadyForSignature)
                | (ReadyForSignature, Signed)
                | (Signed, Completed)
                | (InReview, Draft)
                | (ReadyForSignature, Draft)
        )
    }

    pub fn transition(self, next: DocumentStatus) -> DomainResult<DocumentStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(DomainError::invariant(format!(
                "document cannot move from {self} to {next}"
            )))
        }
    }

    /// Signed and completed documents no longer accept content edits.
    pub fn is_locked(self) -> bool {
        matches!(self, DocumentStatus::Signed | DocumentStatus::Completed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    pub id: DocumentId,
    pub matter_id: MatterId,
    /// Joined from `matters`.
    pub matter_title: Option<String>,
    /// Owning client of the matter (joined), used for ownership checks.
    pub client_id: UserId,
    pub title: String,
    pub description: Option<String>,
    pub content: Option<String>,
    pub status: DocumentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Document {
    type Id = DocumentId;
    const NAME: &'static str = "document";

    fn id(&self) -> &DocumentId {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDocument {
    pub matter_id: MatterId,
    pub title: String,
    pub description: Option<String>,
    pub content: Option<String>,
}

impl NewDocument {
    pub fn new(
        matter_id: Option<&str>,
        title: Option<&str>,
        description: Option<&str>,
        content: Option<&str>,
    ) -> DomainResult<Self> {
        let matter_id = required_text(matter_id, "matter_id")?.parse::<MatterId>()?;
        Ok(Self {
            matter_id,
            title: required_text(title, "title")?,
            description: optional_text(description),
            content: content.map(str::to_string),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub content: Option<String>,
    pub status: Option<DocumentStatus>,
}

impl DocumentPatch {
    pub fn new(
        title: Option<&str>,
        description: Option<&str>,
        content: Option<&str>,
        status: Option<&str>,
    ) -> DomainResult<Self> {
        Ok(Self {
            title: title.map(|t| required_text(Some(t), "title")).transpose()?,
            description: description.map(|v| optional_text(Some(v))),
            content: content.map(str::to_string),
            status: status.map(str::parse::<DocumentStatus>).transpose()?,
        })
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Check the patch against the document's current state.
    pub fn check_against(&self, current: &Document) -> DomainResult<()> {
        if let Some(next) = self.status {
            current.status.transition(next)?;
        }
        let edits_body = self.title.is_some() || self.description.is_some() || self.content.is_some();
        if edits_body && current.status.is_locked() {
            return Err(DomainError::invariant(format!(
                "document is {} and can no longer be edited",
                current.status
            )));
        }
        Ok(())
    }
}
