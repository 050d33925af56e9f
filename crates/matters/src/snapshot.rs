//! Immutable snapshot versions of a document's content.
//!
//! Versions are numbered per document starting at 1. Deleting a snapshot only
//! flips its status, so version numbers are never reused.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use casebridge_core::{
    DocumentId, DomainError, DomainResult, Entity, SnapshotId, UserId, optional_text, status_enum,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SnapshotStatus {
    Active,
    Deleted,
}

status_enum!(SnapshotStatus, "status", {
    Active => "ACTIVE",
    Deleted => "DELETED",
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub id: SnapshotId,
    pub document_id: DocumentId,
    pub version: i64,
    pub content: String,
    pub note: Option<String>,
    pub status: SnapshotStatus,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn is_deleted(&self) -> bool {
        self.status == SnapshotStatus::Deleted
    }
}

impl Entity for Snapshot {
    type Id = SnapshotId;
    const NAME: &'static str = "snapshot";

    fn id(&self) -> &SnapshotId {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSnapshot {
    pub document_id: DocumentId,
    pub content: String,
    pub note: Option<String>,
    pub created_by: Option<UserId>,
}

impl NewSnapshot {
    /// Build a snapshot; when the request omits `content` the document's current
    /// content is captured instead.
    pub fn new(
        document_id: DocumentId,
        content: Option<&str>,
        current_content: Option<&str>,
        note: Option<&str>,
        created_by: Option<UserId>,
    ) -> DomainResult<Self> {
        let content = content
            .or(current_content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| DomainError::validation("content is required"))?;

        Ok(Self {
            document_id,
            content: content.to_string(),
            note: optional_text(note),
            created_by,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_document_content() {
        let doc = DocumentId::new();
        let snap = NewSnapshot::new(doc, None, Some("<p>v1</p>"), Some(" first "), None).unwrap();
        assert_eq!(snap.content, "<p>v1</p>");
        assert_eq!(snap.note.as_deref(), Some("first"));
    }

    #[test]
    fn explicit_content_wins() {
        let snap =
            NewSnapshot::new(DocumentId::new(), Some("mine"), Some("theirs"), None, None).unwrap();
        assert_eq!(snap.content, "mine");
    }

    #[test]
    fn empty_content_is_rejected() {
        let err = NewSnapshot::new(DocumentId::new(), None, Some("  "), None, None).unwrap_err();
        assert_eq!(err.to_string(), "content is required");
    }
}
