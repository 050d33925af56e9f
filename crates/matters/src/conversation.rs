//! Bridge conversations: a thread between a client and the firm, optionally
//! tied to a matter and assigned to a lawyer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use casebridge_core::{
    ConversationId, DomainResult, Entity, MatterId, UserId, optional_text, required_text,
    status_enum,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConversationStatus {
    Open,
    Archived,
}

status_enum!(ConversationStatus, "status", {
    Open => "OPEN",
    Archived => "ARCHIVED",
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub client_id: UserId,
    /// Joined from `users`.
    pub client_name: Option<String>,
    pub lawyer_id: Option<UserId>,
    pub matter_id: Option<MatterId>,
    pub subject: String,
    pub status: ConversationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Lawyers see threads assigned to them plus the unassigned queue.
    pub fn visible_to_lawyer(&self, lawyer: UserId) -> bool {
        self.lawyer_id.is_none_or(|id| id == lawyer)
    }
}

impl Entity for Conversation {
    type Id = ConversationId;
    const NAME: &'static str = "conversation";

    fn id(&self) -> &ConversationId {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewConversation {
    pub client_id: UserId,
    pub lawyer_id: Option<UserId>,
    pub matter_id: Option<MatterId>,
    pub subject: String,
}

impl NewConversation {
    pub fn new(
        client_id: UserId,
        subject: Option<&str>,
        lawyer_id: Option<&str>,
        matter_id: Option<&str>,
    ) -> DomainResult<Self> {
        Ok(Self {
            client_id,
            subject: required_text(subject, "subject")?,
            lawyer_id: optional_text(lawyer_id)
                .map(|s| s.parse::<UserId>())
                .transpose()?,
            matter_id: optional_text(matter_id)
                .map(|s| s.parse::<MatterId>())
                .transpose()?,
        })
    }
}
