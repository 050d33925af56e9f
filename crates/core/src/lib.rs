//! Types every practice-area crate builds on: typed ids, `DomainError`,
//! emails and money, and the status-enum helper. Nothing here touches I/O.

pub mod entity;
pub mod error;
pub mod id;
pub mod status;
pub mod value_object;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{
    ConversationId, DocumentId, JourneyId, JourneyStepId, MatterId, OAuthProviderId, PaymentId,
    ServiceCategoryId, SnapshotId, UserId,
};
pub use value_object::{EmailAddress, Money, ValueObject, optional_text, required_text};
