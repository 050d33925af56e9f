//! Matters domain module: matters, their documents, document snapshot versions
//! and client/lawyer bridge conversations.
//!
//! Pure domain logic (no IO, no HTTP, no storage): record types, status
//! lifecycles and input validation.

pub mod conversation;
pub mod document;
pub mod matter;
pub mod snapshot;

pub use conversation::{Conversation, ConversationStatus, NewConversation};
pub use document::{Document, DocumentPatch, DocumentStatus, NewDocument};
pub use matter::{Matter, MatterPatch, MatterStatus, NewMatter};
pub use snapshot::{NewSnapshot, Snapshot, SnapshotStatus};
