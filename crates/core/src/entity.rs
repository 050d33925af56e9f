//! Rows with a stable identity.

/// A persisted record addressed by a typed id.
pub trait Entity {
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Lowercase name used in "not found" messages (e.g. "matter").
    const NAME: &'static str;

    fn id(&self) -> &Self::Id;
}
