//! Journeys domain module: client journey templates, their ordered steps and
//! the service categories they are filed under.
//!
//! Journeys are soft-deleted (`is_active = false`); steps and categories are
//! removed outright. Steps and categories carry an explicit ordering field that
//! is rewritten in batches through [`ReorderPlan`].

pub mod category;
pub mod journey;
pub mod ordering;
pub mod step;

pub use category::{CategoryPatch, NewServiceCategory, ServiceCategory};
pub use journey::{Journey, JourneyPatch, NewJourney};
pub use ordering::{ReorderEntry, ReorderPlan};
pub use step::{JourneyStep, NewJourneyStep, StepPatch};
