use chrono::{DateTime, Utc};
use serde::Serialize;

use casebridge_core::{DomainResult, Entity, JourneyId, JourneyStepId, optional_text, required_text};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JourneyStep {
    pub id: JourneyStepId,
    pub journey_id: JourneyId,
    pub name: String,
    pub description: Option<String>,
    pub step_order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for JourneyStep {
    type Id = JourneyStepId;
    const NAME: &'static str = "journey step";

    fn id(&self) -> &JourneyStepId {
        &self.id
    }
}

/// A step to append at the end of a journey.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewJourneyStep {
    pub journey_id: JourneyId,
    pub name: String,
    pub description: Option<String>,
}

impl NewJourneyStep {
    pub fn new(
        journey_id: JourneyId,
        name: Option<&str>,
        description: Option<&str>,
    ) -> DomainResult<Self> {
        Ok(Self {
            journey_id,
            name: required_text(name, "name")?,
            description: optional_text(description),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
}

impl StepPatch {
    pub fn new(name: Option<&str>, description: Option<&str>) -> DomainResult<Self> {
        Ok(Self {
            name: name.map(|n| required_text(Some(n), "name")).transpose()?,
            description: description.map(|v| optional_text(Some(v))),
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
    fn step_name_is_required() {
        let err = NewJourneyStep::new(JourneyId::new(), Some(" "), None).unwrap_err();
        assert_eq!(err.to_string(), "name is required");
    }

    #[test]
    fn empty_patch_is_detected() {
        assert!(StepPatch::new(None, None).unwrap().is_empty());
        assert!(StepPatch::new(None, Some("")).is_ok_and(|p| p.description == Some(None)));
    }
}
