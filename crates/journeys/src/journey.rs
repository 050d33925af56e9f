use chrono::{DateTime, Utc};
use serde::Serialize;

use casebridge_core::{
    DomainResult, Entity, JourneyId, ServiceCategoryId, optional_text, required_text,
};

/// A client journey template (e.g. "Revocable Living Trust").
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Journey {
    pub id: JourneyId,
    pub name: String,
    pub description: Option<String>,
    pub service_category_id: Option<ServiceCategoryId>,
    /// Joined from `service_categories`.
    pub category_name: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Journey {
    type Id = JourneyId;
    const NAME: &'static str = "journey";

    fn id(&self) -> &JourneyId {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewJourney {
    pub name: String,
    pub description: Option<String>,
    pub service_category_id: Option<ServiceCategoryId>,
}

impl NewJourney {
    pub fn new(
        name: Option<&str>,
        description: Option<&str>,
        service_category_id: Option<&str>,
    ) -> DomainResult<Self> {
        Ok(Self {
            name: required_text(name, "name")?,
            description: optional_text(description),
            service_category_id: optional_text(service_category_id)
                .map(|s| s.parse::<ServiceCategoryId>())
                .transpose()?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JourneyPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub service_category_id: Option<Option<ServiceCategoryId>>,
    pub is_active: Option<bool>,
}

impl JourneyPatch {
    pub fn new(
        name: Option<&str>,
        description: Option<&str>,
        service_category_id: Option<&str>,
        is_active: Option<bool>,
    ) -> DomainResult<Self> {
        Ok(Self {
            name: name.map(|n| required_text(Some(n), "name")).transpose()?,
            description: description.map(|v| optional_text(Some(v))),
            service_category_id: service_category_id
                .map(|v| {
                    optional_text(Some(v))
                        .map(|s| s.parse::<ServiceCategoryId>())
                        .transpose()
                })
                .transpose()?,
            is_active,
        })
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
