use chrono::{DateTime, Utc};
use serde::Serialize;

use casebridge_core::{DomainResult, Entity, ServiceCategoryId, optional_text, required_text};

/// Grouping for journeys shown to clients (e.g. "Estate Planning", "Probate").
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceCategory {
    pub id: ServiceCategoryId,
    pub name: String,
    pub description: Option<String>,
    pub display_order: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for ServiceCategory {
    type Id = ServiceCategoryId;
    const NAME: &'static str = "service category";

    fn id(&self) -> &ServiceCategoryId {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewServiceCategory {
    pub name: String,
    pub description: Option<String>,
}

impl NewServiceCategory {
    pub fn new(name: Option<&str>, description: Option<&str>) -> DomainResult<Self> {
        Ok(Self {
            name: required_text(name, "name")?,
            description: optional_text(description),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub is_active: Option<bool>,
}

impl CategoryPatch {
    pub fn new(
        name: Option<&str>,
        description: Option<&str>,
        is_active: Option<bool>,
    ) -> DomainResult<Self> {
        Ok(Self {
            name: name.map(|n| required_text(Some(n), "name")).transpose()?,
            description: description.map(|v| optional_text(Some(v))),
            is_active,
        })
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
