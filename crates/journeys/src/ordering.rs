//! Batch reordering of ordered rows (journey steps, service categories).

use std::collections::HashSet;
use std::hash::Hash;

use casebridge_core::{DomainError, DomainResult};

/// One `{ id, position }` pair from a reorder request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReorderEntry<Id> {
    pub id: Id,
    pub position: i64,
}

/// A validated batch of position updates.
///
/// Invariants: non-empty, every id appears once, every position appears once
/// and is non-negative. Entries keep request order, which is also the order
/// they are written in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReorderPlan<Id> {
    entries: Vec<ReorderEntry<Id>>,
}

impl<Id> ReorderPlan<Id>
where
    Id: Copy + Eq + Hash + core::fmt::Display,
{
    pub fn new(entries: Vec<ReorderEntry<Id>>) -> DomainResult<Self> {
        if entries.is_empty() {
            return Err(DomainError::validation("at least one entry is required"));
        }

        let mut ids = HashSet::with_capacity(entries.len());
        let mut positions = HashSet::with_capacity(entries.len());
        for entry in &entries {
            if entry.position < 0 {
                return Err(DomainError::validation(format!(
                    "position for {} must not be negative",
                    entry.id
                )));
            }
            if !ids.insert(entry.id) {
                return Err(DomainError::validation(format!(
                    "{} appears more than once",
                    entry.id
                )));
            }
            if !positions.insert(entry.position) {
                return Err(DomainError::validation(format!(
                    "position {} is assigned more than once",
                    entry.position
                )));
            }
        }

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[ReorderEntry<Id>] {
        &self.entries
    }

    pub fn ids(&self) -> impl Iterator<Item = Id> + '_ {
        self.entries.iter().map(|e| e.id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
