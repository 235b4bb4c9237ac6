//! graph::lookup
//!
//! Access to already-persisted records.
//!
//! State definition asks the store two questions: is there a persisted
//! record with this key, and is there one with these unique values. The
//! [`PersistedLookup`] trait is that capability; [`InMemoryLookup`] answers
//! it from a list of records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::metadata::ProviderError;
use crate::core::types::{PropertyName, TypeName};

/// Values of one persisted record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedRecord {
    pub values: BTreeMap<PropertyName, Value>,
}

impl PersistedRecord {
    pub fn value(&self, property: &PropertyName) -> Option<&Value> {
        self.values.get(property)
    }

    /// Whether every `(property, value)` criterion matches.
    pub fn matches(&self, criteria: &[(PropertyName, Value)]) -> bool {
        criteria
            .iter()
            .all(|(property, value)| self.values.get(property) == Some(value))
    }
}

/// Read-only access to persisted records.
pub trait PersistedLookup {
    /// First record of `type_name` matching every criterion.
    fn find(
        &self,
        type_name: &TypeName,
        criteria: &[(PropertyName, Value)],
    ) -> Result<Option<PersistedRecord>, ProviderError>;
}

/// Records held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLookup {
    records: BTreeMap<TypeName, Vec<PersistedRecord>>,
}

impl InMemoryLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, type_name: TypeName, record: PersistedRecord) {
        self.records.entry(type_name).or_default().push(record);
    }

    pub fn len(&self) -> usize {
        self.records.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PersistedLookup for InMemoryLookup {
    fn find(
        &self,
        type_name: &TypeName,
        criteria: &[(PropertyName, Value)],
    ) -> Result<Option<PersistedRecord>, ProviderError> {
        if criteria.is_empty() {
            return Ok(None);
        }
        Ok(self
            .records
            .get(type_name)
            .and_then(|records| records.iter().find(|r| r.matches(criteria)))
            .cloned())
    }
}
