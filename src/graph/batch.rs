//! graph::batch
//!
//! Batch documents: a set of objects, their links and the persisted records
//! they may match, loaded into a [`GraphContext`].
//!
//! ```toml
//! kind = "entitygraph.batch"
//! schema_version = 1
//! roots = ["order"]
//!
//! [[object]]
//! id = "order"
//! type = "Order"
//! existing = true
//! values = { id = 1, number = "A-1" }
//!
//! [[object]]
//! id = "line"
//! type = "Line"
//! values = { sku = "X" }
//!
//! [[link]]
//! from = "order"
//! navigation = "lines"
//! to = "line"
//!
//! [[persisted]]
//! type = "Customer"
//! values = { id = 5, email = "ann@example.com" }
//! ```
//!
//! An `existing` object is attached with its `original` values (or its
//! `values` when no original is given) and its non-removed links as the
//! persisted snapshot. A `removed` link is part of the snapshot only.

use std::collections::BTreeMap;

use log::debug;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use super::lookup::{InMemoryLookup, PersistedRecord};
use super::objects::ObjectId;
use super::GraphContext;
use crate::core::error::GraphError;
use crate::core::metadata::schema::{DocumentEnvelope, DocumentFormat, MetadataError};
use crate::core::session::SchemaSession;
use crate::core::types::{PropertyName, TypeName};

/// The kind identifier for batch documents.
pub const BATCH_KIND: &str = "entitygraph.batch";

/// Current batch document version.
pub const BATCH_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum BatchError {
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("object '{0}' declared more than once")]
    DuplicateObject(String),

    #[error("unknown object '{0}'")]
    UnknownObject(String),

    #[error("{type_name} has no scalar property '{property}'")]
    UnknownProperty { type_name: String, property: String },
}

/// Batch document (v1).
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BatchDocument {
    pub kind: String,
    pub schema_version: u32,

    /// Labels of the objects to define state from; every object when empty
    #[serde(default)]
    pub roots: Vec<String>,

    #[serde(default, rename = "object")]
    pub objects: Vec<ObjectDef>,

    #[serde(default, rename = "link")]
    pub links: Vec<LinkDef>,

    /// Records the store already holds
    #[serde(default)]
    pub persisted: Vec<PersistedDef>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ObjectDef {
    pub id: String,

    #[serde(rename = "type")]
    pub type_name: String,

    #[serde(default)]
    pub existing: bool,

    #[serde(default)]
    pub values: BTreeMap<String, Value>,

    /// Persisted values of an existing object, when they differ
    #[serde(default)]
    pub original: Option<BTreeMap<String, Value>>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LinkDef {
    pub from: String,
    pub navigation: String,
    pub to: String,

    /// Link that existed when loaded and has since been removed
    #[serde(default)]
    pub removed: bool,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PersistedDef {
    #[serde(rename = "type")]
    pub type_name: TypeName,
    pub values: BTreeMap<PropertyName, Value>,
}

/// A batch loaded into a context.
#[derive(Debug)]
pub struct LoadedBatch<'s> {
    pub context: GraphContext<'s>,
    pub labels: BTreeMap<String, ObjectId>,
    pub roots: Vec<ObjectId>,
}

impl LoadedBatch<'_> {
    pub fn id(&self, label: &str) -> Option<ObjectId> {
        self.labels.get(label).copied()
    }
}

/// Parse a batch document with kind and version checks.
pub fn parse_batch(text: &str, format: DocumentFormat) -> Result<BatchDocument, BatchError> {
    let envelope: DocumentEnvelope = format.parse(text)?;
    envelope.check(BATCH_KIND, BATCH_VERSION)?;
    Ok(format.parse(text)?)
}

impl BatchDocument {
    /// Build the objects, links and lookup of this batch over `session`.
    ///
    /// # Errors
    ///
    /// Unknown types, navigations, properties or object labels, and labels
    /// declared twice.
    pub fn load<'s>(&self, session: &'s SchemaSession) -> Result<LoadedBatch<'s>, BatchError> {
        let mut lookup = InMemoryLookup::new();
        for record in &self.persisted {
            lookup.insert(
                record.type_name.clone(),
                PersistedRecord {
                    values: record.values.clone(),
                },
            );
        }
        let mut context = GraphContext::new(session).with_lookup(lookup);

        let mut labels = BTreeMap::new();
        for object in &self.objects {
            if labels.contains_key(&object.id) {
                return Err(BatchError::DuplicateObject(object.id.clone()));
            }
            let id = context.add_labelled(&object.type_name, &object.id)?;
            labels.insert(object.id.clone(), id);
        }

        let resolve = |label: &str| {
            labels
                .get(label)
                .copied()
                .ok_or_else(|| BatchError::UnknownObject(label.to_string()))
        };

        for link in &self.links {
            context.link(resolve(link.from.as_str())?, &link.navigation, resolve(link.to.as_str())?)?;
        }

        for object in &self.objects {
            let id = resolve(object.id.as_str())?;
            let current = scalar_values(session, &object.type_name, &object.values)?;
            if object.existing {
                let original = match &object.original {
                    Some(values) => scalar_values(session, &object.type_name, values)?,
                    None => current.clone(),
                };
                context.objects_mut().replace_values(id, original)?;
                context.attach_existing(id)?;
            }
            context.objects_mut().replace_values(id, current)?;
        }

        for link in self.links.iter().filter(|l| l.removed) {
            let navigation = PropertyName::new(link.navigation.as_str()).map_err(GraphError::from)?;
            context
                .objects_mut()
                .unlink(resolve(link.from.as_str())?, &navigation, resolve(link.to.as_str())?)?;
        }

        let roots = if self.roots.is_empty() {
            context.objects().ids().collect()
        } else {
            self.roots
                .iter()
                .map(|label| resolve(label.as_str()))
                .collect::<Result<Vec<_>, _>>()?
        };

        debug!(
            "loaded batch: {} objects, {} links, {} persisted records",
            self.objects.len(),
            self.links.len(),
            self.persisted.len()
        );
        Ok(LoadedBatch {
            context,
            labels,
            roots,
        })
    }
}

fn scalar_values(
    session: &SchemaSession,
    type_name: &str,
    values: &BTreeMap<String, Value>,
) -> Result<BTreeMap<PropertyName, Value>, BatchError> {
    let manager = session.entity_type(type_name)?;
    let scalars = manager.scalar_properties();

    let mut result = BTreeMap::new();
    for (name, value) in values {
        let property = PropertyName::new(name.as_str()).map_err(GraphError::from)?;
        if !scalars.contains(&property) {
            return Err(BatchError::UnknownProperty {
                type_name: type_name.to_string(),
                property: name.clone(),
            });
        }
        result.insert(property, value.clone());
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metadata::schema::parse_schema;
    use crate::core::metadata::SchemaCatalog;
    use crate::graph::EntityState;

    const SCHEMA: &str = r#"
kind = "entitygraph.schema"
schema_version = 1

[[entity]]
name = "Order"
keys = ["id"]
key_store_generated = true
properties = ["number"]

[[entity]]
name = "Line"
keys = ["id"]
key_store_generated = true
properties = ["order_id", "sku"]

[[relationship]]
principal = "Order"
principal_keys = ["id"]
dependent = "Line"
dependent_keys = ["order_id"]
required = true
principal_navigation = "lines"
dependent_navigation = "order"
"#;

    const BATCH: &str = r#"
kind = "entitygraph.batch"
schema_version = 1
roots = ["order"]

[[object]]
id = "order"
type = "Order"
existing = true
values = { id = 1, number = "A-2" }
original = { id = 1, number = "A-1" }

[[object]]
id = "kept"
type = "Line"
existing = true
values = { id = 10, order_id = 1, sku = "X" }

[[object]]
id = "gone"
type = "Line"
existing = true
values = { id = 11, order_id = 1, sku = "Y" }

[[object]]
id = "added"
type = "Line"
values = { sku = "Z" }

[[link]]
from = "order"
navigation = "lines"
to = "kept"

[[link]]
from = "order"
navigation = "lines"
to = "gone"
removed = true

[[link]]
from = "added"
navigation = "order"
to = "order"
"#;

    fn session() -> SchemaSession {
        let doc = parse_schema(SCHEMA, DocumentFormat::Toml).unwrap();
        SchemaSession::new(SchemaCatalog::from_document(&doc).unwrap()).unwrap()
    }

    #[test]
    fn loads_and_plans() {
        let session = session();
        let doc = parse_batch(BATCH, DocumentFormat::Toml).unwrap();
        let mut batch = doc.load(&session).unwrap();
        let order = batch.id("order").unwrap();
        assert_eq!(batch.roots, vec![order]);

        let plan = batch.context.define_state_many(&batch.roots.clone(), true).unwrap();
        assert_eq!(plan.state_of(order), Some(EntityState::Modified));
        assert_eq!(plan.state_of(batch.id("kept").unwrap()), Some(EntityState::Unchanged));
        assert_eq!(plan.state_of(batch.id("added").unwrap()), Some(EntityState::New));
        assert_eq!(
            plan.state_of(batch.id("gone").unwrap()),
            Some(EntityState::MarkedForDeletion)
        );
        assert_eq!(plan.position(order), Some(0));
    }

    #[test]
    fn wrong_kind_rejected() {
        let text = BATCH.replace("entitygraph.batch", "entitygraph.schema");
        assert!(matches!(
            parse_batch(&text, DocumentFormat::Toml),
            Err(BatchError::Metadata(MetadataError::InvalidKind { .. }))
        ));
    }

    #[test]
    fn unknown_labels_and_properties() {
        let session = session();
        let text = BATCH.replace("to = \"kept\"", "to = \"nowhere\"");
        let doc = parse_batch(&text, DocumentFormat::Toml).unwrap();
        assert!(matches!(doc.load(&session), Err(BatchError::UnknownObject(l)) if l == "nowhere"));

        let text = BATCH.replace("sku = \"Z\"", "colour = \"Z\"");
        let doc = parse_batch(&text, DocumentFormat::Toml).unwrap();
        assert!(matches!(doc.load(&session), Err(BatchError::UnknownProperty { .. })));
    }

    #[test]
    fn duplicate_labels_rejected() {
        let session = session();
        let text = BATCH.replace("id = \"kept\"", "id = \"gone\"");
        let doc = parse_batch(&text, DocumentFormat::Toml).unwrap();
        assert!(matches!(doc.load(&session), Err(BatchError::DuplicateObject(_))));
    }

    #[test]
    fn json_batch_defaults_roots_to_all_objects() {
        let session = session();
        let doc = parse_batch(
            r#"{"kind": "entitygraph.batch", "schema_version": 1,
                "object": [{"id": "o", "type": "Order"}]}"#,
            DocumentFormat::Json,
        )
        .unwrap();
        let batch = doc.load(&session).unwrap();
        assert_eq!(batch.roots.len(), 1);
    }
}
