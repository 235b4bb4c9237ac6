//! core::metadata::schema
//!
//! Schema document (v1).
//!
//! # Schema Design
//!
//! A schema document is:
//! - Self-describing with `kind` and `schema_version`
//! - Strictly parsed (unknown fields rejected)
//! - Written in TOML or JSON, chosen by file extension
//!
//! Entities list their primary keys and scalar properties; relationships are
//! foreign keys with optional navigations on either side. Unique groups and
//! state definers are declared on the entity and checked by
//! [`super::catalog::SchemaCatalog`] with the same rules as programmatic
//! registration.
//!
//! # Example
//!
//! ```
//! use entitygraph::core::metadata::schema::{parse_schema, DocumentFormat};
//!
//! let toml = r#"
//! kind = "entitygraph.schema"
//! schema_version = 1
//!
//! [[entity]]
//! name = "Customer"
//! keys = ["id"]
//! key_store_generated = true
//! properties = ["email"]
//! unique = [["email"]]
//!
//! [[entity]]
//! name = "Order"
//! keys = ["id"]
//! key_store_generated = true
//! properties = ["customer_id", "number"]
//!
//! [[relationship]]
//! principal = "Customer"
//! principal_keys = ["id"]
//! dependent = "Order"
//! dependent_keys = ["customer_id"]
//! required = true
//! principal_navigation = "orders"
//! dependent_navigation = "customer"
//! "#;
//!
//! let doc = parse_schema(toml, DocumentFormat::Toml).unwrap();
//! assert_eq!(doc.entities.len(), 2);
//! assert_eq!(doc.relationships.len(), 1);
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::types::{PropertyName, TypeError, TypeName};

/// The kind identifier for schema documents.
pub const SCHEMA_KIND: &str = "entitygraph.schema";

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Errors from schema document and registration operations.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("failed to parse document: {0}")]
    ParseError(String),

    #[error("invalid kind '{found}', expected '{expected}'")]
    InvalidKind { found: String, expected: String },

    #[error("unsupported schema version {0}, supported: {SCHEMA_VERSION}")]
    UnsupportedVersion(u32),

    #[error("invalid schema value: {0}")]
    InvalidValue(String),

    #[error("invalid registration: {0}")]
    InvalidRegistration(String),

    #[error("type validation failed: {0}")]
    TypeError(#[from] TypeError),
}

/// Serialization format of a document on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Toml,
    Json,
}

impl DocumentFormat {
    /// Pick the format from a file extension (`.toml` is TOML, anything else JSON).
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => DocumentFormat::Toml,
            _ => DocumentFormat::Json,
        }
    }

    /// Deserialize `text` in this format.
    pub(crate) fn parse<T: DeserializeOwned>(self, text: &str) -> Result<T, MetadataError> {
        match self {
            DocumentFormat::Toml => {
                toml::from_str(text).map_err(|e| MetadataError::ParseError(e.to_string()))
            }
            DocumentFormat::Json => {
                serde_json::from_str(text).map_err(|e| MetadataError::ParseError(e.to_string()))
            }
        }
    }
}

/// Envelope for kind and version checks before full parsing.
#[derive(Debug, Deserialize)]
pub(crate) struct DocumentEnvelope {
    pub(crate) kind: String,
    pub(crate) schema_version: u32,
}

impl DocumentEnvelope {
    /// Check kind and version against the expected values.
    pub(crate) fn check(&self, expected_kind: &str, supported: u32) -> Result<(), MetadataError> {
        if self.kind != expected_kind {
            return Err(MetadataError::InvalidKind {
                found: self.kind.clone(),
                expected: expected_kind.to_string(),
            });
        }
        if self.schema_version != supported {
            return Err(MetadataError::UnsupportedVersion(self.schema_version));
        }
        Ok(())
    }
}

/// Parse a schema document with version dispatch.
///
/// # Errors
///
/// Returns an error if:
/// - The text is malformed
/// - The `kind` field doesn't match [`SCHEMA_KIND`]
/// - The `schema_version` is not supported
/// - The document is structurally inconsistent (see [`SchemaDocument::validate`])
pub fn parse_schema(text: &str, format: DocumentFormat) -> Result<SchemaDocument, MetadataError> {
    let envelope: DocumentEnvelope = format.parse(text)?;
    envelope.check(SCHEMA_KIND, SCHEMA_VERSION)?;

    let doc: SchemaDocument = format.parse(text)?;
    doc.validate()?;
    Ok(doc)
}

/// Schema document (v1).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SchemaDocument {
    /// Kind identifier (always "entitygraph.schema")
    pub kind: String,

    /// Schema version (always 1 for this struct)
    pub schema_version: u32,

    /// Entity types
    #[serde(default, rename = "entity")]
    pub entities: Vec<EntityDef>,

    /// Foreign keys between entity types
    #[serde(default, rename = "relationship")]
    pub relationships: Vec<RelationshipDef>,
}

/// One entity type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct EntityDef {
    pub name: TypeName,

    /// Primary key properties, in key order
    pub keys: Vec<PropertyName>,

    #[serde(default)]
    pub key_store_generated: bool,

    /// Non-key scalar properties
    #[serde(default)]
    pub properties: Vec<PropertyName>,

    /// Unique property groups
    #[serde(default)]
    pub unique: Vec<Vec<PropertyName>>,

    /// Navigations whose targets must have their state defined first
    #[serde(default)]
    pub state_definers: Vec<PropertyName>,
}

impl EntityDef {
    /// Keys followed by the remaining scalar properties, without duplicates.
    pub fn scalar_properties(&self) -> Vec<PropertyName> {
        let mut seen = HashSet::new();
        self.keys
            .iter()
            .chain(self.properties.iter())
            .filter(|p| seen.insert((*p).clone()))
            .cloned()
            .collect()
    }
}

/// One foreign key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RelationshipDef {
    pub principal: TypeName,
    pub principal_keys: Vec<PropertyName>,
    pub dependent: TypeName,
    pub dependent_keys: Vec<PropertyName>,

    #[serde(default)]
    pub required: bool,

    /// One-to-one when true, one-to-many otherwise
    #[serde(default)]
    pub unique: bool,

    #[serde(default)]
    pub principal_navigation: Option<PropertyName>,

    #[serde(default)]
    pub dependent_navigation: Option<PropertyName>,
}

impl SchemaDocument {
    /// Create an empty document with the current kind and version.
    pub fn new() -> Self {
        Self {
            kind: SCHEMA_KIND.to_string(),
            schema_version: SCHEMA_VERSION,
            entities: Vec::new(),
            relationships: Vec::new(),
        }
    }

    /// Find an entity definition by name.
    pub fn entity(&self, name: &TypeName) -> Option<&EntityDef> {
        self.entities.iter().find(|e| &e.name == name)
    }

    /// Validate structural consistency.
    ///
    /// Unique groups and state definers are checked later, when the document
    /// is loaded into a catalog.
    ///
    /// # Errors
    ///
    /// Returns `MetadataError::InvalidValue` for duplicate types, empty
    /// primary keys, relationships to unknown types, mismatched key arity or
    /// key properties the type does not declare.
    pub fn validate(&self) -> Result<(), MetadataError> {
        let mut names = HashSet::new();
        for entity in &self.entities {
            if !names.insert(&entity.name) {
                return Err(MetadataError::InvalidValue(format!(
                    "entity '{}' declared more than once",
                    entity.name
                )));
            }
            if entity.keys.is_empty() {
                return Err(MetadataError::InvalidValue(format!(
                    "entity '{}' has no primary key",
                    entity.name
                )));
            }
        }

        for rel in &self.relationships {
            let principal = self.entity(&rel.principal).ok_or_else(|| {
                MetadataError::InvalidValue(format!(
                    "relationship references unknown principal '{}'",
                    rel.principal
                ))
            })?;
            let dependent = self.entity(&rel.dependent).ok_or_else(|| {
                MetadataError::InvalidValue(format!(
                    "relationship references unknown dependent '{}'",
                    rel.dependent
                ))
            })?;

            if rel.principal_keys.is_empty() || rel.principal_keys.len() != rel.dependent_keys.len()
            {
                return Err(MetadataError::InvalidValue(format!(
                    "relationship {} -> {} must map the same non-zero number of keys",
                    rel.principal, rel.dependent
                )));
            }

            Self::check_declared(principal, &rel.principal_keys)?;
            Self::check_declared(dependent, &rel.dependent_keys)?;
        }

        Ok(())
    }

    fn check_declared(entity: &EntityDef, keys: &[PropertyName]) -> Result<(), MetadataError> {
        let scalars = entity.scalar_properties();
        match keys.iter().find(|k| !scalars.contains(k)) {
            Some(missing) => Err(MetadataError::InvalidValue(format!(
                "property '{}' is not declared on '{}'",
                missing, entity.name
            ))),
            None => Ok(()),
        }
    }
}

impl Default for SchemaDocument {
    fn default() -> Self {
        Self::new()
    }
}
