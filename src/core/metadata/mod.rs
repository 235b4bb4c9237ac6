//! core::metadata
//!
//! Schema metadata consumed by the engine.
//!
//! # Modules
//!
//! - [`schema`] - Versioned schema document (TOML or JSON)
//! - [`catalog`] - In-memory [`SchemaProvider`] built from a document
//!
//! # Architecture
//!
//! The engine never reads a database schema itself. Everything it knows
//! about entity shapes comes through the narrow [`SchemaProvider`]
//! capability: entity types, raw foreign-key descriptors, unique property
//! groups, state-definer properties and primary-key facts. Any data source
//! implementing the trait can back a [`crate::core::session::SchemaSession`].
//!
//! Descriptors returned here are raw. Normalization into
//! [`crate::core::relationship::RelationshipEdge`] and
//! [`crate::core::navigation::NavigationDetail`] happens in the session.

pub mod catalog;
pub mod schema;

pub use catalog::SchemaCatalog;
pub use schema::{parse_schema, SchemaDocument, SCHEMA_KIND, SCHEMA_VERSION};

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::types::{PropertyName, TypeName};

/// Errors reported by a schema provider.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// The backing schema source cannot be read.
    #[error("schema source unavailable: {0}")]
    Unavailable(String),

    /// The provider was asked about a type it does not describe.
    #[error("type not described by provider: {0}")]
    MissingType(String),

    /// Any other provider failure.
    #[error("{0}")]
    Failed(String),
}

/// An entity shape known to the schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityTypeDescriptor {
    /// Type name
    pub name: TypeName,
    /// Scalar properties, keys included
    pub properties: Vec<PropertyName>,
}

/// A raw foreign key as the schema describes it.
///
/// `principal_keys[i]` corresponds positionally to `dependent_keys[i]`.
/// A `unique` foreign key is a one-to-one relationship; otherwise the
/// principal side sees a collection of dependents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyDescriptor {
    /// Type that owns the referenced key
    pub principal_type: TypeName,
    /// Referenced key properties on the principal
    pub principal_keys: Vec<PropertyName>,
    /// Type that holds the foreign key
    pub dependent_type: TypeName,
    /// Foreign key properties on the dependent
    pub dependent_keys: Vec<PropertyName>,
    /// Whether every dependent must have a principal
    pub required: bool,
    /// Whether at most one dependent may refer to a principal
    pub unique: bool,
    /// Navigation on the principal pointing at dependents
    pub principal_navigation: Option<PropertyName>,
    /// Navigation on the dependent pointing at its principal
    pub dependent_navigation: Option<PropertyName>,
}

impl ForeignKeyDescriptor {
    /// Whether the descriptor involves the given type on either side.
    pub fn involves(&self, type_name: &TypeName) -> bool {
        &self.principal_type == type_name || &self.dependent_type == type_name
    }
}

/// A navigation property whose target must have its state defined first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateDefinerProperty {
    /// Navigation property on the declaring type
    pub property: PropertyName,
    /// Type the navigation points at
    pub target_type: TypeName,
}

/// Schema metadata capability.
///
/// Implementations must be deterministic for the lifetime of a session:
/// the session memoizes every derived value and never invalidates it.
pub trait SchemaProvider: Send + Sync {
    /// Enumerate known entity types.
    fn entity_types(&self) -> Result<Vec<EntityTypeDescriptor>, ProviderError>;

    /// Foreign keys in which `type_name` is the principal or the dependent.
    fn relationship_edges(
        &self,
        type_name: &TypeName,
    ) -> Result<Vec<ForeignKeyDescriptor>, ProviderError>;

    /// Declared unique property combinations.
    fn unique_property_groups(
        &self,
        type_name: &TypeName,
    ) -> Result<Vec<Vec<PropertyName>>, ProviderError>;

    /// Declared state-definer navigations.
    fn state_definer_properties(
        &self,
        type_name: &TypeName,
    ) -> Result<Vec<StateDefinerProperty>, ProviderError>;

    /// Whether any primary key property is generated by the store.
    fn is_key_store_generated(&self, type_name: &TypeName) -> Result<bool, ProviderError>;

    /// Primary key property names, in key order.
    fn primary_key_names(&self, type_name: &TypeName) -> Result<Vec<PropertyName>, ProviderError>;
}

impl<P: SchemaProvider + ?Sized> SchemaProvider for Arc<P> {
    fn entity_types(&self) -> Result<Vec<EntityTypeDescriptor>, ProviderError> {
        (**self).entity_types()
    }

    fn relationship_edges(
        &self,
        type_name: &TypeName,
    ) -> Result<Vec<ForeignKeyDescriptor>, ProviderError> {
        (**self).relationship_edges(type_name)
    }

    fn unique_property_groups(
        &self,
        type_name: &TypeName,
    ) -> Result<Vec<Vec<PropertyName>>, ProviderError> {
        (**self).unique_property_groups(type_name)
    }

    fn state_definer_properties(
        &self,
        type_name: &TypeName,
    ) -> Result<Vec<StateDefinerProperty>, ProviderError> {
        (**self).state_definer_properties(type_name)
    }

    fn is_key_store_generated(&self, type_name: &TypeName) -> Result<bool, ProviderError> {
        (**self).is_key_store_generated(type_name)
    }

    fn primary_key_names(&self, type_name: &TypeName) -> Result<Vec<PropertyName>, ProviderError> {
        (**self).primary_key_names(type_name)
    }
}
