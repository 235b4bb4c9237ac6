//! core::session
//!
//! Schema session: the owner of every schema-derived cache.
//!
//! # Architecture
//!
//! A [`SchemaSession`] is constructed once per schema. It holds:
//! - the [`SchemaProvider`] it was built from
//! - an arena of per-type entries keyed by type name, built at construction
//! - three memo tables: navigation detail (with the type's normalized
//!   edges) per type, foreign-key origin per `(type, key)`, and principal
//!   count per type
//!
//! [`EntityTypeManager`] is a borrowed handle onto one arena entry. It never
//! owns session state, so any number of handles can coexist.
//!
//! # Invariants
//!
//! - A cache entry, once written, is never invalidated: the schema is
//!   immutable for the session's lifetime.
//! - Cache writes are insert-if-absent. Two callers racing on the same key
//!   compute identical values, so whichever lands first wins.
//! - No lock is held while calling the provider or recursing.
//!
//! # Example
//!
//! ```
//! use entitygraph::core::metadata::SchemaCatalog;
//! use entitygraph::core::session::SchemaSession;
//!
//! let mut catalog = SchemaCatalog::new();
//! catalog.add_entity("Tag", &["id"], true, &["label"]).unwrap();
//!
//! let session = SchemaSession::new(catalog).unwrap();
//! let tag = session.entity_type("Tag").unwrap();
//! assert!(tag.has_store_generated_key());
//! assert!(session.entity_type("Ghost").is_err());
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::hash::Hash;
use std::sync::{Arc, PoisonError, RwLock};

use log::debug;

use super::error::GraphError;
use super::metadata::{SchemaProvider, StateDefinerProperty};
use super::navigation::NavigationDetail;
use super::principal::PrincipalMemo;
use super::relationship::RelationshipEdge;
use super::types::{PropertyName, SchemaFingerprint, TypeName};

/// Facts about one entity type, loaded once at session construction.
#[derive(Debug, Clone)]
pub(crate) struct TypeEntry {
    pub(crate) name: TypeName,
    pub(crate) properties: Vec<PropertyName>,
    pub(crate) primary_keys: Vec<PropertyName>,
    pub(crate) key_store_generated: bool,
    pub(crate) unique_groups: Vec<Vec<PropertyName>>,
    pub(crate) state_definers: Vec<StateDefinerProperty>,
    /// Types that declare a state definer pointing at this type.
    pub(crate) state_definer_for: Vec<TypeName>,
}

/// Navigation detail and normalized edges of one type.
#[derive(Debug, Clone)]
pub(crate) struct TypeRelations {
    pub(crate) navigation: Arc<NavigationDetail>,
    pub(crate) edges: Arc<[RelationshipEdge]>,
}

/// The session's memo tables.
#[derive(Debug, Default)]
pub(crate) struct HelperStore {
    pub(crate) relations: RwLock<HashMap<TypeName, TypeRelations>>,
    pub(crate) origins: RwLock<HashMap<(TypeName, PropertyName), Option<TypeName>>>,
    pub(crate) principal_counts: RwLock<HashMap<TypeName, usize>>,
}

impl HelperStore {
    /// Read a cached value.
    pub(crate) fn get<K, V>(table: &RwLock<HashMap<K, V>>, key: &K) -> Option<V>
    where
        K: Eq + Hash,
        V: Clone,
    {
        table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Insert if absent and return the value that ends up cached.
    pub(crate) fn put<K, V>(table: &RwLock<HashMap<K, V>>, key: K, value: V) -> V
    where
        K: Eq + Hash,
        V: Clone,
    {
        table
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key)
            .or_insert(value)
            .clone()
    }
}

/// Schema-scoped owner of type entries and memo tables.
pub struct SchemaSession {
    provider: Box<dyn SchemaProvider>,
    types: BTreeMap<TypeName, TypeEntry>,
    pub(crate) store: HelperStore,
}

impl std::fmt::Debug for SchemaSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaSession")
            .field("types", &self.types.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl SchemaSession {
    /// Build a session, loading per-type facts from the provider.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::Provider` if the provider fails.
    pub fn new(provider: impl SchemaProvider + 'static) -> Result<Self, GraphError> {
        Self::from_boxed(Box::new(provider))
    }

    /// Build a session from an already boxed provider.
    pub fn from_boxed(provider: Box<dyn SchemaProvider>) -> Result<Self, GraphError> {
        let mut types = BTreeMap::new();
        for descriptor in provider.entity_types()? {
            let name = descriptor.name;
            let entry = TypeEntry {
                primary_keys: provider.primary_key_names(&name)?,
                key_store_generated: provider.is_key_store_generated(&name)?,
                unique_groups: provider.unique_property_groups(&name)?,
                state_definers: provider.state_definer_properties(&name)?,
                state_definer_for: Vec::new(),
                properties: descriptor.properties,
                name: name.clone(),
            };
            types.insert(name, entry);
        }

        let mut reverse: HashMap<TypeName, Vec<TypeName>> = HashMap::new();
        for entry in types.values() {
            for definer in &entry.state_definers {
                let sources = reverse.entry(definer.target_type.clone()).or_default();
                if !sources.contains(&entry.name) {
                    sources.push(entry.name.clone());
                }
            }
        }
        for (target, sources) in reverse {
            if let Some(entry) = types.get_mut(&target) {
                entry.state_definer_for = sources;
            }
        }

        debug!("schema session loaded {} entity types", types.len());

        Ok(Self {
            provider,
            types,
            store: HelperStore::default(),
        })
    }

    /// All type names, sorted.
    pub fn type_names(&self) -> impl Iterator<Item = &TypeName> {
        self.types.keys()
    }

    /// Whether the type belongs to this session.
    pub fn contains(&self, type_name: &TypeName) -> bool {
        self.types.contains_key(type_name)
    }

    /// Get the manager handle for a type.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an empty name, `UnknownType` if the type is not
    /// part of the schema.
    pub fn entity_type(&self, type_name: &str) -> Result<EntityTypeManager<'_>, GraphError> {
        let entry = self.entry(type_name)?;
        Ok(EntityTypeManager {
            session: self,
            entry,
        })
    }

    pub(crate) fn entry(&self, type_name: &str) -> Result<&TypeEntry, GraphError> {
        let name = TypeName::new(type_name)?;
        self.types
            .get(&name)
            .ok_or_else(|| GraphError::UnknownType(type_name.to_string()))
    }

    pub(crate) fn entry_of(&self, type_name: &TypeName) -> Result<&TypeEntry, GraphError> {
        self.types
            .get(type_name)
            .ok_or_else(|| GraphError::UnknownType(type_name.to_string()))
    }

    /// Navigation detail of a type, computed once per session.
    pub fn navigation_detail(&self, type_name: &str) -> Result<Arc<NavigationDetail>, GraphError> {
        let entry = self.entry(type_name)?;
        Ok(self.relations_of(&entry.name)?.navigation)
    }

    /// Normalized relationship edges involving a type, computed once per session.
    pub fn relationship_edges(
        &self,
        type_name: &str,
    ) -> Result<Arc<[RelationshipEdge]>, GraphError> {
        let entry = self.entry(type_name)?;
        Ok(self.relations_of(&entry.name)?.edges)
    }

    pub(crate) fn relations_of(&self, type_name: &TypeName) -> Result<TypeRelations, GraphError> {
        if let Some(cached) = HelperStore::get(&self.store.relations, type_name) {
            return Ok(cached);
        }

        let foreign_keys = self.provider.relationship_edges(type_name)?;
        let navigation = NavigationDetail::build(type_name, &foreign_keys);
        let edges: Vec<RelationshipEdge> = foreign_keys
            .iter()
            .map(|fk| RelationshipEdge::from_descriptor(fk, type_name))
            .collect();

        debug!(
            "navigation detail for {}: {} navigations, {} edges",
            type_name,
            navigation.relations.len(),
            edges.len()
        );

        let computed = TypeRelations {
            navigation: Arc::new(navigation),
            edges: edges.into(),
        };
        Ok(HelperStore::put(
            &self.store.relations,
            type_name.clone(),
            computed,
        ))
    }

    /// Principal count of a type using the session-wide memo table.
    ///
    /// Equivalent to [`SchemaSession::find_principal_count`] with a memo that
    /// lives as long as the session.
    pub fn principal_count(&self, type_name: &str) -> Result<usize, GraphError> {
        let entry = self.entry(type_name)?;
        if let Some(count) = HelperStore::get(&self.store.principal_counts, &entry.name) {
            return Ok(count);
        }

        let mut memo = PrincipalMemo::new();
        let count = self.find_principal_count(type_name, &mut memo)?;
        for (name, value) in memo.into_iter() {
            HelperStore::put(&self.store.principal_counts, name, value);
        }
        Ok(count)
    }

    /// Fingerprint of the schema as this session sees it.
    ///
    /// Loads (and caches) the navigation detail of every type.
    pub fn fingerprint(&self) -> Result<SchemaFingerprint, GraphError> {
        let mut lines = Vec::new();
        for entry in self.types.values() {
            lines.push(format!(
                "type {} keys={} generated={} props={}",
                entry.name,
                join(&entry.primary_keys),
                entry.key_store_generated,
                join(&entry.properties)
            ));
            for group in &entry.unique_groups {
                lines.push(format!("unique {} {}", entry.name, join(group)));
            }
            for definer in &entry.state_definers {
                lines.push(format!(
                    "definer {}.{} {}",
                    entry.name, definer.property, definer.target_type
                ));
            }
            let relations = self.relations_of(&entry.name)?;
            let mut seen = HashSet::new();
            for edge in relations.edges.iter() {
                let line = format!("edge {edge}");
                if seen.insert(line.clone()) {
                    lines.push(line);
                }
            }
            for nav in &relations.navigation.relations {
                lines.push(format!(
                    "nav {}.{} {} {}",
                    entry.name, nav.property_name, nav.direction, nav.target_type
                ));
            }
        }
        Ok(SchemaFingerprint::compute(lines))
    }
}

/// Borrowed handle onto one entity type of a session.
#[derive(Debug, Clone, Copy)]
pub struct EntityTypeManager<'s> {
    session: &'s SchemaSession,
    entry: &'s TypeEntry,
}

impl<'s> EntityTypeManager<'s> {
    pub fn name(&self) -> &'s TypeName {
        &self.entry.name
    }

    /// Primary key property names, in key order.
    pub fn primary_keys(&self) -> &'s [PropertyName] {
        &self.entry.primary_keys
    }

    /// Whether any key member is generated by the store.
    pub fn has_store_generated_key(&self) -> bool {
        self.entry.key_store_generated
    }

    /// Scalar properties, keys included.
    pub fn scalar_properties(&self) -> &'s [PropertyName] {
        &self.entry.properties
    }

    pub fn unique_property_groups(&self) -> &'s [Vec<PropertyName>] {
        &self.entry.unique_groups
    }

    /// Distinct properties that appear in any unique group.
    pub fn unique_properties(&self) -> Vec<&'s PropertyName> {
        let mut seen = HashSet::new();
        self.entry
            .unique_groups
            .iter()
            .flatten()
            .filter(|p| seen.insert(*p))
            .collect()
    }

    pub fn state_definers(&self) -> &'s [StateDefinerProperty] {
        &self.entry.state_definers
    }

    /// Types for which this type is a declared state definer.
    pub fn state_definer_for(&self) -> &'s [TypeName] {
        &self.entry.state_definer_for
    }

    pub fn navigation_detail(&self) -> Result<Arc<NavigationDetail>, GraphError> {
        Ok(self.session.relations_of(&self.entry.name)?.navigation)
    }

    /// Every normalized edge in which this type is principal or dependent.
    pub fn foreign_key_details(&self) -> Result<Arc<[RelationshipEdge]>, GraphError> {
        Ok(self.session.relations_of(&self.entry.name)?.edges)
    }

    pub fn origin_of_foreign_key(&self, foreign_key: &str) -> Result<Option<TypeName>, GraphError> {
        self.session
            .origin_of_foreign_key(self.entry.name.as_str(), foreign_key)
    }

    pub fn find_principal_count(&self, memo: &mut PrincipalMemo) -> Result<usize, GraphError> {
        self.session
            .find_principal_count(self.entry.name.as_str(), memo)
    }
}

fn join(props: &[PropertyName]) -> String {
    props
        .iter()
        .map(|p| p.as_str())
        .collect::<Vec<_>>()
        .join(",")
}
