//! graph
//!
//! Runtime object graphs and state definition.
//!
//! # Modules
//!
//! - [`objects`] - Object arena with reference identity
//! - [`tracker`] - Lifecycle states of tracked objects
//! - [`walker`] - Parent, child and closure traversal
//! - [`lookup`] - Access to already-persisted records
//! - [`definer`] - State definition and processing order
//! - [`revert`] - Reverting tracked changes
//! - [`batch`] - Batch document describing objects and links
//!
//! # Architecture
//!
//! A [`GraphContext`] binds one batch of objects to a schema session. The
//! session is shared and read-only; the context owns the objects, their
//! tracked states and the persisted-record lookup. A context is meant for
//! one persistence operation at a time. Any number of contexts may share a
//! session concurrently.
//!
//! # Example
//!
//! ```
//! use entitygraph::core::metadata::schema::{parse_schema, DocumentFormat};
//! use entitygraph::core::metadata::SchemaCatalog;
//! use entitygraph::core::session::SchemaSession;
//! use entitygraph::graph::{EntityState, GraphContext};
//!
//! let doc = parse_schema(r#"
//! kind = "entitygraph.schema"
//! schema_version = 1
//!
//! [[entity]]
//! name = "Blog"
//! keys = ["id"]
//! key_store_generated = true
//!
//! [[entity]]
//! name = "Post"
//! keys = ["id"]
//! key_store_generated = true
//! properties = ["blog_id"]
//!
//! [[relationship]]
//! principal = "Blog"
//! principal_keys = ["id"]
//! dependent = "Post"
//! dependent_keys = ["blog_id"]
//! principal_navigation = "posts"
//! dependent_navigation = "blog"
//! "#, DocumentFormat::Toml).unwrap();
//! let session = SchemaSession::new(SchemaCatalog::from_document(&doc).unwrap()).unwrap();
//!
//! let mut ctx = GraphContext::new(&session);
//! let blog = ctx.add("Blog").unwrap();
//! let post = ctx.add("Post").unwrap();
//! ctx.link(post, "blog", blog).unwrap();
//!
//! let plan = ctx.define_state(post, true).unwrap();
//! assert!(plan.position(blog) < plan.position(post));
//! assert_eq!(plan.state_of(post), Some(EntityState::New));
//! ```

pub mod batch;
pub mod definer;
pub mod lookup;
pub mod objects;
pub mod revert;
pub mod tracker;
pub mod walker;

pub use definer::{PlannedEntity, StatePlan};
pub use lookup::{InMemoryLookup, PersistedLookup, PersistedRecord};
pub use objects::{ObjectGraph, ObjectId, ObjectSet};
pub use tracker::{ChangeTracker, EntityState};

use crate::core::error::GraphError;
use crate::core::navigation::NavigationRelation;
use crate::core::session::SchemaSession;
use crate::core::types::TypeName;

/// One batch of objects bound to a schema session.
pub struct GraphContext<'s> {
    session: &'s SchemaSession,
    objects: ObjectGraph,
    tracker: ChangeTracker,
    lookup: Box<dyn PersistedLookup + 's>,
}

impl std::fmt::Debug for GraphContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphContext")
            .field("objects", &self.objects.len())
            .field("tracked", &self.tracker.len())
            .finish_non_exhaustive()
    }
}

impl<'s> GraphContext<'s> {
    /// Empty context with no persisted records.
    pub fn new(session: &'s SchemaSession) -> Self {
        Self {
            session,
            objects: ObjectGraph::new(),
            tracker: ChangeTracker::new(),
            lookup: Box::new(InMemoryLookup::new()),
        }
    }

    /// Replace the persisted-record lookup.
    pub fn with_lookup(mut self, lookup: impl PersistedLookup + 's) -> Self {
        self.lookup = Box::new(lookup);
        self
    }

    pub fn session(&self) -> &'s SchemaSession {
        self.session
    }

    pub fn objects(&self) -> &ObjectGraph {
        &self.objects
    }

    /// Direct access to the arena, for setting values.
    pub fn objects_mut(&mut self) -> &mut ObjectGraph {
        &mut self.objects
    }

    pub fn tracker(&self) -> &ChangeTracker {
        &self.tracker
    }

    pub fn state(&self, id: ObjectId) -> EntityState {
        self.tracker.state(id)
    }

    /// Add an object of a schema type.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an empty name, `UnknownType` for a type the
    /// session does not know.
    pub fn add(&mut self, type_name: &str) -> Result<ObjectId, GraphError> {
        let name = self.session.entry(type_name)?.name.clone();
        Ok(self.objects.add(name))
    }

    /// Add an object carrying a label for reports.
    pub fn add_labelled(&mut self, type_name: &str, label: &str) -> Result<ObjectId, GraphError> {
        let name = self.session.entry(type_name)?.name.clone();
        Ok(self.objects.add_labelled(name, label))
    }

    /// Set one scalar value.
    pub fn set_value(
        &mut self,
        id: ObjectId,
        property: &str,
        value: impl Into<serde_json::Value>,
    ) -> Result<(), GraphError> {
        self.objects.set_value(id, property, value)
    }

    /// Link through a navigation declared on `from`'s type.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if the navigation does not exist on the type or
    /// points at a different type than `to`'s.
    pub fn link(&mut self, from: ObjectId, navigation: &str, to: ObjectId) -> Result<(), GraphError> {
        let from_type = self.objects.get(from)?.type_name().clone();
        let to_type = self.objects.get(to)?.type_name().clone();
        let relation = self.relation(&from_type, navigation)?;
        if relation.target_type != to_type {
            return Err(GraphError::InvalidArgument(format!(
                "{from_type}.{navigation} points at {}, not {to_type}",
                relation.target_type
            )));
        }
        self.objects.link(from, navigation, to)
    }

    /// Attach an object as already persisted, with its current values and
    /// links as the original.
    pub fn attach_existing(&mut self, id: ObjectId) -> Result<(), GraphError> {
        self.objects.mark_original(id)?;
        self.tracker.set_state(id, EntityState::Unchanged);
        Ok(())
    }

    /// Navigation `navigation` of `type_name`.
    pub(crate) fn relation(
        &self,
        type_name: &TypeName,
        navigation: &str,
    ) -> Result<NavigationRelation, GraphError> {
        self.session.entry_of(type_name)?;
        let relations = self.session.relations_of(type_name)?;
        relations
            .navigation
            .relation(navigation)
            .cloned()
            .ok_or_else(|| {
                GraphError::InvalidArgument(format!(
                    "{type_name}.{navigation} is not a navigation property"
                ))
            })
    }
}
