//! graph::objects
//!
//! Arena of runtime objects for one persistence batch.
//!
//! # Architecture
//!
//! Objects live in an [`ObjectGraph`] arena and are addressed by
//! [`ObjectId`]. The id is the object's reference identity: two objects with
//! identical values are still distinct, and every traversal deduplicates by
//! id. Links are stored on the object that owns the navigation property,
//! and the arena keeps a reverse index so an object can find everything
//! that points at it.
//!
//! An object attached as already persisted carries a [`Snapshot`] of its
//! original values and links. State definition compares against it.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::Serialize;
use serde_json::Value;

use crate::core::error::GraphError;
use crate::core::types::{PropertyName, TypeName};

/// Reference identity of an object in an [`ObjectGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ObjectId(usize);

impl ObjectId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Original values and links of a persisted object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub values: BTreeMap<PropertyName, Value>,
    pub links: BTreeMap<PropertyName, Vec<ObjectId>>,
}

/// One runtime object.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityObject {
    type_name: TypeName,
    label: Option<String>,
    values: BTreeMap<PropertyName, Value>,
    links: BTreeMap<PropertyName, Vec<ObjectId>>,
    original: Option<Snapshot>,
}

impl EntityObject {
    pub fn type_name(&self) -> &TypeName {
        &self.type_name
    }

    /// Caller-supplied name, used in reports.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn value(&self, property: &PropertyName) -> Option<&Value> {
        self.values.get(property)
    }

    pub fn values(&self) -> &BTreeMap<PropertyName, Value> {
        &self.values
    }

    /// Targets of one navigation property.
    pub fn links(&self, navigation: &PropertyName) -> &[ObjectId] {
        self.links.get(navigation).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every `(navigation, target)` pair, grouped by navigation name.
    pub fn outgoing(&self) -> impl Iterator<Item = (&PropertyName, ObjectId)> {
        self.links
            .iter()
            .flat_map(|(nav, targets)| targets.iter().map(move |t| (nav, *t)))
    }

    pub fn original(&self) -> Option<&Snapshot> {
        self.original.as_ref()
    }
}

/// Whether a value counts as unset: absent, null, zero or empty string.
///
/// Store-generated keys and not yet assigned foreign keys hold one of these.
pub fn is_unset(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::Number(n)) => n.as_f64() == Some(0.0),
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

/// Arena of objects plus the reverse link index.
#[derive(Debug, Clone, Default)]
pub struct ObjectGraph {
    objects: Vec<EntityObject>,
    /// Who points at each object, through which navigation
    incoming: Vec<BTreeSet<(ObjectId, PropertyName)>>,
}

impl ObjectGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object with no values or links.
    pub fn add(&mut self, type_name: TypeName) -> ObjectId {
        let id = ObjectId(self.objects.len());
        self.objects.push(EntityObject {
            type_name,
            label: None,
            values: BTreeMap::new(),
            links: BTreeMap::new(),
            original: None,
        });
        self.incoming.push(BTreeSet::new());
        id
    }

    /// Add a labelled object.
    pub fn add_labelled(&mut self, type_name: TypeName, label: impl Into<String>) -> ObjectId {
        let id = self.add(type_name);
        self.objects[id.0].label = Some(label.into());
        id
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// All ids, in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = ObjectId> {
        (0..self.objects.len()).map(ObjectId)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        id.0 < self.objects.len()
    }

    /// Look up an object.
    ///
    /// # Errors
    ///
    /// `UnknownObject` for an id from another arena.
    pub fn get(&self, id: ObjectId) -> Result<&EntityObject, GraphError> {
        self.objects.get(id.0).ok_or(GraphError::UnknownObject(id.0))
    }

    fn get_mut(&mut self, id: ObjectId) -> Result<&mut EntityObject, GraphError> {
        self.objects
            .get_mut(id.0)
            .ok_or(GraphError::UnknownObject(id.0))
    }

    /// Set one scalar value.
    pub fn set_value(
        &mut self,
        id: ObjectId,
        property: &str,
        value: impl Into<Value>,
    ) -> Result<(), GraphError> {
        let property = PropertyName::new(property)?;
        self.get_mut(id)?.values.insert(property, value.into());
        Ok(())
    }

    pub(crate) fn put_value(
        &mut self,
        id: ObjectId,
        property: PropertyName,
        value: Value,
    ) -> Result<(), GraphError> {
        self.get_mut(id)?.values.insert(property, value);
        Ok(())
    }

    pub(crate) fn replace_values(
        &mut self,
        id: ObjectId,
        values: BTreeMap<PropertyName, Value>,
    ) -> Result<(), GraphError> {
        self.get_mut(id)?.values = values;
        Ok(())
    }

    /// Point `navigation` of `from` at `to`. Linking twice is a no-op.
    pub fn link(&mut self, from: ObjectId, navigation: &str, to: ObjectId) -> Result<(), GraphError> {
        let navigation = PropertyName::new(navigation)?;
        self.get(to)?;
        let targets = self.get_mut(from)?.links.entry(navigation.clone()).or_default();
        if targets.contains(&to) {
            return Ok(());
        }
        targets.push(to);
        self.incoming[to.0].insert((from, navigation));
        Ok(())
    }

    /// Remove `to` from `navigation` of `from`. Returns whether a link existed.
    pub fn unlink(
        &mut self,
        from: ObjectId,
        navigation: &PropertyName,
        to: ObjectId,
    ) -> Result<bool, GraphError> {
        self.get(to)?;
        let object = self.get_mut(from)?;
        let Some(targets) = object.links.get_mut(navigation) else {
            return Ok(false);
        };
        let before = targets.len();
        targets.retain(|t| *t != to);
        let removed = targets.len() != before;
        if targets.is_empty() {
            object.links.remove(navigation);
        }
        if removed {
            self.incoming[to.0].remove(&(from, navigation.clone()));
        }
        Ok(removed)
    }

    /// Objects pointing at `id`, with the navigation they use.
    pub fn incoming(&self, id: ObjectId) -> Result<Vec<(ObjectId, PropertyName)>, GraphError> {
        self.get(id)?;
        Ok(self.incoming[id.0].iter().cloned().collect())
    }

    /// Record the current values and links as the persisted original.
    pub fn mark_original(&mut self, id: ObjectId) -> Result<(), GraphError> {
        let object = self.get_mut(id)?;
        object.original = Some(Snapshot {
            values: object.values.clone(),
            links: object.links.clone(),
        });
        Ok(())
    }
}

/// Ordered set of distinct objects, deduplicated by reference identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectSet {
    order: Vec<ObjectId>,
    seen: HashSet<ObjectId>,
}

impl ObjectSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `id` unless present. Returns whether it was added.
    pub fn insert(&mut self, id: ObjectId) -> bool {
        if self.seen.insert(id) {
            self.order.push(id);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.seen.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Objects in the order they were first inserted.
    pub fn as_slice(&self) -> &[ObjectId] {
        &self.order
    }

    pub fn iter(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.order.iter().copied()
    }
}

impl FromIterator<ObjectId> for ObjectSet {
    fn from_iter<I: IntoIterator<Item = ObjectId>>(iter: I) -> Self {
        let mut set = Self::new();
        for id in iter {
            set.insert(id);
        }
        set
    }
}
