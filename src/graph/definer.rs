//! graph::definer
//!
//! State definition and processing order.
//!
//! # Processing order
//!
//! Candidates are sorted by the principal count of their type, ascending.
//! Objects with equal counts are ordered by their actual parent links, so a
//! self-referencing parent precedes its children; otherwise they keep
//! discovery order. Processing the resulting plan front to back inserts
//! every principal before its dependents and resolves every state definer
//! before the objects that depend on it.
//!
//! # State policy
//!
//! Applied to each candidate in processing order:
//! 1. A store-generated key that is still unset makes the object
//!    tentatively `New`. A key shared with a one-to-one principal counts as
//!    store-generated when its origin type's key is.
//! 2. Each unique group whose values are all present (not null) is matched
//!    first against objects already processed or tracked, then against
//!    persisted records.
//!    A match adopts the matched identity's key, which is copied down to
//!    dependents, and the object becomes `Unchanged` or `Modified`.
//! 3. A tentatively `New` object without a unique match stays `New`.
//! 4. Otherwise the object is compared with its original snapshot, or with
//!    the persisted record found by key. No baseline means `New`.
//!
//! Objects that used to be children of a processed object and are no
//! longer reachable are `MarkedForDeletion`, together with their own
//! dependants. They follow the rest of the plan, dependants first.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use log::{debug, info, trace};
use serde::Serialize;
use serde_json::Value;

use super::objects::{is_unset, ObjectId, ObjectSet};
use super::tracker::EntityState;
use super::walker::Role;
use super::GraphContext;
use crate::core::error::GraphError;
use crate::core::principal::PrincipalMemo;
use crate::core::session::TypeEntry;
use crate::core::types::{PropertyName, TypeName};

/// One object of a plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedEntity {
    pub object: ObjectId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub type_name: TypeName,
    pub state: EntityState,
    pub principal_count: usize,
    /// Object with the same unique values this one was resolved to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicate_of: Option<ObjectId>,
}

/// Objects with their assigned states, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatePlan {
    pub entries: Vec<PlannedEntity>,
}

impl StatePlan {
    /// Index of `id` in processing order.
    pub fn position(&self, id: ObjectId) -> Option<usize> {
        self.entries.iter().position(|e| e.object == id)
    }

    pub fn entry(&self, id: ObjectId) -> Option<&PlannedEntity> {
        self.entries.iter().find(|e| e.object == id)
    }

    pub fn state_of(&self, id: ObjectId) -> Option<EntityState> {
        self.entry(id).map(|e| e.state)
    }

    /// Number of entries in `state`.
    pub fn count(&self, state: EntityState) -> usize {
        self.entries.iter().filter(|e| e.state == state).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Objects in processing order.
    pub fn order(&self) -> Vec<ObjectId> {
        self.entries.iter().map(|e| e.object).collect()
    }
}

type Criteria = Vec<(PropertyName, Value)>;

/// A candidate with its type and principal count.
type Ranked = (ObjectId, TypeName, usize);

impl<'s> GraphContext<'s> {
    /// Define the state of `root` and the objects related to it.
    ///
    /// With `define_children` every object connected to the root is
    /// defined. Without it only the root, its ancestors and the objects
    /// behind its state-definer navigations are.
    pub fn define_state(
        &mut self,
        root: ObjectId,
        define_children: bool,
    ) -> Result<StatePlan, GraphError> {
        self.define_state_many(&[root], define_children)
    }

    /// Define the state of several roots as one batch.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an empty root list, `UnknownObject` for an id
    /// outside the arena, `DependencyCycle` for a cyclic schema.
    pub fn define_state_many(
        &mut self,
        roots: &[ObjectId],
        define_children: bool,
    ) -> Result<StatePlan, GraphError> {
        if roots.is_empty() {
            return Err(GraphError::InvalidArgument(
                "no root objects to define state of".to_string(),
            ));
        }
        for root in roots {
            let type_name = self.objects.get(*root)?.type_name();
            self.session.entry_of(type_name)?;
        }

        let candidates = self.candidates(roots, define_children)?;
        debug!(
            "defining state of {} objects from {} roots",
            candidates.len(),
            roots.len()
        );
        self.define_candidates(&candidates)
    }

    /// Define the state of every tracked object not marked for deletion.
    pub fn define_state_tracked(&mut self) -> Result<StatePlan, GraphError> {
        let roots = self.live_tracked();
        if roots.is_empty() {
            return Ok(StatePlan::default());
        }
        self.define_state_many(&roots, true)
    }

    fn candidates(
        &self,
        roots: &[ObjectId],
        define_children: bool,
    ) -> Result<ObjectSet, GraphError> {
        let mut set = ObjectSet::new();
        if define_children {
            for root in roots {
                self.get_all_entities(*root, &mut set)?;
            }
            return Ok(set);
        }

        for root in roots {
            let mut required = vec![*root];
            required.extend(self.state_definer_targets(*root)?);
            for id in required {
                set.insert(id);
                for ancestor in self.ancestors(id)?.iter() {
                    set.insert(ancestor);
                }
            }
        }
        Ok(set)
    }

    /// Objects behind the state-definer navigations of `id`.
    fn state_definer_targets(&self, id: ObjectId) -> Result<Vec<ObjectId>, GraphError> {
        let object = self.objects.get(id)?;
        let entry = self.session.entry_of(object.type_name())?;
        let mut targets = Vec::new();

        for definer in &entry.state_definers {
            targets.extend_from_slice(object.links(&definer.property));
            let relation = self.relation(&entry.name, definer.property.as_str())?;
            if let Some(inverse) = &relation.inverse {
                for (source, navigation) in self.objects.incoming(id)? {
                    if &navigation == inverse {
                        targets.push(source);
                    }
                }
            }
        }
        Ok(targets)
    }

    fn define_candidates(&mut self, candidates: &ObjectSet) -> Result<StatePlan, GraphError> {
        let session = self.session;
        let mut memo = PrincipalMemo::new();
        let ranked = self.rank(candidates, &mut memo)?;

        let mut plan = StatePlan::default();
        let mut processed = Vec::with_capacity(ranked.len());
        for (id, type_name, principal_count) in ranked {
            let entry = session.entry_of(&type_name)?;
            let (state, duplicate_of) = self.resolve_state(id, entry, &processed)?;
            trace!("{} {} -> {}", type_name, id, state);

            self.tracker.set_state(id, state);
            processed.push(id);
            plan.entries.push(PlannedEntity {
                object: id,
                label: self.objects.get(id)?.label().map(str::to_string),
                type_name,
                state,
                principal_count,
                duplicate_of,
            });
        }

        let orphans = self.orphans(candidates)?;
        let mut doomed = self.rank(&orphans, &mut memo)?;
        doomed.reverse();

        for (id, type_name, principal_count) in doomed {
            self.tracker.set_state(id, EntityState::MarkedForDeletion);
            plan.entries.push(PlannedEntity {
                object: id,
                label: self.objects.get(id)?.label().map(str::to_string),
                type_name,
                state: EntityState::MarkedForDeletion,
                principal_count,
                duplicate_of: None,
            });
        }

        info!(
            "state plan: {} new, {} modified, {} unchanged, {} marked for deletion",
            plan.count(EntityState::New),
            plan.count(EntityState::Modified),
            plan.count(EntityState::Unchanged),
            plan.count(EntityState::MarkedForDeletion)
        );
        Ok(plan)
    }

    /// `ids` sorted by principal count, each run of equal counts put in
    /// parents-first order.
    fn rank(&self, ids: &ObjectSet, memo: &mut PrincipalMemo) -> Result<Vec<Ranked>, GraphError> {
        let mut ranked = Vec::with_capacity(ids.len());
        for id in ids.iter() {
            let type_name = self.objects.get(id)?.type_name().clone();
            let count = self.session.find_principal_count(type_name.as_str(), memo)?;
            ranked.push((id, type_name, count));
        }
        ranked.sort_by_key(|(_, _, count)| *count);

        let mut ordered = Vec::with_capacity(ranked.len());
        let mut start = 0;
        while start < ranked.len() {
            let count = ranked[start].2;
            let end = ranked[start..]
                .iter()
                .position(|r| r.2 != count)
                .map_or(ranked.len(), |len| start + len);
            ordered.extend(self.parents_first(&ranked[start..end])?);
            start = end;
        }
        Ok(ordered)
    }

    /// Topological order of `bucket` over the parent links between its
    /// members. Among ready objects the earliest discovered goes first; a
    /// cycle of links is broken at its earliest discovered member.
    fn parents_first(&self, bucket: &[Ranked]) -> Result<Vec<Ranked>, GraphError> {
        if bucket.len() < 2 {
            return Ok(bucket.to_vec());
        }

        let index: HashMap<ObjectId, usize> = bucket
            .iter()
            .enumerate()
            .map(|(i, (id, _, _))| (*id, i))
            .collect();
        let mut waiting = vec![0usize; bucket.len()];
        let mut children = vec![Vec::new(); bucket.len()];
        for (i, (id, _, _)) in bucket.iter().enumerate() {
            for parent in self.parents(*id, false)? {
                if let Some(&p) = index.get(&parent) {
                    waiting[i] += 1;
                    children[p].push(i);
                }
            }
        }

        let mut ready: BTreeSet<usize> = (0..bucket.len()).filter(|i| waiting[*i] == 0).collect();
        let mut emitted = vec![false; bucket.len()];
        let mut order = Vec::with_capacity(bucket.len());
        while order.len() < bucket.len() {
            let next = match ready.pop_first() {
                Some(i) => i,
                None => match emitted.iter().position(|done| !done) {
                    Some(i) => {
                        trace!("parent links cycle through {}", bucket[i].0);
                        i
                    }
                    None => break,
                },
            };
            if emitted[next] {
                continue;
            }
            emitted[next] = true;
            order.push(bucket[next].clone());
            for &child in &children[next] {
                waiting[child] = waiting[child].saturating_sub(1);
                if waiting[child] == 0 && !emitted[child] {
                    ready.insert(child);
                }
            }
        }
        Ok(order)
    }

    fn resolve_state(
        &mut self,
        id: ObjectId,
        entry: &TypeEntry,
        processed: &[ObjectId],
    ) -> Result<(EntityState, Option<ObjectId>), GraphError> {
        let mut key_unset = false;
        for key in &entry.primary_keys {
            if is_unset(self.resolve_value(id, key)?.as_ref()) {
                key_unset = true;
                break;
            }
        }
        let tentatively_new = key_unset && self.key_generated(entry)?;

        for group in &entry.unique_groups {
            let Some(criteria) = self.unique_criteria(id, group)? else {
                continue;
            };

            if let Some(other) = self.match_known(id, &entry.name, group, &criteria, processed)? {
                debug!("{} {} matches {} on unique values", entry.name, id, other);
                let mut source = BTreeMap::new();
                for key in &entry.primary_keys {
                    if let Some(value) = self.resolve_value(other, key)? {
                        source.insert(key.clone(), value);
                    }
                }
                self.adopt_key(id, entry, &source)?;
                let baseline = self.objects.get(other)?.values().clone();
                return Ok((self.compare(id, &baseline)?, Some(other)));
            }

            if let Some(record) = self.lookup.find(&entry.name, &criteria)? {
                debug!("{} {} matches a persisted record on unique values", entry.name, id);
                self.adopt_key(id, entry, &record.values)?;
                return Ok((self.compare(id, &record.values)?, None));
            }
        }

        if tentatively_new {
            return Ok((EntityState::New, None));
        }

        let baseline = match self.objects.get(id)?.original() {
            Some(snapshot) => Some(snapshot.values.clone()),
            None => match self.key_criteria(id, entry)? {
                Some(criteria) => self
                    .lookup
                    .find(&entry.name, &criteria)?
                    .map(|record| record.values),
                None => None,
            },
        };

        match baseline {
            Some(values) => Ok((self.compare(id, &values)?, None)),
            None => Ok((EntityState::New, None)),
        }
    }

    /// Whether the key of `entry` is generated by the store, directly or
    /// through the origin of a shared key.
    fn key_generated(&self, entry: &TypeEntry) -> Result<bool, GraphError> {
        if entry.key_store_generated {
            return Ok(true);
        }
        for key in &entry.primary_keys {
            let origin = self
                .session
                .origin_of_foreign_key(entry.name.as_str(), key.as_str())?;
            if let Some(origin) = origin {
                if self.session.entry_of(&origin)?.key_store_generated {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// Value of `property`, read through linked principals while it is an
    /// unset foreign key.
    pub(crate) fn resolve_value(
        &self,
        id: ObjectId,
        property: &PropertyName,
    ) -> Result<Option<Value>, GraphError> {
        let mut visited = HashSet::new();
        let mut current = (id, property.clone());

        loop {
            if !visited.insert(current.clone()) {
                return Ok(None);
            }
            let value = self.objects.get(current.0)?.value(&current.1).cloned();
            if !is_unset(value.as_ref()) {
                return Ok(value);
            }

            let next = self
                .neighbors(current.0)?
                .into_iter()
                .filter(|n| n.role == Role::Parent)
                .find_map(|n| {
                    n.relation
                        .matching_from_key(&current.1)
                        .map(|key| (n.object, key.clone()))
                });
            match next {
                Some(step) => current = step,
                None => return Ok(value),
            }
        }
    }

    /// Values of `group`, or `None` when any of them is absent or null.
    /// Zero and the empty string are real values here.
    fn unique_criteria(
        &self,
        id: ObjectId,
        group: &[PropertyName],
    ) -> Result<Option<Criteria>, GraphError> {
        let mut criteria = Vec::with_capacity(group.len());
        for property in group {
            match self.resolve_value(id, property)? {
                Some(value) if !value.is_null() => criteria.push((property.clone(), value)),
                _ => return Ok(None),
            }
        }
        Ok(Some(criteria))
    }

    fn key_criteria(&self, id: ObjectId, entry: &TypeEntry) -> Result<Option<Criteria>, GraphError> {
        self.unique_criteria(id, &entry.primary_keys)
    }

    /// First processed or tracked object of the same type whose values for
    /// `group` equal `criteria`.
    fn match_known(
        &self,
        id: ObjectId,
        type_name: &TypeName,
        group: &[PropertyName],
        criteria: &Criteria,
        processed: &[ObjectId],
    ) -> Result<Option<ObjectId>, GraphError> {
        let tracked = self.live_tracked();
        let mut seen = HashSet::new();
        for other in processed.iter().chain(tracked.iter()).copied() {
            if other == id || !seen.insert(other) {
                continue;
            }
            if self.objects.get(other)?.type_name() != type_name {
                continue;
            }
            if self.unique_criteria(other, group)?.as_ref() == Some(criteria) {
                return Ok(Some(other));
            }
        }
        Ok(None)
    }

    /// Copy key values onto `id` and down to its dependants.
    fn adopt_key(
        &mut self,
        id: ObjectId,
        entry: &TypeEntry,
        source: &BTreeMap<PropertyName, Value>,
    ) -> Result<(), GraphError> {
        for key in &entry.primary_keys {
            if let Some(value) = source.get(key) {
                if !value.is_null() {
                    self.objects.put_value(id, key.clone(), value.clone())?;
                }
            }
        }
        self.propagate_keys(id)
    }

    /// Copy principal key values into the foreign keys of linked children.
    /// A child whose own key changes passes it on.
    fn propagate_keys(&mut self, id: ObjectId) -> Result<(), GraphError> {
        let mut visited = HashSet::from([id]);
        let mut queue = VecDeque::from([id]);

        while let Some(principal) = queue.pop_front() {
            for neighbor in self.neighbors(principal)? {
                if neighbor.role != Role::Child {
                    continue;
                }
                let child = neighbor.object;
                let child_keys = self
                    .session
                    .entry_of(self.objects.get(child)?.type_name())?
                    .primary_keys
                    .clone();

                let mut key_changed = false;
                let pairs = neighbor.relation.from_keys.iter().zip(&neighbor.relation.to_keys);
                for (from_key, to_key) in pairs {
                    let Some(value) = self.objects.get(principal)?.value(from_key).cloned() else {
                        continue;
                    };
                    if is_unset(Some(&value))
                        || self.objects.get(child)?.value(to_key) == Some(&value)
                    {
                        continue;
                    }
                    trace!("propagate {} -> {}.{}", principal, child, to_key);
                    self.objects.put_value(child, to_key.clone(), value)?;
                    key_changed |= child_keys.contains(to_key);
                }

                if key_changed && visited.insert(child) {
                    queue.push_back(child);
                }
            }
        }
        Ok(())
    }

    /// `Modified` if any current value differs from `baseline`.
    fn compare(
        &self,
        id: ObjectId,
        baseline: &BTreeMap<PropertyName, Value>,
    ) -> Result<EntityState, GraphError> {
        let changed = self
            .objects
            .get(id)?
            .values()
            .iter()
            .any(|(property, value)| match baseline.get(property) {
                Some(original) => original != value,
                None => !value.is_null(),
            });
        Ok(if changed {
            EntityState::Modified
        } else {
            EntityState::Unchanged
        })
    }

    /// Persisted children dropped from a defined object, with their
    /// dependants, that nothing in the batch reaches any more.
    fn orphans(&self, reachable: &ObjectSet) -> Result<ObjectSet, GraphError> {
        let mut dropped = ObjectSet::new();

        for id in reachable.iter() {
            let object = self.objects.get(id)?;
            let Some(original) = object.original() else {
                continue;
            };
            for (navigation, targets) in &original.links {
                let relation = self.relation(object.type_name(), navigation.as_str())?;
                if relation.is_principal() {
                    continue;
                }
                let current = object.links(navigation);
                for target in targets {
                    if !current.contains(target) && !reachable.contains(*target) {
                        dropped.insert(*target);
                    }
                }
            }
        }

        for id in self.objects.ids() {
            if reachable.contains(id) {
                continue;
            }
            let object = self.objects.get(id)?;
            let Some(original) = object.original() else {
                continue;
            };
            for (navigation, targets) in &original.links {
                let relation = self.relation(object.type_name(), navigation.as_str())?;
                if !relation.is_principal() {
                    continue;
                }
                let current = object.links(navigation);
                if targets
                    .iter()
                    .any(|t| reachable.contains(*t) && !current.contains(t))
                {
                    dropped.insert(id);
                }
            }
        }

        let mut result = ObjectSet::new();
        for id in dropped.iter() {
            result.insert(id);
            for dependant in self.dependants(id)?.iter() {
                if !reachable.contains(dependant) {
                    result.insert(dependant);
                }
            }
        }
        Ok(result)
    }
}
