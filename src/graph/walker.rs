//! graph::walker
//!
//! Traversal of runtime object graphs.
//!
//! # Parents and children
//!
//! A link is interpreted through the navigation it uses:
//! - a principal navigation (`From`) on the linking object makes the target
//!   its parent
//! - a dependent navigation (`To`) makes the target its child
//!
//! Links are looked at from both ends, so a relationship declared with only
//! one navigation is still seen by the object on the other side.
//!
//! # Invariants
//!
//! - Every traversal visits an object at most once, by reference identity.
//!   Cyclic data terminates.
//! - Results are in discovery order, which is deterministic for a given
//!   arena.

use std::collections::{HashSet, VecDeque};

use log::trace;

use super::objects::{ObjectId, ObjectSet};
use super::tracker::EntityState;
use super::GraphContext;
use crate::core::error::GraphError;
use crate::core::navigation::NavigationRelation;

/// Which side of a link a neighbour is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Parent,
    Child,
}

/// An object linked to another, with the relation between them.
#[derive(Debug, Clone)]
pub struct Neighbor {
    pub object: ObjectId,
    pub role: Role,
    /// The navigation as declared on the object that owns the link
    pub relation: NavigationRelation,
}

impl GraphContext<'_> {
    /// Every object linked to `id`, from either end.
    pub fn neighbors(&self, id: ObjectId) -> Result<Vec<Neighbor>, GraphError> {
        let object = self.objects.get(id)?;
        let mut result = Vec::new();

        for (navigation, target) in object.outgoing() {
            let relation = self.relation(object.type_name(), navigation.as_str())?;
            let role = if relation.is_principal() {
                Role::Parent
            } else {
                Role::Child
            };
            result.push(Neighbor {
                object: target,
                role,
                relation,
            });
        }

        for (source, navigation) in self.objects.incoming(id)? {
            let source_type = self.objects.get(source)?.type_name();
            let relation = self.relation(source_type, navigation.as_str())?;
            let role = if relation.is_principal() {
                Role::Child
            } else {
                Role::Parent
            };
            result.push(Neighbor {
                object: source,
                role,
                relation,
            });
        }

        Ok(result)
    }

    /// Immediate parents of `id`.
    ///
    /// With `only_principal`, only parents linked through a one-to-one
    /// relationship are returned.
    pub fn parents(&self, id: ObjectId, only_principal: bool) -> Result<Vec<ObjectId>, GraphError> {
        let mut seen = ObjectSet::new();
        for neighbor in self.neighbors(id)? {
            if neighbor.role != Role::Parent || neighbor.object == id {
                continue;
            }
            if only_principal && !neighbor.relation.is_one_to_one() {
                continue;
            }
            seen.insert(neighbor.object);
        }
        Ok(seen.as_slice().to_vec())
    }

    /// Immediate children of `id`.
    pub fn children(&self, id: ObjectId) -> Result<Vec<ObjectId>, GraphError> {
        let mut seen = ObjectSet::new();
        for neighbor in self.neighbors(id)? {
            if neighbor.role == Role::Child && neighbor.object != id {
                seen.insert(neighbor.object);
            }
        }
        Ok(seen.as_slice().to_vec())
    }

    /// Topmost ancestor reached through one-to-one principal links, or `id`
    /// itself when it has none.
    pub fn uppermost_principal_parent(&self, id: ObjectId) -> Result<ObjectId, GraphError> {
        self.climb(id, true)
    }

    /// Topmost ancestor reached through any principal link, or `id` itself.
    pub fn uppermost_parent(&self, id: ObjectId) -> Result<ObjectId, GraphError> {
        self.climb(id, false)
    }

    /// [`uppermost_parent`](Self::uppermost_parent) of each of `ids`, each
    /// distinct object once, in first-seen order.
    pub fn uppermost_parents(&self, ids: &[ObjectId]) -> Result<ObjectSet, GraphError> {
        let mut result = ObjectSet::new();
        for id in ids {
            result.insert(self.uppermost_parent(*id)?);
        }
        Ok(result)
    }

    fn climb(&self, id: ObjectId, only_principal: bool) -> Result<ObjectId, GraphError> {
        let mut visited = HashSet::from([id]);
        let mut current = id;
        loop {
            let Some(parent) = self.parents(current, only_principal)?.first().copied() else {
                break;
            };
            if !visited.insert(parent) {
                break;
            }
            trace!("climb {} -> {}", current, parent);
            current = parent;
        }
        Ok(current)
    }

    /// Every object reachable from `id` through child links, `id` excluded.
    pub fn dependants(&self, id: ObjectId) -> Result<ObjectSet, GraphError> {
        let mut result = ObjectSet::new();
        let mut queue = VecDeque::from(self.children(id)?);

        while let Some(current) = queue.pop_front() {
            if current == id || !result.insert(current) {
                continue;
            }
            queue.extend(self.children(current)?);
        }

        Ok(result)
    }

    /// Every object reachable from `id` through parent links, `id` excluded.
    pub fn ancestors(&self, id: ObjectId) -> Result<ObjectSet, GraphError> {
        let mut result = ObjectSet::new();
        let mut queue = VecDeque::from(self.parents(id, false)?);

        while let Some(current) = queue.pop_front() {
            if current == id || !result.insert(current) {
                continue;
            }
            queue.extend(self.parents(current, false)?);
        }

        Ok(result)
    }

    /// Stop tracking everything that depends on `id`, and `id` itself when
    /// `detach_itself` is set. Returns the objects that were detached.
    pub fn detach_with_dependants(
        &mut self,
        id: ObjectId,
        detach_itself: bool,
    ) -> Result<Vec<ObjectId>, GraphError> {
        let mut targets = self.dependants(id)?.as_slice().to_vec();
        if detach_itself {
            targets.insert(0, id);
        }

        let mut detached = Vec::new();
        for target in targets {
            if self.tracker.detach(target) {
                detached.push(target);
            }
        }
        trace!("detached {} objects below {}", detached.len(), id);
        Ok(detached)
    }

    /// Append every object connected to `id`, in either direction, to
    /// `accumulator`. Objects already present are skipped along with
    /// everything only reachable through them.
    pub fn get_all_entities(
        &self,
        id: ObjectId,
        accumulator: &mut ObjectSet,
    ) -> Result<(), GraphError> {
        self.objects.get(id)?;
        let mut queue = VecDeque::from([id]);

        while let Some(current) = queue.pop_front() {
            if !accumulator.insert(current) {
                continue;
            }
            for neighbor in self.neighbors(current)? {
                if !accumulator.contains(neighbor.object) {
                    queue.push_back(neighbor.object);
                }
            }
        }

        Ok(())
    }

    /// Tracked objects, excluding those marked for deletion.
    pub(crate) fn live_tracked(&self) -> Vec<ObjectId> {
        self.tracker
            .entries()
            .filter(|(_, state)| *state != EntityState::MarkedForDeletion)
            .map(|(id, _)| id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metadata::schema::{parse_schema, DocumentFormat};
    use crate::core::metadata::SchemaCatalog;
    use crate::core::session::SchemaSession;

    const SCHEMA: &str = r#"
kind = "entitygraph.schema"
schema_version = 1

[[entity]]
name = "Person"
keys = ["id"]

[[entity]]
name = "Passport"
keys = ["id"]
properties = ["person_id"]

[[entity]]
name = "Visa"
keys = ["id"]
properties = ["passport_id"]

[[relationship]]
principal = "Person"
principal_keys = ["id"]
dependent = "Passport"
dependent_keys = ["person_id"]
unique = true
required = true
principal_navigation = "passport"
dependent_navigation = "holder"

[[relationship]]
principal = "Passport"
principal_keys = ["id"]
dependent = "Visa"
dependent_keys = ["passport_id"]
principal_navigation = "visas"
dependent_navigation = "passport"
"#;

    fn session() -> SchemaSession {
        let doc = parse_schema(SCHEMA, DocumentFormat::Toml).unwrap();
        SchemaSession::new(SchemaCatalog::from_document(&doc).unwrap()).unwrap()
    }

    struct Fixture {
        person: ObjectId,
        passport: ObjectId,
        visa_a: ObjectId,
        visa_b: ObjectId,
    }

    fn build(ctx: &mut GraphContext<'_>) -> Fixture {
        let person = ctx.add("Person").unwrap();
        let passport = ctx.add("Passport").unwrap();
        let visa_a = ctx.add("Visa").unwrap();
        let visa_b = ctx.add("Visa").unwrap();
        ctx.link(passport, "holder", person).unwrap();
        ctx.link(passport, "visas", visa_a).unwrap();
        ctx.link(visa_b, "passport", passport).unwrap();
        Fixture {
            person,
            passport,
            visa_a,
            visa_b,
        }
    }

    #[test]
    fn parents_from_both_ends() {
        let session = session();
        let mut ctx = GraphContext::new(&session);
        let f = build(&mut ctx);

        assert_eq!(ctx.parents(f.visa_a, false).unwrap(), vec![f.passport]);
        assert_eq!(ctx.parents(f.visa_b, false).unwrap(), vec![f.passport]);
        assert_eq!(ctx.parents(f.passport, false).unwrap(), vec![f.person]);
        assert!(ctx.parents(f.person, false).unwrap().is_empty());
    }

    #[test]
    fn only_principal_keeps_one_to_one() {
        let session = session();
        let mut ctx = GraphContext::new(&session);
        let f = build(&mut ctx);

        assert_eq!(ctx.parents(f.passport, true).unwrap(), vec![f.person]);
        assert!(ctx.parents(f.visa_a, true).unwrap().is_empty());
    }

    #[test]
    fn uppermost_parents() {
        let session = session();
        let mut ctx = GraphContext::new(&session);
        let f = build(&mut ctx);

        assert_eq!(ctx.uppermost_parent(f.visa_b).unwrap(), f.person);
        // Visa -> Passport is one-to-many, so the visa is its own top.
        assert_eq!(ctx.uppermost_principal_parent(f.visa_b).unwrap(), f.visa_b);
        assert_eq!(ctx.uppermost_principal_parent(f.passport).unwrap(), f.person);
        assert_eq!(ctx.uppermost_parent(f.person).unwrap(), f.person);
    }

    #[test]
    fn uppermost_parents_of_many_deduplicated() {
        let session = session();
        let mut ctx = GraphContext::new(&session);
        let f = build(&mut ctx);
        let loner = ctx.add("Visa").unwrap();

        let tops = ctx
            .uppermost_parents(&[f.visa_a, loner, f.visa_b, f.passport])
            .unwrap();
        assert_eq!(tops.as_slice(), &[f.person, loner]);
        assert!(ctx.uppermost_parents(&[]).unwrap().is_empty());
    }

    #[test]
    fn children_and_dependants() {
        let session = session();
        let mut ctx = GraphContext::new(&session);
        let f = build(&mut ctx);

        assert_eq!(ctx.children(f.passport).unwrap(), vec![f.visa_a, f.visa_b]);
        let below: Vec<_> = ctx.dependants(f.person).unwrap().iter().collect();
        assert_eq!(below, vec![f.passport, f.visa_a, f.visa_b]);
    }

    #[test]
    fn detach_keeps_root_unless_asked() {
        let session = session();
        let mut ctx = GraphContext::new(&session);
        let f = build(&mut ctx);
        for id in [f.person, f.passport, f.visa_a, f.visa_b] {
            ctx.attach_existing(id).unwrap();
        }

        let detached = ctx.detach_with_dependants(f.passport, false).unwrap();
        assert_eq!(detached, vec![f.visa_a, f.visa_b]);
        assert!(ctx.tracker().is_tracked(f.passport));
        assert!(ctx.tracker().is_tracked(f.person));

        let detached = ctx.detach_with_dependants(f.passport, true).unwrap();
        assert_eq!(detached, vec![f.passport]);
        assert_eq!(ctx.state(f.passport), EntityState::Detached);
    }

    #[test]
    fn all_entities_from_any_start() {
        let session = session();
        let mut ctx = GraphContext::new(&session);
        let f = build(&mut ctx);

        let mut all = ObjectSet::new();
        ctx.get_all_entities(f.visa_a, &mut all).unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(all.as_slice()[0], f.visa_a);

        // A second walk into the same accumulator adds nothing.
        ctx.get_all_entities(f.person, &mut all).unwrap();
        assert_eq!(all.len(), 4);
    }

    #[test]
    fn link_validates_navigation() {
        let session = session();
        let mut ctx = GraphContext::new(&session);
        let person = ctx.add("Person").unwrap();
        let visa = ctx.add("Visa").unwrap();

        assert!(matches!(
            ctx.link(person, "visas", visa),
            Err(GraphError::InvalidArgument(_))
        ));
        assert!(matches!(
            ctx.link(person, "passport", visa),
            Err(GraphError::InvalidArgument(_))
        ));
        assert!(matches!(ctx.add("Embassy"), Err(GraphError::UnknownType(_))));
    }
}
