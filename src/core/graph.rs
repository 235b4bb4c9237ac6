//! core::graph
//!
//! Type-level dependency graph.
//!
//! # Architecture
//!
//! The dependency graph is derived from a [`SchemaSession`] where:
//! - Nodes are entity types
//! - Edges point from a dependent type to a type it must wait for: a
//!   principal reached through a `From` navigation, or a state-definer target
//! - Self references and principals excluded by a state-definer declaration
//!   are left out, mirroring the principal-dependency counter
//!
//! # Invariants
//!
//! - A graph without cycles yields a processing order in which every type
//!   comes after all of its prerequisites

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

use super::error::GraphError;
use super::session::SchemaSession;
use super::types::TypeName;

/// Prerequisite edges between entity types.
#[derive(Debug, Default)]
pub struct TypeGraph {
    /// Prerequisites of each type
    prerequisites: BTreeMap<TypeName, BTreeSet<TypeName>>,
    /// Reverse index (derived from prerequisites)
    dependents: BTreeMap<TypeName, BTreeSet<TypeName>>,
}

impl TypeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph of every type in the session.
    ///
    /// # Errors
    ///
    /// Propagates provider failures while loading navigation details.
    pub fn from_session(session: &SchemaSession) -> Result<Self, GraphError> {
        let mut graph = Self::new();
        for name in session.type_names() {
            graph.add_type(name.clone());
            let entry = session.entry_of(name)?;
            let navigation = session.relations_of(name)?.navigation;
            for relation in navigation.principals() {
                let target = &relation.target_type;
                if target == name || entry.state_definer_for.contains(target) {
                    continue;
                }
                graph.add_edge(name.clone(), target.clone());
            }
            for definer in &entry.state_definers {
                if &definer.target_type != name {
                    graph.add_edge(name.clone(), definer.target_type.clone());
                }
            }
        }
        Ok(graph)
    }

    /// Register a type with no edges yet.
    pub fn add_type(&mut self, name: TypeName) {
        self.prerequisites.entry(name).or_default();
    }

    /// Record that `dependent` must wait for `prerequisite`.
    pub fn add_edge(&mut self, dependent: TypeName, prerequisite: TypeName) {
        self.prerequisites.entry(prerequisite.clone()).or_default();
        self.dependents
            .entry(prerequisite.clone())
            .or_default()
            .insert(dependent.clone());
        self.prerequisites
            .entry(dependent)
            .or_default()
            .insert(prerequisite);
    }

    /// Direct prerequisites of a type.
    pub fn prerequisites(&self, name: &TypeName) -> impl Iterator<Item = &TypeName> {
        self.prerequisites.get(name).into_iter().flatten()
    }

    /// Direct dependents of a type.
    pub fn dependents(&self, name: &TypeName) -> impl Iterator<Item = &TypeName> {
        self.dependents.get(name).into_iter().flatten()
    }

    /// All types in the graph, sorted.
    pub fn types(&self) -> impl Iterator<Item = &TypeName> {
        self.prerequisites.keys()
    }

    /// Find a cycle among prerequisite edges.
    ///
    /// Returns the cycle as a path that starts and ends with the same type.
    pub fn find_cycle(&self) -> Option<Vec<TypeName>> {
        let mut visited = HashSet::new();
        let mut path = Vec::new();

        for name in self.prerequisites.keys() {
            if let Some(cycle) = self.cycle_from(name, &mut visited, &mut path) {
                return Some(cycle);
            }
        }
        None
    }

    fn cycle_from(
        &self,
        name: &TypeName,
        visited: &mut HashSet<TypeName>,
        path: &mut Vec<TypeName>,
    ) -> Option<Vec<TypeName>> {
        if let Some(pos) = path.iter().position(|t| t == name) {
            let mut cycle = path[pos..].to_vec();
            cycle.push(name.clone());
            return Some(cycle);
        }
        if !visited.insert(name.clone()) {
            return None;
        }

        path.push(name.clone());
        for next in self.prerequisites(name) {
            if let Some(cycle) = self.cycle_from(next, visited, path) {
                return Some(cycle);
            }
        }
        path.pop();
        None
    }

    /// Every type that transitively waits for `name`.
    ///
    /// # Example
    ///
    /// ```
    /// use entitygraph::core::graph::TypeGraph;
    /// use entitygraph::core::types::TypeName;
    ///
    /// let mut graph = TypeGraph::new();
    /// let blog = TypeName::new("Blog").unwrap();
    /// let post = TypeName::new("Post").unwrap();
    /// let comment = TypeName::new("Comment").unwrap();
    ///
    /// graph.add_edge(post.clone(), blog.clone());
    /// graph.add_edge(comment.clone(), post.clone());
    ///
    /// let downstream = graph.downstream(&blog);
    /// assert!(downstream.contains(&post));
    /// assert!(downstream.contains(&comment));
    /// ```
    pub fn downstream(&self, name: &TypeName) -> BTreeSet<TypeName> {
        Self::reach(&self.dependents, name)
    }

    /// Every type `name` transitively waits for.
    pub fn upstream(&self, name: &TypeName) -> BTreeSet<TypeName> {
        Self::reach(&self.prerequisites, name)
    }

    fn reach(
        edges: &BTreeMap<TypeName, BTreeSet<TypeName>>,
        start: &TypeName,
    ) -> BTreeSet<TypeName> {
        let mut result = BTreeSet::new();
        let mut queue: VecDeque<&TypeName> = edges.get(start).into_iter().flatten().collect();

        while let Some(current) = queue.pop_front() {
            if result.insert(current.clone()) {
                queue.extend(edges.get(current).into_iter().flatten());
            }
        }

        result
    }
}

/// One entry of a type processing order.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct OrderedType {
    pub name: TypeName,
    pub principal_count: usize,
}

/// Types sorted by ascending principal count, ties broken by name.
///
/// # Errors
///
/// `DependencyCycle` if the schema's principal navigations loop.
pub fn type_processing_order(session: &SchemaSession) -> Result<Vec<OrderedType>, GraphError> {
    let mut ordered = Vec::new();
    for name in session.type_names() {
        ordered.push(OrderedType {
            principal_count: session.principal_count(name.as_str())?,
            name: name.clone(),
        });
    }

    ordered.sort_by(|a, b| {
        a.principal_count
            .cmp(&b.principal_count)
            .then_with(|| a.name.cmp(&b.name))
    });
    Ok(ordered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metadata::schema::{parse_schema, DocumentFormat};
    use crate::core::metadata::SchemaCatalog;

    fn name(s: &str) -> TypeName {
        TypeName::new(s).unwrap()
    }

    fn session(body: &str) -> SchemaSession {
        let text = format!("kind = \"entitygraph.schema\"\nschema_version = 1\n{body}");
        let doc = parse_schema(&text, DocumentFormat::Toml).unwrap();
        SchemaSession::new(SchemaCatalog::from_document(&doc).unwrap()).unwrap()
    }

    const LIBRARY: &str = r#"
[[entity]]
name = "Author"
keys = ["id"]

[[entity]]
name = "Book"
keys = ["id"]
properties = ["author_id", "shelf_id"]

[[entity]]
name = "Shelf"
keys = ["id"]

[[relationship]]
principal = "Author"
principal_keys = ["id"]
dependent = "Book"
dependent_keys = ["author_id"]
principal_navigation = "books"
dependent_navigation = "author"

[[relationship]]
principal = "Shelf"
principal_keys = ["id"]
dependent = "Book"
dependent_keys = ["shelf_id"]
dependent_navigation = "shelf"
"#;

    #[test]
    fn empty_graph_has_no_cycles() {
        assert!(TypeGraph::new().find_cycle().is_none());
    }

    #[test]
    fn graph_from_session() {
        let graph = TypeGraph::from_session(&session(LIBRARY)).unwrap();
        let book_prereqs: Vec<_> = graph.prerequisites(&name("Book")).collect();
        assert_eq!(book_prereqs, vec![&name("Author"), &name("Shelf")]);
        assert!(graph.find_cycle().is_none());
        assert_eq!(graph.types().count(), 3);
    }

    #[test]
    fn cycle_path_is_closed() {
        let mut graph = TypeGraph::new();
        graph.add_edge(name("A"), name("B"));
        graph.add_edge(name("B"), name("C"));
        graph.add_edge(name("C"), name("A"));

        let cycle = graph.find_cycle().unwrap();
        assert_eq!(cycle.first(), cycle.last());
        assert_eq!(cycle.len(), 4);
    }

    #[test]
    fn upstream_and_downstream() {
        let mut graph = TypeGraph::new();
        graph.add_edge(name("Post"), name("Blog"));
        graph.add_edge(name("Comment"), name("Post"));

        let up = graph.upstream(&name("Comment"));
        assert_eq!(up.into_iter().collect::<Vec<_>>(), vec![name("Blog"), name("Post")]);
        assert!(graph.downstream(&name("Comment")).is_empty());
    }

    #[test]
    fn processing_order_by_count_then_name() {
        let order = type_processing_order(&session(LIBRARY)).unwrap();
        let names: Vec<_> = order.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["Author", "Shelf", "Book"]);
        assert_eq!(order[2].principal_count, 2);
    }

    #[test]
    fn processing_order_reports_cycle() {
        let session = session(
            r#"
[[entity]]
name = "Left"
keys = ["id"]
properties = ["right_id"]

[[entity]]
name = "Right"
keys = ["id"]
properties = ["left_id"]

[[relationship]]
principal = "Right"
principal_keys = ["id"]
dependent = "Left"
dependent_keys = ["right_id"]
dependent_navigation = "right"

[[relationship]]
principal = "Left"
principal_keys = ["id"]
dependent = "Right"
dependent_keys = ["left_id"]
dependent_navigation = "left"
"#,
        );
        assert!(matches!(
            type_processing_order(&session),
            Err(GraphError::DependencyCycle { .. })
        ));
        assert!(TypeGraph::from_session(&session)
            .unwrap()
            .find_cycle()
            .is_some());
    }
}
