//! core::origin
//!
//! Foreign-key origin resolution.
//!
//! A foreign key on a dependent refers to a key of its principal. When that
//! principal key is itself a foreign key of a one-to-one link (a shared
//! primary key, for instance), the value really originates one level
//! further up. [`SchemaSession::origin_of_foreign_key`] follows that chain
//! to the type that originally owns the key.
//!
//! # Termination
//!
//! - no further one-to-one principal edge: the current type is the origin
//! - the walk reaches a type it already visited (the starting type
//!   included): it stops at that type

use std::collections::HashSet;

use log::{debug, trace};

use super::error::GraphError;
use super::relationship::RelationshipEdge;
use super::session::{HelperStore, SchemaSession};
use super::types::{PropertyName, TypeName};

impl SchemaSession {
    /// Type that originally owns `foreign_key` of `type_name`.
    ///
    /// Returns `None` when the key is not part of any one-to-one principal
    /// link, meaning the key originates on `type_name` itself. Results are
    /// memoized per `(type, key)`.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an empty type or key name, `UnknownType` for a
    /// type outside the schema.
    ///
    /// # Example
    ///
    /// ```
    /// use entitygraph::core::metadata::schema::{parse_schema, DocumentFormat};
    /// use entitygraph::core::metadata::SchemaCatalog;
    /// use entitygraph::core::session::SchemaSession;
    ///
    /// let doc = parse_schema(r#"
    /// kind = "entitygraph.schema"
    /// schema_version = 1
    ///
    /// [[entity]]
    /// name = "Party"
    /// keys = ["id"]
    ///
    /// [[entity]]
    /// name = "Person"
    /// keys = ["id"]
    ///
    /// [[relationship]]
    /// principal = "Party"
    /// principal_keys = ["id"]
    /// dependent = "Person"
    /// dependent_keys = ["id"]
    /// unique = true
    /// required = true
    /// "#, DocumentFormat::Toml).unwrap();
    ///
    /// let session = SchemaSession::new(SchemaCatalog::from_document(&doc).unwrap()).unwrap();
    /// let origin = session.origin_of_foreign_key("Person", "id").unwrap();
    /// assert_eq!(origin.unwrap().as_str(), "Party");
    /// ```
    pub fn origin_of_foreign_key(
        &self,
        type_name: &str,
        foreign_key: &str,
    ) -> Result<Option<TypeName>, GraphError> {
        let start = self.entry(type_name)?.name.clone();
        let key = PropertyName::new(foreign_key)?;

        let cache_key = (start.clone(), key.clone());
        if let Some(cached) = HelperStore::get(&self.store.origins, &cache_key) {
            return Ok(cached);
        }

        let origin = match self.one_to_one_principal(&start, &key)? {
            None => None,
            Some(edge) => {
                let mut visited = HashSet::from([start.clone()]);
                let mut current_type = edge.from_type().clone();
                let mut current_key = edge.matching_from_key(&key).cloned();

                while visited.insert(current_type.clone()) {
                    let Some(k) = current_key.take() else {
                        break;
                    };
                    match self.one_to_one_principal(&current_type, &k)? {
                        Some(parent) => {
                            trace!(
                                "origin of {}.{}: {}.{} -> {}",
                                start,
                                key,
                                current_type,
                                k,
                                parent.from_type()
                            );
                            current_key = parent.matching_from_key(&k).cloned();
                            current_type = parent.from_type().clone();
                        }
                        None => break,
                    }
                }

                Some(current_type)
            }
        };

        debug!(
            "origin of {}.{} resolved to {}",
            start,
            key,
            origin.as_ref().map_or("<self>", |t| t.as_str())
        );
        Ok(HelperStore::put(&self.store.origins, cache_key, origin))
    }

    /// First edge where `type_name` is the dependent holding `key` and the
    /// principal end is single-valued.
    fn one_to_one_principal(
        &self,
        type_name: &TypeName,
        key: &PropertyName,
    ) -> Result<Option<RelationshipEdge>, GraphError> {
        self.entry_of(type_name)?;
        let relations = self.relations_of(type_name)?;
        Ok(relations
            .edges
            .iter()
            .find(|edge| {
                edge.to_type() == type_name
                    && edge.to_keys().contains(key)
                    && edge.is_one_to_one_principal()
            })
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use crate::core::error::GraphError;
    use crate::core::metadata::schema::{parse_schema, DocumentFormat};
    use crate::core::metadata::SchemaCatalog;
    use crate::core::session::SchemaSession;

    fn session(body: &str) -> SchemaSession {
        let text = format!("kind = \"entitygraph.schema\"\nschema_version = 1\n{body}");
        let doc = parse_schema(&text, DocumentFormat::Toml).unwrap();
        SchemaSession::new(SchemaCatalog::from_document(&doc).unwrap()).unwrap()
    }

    const CHAIN: &str = r#"
[[entity]]
name = "Party"
keys = ["id"]

[[entity]]
name = "Person"
keys = ["id"]

[[entity]]
name = "Employee"
keys = ["id"]
properties = ["person_id"]

[[entity]]
name = "Department"
keys = ["id"]

[[relationship]]
principal = "Party"
principal_keys = ["id"]
dependent = "Person"
dependent_keys = ["id"]
unique = true
required = true

[[relationship]]
principal = "Person"
principal_keys = ["id"]
dependent = "Employee"
dependent_keys = ["person_id"]
unique = true

[[relationship]]
principal = "Department"
principal_keys = ["id"]
dependent = "Employee"
dependent_keys = ["id"]
"#;

    #[test]
    fn chain_resolves_to_uppermost_owner() {
        let session = session(CHAIN);
        let origin = session.origin_of_foreign_key("Employee", "person_id").unwrap();
        assert_eq!(origin.unwrap().as_str(), "Party");
    }

    #[test]
    fn one_to_many_is_not_an_origin() {
        let session = session(CHAIN);
        // Employee.id is a foreign key to Department, but one-to-many.
        assert_eq!(session.origin_of_foreign_key("Employee", "id").unwrap(), None);
    }

    #[test]
    fn no_relationship_yields_none() {
        let session = session(CHAIN);
        assert_eq!(session.origin_of_foreign_key("Party", "id").unwrap(), None);
        assert_eq!(
            session.origin_of_foreign_key("Party", "not_a_key").unwrap(),
            None
        );
    }

    #[test]
    fn empty_key_is_invalid_argument() {
        let session = session(CHAIN);
        assert!(matches!(
            session.origin_of_foreign_key("Person", ""),
            Err(GraphError::InvalidArgument(_))
        ));
        assert!(matches!(
            session.origin_of_foreign_key("", "id"),
            Err(GraphError::InvalidArgument(_))
        ));
    }

    #[test]
    fn self_reference_terminates() {
        let session = session(
            r#"
[[entity]]
name = "Node"
keys = ["id"]
properties = ["twin_id"]

[[relationship]]
principal = "Node"
principal_keys = ["id"]
dependent = "Node"
dependent_keys = ["twin_id"]
unique = true
"#,
        );
        let origin = session.origin_of_foreign_key("Node", "twin_id").unwrap();
        assert_eq!(origin.unwrap().as_str(), "Node");
    }

    #[test]
    fn cycle_away_from_start_terminates() {
        let session = session(
            r#"
[[entity]]
name = "A"
keys = ["id"]
properties = ["b_id"]

[[entity]]
name = "B"
keys = ["id"]

[[entity]]
name = "C"
keys = ["id"]

[[relationship]]
principal = "B"
principal_keys = ["id"]
dependent = "A"
dependent_keys = ["b_id"]
unique = true

[[relationship]]
principal = "C"
principal_keys = ["id"]
dependent = "B"
dependent_keys = ["id"]
unique = true

[[relationship]]
principal = "B"
principal_keys = ["id"]
dependent = "C"
dependent_keys = ["id"]
unique = true
"#,
        );
        let origin = session.origin_of_foreign_key("A", "b_id").unwrap();
        assert_eq!(origin.unwrap().as_str(), "B");
    }

    #[test]
    fn result_is_memoized() {
        let session = session(CHAIN);
        let first = session.origin_of_foreign_key("Employee", "person_id").unwrap();
        let second = session.origin_of_foreign_key("Employee", "person_id").unwrap();
        assert_eq!(first, second);
        assert_eq!(session.store.origins.read().unwrap().len(), 1);
    }
}
