//! core::principal
//!
//! Principal-dependency counting.
//!
//! The principal count of a type is the number of relationships in which it
//! is the dependent, plus its state definers, plus the counts of all those
//! principals and definers. Types with a lower count have fewer
//! prerequisites and are processed first.
//!
//! # Cycle handling
//!
//! Two kinds of edges are skipped during recursion:
//! - a relationship from the type to itself
//! - a principal for which the type is a declared state definer
//!
//! Any other cycle among principals is reported as
//! [`GraphError::DependencyCycle`] instead of recursing forever.

use std::collections::HashMap;

use log::trace;

use super::error::GraphError;
use super::session::{SchemaSession, TypeEntry};
use super::types::{NavigationDirection, TypeName};

/// Caller-owned memo of principal counts for one ordering run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrincipalMemo {
    counts: HashMap<TypeName, usize>,
}

impl PrincipalMemo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count already computed for a type.
    pub fn get(&self, type_name: &str) -> Option<usize> {
        self.counts
            .iter()
            .find(|(name, _)| name.as_str() == type_name)
            .map(|(_, count)| *count)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

impl IntoIterator for PrincipalMemo {
    type Item = (TypeName, usize);
    type IntoIter = std::collections::hash_map::IntoIter<TypeName, usize>;

    fn into_iter(self) -> Self::IntoIter {
        self.counts.into_iter()
    }
}

impl SchemaSession {
    /// Principal count of `type_name`, reusing and filling `memo`.
    ///
    /// # Errors
    ///
    /// `InvalidArgument`/`UnknownType` for a bad type name and
    /// `DependencyCycle` when principals loop.
    ///
    /// # Example
    ///
    /// ```
    /// use entitygraph::core::metadata::schema::{parse_schema, DocumentFormat};
    /// use entitygraph::core::metadata::SchemaCatalog;
    /// use entitygraph::core::principal::PrincipalMemo;
    /// use entitygraph::core::session::SchemaSession;
    ///
    /// let doc = parse_schema(r#"
    /// kind = "entitygraph.schema"
    /// schema_version = 1
    ///
    /// [[entity]]
    /// name = "Blog"
    /// keys = ["id"]
    ///
    /// [[entity]]
    /// name = "Post"
    /// keys = ["id"]
    /// properties = ["blog_id"]
    ///
    /// [[relationship]]
    /// principal = "Blog"
    /// principal_keys = ["id"]
    /// dependent = "Post"
    /// dependent_keys = ["blog_id"]
    /// principal_navigation = "posts"
    /// dependent_navigation = "blog"
    /// "#, DocumentFormat::Toml).unwrap();
    ///
    /// let session = SchemaSession::new(SchemaCatalog::from_document(&doc).unwrap()).unwrap();
    /// let mut memo = PrincipalMemo::new();
    /// assert_eq!(session.find_principal_count("Post", &mut memo).unwrap(), 1);
    /// assert_eq!(memo.get("Blog"), Some(0));
    /// ```
    pub fn find_principal_count(
        &self,
        type_name: &str,
        memo: &mut PrincipalMemo,
    ) -> Result<usize, GraphError> {
        let entry = self.entry(type_name)?;
        let mut stack = Vec::new();
        self.count_principals(entry, memo, &mut stack)
    }

    fn count_principals(
        &self,
        entry: &TypeEntry,
        memo: &mut PrincipalMemo,
        stack: &mut Vec<TypeName>,
    ) -> Result<usize, GraphError> {
        if let Some(count) = memo.counts.get(&entry.name) {
            return Ok(*count);
        }

        if let Some(pos) = stack.iter().position(|t| t == &entry.name) {
            let mut path: Vec<String> = stack[pos..].iter().map(|t| t.to_string()).collect();
            path.push(entry.name.to_string());
            return Err(GraphError::DependencyCycle { path });
        }

        // Every relationship in which this type is the dependent counts,
        // whether or not a navigation is declared on this side.
        let edges = self.relations_of(&entry.name)?.edges;
        let principals: Vec<&TypeName> = edges
            .iter()
            .filter(|e| e.direction() == NavigationDirection::From)
            .map(|e| e.from_type())
            .collect();
        let definers = &entry.state_definers;

        if principals.is_empty() && definers.is_empty() {
            memo.counts.insert(entry.name.clone(), 0);
            return Ok(0);
        }

        let mut count = principals.len() + definers.len();
        stack.push(entry.name.clone());

        for target in principals {
            if target == &entry.name || entry.state_definer_for.contains(target) {
                continue;
            }
            count += self.count_principals(self.entry_of(target)?, memo, stack)?;
        }

        for definer in definers {
            if definer.target_type == entry.name {
                continue;
            }
            count += self.count_principals(self.entry_of(&definer.target_type)?, memo, stack)?;
        }

        stack.pop();
        trace!("principal count of {} = {}", entry.name, count);
        memo.counts.insert(entry.name.clone(), count);
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metadata::schema::{parse_schema, DocumentFormat};
    use crate::core::metadata::SchemaCatalog;

    fn session(body: &str) -> SchemaSession {
        let text = format!("kind = \"entitygraph.schema\"\nschema_version = 1\n{body}");
        let doc = parse_schema(&text, DocumentFormat::Toml).unwrap();
        SchemaSession::new(SchemaCatalog::from_document(&doc).unwrap()).unwrap()
    }

    const CHAIN: &str = r#"
[[entity]]
name = "Country"
keys = ["id"]

[[entity]]
name = "City"
keys = ["id"]
properties = ["country_id"]

[[entity]]
name = "Street"
keys = ["id"]
properties = ["city_id"]

[[entity]]
name = "Note"
keys = ["id"]

[[relationship]]
principal = "Country"
principal_keys = ["id"]
dependent = "City"
dependent_keys = ["country_id"]
principal_navigation = "cities"
dependent_navigation = "country"

[[relationship]]
principal = "City"
principal_keys = ["id"]
dependent = "Street"
dependent_keys = ["city_id"]
principal_navigation = "streets"
dependent_navigation = "city"
"#;

    #[test]
    fn isolated_type_counts_zero() {
        let session = session(CHAIN);
        let mut memo = PrincipalMemo::new();
        assert_eq!(session.find_principal_count("Note", &mut memo).unwrap(), 0);
        assert_eq!(session.find_principal_count("Country", &mut memo).unwrap(), 0);
    }

    #[test]
    fn counts_are_transitive() {
        let session = session(CHAIN);
        let mut memo = PrincipalMemo::new();
        assert_eq!(session.find_principal_count("Street", &mut memo).unwrap(), 2);
        assert_eq!(memo.get("City"), Some(1));
        assert_eq!(memo.get("Country"), Some(0));
        assert_eq!(memo.len(), 3);
    }

    #[test]
    fn memo_is_reused() {
        let session = session(CHAIN);
        let mut memo = PrincipalMemo::new();
        let first = session.find_principal_count("Street", &mut memo).unwrap();
        let snapshot = memo.clone();
        let second = session.find_principal_count("Street", &mut memo).unwrap();
        assert_eq!(first, second);
        assert_eq!(memo, snapshot);
    }

    #[test]
    fn memo_values_take_precedence() {
        let session = session(CHAIN);
        let mut memo = PrincipalMemo::new();
        memo.counts.insert(TypeName::new("City").unwrap(), 10);
        assert_eq!(session.find_principal_count("Street", &mut memo).unwrap(), 11);
    }

    #[test]
    fn self_reference_is_counted_but_not_followed() {
        let session = session(
            r#"
[[entity]]
name = "Category"
keys = ["id"]
properties = ["parent_id"]

[[relationship]]
principal = "Category"
principal_keys = ["id"]
dependent = "Category"
dependent_keys = ["parent_id"]
principal_navigation = "children"
dependent_navigation = "parent"
"#,
        );
        let mut memo = PrincipalMemo::new();
        assert_eq!(session.find_principal_count("Category", &mut memo).unwrap(), 1);
    }

    #[test]
    fn relationship_without_dependent_navigation_counts() {
        let session = session(
            r#"
[[entity]]
name = "Team"
keys = ["id"]

[[entity]]
name = "Player"
keys = ["id"]
properties = ["team_id"]

[[relationship]]
principal = "Team"
principal_keys = ["id"]
dependent = "Player"
dependent_keys = ["team_id"]
principal_navigation = "players"
"#,
        );
        let mut memo = PrincipalMemo::new();
        assert_eq!(session.find_principal_count("Player", &mut memo).unwrap(), 1);
        assert_eq!(memo.get("Team"), Some(0));
    }

    #[test]
    fn state_definer_exclusion_breaks_cycle() {
        let session = session(
            r#"
[[entity]]
name = "Person"
keys = ["id"]
state_definers = ["passport"]

[[entity]]
name = "Passport"
keys = ["id"]
properties = ["person_id"]

[[relationship]]
principal = "Person"
principal_keys = ["id"]
dependent = "Passport"
dependent_keys = ["person_id"]
unique = true
principal_navigation = "passport"
dependent_navigation = "holder"
"#,
        );
        let mut memo = PrincipalMemo::new();
        // Passport: one principal (Person), skipped because Passport defines Person's state.
        assert_eq!(session.find_principal_count("Passport", &mut memo).unwrap(), 1);
        // Person: one state definer plus Passport's count.
        assert_eq!(session.find_principal_count("Person", &mut memo).unwrap(), 2);
    }

    #[test]
    fn principal_cycle_is_reported() {
        let session = session(
            r#"
[[entity]]
name = "Egg"
keys = ["id"]
properties = ["hen_id"]

[[entity]]
name = "Hen"
keys = ["id"]
properties = ["egg_id"]

[[relationship]]
principal = "Hen"
principal_keys = ["id"]
dependent = "Egg"
dependent_keys = ["hen_id"]
dependent_navigation = "hen"

[[relationship]]
principal = "Egg"
principal_keys = ["id"]
dependent = "Hen"
dependent_keys = ["egg_id"]
dependent_navigation = "egg"
"#,
        );
        let mut memo = PrincipalMemo::new();
        let err = session.find_principal_count("Egg", &mut memo).unwrap_err();
        match err {
            GraphError::DependencyCycle { path } => {
                assert_eq!(path, vec!["Egg", "Hen", "Egg"]);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn unknown_type_rejected() {
        let session = session(CHAIN);
        let mut memo = PrincipalMemo::new();
        assert!(matches!(
            session.find_principal_count("Planet", &mut memo),
            Err(GraphError::UnknownType(_))
        ));
    }
}
