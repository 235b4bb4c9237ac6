//! core::relationship
//!
//! Normalized relationship edges.
//!
//! An edge always runs from the principal (`from`) to the dependent (`to`).
//! Each end carries the multiplicity of the navigation located on that end:
//! a principal whose navigation is a collection of dependents is `Many`,
//! which is what separates one-to-many links from genuine one-to-one
//! principal links.

use serde::Serialize;

use super::metadata::ForeignKeyDescriptor;
use super::types::{Multiplicity, NavigationDirection, PropertyName, TypeName};

/// One directed edge between two entity types.
///
/// `from_keys()[i]` corresponds positionally to `to_keys()[i]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationshipEdge {
    from_type: TypeName,
    from_keys: Vec<PropertyName>,
    to_type: TypeName,
    to_keys: Vec<PropertyName>,
    from_multiplicity: Multiplicity,
    to_multiplicity: Multiplicity,
    direction: NavigationDirection,
}

impl RelationshipEdge {
    /// Normalize a raw foreign key as seen from `viewed_from`.
    ///
    /// The direction is `From` when `viewed_from` is the dependent (including
    /// self references) and `To` otherwise.
    ///
    /// # Example
    ///
    /// ```
    /// use entitygraph::core::metadata::ForeignKeyDescriptor;
    /// use entitygraph::core::relationship::RelationshipEdge;
    /// use entitygraph::core::types::{Multiplicity, NavigationDirection, PropertyName, TypeName};
    ///
    /// let order = TypeName::new("Order").unwrap();
    /// let fk = ForeignKeyDescriptor {
    ///     principal_type: TypeName::new("Customer").unwrap(),
    ///     principal_keys: vec![PropertyName::new("id").unwrap()],
    ///     dependent_type: order.clone(),
    ///     dependent_keys: vec![PropertyName::new("customer_id").unwrap()],
    ///     required: true,
    ///     unique: false,
    ///     principal_navigation: None,
    ///     dependent_navigation: None,
    /// };
    ///
    /// let edge = RelationshipEdge::from_descriptor(&fk, &order);
    /// assert_eq!(edge.direction(), NavigationDirection::From);
    /// assert_eq!(edge.from_multiplicity(), Multiplicity::Many);
    /// assert!(!edge.is_one_to_one_principal());
    /// ```
    pub fn from_descriptor(fk: &ForeignKeyDescriptor, viewed_from: &TypeName) -> Self {
        let direction = if &fk.dependent_type == viewed_from {
            NavigationDirection::From
        } else {
            NavigationDirection::To
        };

        Self {
            from_type: fk.principal_type.clone(),
            from_keys: fk.principal_keys.clone(),
            to_type: fk.dependent_type.clone(),
            to_keys: fk.dependent_keys.clone(),
            from_multiplicity: Multiplicity::of_navigation(!fk.unique, fk.required, false),
            to_multiplicity: Multiplicity::of_navigation(false, fk.required, true),
            direction,
        }
    }

    /// Principal type.
    pub fn from_type(&self) -> &TypeName {
        &self.from_type
    }

    /// Referenced key properties on the principal.
    pub fn from_keys(&self) -> &[PropertyName] {
        &self.from_keys
    }

    /// Dependent type.
    pub fn to_type(&self) -> &TypeName {
        &self.to_type
    }

    /// Foreign key properties on the dependent.
    pub fn to_keys(&self) -> &[PropertyName] {
        &self.to_keys
    }

    pub fn from_multiplicity(&self) -> Multiplicity {
        self.from_multiplicity
    }

    pub fn to_multiplicity(&self) -> Multiplicity {
        self.to_multiplicity
    }

    pub fn direction(&self) -> NavigationDirection {
        self.direction
    }

    /// Whether the principal end is single-valued, making this a one-to-one
    /// principal link rather than one-to-many.
    pub fn is_one_to_one_principal(&self) -> bool {
        self.from_multiplicity.is_single()
    }

    /// Principal key matching a dependent foreign key, by position.
    pub fn matching_from_key(&self, to_key: &PropertyName) -> Option<&PropertyName> {
        self.to_keys
            .iter()
            .position(|k| k == to_key)
            .and_then(|i| self.from_keys.get(i))
    }

    /// Dependent foreign key matching a principal key, by position.
    pub fn matching_to_key(&self, from_key: &PropertyName) -> Option<&PropertyName> {
        self.from_keys
            .iter()
            .position(|k| k == from_key)
            .and_then(|i| self.to_keys.get(i))
    }
}

impl std::fmt::Display for RelationshipEdge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}({}) [{}] -> {}({}) [{}]",
            self.from_type,
            join(&self.from_keys),
            self.from_multiplicity,
            self.to_type,
            join(&self.to_keys),
            self.to_multiplicity
        )
    }
}

fn join(props: &[PropertyName]) -> String {
    props
        .iter()
        .map(|p| p.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
