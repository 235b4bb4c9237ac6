//! core::navigation
//!
//! Per-type navigation detail.
//!
//! A [`NavigationDetail`] lists every navigation property declared on one
//! entity type, tagged with the side of the relationship it sits on and the
//! multiplicity of both ends. Navigations are what the graph walker follows
//! between runtime objects; the principal-dependency counter counts the
//! `From` ones.

use serde::Serialize;

use super::metadata::ForeignKeyDescriptor;
use super::types::{Multiplicity, NavigationDirection, PropertyName, TypeName};

/// One navigation property of a type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavigationRelation {
    /// Navigation property name on the source type
    pub property_name: PropertyName,
    /// Type the navigation points at
    pub target_type: TypeName,
    /// Principal key properties
    pub from_keys: Vec<PropertyName>,
    /// Dependent foreign key properties
    pub to_keys: Vec<PropertyName>,
    /// Multiplicity of the source end (as its inverse navigation would see it)
    pub source_multiplicity: Multiplicity,
    /// Multiplicity of this navigation
    pub target_multiplicity: Multiplicity,
    /// `From` when the source type is the dependent
    pub direction: NavigationDirection,
    /// Navigation on the target pointing back, if declared
    pub inverse: Option<PropertyName>,
}

impl NavigationRelation {
    /// Navigation from a dependent to its principal.
    fn dependent_side(fk: &ForeignKeyDescriptor, property_name: PropertyName) -> Self {
        Self {
            property_name,
            target_type: fk.principal_type.clone(),
            from_keys: fk.principal_keys.clone(),
            to_keys: fk.dependent_keys.clone(),
            source_multiplicity: Multiplicity::of_navigation(!fk.unique, fk.required, false),
            target_multiplicity: Multiplicity::of_navigation(false, fk.required, true),
            direction: NavigationDirection::From,
            inverse: fk.principal_navigation.clone(),
        }
    }

    /// Navigation from a principal to its dependents.
    fn principal_side(fk: &ForeignKeyDescriptor, property_name: PropertyName) -> Self {
        Self {
            property_name,
            target_type: fk.dependent_type.clone(),
            from_keys: fk.principal_keys.clone(),
            to_keys: fk.dependent_keys.clone(),
            source_multiplicity: Multiplicity::of_navigation(false, fk.required, true),
            target_multiplicity: Multiplicity::of_navigation(!fk.unique, fk.required, false),
            direction: NavigationDirection::To,
            inverse: fk.dependent_navigation.clone(),
        }
    }

    /// Whether the navigation holds a collection.
    pub fn is_collection(&self) -> bool {
        self.target_multiplicity == Multiplicity::Many
    }

    /// Whether both ends are single-valued.
    pub fn is_one_to_one(&self) -> bool {
        self.source_multiplicity.is_single() && self.target_multiplicity.is_single()
    }

    /// Whether this navigation points at a principal.
    pub fn is_principal(&self) -> bool {
        self.direction == NavigationDirection::From
    }

    /// Principal key matching a dependent foreign key, by position.
    pub fn matching_from_key(&self, to_key: &PropertyName) -> Option<&PropertyName> {
        self.to_keys
            .iter()
            .position(|k| k == to_key)
            .and_then(|i| self.from_keys.get(i))
    }
}

/// Navigation detail of one entity type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavigationDetail {
    pub source_type: TypeName,
    pub relations: Vec<NavigationRelation>,
}

impl NavigationDetail {
    /// Build the detail of `source_type` from the foreign keys involving it.
    ///
    /// A self-referencing foreign key contributes both of its navigations.
    pub fn build(source_type: &TypeName, foreign_keys: &[ForeignKeyDescriptor]) -> Self {
        let mut relations = Vec::new();
        for fk in foreign_keys {
            if &fk.dependent_type == source_type {
                if let Some(nav) = &fk.dependent_navigation {
                    relations.push(NavigationRelation::dependent_side(fk, nav.clone()));
                }
            }
            if &fk.principal_type == source_type {
                if let Some(nav) = &fk.principal_navigation {
                    relations.push(NavigationRelation::principal_side(fk, nav.clone()));
                }
            }
        }

        Self {
            source_type: source_type.clone(),
            relations,
        }
    }

    /// Navigations pointing at principals.
    pub fn principals(&self) -> impl Iterator<Item = &NavigationRelation> {
        self.relations.iter().filter(|r| r.is_principal())
    }

    /// Navigations pointing at dependents.
    pub fn dependents(&self) -> impl Iterator<Item = &NavigationRelation> {
        self.relations.iter().filter(|r| !r.is_principal())
    }

    /// Find a navigation by property name.
    pub fn relation(&self, property: &str) -> Option<&NavigationRelation> {
        self.relations
            .iter()
            .find(|r| r.property_name.as_str() == property)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> TypeName {
        TypeName::new(s).unwrap()
    }

    fn prop(s: &str) -> PropertyName {
        PropertyName::new(s).unwrap()
    }

    fn fk(
        principal: &str,
        dependent: &str,
        unique: bool,
        principal_nav: Option<&str>,
        dependent_nav: Option<&str>,
    ) -> ForeignKeyDescriptor {
        ForeignKeyDescriptor {
            principal_type: name(principal),
            principal_keys: vec![prop("id")],
            dependent_type: name(dependent),
            dependent_keys: vec![prop(&format!("{}_id", principal.to_lowercase()))],
            required: false,
            unique,
            principal_navigation: principal_nav.map(prop),
            dependent_navigation: dependent_nav.map(prop),
        }
    }

    #[test]
    fn one_to_many_both_navigations() {
        let fks = vec![fk("Blog", "Post", false, Some("posts"), Some("blog"))];

        let post = NavigationDetail::build(&name("Post"), &fks);
        let blog_nav = post.relation("blog").unwrap();
        assert_eq!(blog_nav.direction, NavigationDirection::From);
        assert_eq!(blog_nav.target_multiplicity, Multiplicity::One);
        assert_eq!(blog_nav.source_multiplicity, Multiplicity::Many);
        assert!(!blog_nav.is_one_to_one());
        assert_eq!(blog_nav.inverse, Some(prop("posts")));

        let blog = NavigationDetail::build(&name("Blog"), &fks);
        let posts_nav = blog.relation("posts").unwrap();
        assert_eq!(posts_nav.direction, NavigationDirection::To);
        assert!(posts_nav.is_collection());
    }

    #[test]
    fn one_to_one_optional() {
        let fks = vec![fk("User", "Avatar", true, Some("avatar"), Some("user"))];
        let user = NavigationDetail::build(&name("User"), &fks);
        let avatar_nav = user.relation("avatar").unwrap();
        assert_eq!(avatar_nav.target_multiplicity, Multiplicity::ZeroOrOne);
        assert!(avatar_nav.is_one_to_one());
    }

    #[test]
    fn missing_navigation_contributes_nothing() {
        let fks = vec![fk("Blog", "Post", false, None, Some("blog"))];
        let blog = NavigationDetail::build(&name("Blog"), &fks);
        assert!(blog.relations.is_empty());

        let post = NavigationDetail::build(&name("Post"), &fks);
        assert_eq!(post.principals().count(), 1);
        assert_eq!(post.dependents().count(), 0);
    }

    #[test]
    fn self_reference_has_both_sides() {
        let fks = vec![fk("Node", "Node", false, Some("children"), Some("parent"))];
        let node = NavigationDetail::build(&name("Node"), &fks);
        assert_eq!(node.principals().count(), 1);
        assert_eq!(node.dependents().count(), 1);
    }

    #[test]
    fn matching_key_by_position() {
        let fks = vec![fk("Blog", "Post", false, Some("posts"), Some("blog"))];
        let post = NavigationDetail::build(&name("Post"), &fks);
        let nav = post.relation("blog").unwrap();
        assert_eq!(nav.matching_from_key(&prop("blog_id")), Some(&prop("id")));
    }
}
