//! core::metadata::catalog
//!
//! In-memory schema provider.
//!
//! # Registration rules
//!
//! Unique groups:
//! - must name at least one property
//! - may only name scalar properties of the type (never navigations)
//! - a group equal to an already registered one (in any order) is ignored
//!
//! State definers:
//! - must name at least one property
//! - may only name navigation properties of the type
//! - a property that is already registered is ignored
//!
//! # Example
//!
//! ```
//! use entitygraph::core::metadata::{SchemaCatalog, SchemaProvider};
//! use entitygraph::core::types::TypeName;
//!
//! let mut catalog = SchemaCatalog::new();
//! catalog.add_entity("Country", &["id"], true, &["code"]).unwrap();
//! catalog.has_unique("Country", &["code"]).unwrap();
//! // Registering the same group again is a no-op.
//! catalog.has_unique("Country", &["code"]).unwrap();
//!
//! let country = TypeName::new("Country").unwrap();
//! assert_eq!(catalog.unique_property_groups(&country).unwrap().len(), 1);
//! ```

use std::collections::HashSet;

use super::schema::{MetadataError, RelationshipDef, SchemaDocument};
use super::{
    EntityTypeDescriptor, ForeignKeyDescriptor, ProviderError, SchemaProvider,
    StateDefinerProperty,
};
use crate::core::types::{PropertyName, TypeName};

/// Entity type as held by the catalog.
#[derive(Debug, Clone)]
struct CatalogEntity {
    name: TypeName,
    keys: Vec<PropertyName>,
    key_store_generated: bool,
    scalars: Vec<PropertyName>,
    unique_groups: Vec<Vec<PropertyName>>,
    state_definers: Vec<PropertyName>,
}

/// In-memory [`SchemaProvider`].
#[derive(Debug, Clone, Default)]
pub struct SchemaCatalog {
    entities: Vec<CatalogEntity>,
    foreign_keys: Vec<ForeignKeyDescriptor>,
}

impl SchemaCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from a parsed schema document.
    ///
    /// Entities and relationships are added first; unique groups and state
    /// definers are then registered with the usual rules.
    pub fn from_document(doc: &SchemaDocument) -> Result<Self, MetadataError> {
        doc.validate()?;
        let mut catalog = Self::new();

        for entity in &doc.entities {
            let scalars: Vec<&str> = entity.properties.iter().map(|p| p.as_str()).collect();
            let keys: Vec<&str> = entity.keys.iter().map(|p| p.as_str()).collect();
            catalog.add_entity(entity.name.as_str(), &keys, entity.key_store_generated, &scalars)?;
        }

        for rel in &doc.relationships {
            catalog.add_relationship(rel.clone())?;
        }

        for entity in &doc.entities {
            for group in &entity.unique {
                let props: Vec<&str> = group.iter().map(|p| p.as_str()).collect();
                catalog.has_unique(entity.name.as_str(), &props)?;
            }
            if !entity.state_definers.is_empty() {
                let props: Vec<&str> = entity.state_definers.iter().map(|p| p.as_str()).collect();
                catalog.has_state_definer(entity.name.as_str(), &props)?;
            }
        }

        Ok(catalog)
    }

    /// Add an entity type.
    ///
    /// Keys are scalar properties too; listing them again in `properties`
    /// is harmless.
    pub fn add_entity(
        &mut self,
        name: &str,
        keys: &[&str],
        key_store_generated: bool,
        properties: &[&str],
    ) -> Result<(), MetadataError> {
        let name = TypeName::new(name)?;
        if self.find(&name).is_some() {
            return Err(MetadataError::InvalidValue(format!(
                "entity '{name}' declared more than once"
            )));
        }
        if keys.is_empty() {
            return Err(MetadataError::InvalidValue(format!(
                "entity '{name}' has no primary key"
            )));
        }

        let keys = to_properties(keys)?;
        let mut scalars = keys.clone();
        for prop in to_properties(properties)? {
            if !scalars.contains(&prop) {
                scalars.push(prop);
            }
        }

        self.entities.push(CatalogEntity {
            name,
            keys,
            key_store_generated,
            scalars,
            unique_groups: Vec::new(),
            state_definers: Vec::new(),
        });
        Ok(())
    }

    /// Add a foreign key between two known entity types.
    pub fn add_relationship(&mut self, rel: RelationshipDef) -> Result<(), MetadataError> {
        for (type_name, keys) in [
            (&rel.principal, &rel.principal_keys),
            (&rel.dependent, &rel.dependent_keys),
        ] {
            let entity = self.find(type_name).ok_or_else(|| {
                MetadataError::InvalidValue(format!("relationship references unknown type '{type_name}'"))
            })?;
            if let Some(missing) = keys.iter().find(|k| !entity.scalars.contains(k)) {
                return Err(MetadataError::InvalidValue(format!(
                    "property '{missing}' is not declared on '{type_name}'"
                )));
            }
        }
        if rel.principal_keys.is_empty() || rel.principal_keys.len() != rel.dependent_keys.len() {
            return Err(MetadataError::InvalidValue(format!(
                "relationship {} -> {} must map the same non-zero number of keys",
                rel.principal, rel.dependent
            )));
        }

        self.foreign_keys.push(ForeignKeyDescriptor {
            principal_type: rel.principal,
            principal_keys: rel.principal_keys,
            dependent_type: rel.dependent,
            dependent_keys: rel.dependent_keys,
            required: rel.required,
            unique: rel.unique,
            principal_navigation: rel.principal_navigation,
            dependent_navigation: rel.dependent_navigation,
        });
        Ok(())
    }

    /// Mark a combination of scalar properties as unique.
    pub fn has_unique(&mut self, type_name: &str, properties: &[&str]) -> Result<(), MetadataError> {
        let type_name = TypeName::new(type_name)?;
        let marked = to_properties(properties)?;
        if marked.is_empty() {
            return Err(MetadataError::InvalidRegistration(format!(
                "unique group for '{type_name}' marks no property"
            )));
        }

        let navigations = self.navigation_names(&type_name);
        let entity = self.find_mut(&type_name)?;
        let inappropriate: Vec<String> = marked
            .iter()
            .filter(|p| navigations.contains(p) || !entity.scalars.contains(p))
            .map(|p| p.to_string())
            .collect();
        if !inappropriate.is_empty() {
            return Err(MetadataError::InvalidRegistration(format!(
                "unique group for '{}' selects inappropriate properties: {}; \
                 only scalar properties can be set unique",
                type_name,
                inappropriate.join(", ")
            )));
        }

        let sorted = sorted_names(&marked);
        let duplicate = entity
            .unique_groups
            .iter()
            .any(|group| sorted_names(group) == sorted);
        if !duplicate {
            entity.unique_groups.push(marked);
        }
        Ok(())
    }

    /// Mark navigations whose targets must have their state defined first.
    pub fn has_state_definer(
        &mut self,
        type_name: &str,
        properties: &[&str],
    ) -> Result<(), MetadataError> {
        let type_name = TypeName::new(type_name)?;
        let marked = to_properties(properties)?;
        if marked.is_empty() {
            return Err(MetadataError::InvalidRegistration(format!(
                "state definer for '{type_name}' marks no property"
            )));
        }

        let navigations = self.navigation_names(&type_name);
        let entity = self.find_mut(&type_name)?;
        let inappropriate: Vec<String> = marked
            .iter()
            .filter(|p| !navigations.contains(p))
            .map(|p| p.to_string())
            .collect();
        if !inappropriate.is_empty() {
            return Err(MetadataError::InvalidRegistration(format!(
                "state definer for '{}' selects inappropriate properties: {}; \
                 only navigation properties can define state",
                type_name,
                inappropriate.join(", ")
            )));
        }

        if marked.iter().any(|p| entity.state_definers.contains(p)) {
            return Ok(());
        }
        entity.state_definers.extend(marked);
        Ok(())
    }

    /// Distinct properties appearing in any unique group of the type.
    pub fn unique_properties(&self, type_name: &TypeName) -> Vec<PropertyName> {
        let mut seen = HashSet::new();
        self.find(type_name)
            .map(|e| {
                e.unique_groups
                    .iter()
                    .flatten()
                    .filter(|p| seen.insert((*p).clone()))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Navigation properties declared on the type.
    fn navigation_names(&self, type_name: &TypeName) -> HashSet<PropertyName> {
        let mut names = HashSet::new();
        for fk in &self.foreign_keys {
            if &fk.principal_type == type_name {
                names.extend(fk.principal_navigation.iter().cloned());
            }
            if &fk.dependent_type == type_name {
                names.extend(fk.dependent_navigation.iter().cloned());
            }
        }
        names
    }

    /// Type a navigation of `type_name` points at.
    fn navigation_target(&self, type_name: &TypeName, property: &PropertyName) -> Option<TypeName> {
        self.foreign_keys.iter().find_map(|fk| {
            if &fk.dependent_type == type_name && fk.dependent_navigation.as_ref() == Some(property)
            {
                Some(fk.principal_type.clone())
            } else if &fk.principal_type == type_name
                && fk.principal_navigation.as_ref() == Some(property)
            {
                Some(fk.dependent_type.clone())
            } else {
                None
            }
        })
    }

    fn find(&self, type_name: &TypeName) -> Option<&CatalogEntity> {
        self.entities.iter().find(|e| &e.name == type_name)
    }

    fn find_mut(&mut self, type_name: &TypeName) -> Result<&mut CatalogEntity, MetadataError> {
        self.entities
            .iter_mut()
            .find(|e| &e.name == type_name)
            .ok_or_else(|| MetadataError::InvalidValue(format!("unknown entity '{type_name}'")))
    }

    fn require(&self, type_name: &TypeName) -> Result<&CatalogEntity, ProviderError> {
        self.find(type_name)
            .ok_or_else(|| ProviderError::MissingType(type_name.to_string()))
    }
}

impl SchemaProvider for SchemaCatalog {
    fn entity_types(&self) -> Result<Vec<EntityTypeDescriptor>, ProviderError> {
        Ok(self
            .entities
            .iter()
            .map(|e| EntityTypeDescriptor {
                name: e.name.clone(),
                properties: e.scalars.clone(),
            })
            .collect())
    }

    fn relationship_edges(
        &self,
        type_name: &TypeName,
    ) -> Result<Vec<ForeignKeyDescriptor>, ProviderError> {
        self.require(type_name)?;
        Ok(self
            .foreign_keys
            .iter()
            .filter(|fk| fk.involves(type_name))
            .cloned()
            .collect())
    }

    fn unique_property_groups(
        &self,
        type_name: &TypeName,
    ) -> Result<Vec<Vec<PropertyName>>, ProviderError> {
        Ok(self.require(type_name)?.unique_groups.clone())
    }

    fn state_definer_properties(
        &self,
        type_name: &TypeName,
    ) -> Result<Vec<StateDefinerProperty>, ProviderError> {
        let entity = self.require(type_name)?;
        entity
            .state_definers
            .iter()
            .map(|property| {
                let target_type = self.navigation_target(type_name, property).ok_or_else(|| {
                    ProviderError::Failed(format!(
                        "state definer '{type_name}.{property}' is not a navigation"
                    ))
                })?;
                Ok(StateDefinerProperty {
                    property: property.clone(),
                    target_type,
                })
            })
            .collect()
    }

    fn is_key_store_generated(&self, type_name: &TypeName) -> Result<bool, ProviderError> {
        Ok(self.require(type_name)?.key_store_generated)
    }

    fn primary_key_names(&self, type_name: &TypeName) -> Result<Vec<PropertyName>, ProviderError> {
        Ok(self.require(type_name)?.keys.clone())
    }
}

fn to_properties(names: &[&str]) -> Result<Vec<PropertyName>, MetadataError> {
    names
        .iter()
        .map(|n| PropertyName::new(*n).map_err(MetadataError::from))
        .collect()
}

fn sorted_names(props: &[PropertyName]) -> Vec<&str> {
    let mut names: Vec<&str> = props.iter().map(|p| p.as_str()).collect();
    names.sort_unstable();
    names
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

    fn catalog() -> SchemaCatalog {
        let mut catalog = SchemaCatalog::new();
        catalog
            .add_entity("Person", &["id"], true, &["first", "last", "passport_id"])
            .unwrap();
        catalog
            .add_entity("Passport", &["id"], true, &["number"])
            .unwrap();
        catalog
            .add_relationship(RelationshipDef {
                principal: name("Passport"),
                principal_keys: vec![prop("id")],
                dependent: name("Person"),
                dependent_keys: vec![prop("passport_id")],
                required: false,
                unique: true,
                principal_navigation: Some(prop("holder")),
                dependent_navigation: Some(prop("passport")),
            })
            .unwrap();
        catalog
    }

    #[test]
    fn unique_group_registered_once_in_any_order() {
        let mut catalog = catalog();
        catalog.has_unique("Person", &["first", "last"]).unwrap();
        catalog.has_unique("Person", &["last", "first"]).unwrap();

        let groups = catalog.unique_property_groups(&name("Person")).unwrap();
        assert_eq!(groups.len(), 1);
    }

    #[test]
    fn unique_group_must_not_be_empty() {
        let mut catalog = catalog();
        let result = catalog.has_unique("Person", &[]);
        assert!(matches!(result, Err(MetadataError::InvalidRegistration(_))));
    }

    #[test]
    fn unique_group_rejects_navigation() {
        let mut catalog = catalog();
        let result = catalog.has_unique("Person", &["passport"]);
        assert!(matches!(result, Err(MetadataError::InvalidRegistration(_))));
    }

    #[test]
    fn unique_group_rejects_unknown_property() {
        let mut catalog = catalog();
        assert!(catalog.has_unique("Person", &["age"]).is_err());
    }

    #[test]
    fn unique_properties_are_distinct() {
        let mut catalog = catalog();
        catalog.has_unique("Person", &["first", "last"]).unwrap();
        catalog.has_unique("Person", &["last", "passport_id"]).unwrap();

        let props = catalog.unique_properties(&name("Person"));
        assert_eq!(props, vec![prop("first"), prop("last"), prop("passport_id")]);
    }

    #[test]
    fn state_definer_resolves_target_type() {
        let mut catalog = catalog();
        catalog.has_state_definer("Person", &["passport"]).unwrap();

        let definers = catalog.state_definer_properties(&name("Person")).unwrap();
        assert_eq!(definers.len(), 1);
        assert_eq!(definers[0].target_type, name("Passport"));
    }

    #[test]
    fn state_definer_rejects_scalar() {
        let mut catalog = catalog();
        let result = catalog.has_state_definer("Person", &["first"]);
        assert!(matches!(result, Err(MetadataError::InvalidRegistration(_))));
    }

    #[test]
    fn state_definer_already_added_is_ignored() {
        let mut catalog = catalog();
        catalog.has_state_definer("Person", &["passport"]).unwrap();
        catalog.has_state_definer("Person", &["passport"]).unwrap();

        let definers = catalog.state_definer_properties(&name("Person")).unwrap();
        assert_eq!(definers.len(), 1);
    }

    #[test]
    fn relationship_edges_include_both_sides() {
        let catalog = catalog();
        assert_eq!(catalog.relationship_edges(&name("Person")).unwrap().len(), 1);
        assert_eq!(catalog.relationship_edges(&name("Passport")).unwrap().len(), 1);
    }

    #[test]
    fn unknown_type_is_provider_error() {
        let catalog = catalog();
        let result = catalog.primary_key_names(&name("Ghost"));
        assert_eq!(result, Err(ProviderError::MissingType("Ghost".into())));
    }

    #[test]
    fn duplicate_entity_rejected() {
        let mut catalog = catalog();
        assert!(catalog.add_entity("Person", &["id"], false, &[]).is_err());
    }

    #[test]
    fn keys_count_as_scalars() {
        let catalog = catalog();
        let types = catalog.entity_types().unwrap();
        let passport = types.iter().find(|t| t.name == name("Passport")).unwrap();
        assert_eq!(passport.properties, vec![prop("id"), prop("number")]);
    }
}
