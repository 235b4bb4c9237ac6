//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`TypeName`] - Validated entity type name
//! - [`PropertyName`] - Validated property (scalar, key or navigation) name
//! - [`Multiplicity`] - Multiplicity of one relationship end
//! - [`NavigationDirection`] - Which side of a relationship a navigation sits on
//! - [`SchemaFingerprint`] - Hash of a normalized schema
//!
//! # Validation
//!
//! Names are validated at construction time. An empty name cannot be
//! represented, so every resolver that accepts a name fails at the call
//! that received it rather than somewhere deeper in a traversal.
//!
//! # Examples
//!
//! ```
//! use entitygraph::core::types::{PropertyName, TypeName};
//!
//! let order = TypeName::new("Order").unwrap();
//! let key = PropertyName::new("CustomerId").unwrap();
//! assert_eq!(order.as_str(), "Order");
//! assert_eq!(key.as_str(), "CustomerId");
//!
//! assert!(TypeName::new("").is_err());
//! assert!(PropertyName::new("  ").is_err());
//! ```

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid type name: {0}")]
    InvalidTypeName(String),

    #[error("invalid property name: {0}")]
    InvalidPropertyName(String),
}

/// Shared validation for type and property names.
///
/// Names must be non-blank and free of whitespace and control characters.
fn validate_name(name: &str) -> Result<(), &'static str> {
    if name.trim().is_empty() {
        return Err("name cannot be empty");
    }
    if name.chars().any(|c| c.is_whitespace()) {
        return Err("name cannot contain whitespace");
    }
    if name.chars().any(|c| c.is_control()) {
        return Err("name cannot contain control characters");
    }
    Ok(())
}

/// A validated entity type name.
///
/// # Example
///
/// ```
/// use entitygraph::core::types::TypeName;
///
/// let name = TypeName::new("OrderLine").unwrap();
/// assert_eq!(name.to_string(), "OrderLine");
///
/// assert!(TypeName::new("").is_err());
/// assert!(TypeName::new("Order Line").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TypeName(String);

impl TypeName {
    /// Create a new validated type name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidTypeName` if the name is empty or malformed.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        validate_name(&name)
            .map_err(|reason| TypeError::InvalidTypeName(format!("'{name}': {reason}")))?;
        Ok(Self(name))
    }

    /// Get the type name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TypeName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<TypeName> for String {
    fn from(name: TypeName) -> Self {
        name.0
    }
}

impl AsRef<str> for TypeName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TypeName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated property name.
///
/// Used for scalar properties, key properties and navigation properties alike.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PropertyName(String);

impl PropertyName {
    /// Create a new validated property name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidPropertyName` if the name is empty or malformed.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        validate_name(&name)
            .map_err(|reason| TypeError::InvalidPropertyName(format!("'{name}': {reason}")))?;
        Ok(Self(name))
    }

    /// Get the property name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PropertyName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<PropertyName> for String {
    fn from(name: PropertyName) -> Self {
        name.0
    }
}

impl AsRef<str> for PropertyName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PropertyName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Multiplicity of one end of a relationship.
///
/// A `Many` end can never be the origin of a foreign key; only
/// `One`/`ZeroOrOne` principal ends can.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Multiplicity {
    /// Lower bound zero, upper bound one.
    ZeroOrOne,
    /// Lower and upper bound one.
    One,
    /// Lower bound zero, no upper bound.
    Many,
}

impl Multiplicity {
    /// Multiplicity of a navigation end.
    ///
    /// A collection-valued end is `Many`. A single-valued end is `One` when
    /// the foreign key is required or the navigation sits on the dependent,
    /// and `ZeroOrOne` otherwise.
    ///
    /// # Example
    ///
    /// ```
    /// use entitygraph::core::types::Multiplicity;
    ///
    /// assert_eq!(Multiplicity::of_navigation(true, true, false), Multiplicity::Many);
    /// assert_eq!(Multiplicity::of_navigation(false, false, true), Multiplicity::One);
    /// assert_eq!(Multiplicity::of_navigation(false, false, false), Multiplicity::ZeroOrOne);
    /// ```
    pub fn of_navigation(is_collection: bool, required: bool, on_dependent: bool) -> Self {
        if is_collection {
            Multiplicity::Many
        } else if required || on_dependent {
            Multiplicity::One
        } else {
            Multiplicity::ZeroOrOne
        }
    }

    /// Whether this end refers to at most one entity.
    pub fn is_single(self) -> bool {
        !matches!(self, Multiplicity::Many)
    }
}

impl std::fmt::Display for Multiplicity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Multiplicity::ZeroOrOne => "0..1",
            Multiplicity::One => "1",
            Multiplicity::Many => "*",
        };
        write!(f, "{s}")
    }
}

/// Which side of a relationship a navigation or edge is seen from.
///
/// `From` means the owning type is the dependent and the navigation points
/// at its principal (a parent). `To` means the owning type is the principal
/// and the navigation points at dependents (children).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationDirection {
    From,
    To,
}

impl std::fmt::Display for NavigationDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NavigationDirection::From => write!(f, "from"),
            NavigationDirection::To => write!(f, "to"),
        }
    }
}

/// Fingerprint of a normalized schema.
///
/// Identifies the schema a session's caches were computed against.
///
/// # Example
///
/// ```
/// use entitygraph::core::types::SchemaFingerprint;
///
/// let a = SchemaFingerprint::compute(["type Order", "type Customer"]);
/// let b = SchemaFingerprint::compute(["type Customer", "type Order"]);
/// assert_eq!(a, b);
/// assert_eq!(a.as_str().len(), 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SchemaFingerprint(String);

impl SchemaFingerprint {
    /// Compute a fingerprint from canonical schema lines.
    ///
    /// Lines are sorted before hashing so input order does not matter.
    pub fn compute<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut sorted: Vec<String> = lines.into_iter().map(|l| l.as_ref().to_string()).collect();
        sorted.sort();

        let mut hasher = Sha256::new();
        for line in sorted {
            hasher.update(line.as_bytes());
            hasher.update(b"\n");
        }

        Self(hex::encode(hasher.finalize()))
    }

    /// Get the fingerprint as a hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form for display.
    pub fn short(&self, len: usize) -> &str {
        &self.0[..len.min(self.0.len())]
    }
}

impl std::fmt::Display for SchemaFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
