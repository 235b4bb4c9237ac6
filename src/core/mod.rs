//! core
//!
//! Schema-level model of the engine.
//!
//! # Modules
//!
//! - [`types`] - Strong types: TypeName, PropertyName, Multiplicity, etc.
//! - [`error`] - Engine error type
//! - [`metadata`] - Schema provider capability, schema document, catalog
//! - [`relationship`] - Normalized relationship edges
//! - [`navigation`] - Per-type navigation detail
//! - [`session`] - Schema session owning the memo tables
//! - [`origin`] - Foreign-key origin resolution
//! - [`principal`] - Principal-dependency counting
//! - [`graph`] - Type-level dependency graph and processing order
//! - [`verify`] - Cycle and advisory checks
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid names at construction
//! - Schema documents are strict and self-describing
//! - Everything derived from the schema is computed once per session

pub mod config;
pub mod error;
pub mod graph;
pub mod metadata;
pub mod navigation;
pub mod origin;
pub mod principal;
pub mod relationship;
pub mod session;
pub mod types;
pub mod verify;
