//! entitygraph - dependency ordering and state definition for entity graphs
//!
//! Given a schema of entity types connected by foreign keys, entitygraph
//! works out how many principals each type depends on, where a shared key
//! ultimately comes from, and in which order a batch of related objects has
//! to be inserted, updated or deleted. It also decides the state of every
//! object in such a batch.
//!
//! # Architecture
//!
//! - [`core`] - Schema model, memoized per-schema analysis, configuration
//! - [`graph`] - Runtime object graphs, traversal and state definition
//! - [`cli`] - Diagnostic command-line interface
//! - [`ui`] - Output formatting
//!
//! # Correctness Invariants
//!
//! 1. Every principal is processed before its dependents
//! 2. Every object appears at most once in a plan, by reference identity
//! 3. Schema analysis is a pure function of the schema and cached per session
//! 4. Principal cycles are reported as errors, never followed indefinitely

pub mod cli;
pub mod core;
pub mod graph;
pub mod ui;
