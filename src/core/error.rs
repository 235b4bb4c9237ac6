//! core::error
//!
//! Errors raised by the graph engine.
//!
//! All errors are raised synchronously at the call that detects them.
//! Failures of the schema provider are carried unmodified as the source of
//! [`GraphError::Provider`].

use thiserror::Error;

use super::metadata::ProviderError;
use super::types::TypeError;

/// Errors from schema resolution and graph traversal.
#[derive(Debug, Error)]
pub enum GraphError {
    /// An empty name or otherwise unusable argument was supplied.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The type is not part of the session's schema.
    #[error("unknown entity type: {0}")]
    UnknownType(String),

    /// Opt-in diagnostic about a schema shape the engine cannot fully serve.
    #[error("advisory violation:\n{0}")]
    AdvisoryViolation(String),

    /// Principal relationships between types form a cycle.
    #[error("principal dependency cycle: {}", path.join(" -> "))]
    DependencyCycle {
        /// Types on the cycle, first type repeated at the end.
        path: Vec<String>,
    },

    /// An object id that does not belong to the graph.
    #[error("unknown object: #{0}")]
    UnknownObject(usize),

    /// The schema provider failed.
    #[error("schema provider failed")]
    Provider(#[source] ProviderError),
}

impl From<TypeError> for GraphError {
    fn from(err: TypeError) -> Self {
        GraphError::InvalidArgument(err.to_string())
    }
}

impl From<ProviderError> for GraphError {
    fn from(err: ProviderError) -> Self {
        GraphError::Provider(err)
    }
}
