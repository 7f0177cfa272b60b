//! Error types for council-engine

use council_core::{DomainError, RepositoryError};
use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that escape the engine to its caller
///
/// Per-agent failures never appear here; they are absorbed into the
/// aggregate as failed reviews. Only contract violations propagate.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration rejected by validation
    #[error("configuration error: {0}")]
    Config(String),

    /// Aggregate contract violation (invalid transition, duplicate review)
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Persistence failure, including optimistic concurrency conflicts
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
