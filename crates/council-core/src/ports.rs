//! Port traits implemented by external collaborators
//!
//! The engine depends on these contracts only; concrete adapters (LLM
//! providers, databases) live outside this workspace's scope.

use crate::analysis::Analysis;
use crate::review::{AgentReview, AgentRole};
use crate::snapshot::{AnalysisId, DataBundle};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Failure modes of a single agent invocation
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AgentError {
    /// Retryable: network trouble, rate limiting, provider timeout
    #[error("transient provider error: {0}")]
    Transient(String),

    /// Non-retryable: malformed input or a provider policy violation
    #[error("permanent validation error: {0}")]
    Permanent(String),
}

impl AgentError {
    pub fn is_transient(&self) -> bool {
        matches!(self, AgentError::Transient(_))
    }
}

/// Invokes one analyst capability
///
/// Implementations must be safe to call repeatedly for the same inputs
/// (retries happen) and must not mutate any state observable by this
/// system outside their returned review.
#[async_trait]
pub trait AgentPort: Send + Sync {
    /// Produce a review for `role` given the data bundle and any prior
    /// reviews the interaction policy chose to share.
    async fn invoke(
        &self,
        role: AgentRole,
        bundle: &DataBundle,
        prior_context: &[AgentReview],
        timeout: Duration,
    ) -> Result<AgentReview, AgentError>;
}

/// Failure modes of aggregate persistence
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RepositoryError {
    /// Optimistic concurrency check failed; reload and retry the mutation
    #[error("concurrency conflict on {id}: expected version {expected}, stored {stored}")]
    Conflict {
        id: AnalysisId,
        expected: u64,
        stored: u64,
    },

    /// No aggregate stored under this identifier
    #[error("analysis {0} not found")]
    NotFound(AnalysisId),
}

/// Persists and loads the `Analysis` aggregate with optimistic concurrency
///
/// `save` verifies the stored version matches the aggregate's version,
/// then bumps it by exactly one. A mismatch surfaces as
/// [`RepositoryError::Conflict`] and never overwrites silently.
#[async_trait]
pub trait AnalysisRepository: Send + Sync {
    async fn save(&self, analysis: &mut Analysis) -> Result<(), RepositoryError>;

    async fn load(&self, id: AnalysisId) -> Result<Analysis, RepositoryError>;
}
