//! Error types for council-core

use crate::analysis::AnalysisStatus;
use crate::review::AgentRole;
use thiserror::Error;

/// Result type alias for domain operations
pub type Result<T> = std::result::Result<T, DomainError>;

/// Contract errors raised by the `Analysis` aggregate
///
/// These indicate a caller bug or a stale view of the aggregate and are
/// always surfaced, never absorbed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    /// The requested lifecycle change is not legal from the current status
    #[error("invalid transition: cannot {action} while {from:?}")]
    InvalidTransition {
        from: AnalysisStatus,
        action: &'static str,
    },

    /// A review for this role has already been recorded
    #[error("duplicate review for role {0}")]
    DuplicateReview(AgentRole),

    /// A replacement was requested for a role with no prior review
    #[error("no existing review for role {0} to replace")]
    MissingReview(AgentRole),

    /// Conclusion requested with fewer successful roles than the quorum
    #[error("quorum not met: {successful} successful of {quorum} required")]
    QuorumNotMet { successful: usize, quorum: usize },
}
