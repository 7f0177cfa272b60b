//! Domain model for multi-analyst stock review aggregation
//!
//! This crate defines the consistency-bearing `Analysis` aggregate, the
//! value objects that flow through an analysis run, the domain error
//! taxonomy, and the port traits implemented by external collaborators
//! (agent invocation and persistence).

pub mod analysis;
pub mod decision;
pub mod error;
pub mod ports;
pub mod review;
pub mod snapshot;

pub use analysis::{Analysis, AnalysisStatus};
pub use decision::FinalDecision;
pub use error::{DomainError, Result};
pub use ports::{AgentError, AgentPort, AnalysisRepository, RepositoryError};
pub use review::{AgentReview, AgentRole, ReviewContent, ReviewOutcome};
pub use snapshot::{AnalysisId, DataBundle, StockSnapshot};
