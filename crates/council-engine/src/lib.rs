//! Orchestration engine for multi-analyst stock review aggregation
//!
//! This crate coordinates heterogeneous, slow, unreliable agent calls
//! under a configurable interaction policy, funnels their results into
//! the `Analysis` aggregate through a single synchronization point, and
//! deterministically merges the collected reviews into one decision.
//!
//! # Architecture
//!
//! - [`config::EngineConfig`]: policy selection, parallelism cap,
//!   timeouts, retry budget, weights, veto, quorum.
//! - [`policy::InteractionPolicy`]: closed set of interaction variants
//!   (parallel, sequential debate, consensus voting) planning rounds.
//! - [`retry::RetryPolicy`]: exponential backoff around each agent call.
//! - [`orchestrator::Orchestrator`]: fan-out / fan-in driver and single
//!   writer of the aggregate.
//! - [`aggregator::aggregate`]: pure weighted merge with veto support.
//! - [`memory::InMemoryAnalysisRepository`]: reference repository with
//!   optimistic concurrency.
//! - [`service::AnalysisService`]: use-case boundary for the application
//!   layer.
//!
//! # Example
//!
//! ```rust,ignore
//! use council_engine::{AnalysisService, EngineConfig, InMemoryAnalysisRepository};
//! use council_core::{AgentRole, DataBundle, StockSnapshot};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example(agents: Arc<dyn council_core::AgentPort>) -> anyhow::Result<()> {
//! let repository = Arc::new(InMemoryAnalysisRepository::new());
//! let service = AnalysisService::new(agents, repository, EngineConfig::default())?;
//!
//! let id = service.request_analysis(StockSnapshot::new("AAPL", "Apple Inc.")).await?;
//! let report = service
//!     .run_analysis(id, &AgentRole::ALL, DataBundle::default(), CancellationToken::new())
//!     .await?;
//! println!("{:?}", report.status);
//! # Ok(())
//! # }
//! ```

pub mod aggregator;
pub mod config;
pub mod error;
pub mod memory;
pub mod orchestrator;
pub mod policy;
pub mod retry;
pub mod service;

pub use aggregator::aggregate;
pub use config::{EngineConfig, EngineConfigBuilder, PolicyKind, VetoRule};
pub use error::{EngineError, Result};
pub use memory::InMemoryAnalysisRepository;
pub use orchestrator::{Orchestrator, RoleOutcome, RunReport};
pub use policy::{InteractionPolicy, Round, RoundMode};
pub use retry::RetryPolicy;
pub use service::AnalysisService;
