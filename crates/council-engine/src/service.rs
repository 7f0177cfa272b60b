//! Use-case boundary consumed by the application layer

use crate::config::EngineConfig;
use crate::error::Result;
use crate::orchestrator::{Orchestrator, RunReport};
use council_core::{
    AgentPort, AgentRole, Analysis, AnalysisId, AnalysisRepository, DataBundle, StockSnapshot,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Thin service wiring the repository and the orchestrator together
///
/// The excluded application layer (UI, report rendering) talks to the
/// engine exclusively through this boundary.
pub struct AnalysisService {
    repository: Arc<dyn AnalysisRepository>,
    orchestrator: Orchestrator,
}

impl AnalysisService {
    pub fn new(
        agents: Arc<dyn AgentPort>,
        repository: Arc<dyn AnalysisRepository>,
        config: EngineConfig,
    ) -> Result<Self> {
        let orchestrator = Orchestrator::new(agents, repository.clone(), config)?;
        Ok(Self {
            repository,
            orchestrator,
        })
    }

    /// Register a new analysis for the given snapshot and return its id
    pub async fn request_analysis(&self, snapshot: StockSnapshot) -> Result<AnalysisId> {
        let mut analysis = Analysis::new(snapshot);
        self.repository.save(&mut analysis).await?;
        info!(analysis_id = %analysis.id(), symbol = %analysis.snapshot().symbol, "analysis requested");
        Ok(analysis.id())
    }

    /// Read-only view of a stored analysis
    pub async fn get_analysis(&self, id: AnalysisId) -> Result<Analysis> {
        Ok(self.repository.load(id).await?)
    }

    /// Execute a previously requested analysis with the enabled roles
    pub async fn run_analysis(
        &self,
        id: AnalysisId,
        enabled_roles: &[AgentRole],
        bundle: DataBundle,
        cancel: CancellationToken,
    ) -> Result<RunReport> {
        let analysis = self.repository.load(id).await?;
        self.orchestrator
            .run(analysis, enabled_roles, &bundle, cancel)
            .await
    }
}
