//! In-memory repository with optimistic concurrency
//!
//! Reference implementation of `AnalysisRepository`, used by tests and the
//! example wiring. Real deployments substitute a database-backed adapter.

use async_trait::async_trait;
use council_core::{Analysis, AnalysisId, AnalysisRepository, RepositoryError};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// Map-backed aggregate store
#[derive(Debug, Default)]
pub struct InMemoryAnalysisRepository {
    store: RwLock<HashMap<AnalysisId, Analysis>>,
}

impl InMemoryAnalysisRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }
}

#[async_trait]
impl AnalysisRepository for InMemoryAnalysisRepository {
    async fn save(&self, analysis: &mut Analysis) -> Result<(), RepositoryError> {
        let mut store = self.store.write().await;

        // Optimistic check: the caller must hold the stored version
        if let Some(stored) = store.get(&analysis.id()) {
            if stored.version() != analysis.version() {
                return Err(RepositoryError::Conflict {
                    id: analysis.id(),
                    expected: analysis.version(),
                    stored: stored.version(),
                });
            }
        }

        let version = analysis.bump_version();
        store.insert(analysis.id(), analysis.clone());
        debug!(analysis_id = %analysis.id(), version, "analysis persisted");
        Ok(())
    }

    async fn load(&self, id: AnalysisId) -> Result<Analysis, RepositoryError> {
        self.store
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use council_core::StockSnapshot;

    fn fresh() -> Analysis {
        Analysis::new(StockSnapshot::new("AAPL", "Apple Inc."))
    }

    #[tokio::test]
    async fn test_save_then_load_round_trip_bumps_version_once() {
        let repo = InMemoryAnalysisRepository::new();
        let mut analysis = fresh();
        let before = analysis.version();

        repo.save(&mut analysis).await.unwrap();
        let loaded = repo.load(analysis.id()).await.unwrap();

        assert_eq!(loaded, analysis);
        assert_eq!(loaded.version(), before + 1);
    }

    #[tokio::test]
    async fn test_load_missing_is_not_found() {
        let repo = InMemoryAnalysisRepository::new();
        let id = AnalysisId::new();
        assert_eq!(
            repo.load(id).await.unwrap_err(),
            RepositoryError::NotFound(id)
        );
    }

    #[tokio::test]
    async fn test_stale_writer_gets_conflict() {
        let repo = InMemoryAnalysisRepository::new();
        let mut analysis = fresh();
        repo.save(&mut analysis).await.unwrap();

        let mut writer_a = repo.load(analysis.id()).await.unwrap();
        let mut writer_b = repo.load(analysis.id()).await.unwrap();

        repo.save(&mut writer_a).await.unwrap();

        let err = repo.save(&mut writer_b).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict { .. }));

        // Reload-and-retry resolves the conflict
        let mut retried = repo.load(analysis.id()).await.unwrap();
        repo.save(&mut retried).await.unwrap();
        assert_eq!(retried.version(), 3);
    }

    #[tokio::test]
    async fn test_consecutive_saves_by_same_holder_succeed() {
        let repo = InMemoryAnalysisRepository::new();
        let mut analysis = fresh();

        repo.save(&mut analysis).await.unwrap();
        repo.save(&mut analysis).await.unwrap();
        assert_eq!(analysis.version(), 2);
    }
}
