//! Configuration for the orchestration engine

use crate::error::{EngineError, Result};
use council_core::AgentRole;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Interaction style the orchestrator runs under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyKind {
    /// All agents concurrently, no shared context
    Parallel,
    /// Fixed role order, each agent sees its predecessors' reviews
    SequentialDebate,
    /// Parallel round, then one bounded re-ask of dissenting roles
    ConsensusVoting,
}

impl Default for PolicyKind {
    fn default() -> Self {
        Self::Parallel
    }
}

/// Designated role whose caution caps the aggregated rating
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VetoRule {
    pub role: AgentRole,
    /// Maximum aggregated rating while the veto role rates at or below it
    pub cap: f64,
}

/// Configuration for an orchestrator instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Interaction policy to run
    pub policy: PolicyKind,

    /// Simultaneous agent calls within a concurrent group
    pub max_parallel_agents: usize,

    /// Timeout applied to every individual agent call
    pub per_call_timeout: Duration,

    /// Hard bound on total run time
    pub overall_deadline: Duration,

    /// Retries per agent call after the first attempt
    pub retry_count: u32,

    /// Initial backoff between retries (doubles per attempt)
    pub retry_backoff_base: Duration,

    /// Rating variance above which the reviews count as disagreeing
    pub disagreement_threshold: f64,

    /// Extra rounds ConsensusVoting may schedule for dissenting roles
    pub max_reask_rounds: u32,

    /// Per-role aggregation weights; unlisted roles weigh 1.0
    pub role_weights: HashMap<AgentRole, f64>,

    /// Optional veto rule applied by the aggregator
    pub veto: Option<VetoRule>,

    /// Minimum successful roles to conclude; defaults to all required
    pub quorum: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            policy: PolicyKind::Parallel,
            max_parallel_agents: 4,
            per_call_timeout: Duration::from_secs(30),
            overall_deadline: Duration::from_secs(120),
            retry_count: 2,
            retry_backoff_base: Duration::from_millis(200),
            disagreement_threshold: 0.04,
            max_reask_rounds: 1,
            role_weights: HashMap::new(),
            veto: None,
            quorum: None,
        }
    }
}

impl EngineConfig {
    /// Create a new configuration builder
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_parallel_agents == 0 {
            return Err(EngineError::Config(
                "max_parallel_agents must be greater than 0".to_string(),
            ));
        }
        if self.disagreement_threshold < 0.0 {
            return Err(EngineError::Config(
                "disagreement_threshold must be non-negative".to_string(),
            ));
        }
        if let Some(veto) = &self.veto {
            if !(0.0..=1.0).contains(&veto.cap) {
                return Err(EngineError::Config(format!(
                    "veto cap {} outside [0, 1]",
                    veto.cap
                )));
            }
        }
        if let Some(weight) = self.role_weights.values().find(|w| **w < 0.0) {
            return Err(EngineError::Config(format!(
                "negative role weight {weight}"
            )));
        }
        if self.quorum == Some(0) {
            return Err(EngineError::Config(
                "quorum must be greater than 0 when set".to_string(),
            ));
        }
        Ok(())
    }

    /// Effective quorum for a run with `required` roles
    pub fn quorum_for(&self, required: usize) -> usize {
        self.quorum.unwrap_or(required).min(required)
    }

    /// Aggregation weight for one role (1.0 unless configured)
    pub fn weight_for(&self, role: AgentRole) -> f64 {
        self.role_weights.get(&role).copied().unwrap_or(1.0)
    }
}

/// Builder for EngineConfig
#[derive(Debug, Default)]
pub struct EngineConfigBuilder {
    policy: Option<PolicyKind>,
    max_parallel_agents: Option<usize>,
    per_call_timeout: Option<Duration>,
    overall_deadline: Option<Duration>,
    retry_count: Option<u32>,
    retry_backoff_base: Option<Duration>,
    disagreement_threshold: Option<f64>,
    max_reask_rounds: Option<u32>,
    role_weights: HashMap<AgentRole, f64>,
    veto: Option<VetoRule>,
    quorum: Option<usize>,
}

impl EngineConfigBuilder {
    /// Set the interaction policy
    pub fn policy(mut self, policy: PolicyKind) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Set the concurrent-call cap
    pub fn max_parallel_agents(mut self, cap: usize) -> Self {
        self.max_parallel_agents = Some(cap);
        self
    }

    /// Set the per-call timeout
    pub fn per_call_timeout(mut self, timeout: Duration) -> Self {
        self.per_call_timeout = Some(timeout);
        self
    }

    /// Set the overall run deadline
    pub fn overall_deadline(mut self, deadline: Duration) -> Self {
        self.overall_deadline = Some(deadline);
        self
    }

    /// Set the retry count
    pub fn retry_count(mut self, retries: u32) -> Self {
        self.retry_count = Some(retries);
        self
    }

    /// Set the initial retry backoff
    pub fn retry_backoff_base(mut self, base: Duration) -> Self {
        self.retry_backoff_base = Some(base);
        self
    }

    /// Set the disagreement threshold (rating variance)
    pub fn disagreement_threshold(mut self, threshold: f64) -> Self {
        self.disagreement_threshold = Some(threshold);
        self
    }

    /// Set the re-ask round budget
    pub fn max_reask_rounds(mut self, rounds: u32) -> Self {
        self.max_reask_rounds = Some(rounds);
        self
    }

    /// Set one role's aggregation weight
    pub fn role_weight(mut self, role: AgentRole, weight: f64) -> Self {
        self.role_weights.insert(role, weight);
        self
    }

    /// Set the veto rule
    pub fn veto(mut self, role: AgentRole, cap: f64) -> Self {
        self.veto = Some(VetoRule { role, cap });
        self
    }

    /// Set the quorum
    pub fn quorum(mut self, quorum: usize) -> Self {
        self.quorum = Some(quorum);
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<EngineConfig> {
        let defaults = EngineConfig::default();

        let config = EngineConfig {
            policy: self.policy.unwrap_or(defaults.policy),
            max_parallel_agents: self.max_parallel_agents.unwrap_or(defaults.max_parallel_agents),
            per_call_timeout: self.per_call_timeout.unwrap_or(defaults.per_call_timeout),
            overall_deadline: self.overall_deadline.unwrap_or(defaults.overall_deadline),
            retry_count: self.retry_count.unwrap_or(defaults.retry_count),
            retry_backoff_base: self.retry_backoff_base.unwrap_or(defaults.retry_backoff_base),
            disagreement_threshold: self
                .disagreement_threshold
                .unwrap_or(defaults.disagreement_threshold),
            max_reask_rounds: self.max_reask_rounds.unwrap_or(defaults.max_reask_rounds),
            role_weights: self.role_weights,
            veto: self.veto,
            quorum: self.quorum,
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.policy, PolicyKind::Parallel);
        assert_eq!(config.max_parallel_agents, 4);
        assert_eq!(config.retry_count, 2);
        assert_eq!(config.max_reask_rounds, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = EngineConfig::builder()
            .policy(PolicyKind::ConsensusVoting)
            .retry_count(5)
            .veto(AgentRole::Risk, 0.5)
            .role_weight(AgentRole::Technical, 2.0)
            .quorum(2)
            .build()
            .unwrap();

        assert_eq!(config.policy, PolicyKind::ConsensusVoting);
        assert_eq!(config.retry_count, 5);
        assert_eq!(config.veto.as_ref().unwrap().role, AgentRole::Risk);
        assert_eq!(config.weight_for(AgentRole::Technical), 2.0);
        assert_eq!(config.weight_for(AgentRole::News), 1.0);
    }

    #[test]
    fn test_validation_rejects_zero_parallelism() {
        let result = EngineConfig::builder().max_parallel_agents(0).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_rejects_bad_veto_cap() {
        let result = EngineConfig::builder().veto(AgentRole::Risk, 1.5).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_quorum_for_caps_at_required() {
        let config = EngineConfig::builder().quorum(5).build().unwrap();
        assert_eq!(config.quorum_for(3), 3);

        let default = EngineConfig::default();
        assert_eq!(default.quorum_for(3), 3);

        let lower = EngineConfig::builder().quorum(2).build().unwrap();
        assert_eq!(lower.quorum_for(3), 2);
    }
}
