//! Interaction policies governing call ordering and context sharing
//!
//! Policies are a closed set of tagged variants with one fixed operation
//! set: required roles, round planning, quorum, and disagreement. New
//! interaction styles are added as new variants, not via runtime lookup.

use council_core::{AgentReview, AgentRole};

/// How the calls of one round are scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundMode {
    /// All calls in flight together, capped by `max_parallel_agents`
    Concurrent,
    /// Strictly one call at a time, later calls see earlier output
    Sequential,
}

/// One planned group of agent calls
#[derive(Debug, Clone, PartialEq)]
pub struct Round {
    pub mode: RoundMode,
    pub roles: Vec<AgentRole>,
    /// Whether callees receive the successful reviews collected so far
    pub share_prior: bool,
    /// Whether results replace already-recorded reviews (re-ask)
    pub replaces_existing: bool,
    /// Disagreement summary injected into the data bundle, if any
    pub note: Option<String>,
}

/// Pluggable strategy for agent interaction
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionPolicy {
    /// Fan out to every role at once; no context is shared, so the result
    /// must be independent of completion order
    ParallelIndependent,

    /// Ask roles one by one in a fixed order; each agent receives the
    /// successful reviews of all predecessors, and a failed predecessor
    /// does not block later agents
    SequentialDebate { order: Vec<AgentRole> },

    /// Parallel first round; if rating variance exceeds the threshold,
    /// one bounded re-ask round is scheduled for the dissenting roles
    ConsensusVoting {
        disagreement_threshold: f64,
        max_reask_rounds: u32,
    },
}

impl InteractionPolicy {
    /// Build the policy named by the configuration for the enabled roles
    pub fn from_config(config: &crate::config::EngineConfig, enabled: &[AgentRole]) -> Self {
        match config.policy {
            crate::config::PolicyKind::Parallel => Self::ParallelIndependent,
            crate::config::PolicyKind::SequentialDebate => Self::SequentialDebate {
                order: canonical_roles(enabled),
            },
            crate::config::PolicyKind::ConsensusVoting => Self::ConsensusVoting {
                disagreement_threshold: config.disagreement_threshold,
                max_reask_rounds: config.max_reask_rounds,
            },
        }
    }

    /// Roles this policy will ask, in canonical order
    pub fn required_roles(&self, enabled: &[AgentRole]) -> Vec<AgentRole> {
        match self {
            Self::SequentialDebate { order } => order.clone(),
            _ => canonical_roles(enabled),
        }
    }

    /// Plan round `round_index` (0-based), or `None` when the policy is done
    pub fn plan_next_round(
        &self,
        round_index: u32,
        required: &[AgentRole],
        reviews: &[AgentReview],
    ) -> Option<Round> {
        match self {
            Self::ParallelIndependent => (round_index == 0).then(|| Round {
                mode: RoundMode::Concurrent,
                roles: required.to_vec(),
                share_prior: false,
                replaces_existing: false,
                note: None,
            }),

            Self::SequentialDebate { order } => (round_index == 0).then(|| Round {
                mode: RoundMode::Sequential,
                roles: order.clone(),
                share_prior: true,
                replaces_existing: false,
                note: None,
            }),

            Self::ConsensusVoting {
                disagreement_threshold,
                max_reask_rounds,
            } => {
                if round_index == 0 {
                    return Some(Round {
                        mode: RoundMode::Concurrent,
                        roles: required.to_vec(),
                        share_prior: false,
                        replaces_existing: false,
                        note: None,
                    });
                }
                if round_index > *max_reask_rounds || !self.disagreement_exceeded(reviews) {
                    return None;
                }
                let dissenters = dissenting_roles(reviews, *disagreement_threshold);
                if dissenters.is_empty() {
                    return None;
                }
                Some(Round {
                    mode: RoundMode::Concurrent,
                    roles: dissenters,
                    share_prior: true,
                    replaces_existing: true,
                    note: Some(disagreement_note(reviews, *disagreement_threshold)),
                })
            }
        }
    }

    /// Whether enough roles have succeeded to conclude
    pub fn quorum_satisfied(&self, reviews: &[AgentReview], quorum: usize) -> bool {
        reviews.iter().filter(|r| r.is_success()).count() >= quorum
    }

    /// Whether the collected reviews disagree beyond the policy's tolerance
    ///
    /// Only ConsensusVoting carries a threshold; the other variants never
    /// schedule disagreement rounds.
    pub fn disagreement_exceeded(&self, reviews: &[AgentReview]) -> bool {
        match self {
            Self::ConsensusVoting {
                disagreement_threshold,
                ..
            } => rating_variance(reviews) > *disagreement_threshold,
            _ => false,
        }
    }
}

/// Deduplicated roles in canonical enum order
fn canonical_roles(roles: &[AgentRole]) -> Vec<AgentRole> {
    let mut out: Vec<AgentRole> = Vec::with_capacity(roles.len());
    for role in roles {
        if !out.contains(role) {
            out.push(*role);
        }
    }
    out.sort();
    out
}

/// Population variance of the successful reviews' ratings
pub fn rating_variance(reviews: &[AgentReview]) -> f64 {
    let ratings: Vec<f64> = reviews
        .iter()
        .filter_map(|r| r.content().map(|c| c.rating))
        .collect();
    if ratings.len() < 2 {
        return 0.0;
    }
    let mean = ratings.iter().sum::<f64>() / ratings.len() as f64;
    ratings.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / ratings.len() as f64
}

/// Roles whose rating deviates from the mean by more than √threshold
pub fn dissenting_roles(reviews: &[AgentReview], threshold: f64) -> Vec<AgentRole> {
    let successes: Vec<(&AgentRole, f64)> = reviews
        .iter()
        .filter_map(|r| r.content().map(|c| (&r.role, c.rating)))
        .collect();
    if successes.len() < 2 {
        return Vec::new();
    }
    let mean = successes.iter().map(|(_, r)| r).sum::<f64>() / successes.len() as f64;
    let band = threshold.sqrt();

    let mut roles: Vec<AgentRole> = successes
        .iter()
        .filter(|(_, rating)| (rating - mean).abs() > band)
        .map(|(role, _)| **role)
        .collect();
    roles.sort();
    roles
}

/// Human-readable summary of the split, injected as re-ask context
fn disagreement_note(reviews: &[AgentReview], threshold: f64) -> String {
    let successes: Vec<(&AgentRole, f64)> = reviews
        .iter()
        .filter_map(|r| r.content().map(|c| (&r.role, c.rating)))
        .collect();
    let mean = if successes.is_empty() {
        0.0
    } else {
        successes.iter().map(|(_, r)| r).sum::<f64>() / successes.len() as f64
    };

    let mut sorted = successes;
    sorted.sort_by_key(|(role, _)| **role);
    let positions = sorted
        .iter()
        .map(|(role, rating)| format!("{role}={rating:.2}"))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "the council disagrees (mean rating {:.2}, variance {:.4} above threshold {:.4}): {}. \
         Reconsider your rating in light of the other analysts' positions.",
        mean,
        rating_variance(reviews),
        threshold,
        positions
    )
}
