//! Final decision produced by merging the council's reviews

use crate::review::AgentRole;
use serde::{Deserialize, Serialize};

/// Aggregated verdict over all successful reviews
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalDecision {
    /// Merged rating in [0, 1]
    pub rating: f64,
    /// Merged confidence in [0, 1]
    pub confidence: f64,
    /// Human-readable account of how the verdict was reached
    pub summary: String,
    /// Roles whose successful reviews contributed to the verdict
    pub contributing_roles: Vec<AgentRole>,
    /// True when a veto cap overrode the weighted rating
    pub overridden: bool,
    /// Roles whose rating sat outside the agreed band
    pub dissenting_roles: Vec<AgentRole>,
}

impl FinalDecision {
    pub fn contributed(&self, role: AgentRole) -> bool {
        self.contributing_roles.contains(&role)
    }

    pub fn has_disagreement(&self) -> bool {
        !self.dissenting_roles.is_empty()
    }
}
