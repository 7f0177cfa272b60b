//! Analyst roles and the reviews they produce

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Analyst specialization
///
/// The set is extensible by adding variants; ordering is used to make
/// aggregation and reporting deterministic regardless of completion order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Technical,
    Fundamental,
    FundFlow,
    Risk,
    Sentiment,
    News,
}

impl AgentRole {
    /// All roles, in canonical order
    pub const ALL: [AgentRole; 6] = [
        AgentRole::Technical,
        AgentRole::Fundamental,
        AgentRole::FundFlow,
        AgentRole::Risk,
        AgentRole::Sentiment,
        AgentRole::News,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::Technical => "technical",
            AgentRole::Fundamental => "fundamental",
            AgentRole::FundFlow => "fund_flow",
            AgentRole::Risk => "risk",
            AgentRole::Sentiment => "sentiment",
            AgentRole::News => "news",
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured content of a successful review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewContent {
    /// Bullishness in [0, 1]
    pub rating: f64,
    /// Self-reported confidence in [0, 1]
    pub confidence: f64,
    /// Free-form reasoning behind the numbers
    pub rationale: String,
}

impl ReviewContent {
    /// Build content with rating and confidence clamped into [0, 1]
    pub fn new(rating: f64, confidence: f64, rationale: impl Into<String>) -> Self {
        Self {
            rating: rating.clamp(0.0, 1.0),
            confidence: confidence.clamp(0.0, 1.0),
            rationale: rationale.into(),
        }
    }
}

/// Whether a role delivered an opinion or was written off
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReviewOutcome {
    Success(ReviewContent),
    Failed { reason: String },
}

impl ReviewOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ReviewOutcome::Success(_))
    }
}

/// One analyst's recorded opinion on the stock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentReview {
    pub role: AgentRole,
    pub outcome: ReviewOutcome,
    pub produced_at: DateTime<Utc>,
}

impl AgentReview {
    pub fn success(role: AgentRole, content: ReviewContent) -> Self {
        Self {
            role,
            outcome: ReviewOutcome::Success(content),
            produced_at: Utc::now(),
        }
    }

    pub fn failed(role: AgentRole, reason: impl Into<String>) -> Self {
        Self {
            role,
            outcome: ReviewOutcome::Failed {
                reason: reason.into(),
            },
            produced_at: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }

    /// Content of a successful review, `None` for failed ones
    pub fn content(&self) -> Option<&ReviewContent> {
        match &self.outcome {
            ReviewOutcome::Success(content) => Some(content),
            ReviewOutcome::Failed { .. } => None,
        }
    }
}
