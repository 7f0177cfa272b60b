//! The `Analysis` aggregate root and its lifecycle state machine
//!
//! All consistency-preserving mutations of an analysis run pass through
//! this type. The orchestrator is its single writer: concurrent agent
//! results are funneled through one synchronization point before any
//! mutator here is called, so the aggregate itself carries no locking.

use crate::decision::FinalDecision;
use crate::error::{DomainError, Result};
use crate::review::{AgentReview, AgentRole};
use crate::snapshot::{AnalysisId, StockSnapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of an analysis run
///
/// Transitions are monotonic; `Completed`, `PartiallyFailed` and `Failed`
/// are terminal and admit no further mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Created,
    InProgress,
    /// Every required role delivered a successful review
    Completed,
    /// Quorum was met but at least one required role failed
    PartiallyFailed,
    /// Quorum could not be met; may carry a partial decision
    Failed,
}

impl AnalysisStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AnalysisStatus::Completed | AnalysisStatus::PartiallyFailed | AnalysisStatus::Failed
        )
    }
}

/// Aggregate root for one multi-analyst analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    id: AnalysisId,
    snapshot: StockSnapshot,
    status: AnalysisStatus,
    required_roles: Vec<AgentRole>,
    /// Recorded reviews in application order, at most one per role
    reviews: Vec<AgentReview>,
    decision: Option<FinalDecision>,
    failure_reason: Option<String>,
    created_at: DateTime<Utc>,
    concluded_at: Option<DateTime<Utc>>,
    /// Bumped by the repository on every persisted mutation
    version: u64,
}

impl Analysis {
    /// Create a fresh analysis in `Created` state
    pub fn new(snapshot: StockSnapshot) -> Self {
        Self::with_id(AnalysisId::new(), snapshot)
    }

    /// Create a fresh analysis with a caller-chosen identifier
    pub fn with_id(id: AnalysisId, snapshot: StockSnapshot) -> Self {
        Self {
            id,
            snapshot,
            status: AnalysisStatus::Created,
            required_roles: Vec::new(),
            reviews: Vec::new(),
            decision: None,
            failure_reason: None,
            created_at: Utc::now(),
            concluded_at: None,
            version: 0,
        }
    }

    // =========== Accessors ===========

    pub fn id(&self) -> AnalysisId {
        self.id
    }

    pub fn snapshot(&self) -> &StockSnapshot {
        &self.snapshot
    }

    pub fn status(&self) -> AnalysisStatus {
        self.status
    }

    pub fn required_roles(&self) -> &[AgentRole] {
        &self.required_roles
    }

    pub fn reviews(&self) -> &[AgentReview] {
        &self.reviews
    }

    /// Successful reviews only, in application order
    pub fn successful_reviews(&self) -> Vec<&AgentReview> {
        self.reviews.iter().filter(|r| r.is_success()).collect()
    }

    pub fn review_for(&self, role: AgentRole) -> Option<&AgentReview> {
        self.reviews.iter().find(|r| r.role == role)
    }

    pub fn has_review(&self, role: AgentRole) -> bool {
        self.review_for(role).is_some()
    }

    pub fn decision(&self) -> Option<&FinalDecision> {
        self.decision.as_ref()
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn concluded_at(&self) -> Option<DateTime<Utc>> {
        self.concluded_at
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Advance the optimistic-concurrency version
    ///
    /// Reserved for `AnalysisRepository` implementations; exactly one bump
    /// per successfully persisted mutation.
    pub fn bump_version(&mut self) -> u64 {
        self.version += 1;
        self.version
    }

    // =========== Mutators (single-writer) ===========

    /// Begin the run: `Created` → `InProgress`
    pub fn start(&mut self, required_roles: Vec<AgentRole>) -> Result<()> {
        if self.status != AnalysisStatus::Created {
            return Err(DomainError::InvalidTransition {
                from: self.status,
                action: "start",
            });
        }
        self.required_roles = required_roles;
        self.status = AnalysisStatus::InProgress;
        Ok(())
    }

    /// Record a review for a role not yet present
    ///
    /// Does not itself decide completion; the orchestrator owns that.
    pub fn add_review(&mut self, review: AgentReview) -> Result<()> {
        if self.status != AnalysisStatus::InProgress {
            return Err(DomainError::InvalidTransition {
                from: self.status,
                action: "add_review",
            });
        }
        if self.has_review(review.role) {
            return Err(DomainError::DuplicateReview(review.role));
        }
        self.reviews.push(review);
        Ok(())
    }

    /// Swap an already-recorded role's review for a newer one
    ///
    /// Used by re-ask rounds; the one-review-per-role invariant holds
    /// because the prior review is replaced in place.
    pub fn replace_review(&mut self, review: AgentReview) -> Result<()> {
        if self.status != AnalysisStatus::InProgress {
            return Err(DomainError::InvalidTransition {
                from: self.status,
                action: "replace_review",
            });
        }
        match self.reviews.iter_mut().find(|r| r.role == review.role) {
            Some(slot) => {
                *slot = review;
                Ok(())
            }
            None => Err(DomainError::MissingReview(review.role)),
        }
    }

    /// Conclude with a decision: `InProgress` → `Completed` or `PartiallyFailed`
    ///
    /// Requires at least `quorum` successful roles. `Completed` only when
    /// every required role delivered a successful review.
    pub fn conclude(&mut self, decision: FinalDecision, quorum: usize) -> Result<()> {
        if self.status != AnalysisStatus::InProgress {
            return Err(DomainError::InvalidTransition {
                from: self.status,
                action: "conclude",
            });
        }
        let successful = self.successful_reviews().len();
        if successful < quorum {
            return Err(DomainError::QuorumNotMet { successful, quorum });
        }
        let all_succeeded = self
            .required_roles
            .iter()
            .all(|role| self.review_for(*role).is_some_and(AgentReview::is_success));

        self.decision = Some(decision);
        self.status = if all_succeeded {
            AnalysisStatus::Completed
        } else {
            AnalysisStatus::PartiallyFailed
        };
        self.concluded_at = Some(Utc::now());
        Ok(())
    }

    /// Abort: any non-terminal status → `Failed`
    ///
    /// `partial_decision` carries whatever could still be aggregated from
    /// the successful reviews, if any existed.
    pub fn fail(
        &mut self,
        reason: impl Into<String>,
        partial_decision: Option<FinalDecision>,
    ) -> Result<()> {
        if self.status.is_terminal() {
            return Err(DomainError::InvalidTransition {
                from: self.status,
                action: "fail",
            });
        }
        self.failure_reason = Some(reason.into());
        self.decision = partial_decision;
        self.status = AnalysisStatus::Failed;
        self.concluded_at = Some(Utc::now());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::review::ReviewContent;

    fn fresh() -> Analysis {
        Analysis::new(StockSnapshot::new("AAPL", "Apple Inc."))
    }

    fn started(roles: &[AgentRole]) -> Analysis {
        let mut analysis = fresh();
        analysis.start(roles.to_vec()).unwrap();
        analysis
    }

    fn ok_review(role: AgentRole, rating: f64) -> AgentReview {
        AgentReview::success(role, ReviewContent::new(rating, 0.9, "test"))
    }

    fn decision() -> FinalDecision {
        FinalDecision {
            rating: 0.5,
            confidence: 0.8,
            summary: "merged".to_string(),
            contributing_roles: vec![AgentRole::Technical],
            overridden: false,
            dissenting_roles: Vec::new(),
        }
    }

    #[test]
    fn test_start_only_from_created() {
        let mut analysis = fresh();
        assert_eq!(analysis.status(), AnalysisStatus::Created);
        analysis.start(vec![AgentRole::Technical]).unwrap();
        assert_eq!(analysis.status(), AnalysisStatus::InProgress);

        let err = analysis.start(vec![AgentRole::Technical]).unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition { .. }));
    }

    #[test]
    fn test_add_review_requires_in_progress() {
        let mut analysis = fresh();
        let err = analysis
            .add_review(ok_review(AgentRole::Technical, 0.7))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition { .. }));
    }

    #[test]
    fn test_duplicate_review_rejected_without_mutation() {
        let mut analysis = started(&[AgentRole::Technical]);
        analysis
            .add_review(ok_review(AgentRole::Technical, 0.7))
            .unwrap();

        let err = analysis
            .add_review(ok_review(AgentRole::Technical, 0.2))
            .unwrap_err();
        assert_eq!(err, DomainError::DuplicateReview(AgentRole::Technical));

        // Original review untouched
        assert_eq!(analysis.reviews().len(), 1);
        let kept = analysis.review_for(AgentRole::Technical).unwrap();
        assert_eq!(kept.content().unwrap().rating, 0.7);
    }

    #[test]
    fn test_replace_review_swaps_in_place() {
        let mut analysis = started(&[AgentRole::Technical, AgentRole::Risk]);
        analysis
            .add_review(ok_review(AgentRole::Technical, 0.9))
            .unwrap();
        analysis.add_review(ok_review(AgentRole::Risk, 0.3)).unwrap();

        analysis
            .replace_review(ok_review(AgentRole::Technical, 0.5))
            .unwrap();
        assert_eq!(analysis.reviews().len(), 2);
        let replaced = analysis.review_for(AgentRole::Technical).unwrap();
        assert_eq!(replaced.content().unwrap().rating, 0.5);
    }

    #[test]
    fn test_replace_review_requires_existing() {
        let mut analysis = started(&[AgentRole::Technical]);
        let err = analysis
            .replace_review(ok_review(AgentRole::News, 0.5))
            .unwrap_err();
        assert_eq!(err, DomainError::MissingReview(AgentRole::News));
    }

    #[test]
    fn test_conclude_completed_when_all_succeed() {
        let roles = [AgentRole::Technical, AgentRole::Fundamental];
        let mut analysis = started(&roles);
        for role in roles {
            analysis.add_review(ok_review(role, 0.6)).unwrap();
        }
        analysis.conclude(decision(), 2).unwrap();

        assert_eq!(analysis.status(), AnalysisStatus::Completed);
        assert!(analysis.decision().is_some());
        assert!(analysis.concluded_at().is_some());
    }

    #[test]
    fn test_conclude_partially_failed_when_one_role_failed() {
        let roles = [AgentRole::Technical, AgentRole::Fundamental, AgentRole::Risk];
        let mut analysis = started(&roles);
        analysis
            .add_review(ok_review(AgentRole::Technical, 0.6))
            .unwrap();
        analysis
            .add_review(ok_review(AgentRole::Fundamental, 0.5))
            .unwrap();
        analysis
            .add_review(AgentReview::failed(AgentRole::Risk, "timeout"))
            .unwrap();

        analysis.conclude(decision(), 2).unwrap();
        assert_eq!(analysis.status(), AnalysisStatus::PartiallyFailed);
    }

    #[test]
    fn test_conclude_rejects_below_quorum() {
        let mut analysis = started(&[AgentRole::Technical, AgentRole::Risk]);
        analysis
            .add_review(ok_review(AgentRole::Technical, 0.6))
            .unwrap();

        let err = analysis.conclude(decision(), 2).unwrap_err();
        assert_eq!(
            err,
            DomainError::QuorumNotMet {
                successful: 1,
                quorum: 2
            }
        );
        assert_eq!(analysis.status(), AnalysisStatus::InProgress);
        assert!(analysis.decision().is_none());
    }

    #[test]
    fn test_terminal_mutations_rejected_idempotently() {
        let mut analysis = started(&[AgentRole::Technical]);
        analysis
            .add_review(ok_review(AgentRole::Technical, 0.6))
            .unwrap();
        analysis.conclude(decision(), 1).unwrap();
        let snapshot = analysis.clone();

        assert!(matches!(
            analysis.conclude(decision(), 1).unwrap_err(),
            DomainError::InvalidTransition { .. }
        ));
        assert!(matches!(
            analysis.fail("late", None).unwrap_err(),
            DomainError::InvalidTransition { .. }
        ));
        assert!(matches!(
            analysis
                .add_review(ok_review(AgentRole::News, 0.4))
                .unwrap_err(),
            DomainError::InvalidTransition { .. }
        ));

        // Rejection left the aggregate unchanged
        assert_eq!(analysis, snapshot);
    }

    #[test]
    fn test_fail_from_any_non_terminal() {
        let mut created = fresh();
        created.fail("never started", None).unwrap();
        assert_eq!(created.status(), AnalysisStatus::Failed);
        assert_eq!(created.failure_reason(), Some("never started"));
        assert!(created.decision().is_none());

        let mut running = started(&[AgentRole::Technical]);
        running
            .add_review(ok_review(AgentRole::Technical, 0.8))
            .unwrap();
        running.fail("quorum unmet", Some(decision())).unwrap();
        assert_eq!(running.status(), AnalysisStatus::Failed);
        // Failed-with-partial keeps the salvage decision
        assert!(running.decision().is_some());

        let err = running.fail("again", None).unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition { .. }));
    }

    #[test]
    fn test_version_bump() {
        let mut analysis = fresh();
        assert_eq!(analysis.version(), 0);
        assert_eq!(analysis.bump_version(), 1);
        assert_eq!(analysis.version(), 1);
    }
}
