//! Orchestrator driving agent invocation, result funneling, and conclusion
//!
//! The orchestrator is the aggregate's single writer. Concurrent agent
//! calls run as spawned tasks whose results funnel through one mpsc
//! consumer; only that consumer touches the aggregate, so the final state
//! never depends on the real-time completion order within a group.

use crate::aggregator::aggregate;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::policy::{InteractionPolicy, Round, RoundMode};
use crate::retry::RetryPolicy;
use council_core::{
    AgentError, AgentPort, AgentReview, AgentRole, Analysis, AnalysisId, AnalysisRepository,
    AnalysisStatus, DataBundle, FinalDecision, ReviewOutcome,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Semaphore, mpsc};
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Bundle payload key under which a re-ask round's disagreement summary
/// is handed to the agents
pub const DISAGREEMENT_CONTEXT_KEY: &str = "disagreement_summary";

/// Per-role outcome in the user-visible run report
#[derive(Debug, Clone, PartialEq)]
pub struct RoleOutcome {
    pub role: AgentRole,
    pub outcome: ReviewOutcome,
}

/// User-visible result of one orchestrated run
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub analysis_id: AnalysisId,
    pub status: AnalysisStatus,
    pub decision: Option<FinalDecision>,
    pub roles: Vec<RoleOutcome>,
    pub rounds: u32,
}

/// Why a round stopped before handing control back to the planner
enum RoundEnd {
    Finished,
    DeadlineExpired,
    Cancelled,
}

/// Drives one analysis run end to end
///
/// Collaborators arrive by explicit parameter passing; there is no
/// ambient lookup.
pub struct Orchestrator {
    agents: Arc<dyn AgentPort>,
    repository: Arc<dyn AnalysisRepository>,
    config: EngineConfig,
}

impl Orchestrator {
    /// Create an orchestrator, validating the configuration up front
    pub fn new(
        agents: Arc<dyn AgentPort>,
        repository: Arc<dyn AnalysisRepository>,
        config: EngineConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            agents,
            repository,
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run the full fan-out / fan-in cycle for `analysis`
    ///
    /// Per-agent failures are absorbed as failed reviews; only contract
    /// violations (invalid transitions, persistence conflicts) surface as
    /// errors. The aggregate is persisted exactly once, at conclusion.
    pub async fn run(
        &self,
        mut analysis: Analysis,
        enabled_roles: &[AgentRole],
        bundle: &DataBundle,
        cancel: CancellationToken,
    ) -> Result<RunReport> {
        let policy = InteractionPolicy::from_config(&self.config, enabled_roles);
        let required = policy.required_roles(enabled_roles);
        let quorum = self.config.quorum_for(required.len());

        analysis.start(required.clone())?;
        info!(
            analysis_id = %analysis.id(),
            symbol = %analysis.snapshot().symbol,
            roles = required.len(),
            quorum,
            "analysis started"
        );

        let deadline = Instant::now() + self.config.overall_deadline;
        let mut rounds = 0u32;
        let mut stop_reason: Option<&'static str> = None;

        loop {
            if cancel.is_cancelled() {
                stop_reason = Some("run aborted");
                break;
            }
            if Instant::now() >= deadline {
                stop_reason = Some("overall deadline expired");
                break;
            }
            let Some(round) = policy.plan_next_round(rounds, &required, analysis.reviews())
            else {
                break;
            };
            debug!(round = rounds, roles = round.roles.len(), "executing round");

            let end = self
                .execute_round(&mut analysis, &round, bundle, deadline, &cancel)
                .await?;
            rounds += 1;
            match end {
                RoundEnd::Finished => {}
                RoundEnd::DeadlineExpired => {
                    stop_reason = Some("overall deadline expired");
                    break;
                }
                RoundEnd::Cancelled => {
                    stop_reason = Some("run aborted");
                    break;
                }
            }
        }

        self.conclude(&mut analysis, quorum, stop_reason).await?;

        Ok(build_report(&analysis, &required, rounds))
    }

    /// Merge whatever succeeded and move the aggregate to a terminal state
    async fn conclude(
        &self,
        analysis: &mut Analysis,
        quorum: usize,
        stop_reason: Option<&'static str>,
    ) -> Result<()> {
        let successes = analysis.successful_reviews().len();
        let decision = aggregate(analysis.reviews(), &self.config);

        match decision {
            Some(decision) if successes >= quorum => {
                analysis.conclude(decision, quorum)?;
            }
            partial => {
                let reason = stop_reason.unwrap_or("quorum unmet after retries");
                warn!(
                    analysis_id = %analysis.id(),
                    successes,
                    quorum,
                    reason,
                    "failing analysis"
                );
                analysis.fail(reason, partial)?;
            }
        }

        self.repository.save(analysis).await?;
        info!(
            analysis_id = %analysis.id(),
            status = ?analysis.status(),
            version = analysis.version(),
            "analysis concluded and persisted"
        );
        Ok(())
    }

    async fn execute_round(
        &self,
        analysis: &mut Analysis,
        round: &Round,
        bundle: &DataBundle,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> Result<RoundEnd> {
        let bundle = match &round.note {
            Some(note) => bundle
                .clone()
                .with_entry(DISAGREEMENT_CONTEXT_KEY, serde_json::json!(note)),
            None => bundle.clone(),
        };

        match round.mode {
            RoundMode::Concurrent => {
                self.run_concurrent(analysis, round, bundle, deadline, cancel)
                    .await
            }
            RoundMode::Sequential => {
                self.run_sequential(analysis, round, bundle, deadline, cancel)
                    .await
            }
        }
    }

    /// Fan out one concurrent group; results pass the mpsc synchronization
    /// point before touching the aggregate
    async fn run_concurrent(
        &self,
        analysis: &mut Analysis,
        round: &Round,
        bundle: DataBundle,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> Result<RoundEnd> {
        let pending: Vec<AgentRole> = round
            .roles
            .iter()
            .copied()
            .filter(|role| round.replaces_existing || !analysis.has_review(*role))
            .collect();
        if pending.is_empty() {
            return Ok(RoundEnd::Finished);
        }

        let prior: Arc<Vec<AgentReview>> = Arc::new(if round.share_prior {
            analysis.successful_reviews().into_iter().cloned().collect()
        } else {
            Vec::new()
        });

        let (tx, mut rx) = mpsc::channel::<AgentReview>(pending.len());
        let semaphore = Arc::new(Semaphore::new(self.config.max_parallel_agents));
        let retry = RetryPolicy::from_config(&self.config);
        let per_call = self.config.per_call_timeout;

        let mut handles = Vec::with_capacity(pending.len());
        for role in pending {
            let tx = tx.clone();
            let semaphore = semaphore.clone();
            let port = self.agents.clone();
            let bundle = bundle.clone();
            let prior = prior.clone();
            let retry = retry.clone();
            let cancel = cancel.clone();

            handles.push(tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return;
                };
                // A call that was still queued when the run aborted is
                // simply never issued
                if cancel.is_cancelled() {
                    return;
                }
                let review = invoke_with_retry(port, role, &bundle, &prior, &retry, per_call).await;
                let _ = tx.send(review).await;
            }));
        }
        drop(tx);

        let mut end = RoundEnd::Finished;
        loop {
            tokio::select! {
                received = rx.recv() => match received {
                    Some(review) => self.apply_review(analysis, review, round.replaces_existing)?,
                    None => break,
                },
                () = cancel.cancelled() => {
                    warn!("abort signal received, abandoning in-flight calls");
                    end = RoundEnd::Cancelled;
                    break;
                }
                () = sleep_until(deadline) => {
                    warn!("overall deadline expired, abandoning in-flight calls");
                    end = RoundEnd::DeadlineExpired;
                    break;
                }
            }
        }

        // Late results from abandoned tasks are discarded, never applied
        for handle in &handles {
            handle.abort();
        }

        Ok(end)
    }

    /// Run one sequential group; each call sees all prior successful reviews
    async fn run_sequential(
        &self,
        analysis: &mut Analysis,
        round: &Round,
        bundle: DataBundle,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> Result<RoundEnd> {
        let retry = RetryPolicy::from_config(&self.config);
        let per_call = self.config.per_call_timeout;

        for role in &round.roles {
            if !round.replaces_existing && analysis.has_review(*role) {
                continue;
            }
            let prior: Vec<AgentReview> = if round.share_prior {
                analysis.successful_reviews().into_iter().cloned().collect()
            } else {
                Vec::new()
            };

            let call = invoke_with_retry(
                self.agents.clone(),
                *role,
                &bundle,
                &prior,
                &retry,
                per_call,
            );
            tokio::select! {
                review = call => {
                    self.apply_review(analysis, review, round.replaces_existing)?;
                }
                () = cancel.cancelled() => {
                    warn!(role = %role, "abort signal received mid-debate");
                    return Ok(RoundEnd::Cancelled);
                }
                () = sleep_until(deadline) => {
                    warn!(role = %role, "overall deadline expired mid-debate");
                    return Ok(RoundEnd::DeadlineExpired);
                }
            }
        }
        Ok(RoundEnd::Finished)
    }

    /// The single mutation path for agent results
    fn apply_review(
        &self,
        analysis: &mut Analysis,
        review: AgentReview,
        replaces_existing: bool,
    ) -> Result<()> {
        debug!(role = %review.role, success = review.is_success(), "recording review");
        if replaces_existing && analysis.has_review(review.role) {
            // A failed re-ask never clobbers a previously successful review
            let prior_succeeded = analysis
                .review_for(review.role)
                .is_some_and(AgentReview::is_success);
            if prior_succeeded && !review.is_success() {
                debug!(role = %review.role, "re-ask failed, keeping prior review");
                return Ok(());
            }
            analysis.replace_review(review)?;
        } else {
            analysis.add_review(review)?;
        }
        Ok(())
    }
}

/// Invoke one role with per-call timeout and retry; failures become a
/// failed review for that role instead of an error
async fn invoke_with_retry(
    port: Arc<dyn AgentPort>,
    role: AgentRole,
    bundle: &DataBundle,
    prior: &[AgentReview],
    retry: &RetryPolicy,
    per_call: Duration,
) -> AgentReview {
    let result = retry
        .execute(role.as_str(), || {
            let port = port.clone();
            let bundle = bundle.clone();
            let prior = prior.to_vec();
            async move {
                match tokio::time::timeout(per_call, port.invoke(role, &bundle, &prior, per_call))
                    .await
                {
                    Ok(outcome) => outcome,
                    Err(_) => Err(AgentError::Transient(format!(
                        "agent call timed out after {per_call:?}"
                    ))),
                }
            }
        })
        .await;

    match result {
        Ok(review) if review.role == role => review,
        Ok(review) => {
            warn!(requested = %role, returned = %review.role, "port answered for wrong role");
            AgentReview::failed(role, format!("port answered for role {}", review.role))
        }
        Err(err) => AgentReview::failed(role, err.to_string()),
    }
}

fn build_report(analysis: &Analysis, required: &[AgentRole], rounds: u32) -> RunReport {
    let roles = required
        .iter()
        .map(|role| RoleOutcome {
            role: *role,
            outcome: analysis
                .review_for(*role)
                .map(|review| review.outcome.clone())
                .unwrap_or(ReviewOutcome::Failed {
                    reason: "not attempted".to_string(),
                }),
        })
        .collect();

    RunReport {
        analysis_id: analysis.id(),
        status: analysis.status(),
        decision: analysis.decision().cloned(),
        roles,
        rounds,
    }
}
