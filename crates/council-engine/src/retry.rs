//! Retry with exponential backoff for agent calls

use crate::config::EngineConfig;
use council_core::AgentError;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Retry policy for a single role's agent invocation
///
/// Only [`AgentError::Transient`] outcomes are retried; a permanent
/// validation error fails the call on the spot.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, first call included
    pub max_attempts: u32,

    /// Backoff before the first retry
    pub initial_backoff: Duration,

    /// Ceiling on any single backoff
    pub max_backoff: Duration,

    /// Growth factor per retry
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(10),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Derive the policy from engine configuration
    ///
    /// `retry_count` is the number of retries after the first attempt.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            max_attempts: config.retry_count + 1,
            initial_backoff: config.retry_backoff_base,
            ..Self::default()
        }
    }

    /// Millisecond-scale backoffs for tests
    pub fn fast() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(5),
            max_backoff: Duration::from_millis(50),
            backoff_multiplier: 2.0,
        }
    }

    /// Backoff to wait before the given retry (1-based)
    fn backoff_duration(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let millis = self.initial_backoff.as_millis() as f64
            * self.backoff_multiplier.powi(retry as i32 - 1);
        Duration::from_millis(millis as u64).min(self.max_backoff)
    }

    /// Run `operation` until it succeeds, exhausts the attempt budget, or
    /// fails permanently
    pub async fn execute<F, Fut, T>(
        &self,
        operation_name: &str,
        mut operation: F,
    ) -> Result<T, AgentError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, AgentError>>,
    {
        let mut last_error = None;

        for attempt in 1..=self.max_attempts {
            debug!(
                operation = operation_name,
                attempt,
                max_attempts = self.max_attempts,
                "invoking"
            );

            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(
                            operation = operation_name,
                            attempt, "succeeded after retry"
                        );
                    }
                    return Ok(value);
                }
                Err(err) if err.is_transient() => {
                    if attempt < self.max_attempts {
                        let backoff = self.backoff_duration(attempt);
                        warn!(
                            operation = operation_name,
                            attempt,
                            ?backoff,
                            error = %err,
                            "transient failure, backing off"
                        );
                        sleep(backoff).await;
                    }
                    last_error = Some(err);
                }
                Err(err) => {
                    debug!(operation = operation_name, error = %err, "permanent failure");
                    return Err(err);
                }
            }
        }

        let error = last_error
            .unwrap_or_else(|| AgentError::Transient("retry budget empty".to_string()));
        warn!(
            operation = operation_name,
            attempts = self.max_attempts,
            error = %error,
            "retries exhausted"
        );
        Err(error)
    }
}
