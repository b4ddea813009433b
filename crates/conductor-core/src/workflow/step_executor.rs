//! Single-step invocation with timeout and linear-backoff retry.
//!
//! Each attempt re-resolves the step's parameters from the current scope,
//! mirrors the attempt count onto the tracker, and awaits the invoker under
//! the step's timeout. The loop stops if the record disappears. Suspension happens only here: awaiting the operation and
//! waiting out backoff.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use conductor_types::event::AuditRecord;
use conductor_types::workflow::{RetryPolicy, WorkflowStep};
use serde_json::Value;

use super::template::ParamTemplate;
use super::tracker::ExecutionTracker;
use crate::invoker::{OperationError, OperationInvoker};
use crate::observer::WorkflowObserver;

/// Result of a successful step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepSuccess {
    pub result: Value,
    pub attempts: u32,
}

/// Terminal failure of a step, after retries.
#[derive(Debug, Clone, PartialEq)]
pub struct StepFailure {
    pub error: OperationError,
    pub attempts: u32,
}

/// Wait before attempt `attempt + 1`: `backoff_ms * attempt`.
pub fn backoff_delay(policy: &RetryPolicy, attempt: u32) -> Duration {
    Duration::from_millis(policy.backoff_ms.saturating_mul(u64::from(attempt)))
}

/// Whether another attempt is allowed after `attempt` (1-based) failed.
pub fn should_retry(policy: &RetryPolicy, attempt: u32) -> bool {
    attempt < policy.max_attempts
}

pub struct StepExecutor {
    invoker: Arc<dyn OperationInvoker>,
    observer: Arc<dyn WorkflowObserver>,
    default_timeout: Option<Duration>,
}

impl StepExecutor {
    pub fn new(
        invoker: Arc<dyn OperationInvoker>,
        observer: Arc<dyn WorkflowObserver>,
        default_timeout: Option<Duration>,
    ) -> Self {
        Self {
            invoker,
            observer,
            default_timeout,
        }
    }

    pub fn with_default_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.default_timeout = timeout;
        self
    }

    fn timeout_for(&self, step: &WorkflowStep) -> Option<Duration> {
        step.timeout_ms.map(Duration::from_millis).or(self.default_timeout)
    }

    /// Run one step to success or terminal failure.
    pub async fn execute(
        &self,
        step: &WorkflowStep,
        template: &ParamTemplate,
        tracker: &ExecutionTracker,
    ) -> Result<StepSuccess, StepFailure> {
        let policy = step.effective_retry();
        let timeout = self.timeout_for(step);

        let mut attempt = 0u32;
        loop {
            let Some(parameters) = tracker.with_execution(|exec| template.resolve(exec)) else {
                return Err(StepFailure {
                    error: OperationError::failed(format!(
                        "execution {} record is gone",
                        tracker.execution_id()
                    )),
                    attempts: attempt,
                });
            };
            attempt += 1;
            tracker.record_attempt(&step.id);

            tracing::debug!(
                execution_id = %tracker.execution_id(),
                step_id = step.id.as_str(),
                operation = step.operation.as_str(),
                attempt,
                "invoking operation"
            );

            match self.invoke_once(&step.operation, parameters.clone(), timeout).await {
                Ok(result) => {
                    self.observer.audit(&AuditRecord {
                        timestamp: Utc::now(),
                        execution_id: tracker.execution_id(),
                        workflow_id: tracker.workflow_id().to_string(),
                        step_id: step.id.clone(),
                        operation: step.operation.clone(),
                        parameters,
                        success: true,
                    });
                    return Ok(StepSuccess {
                        result,
                        attempts: attempt,
                    });
                }
                Err(error) => {
                    let Some(policy) = policy.as_ref().filter(|p| should_retry(p, attempt)) else {
                        return Err(StepFailure {
                            error,
                            attempts: attempt,
                        });
                    };
                    let delay = backoff_delay(policy, attempt);
                    tracing::warn!(
                        execution_id = %tracker.execution_id(),
                        step_id = step.id.as_str(),
                        attempt,
                        max_attempts = policy.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "step attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn invoke_once(
        &self,
        operation: &str,
        parameters: Value,
        timeout: Option<Duration>,
    ) -> Result<Value, OperationError> {
        let call = self.invoker.invoke(operation, parameters);
        match timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .unwrap_or_else(|_| Err(OperationError::TimedOut(limit.as_millis() as u64))),
            None => call.await,
        }
    }
}

impl std::fmt::Debug for StepExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepExecutor")
            .field("default_timeout", &self.default_timeout)
            .finish_non_exhaustive()
    }
}
