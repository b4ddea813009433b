//! Orchestrator: the step-loop state machine.
//!
//! # Execution flow
//!
//! 1. Look up the compiled definition and seed the variable scope.
//! 2. Record a `pending` execution and mark it active.
//! 3. Check preconditions, then move to `running`.
//! 4. Run steps in definition order: cancellation check, gating, invocation.
//! 5. `completed` runs `onSuccess`, an unrecovered failure runs `onFailure`,
//!    a cancelled run stops without actions.
//! 6. On every exit path the execution is marked no longer active.
//!
//! `runWorkflow` actions re-enter the orchestrator one level deeper, bounded
//! by `max_workflow_depth`.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use conductor_types::config::EngineConfig;
use conductor_types::workflow::{
    ErrorHandling, Execution, ExecutionStatus, StepExecution, WorkflowAction, WorkflowDefinition,
};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::actions::{emit_log, ActionError, ActionPlan};
use super::condition::{ConditionEvaluator, PredicateError};
use super::definition::WorkflowError;
use super::path::STEPS_ROOT;
use super::registry::{CompiledWorkflow, WorkflowRegistry};
use super::step_executor::{StepExecutor, StepFailure};
use super::template::ParamTemplate;
use super::tracker::{ExecutionStore, ExecutionTracker};
use crate::invoker::{OperationError, OperationInvoker};
use crate::observer::WorkflowObserver;

/// Default cap on nested `runWorkflow` depth.
pub const DEFAULT_MAX_WORKFLOW_DEPTH: u32 = 16;

// ---------------------------------------------------------------------------
// Settings and options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorSettings {
    /// Timeout for steps that don't set their own.
    pub default_step_timeout: Option<Duration>,
    pub max_workflow_depth: u32,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            default_step_timeout: None,
            max_workflow_depth: DEFAULT_MAX_WORKFLOW_DEPTH,
        }
    }
}

impl From<&EngineConfig> for OrchestratorSettings {
    fn from(config: &EngineConfig) -> Self {
        Self {
            default_step_timeout: config.default_step_timeout_ms.map(Duration::from_millis),
            max_workflow_depth: config.max_workflow_depth,
        }
    }
}

/// Called after each successfully completed step.
pub type StepCallback = Arc<dyn Fn(&StepExecution) + Send + Sync>;

/// Per-call execution options.
#[derive(Clone, Default)]
pub struct ExecuteOptions {
    /// Validate preconditions and mark the run completed without running steps.
    pub dry_run: bool,
    pub step_callback: Option<StepCallback>,
}

impl ExecuteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn on_step(mut self, callback: impl Fn(&StepExecution) + Send + Sync + 'static) -> Self {
        self.step_callback = Some(Arc::new(callback));
        self
    }
}

impl std::fmt::Debug for ExecuteOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecuteOptions")
            .field("dry_run", &self.dry_run)
            .field("step_callback", &self.step_callback.is_some())
            .finish()
    }
}

type ExecutionFuture<'a> = Pin<Box<dyn Future<Output = Result<Execution, WorkflowError>> + Send + 'a>>;

/// How the step loop ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunOutcome {
    Finished,
    DryRun,
    Cancelled,
}

// ---------------------------------------------------------------------------
// Active-execution guard
// ---------------------------------------------------------------------------

/// Marks an execution active on creation and inactive on drop, whichever
/// path leaves the driver. A record still non-terminal at drop is failed,
/// then released for eviction.
struct ActiveExecution<'a> {
    tracker: &'a ExecutionTracker,
    observer: &'a dyn WorkflowObserver,
}

impl<'a> ActiveExecution<'a> {
    fn start(tracker: &'a ExecutionTracker, observer: &'a dyn WorkflowObserver, execution: &Execution) -> Self {
        observer.execution_started(execution);
        Self { tracker, observer }
    }
}

impl Drop for ActiveExecution<'_> {
    fn drop(&mut self) {
        let status = match self.tracker.status() {
            Some(status) if status.is_terminal() => status,
            _ => {
                self.tracker.fail("execution aborted before completion");
                ExecutionStatus::Failed
            }
        };
        self.observer
            .execution_finished(self.tracker.execution_id(), self.tracker.workflow_id(), status);
        self.tracker.release();
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct Orchestrator {
    registry: Arc<WorkflowRegistry>,
    store: ExecutionStore,
    evaluator: ConditionEvaluator,
    executor: StepExecutor,
    observer: Arc<dyn WorkflowObserver>,
    settings: OrchestratorSettings,
}

impl Orchestrator {
    pub fn new(
        registry: Arc<WorkflowRegistry>,
        invoker: Arc<dyn OperationInvoker>,
        observer: Arc<dyn WorkflowObserver>,
    ) -> Self {
        let settings = OrchestratorSettings::default();
        Self {
            registry,
            store: ExecutionStore::new(),
            evaluator: ConditionEvaluator::new(),
            executor: StepExecutor::new(invoker, Arc::clone(&observer), settings.default_step_timeout),
            observer,
            settings,
        }
    }

    pub fn with_settings(mut self, settings: OrchestratorSettings) -> Self {
        self.executor = self.executor.with_default_timeout(settings.default_step_timeout);
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    pub fn registry(&self) -> &Arc<WorkflowRegistry> {
        &self.registry
    }

    pub fn register_workflow(&self, definition: WorkflowDefinition) -> Result<bool, WorkflowError> {
        self.registry.register(definition)
    }

    /// Register a predicate for `custom` conditions.
    pub fn register_predicate<F>(&self, name: impl Into<String>, predicate: F)
    where
        F: Fn(&Execution) -> Result<bool, PredicateError> + Send + Sync + 'static,
    {
        self.evaluator.register_predicate(name, predicate);
    }

    pub fn get_workflow(&self, workflow_id: &str) -> Option<WorkflowDefinition> {
        self.registry.get(workflow_id)
    }

    pub fn list_workflows(&self, category: Option<&str>) -> Vec<WorkflowDefinition> {
        self.registry.list(category)
    }

    pub fn get_execution(&self, execution_id: Uuid) -> Option<Execution> {
        self.store.get(execution_id)
    }

    pub fn list_executions(&self, workflow_id: Option<&str>) -> Vec<Execution> {
        self.store.list(workflow_id)
    }

    /// Request cancellation of a running execution. The in-flight step is
    /// not interrupted; the loop stops before the next one.
    pub fn cancel_execution(&self, execution_id: Uuid) -> bool {
        let cancelled = self.store.cancel(execution_id);
        if cancelled {
            tracing::info!(execution_id = %execution_id, "execution cancelled");
        }
        cancelled
    }

    /// Drop a finished execution record.
    pub fn evict_execution(&self, execution_id: Uuid) -> Option<Execution> {
        self.store.evict(execution_id)
    }

    /// Execute a registered workflow and return the final execution record.
    ///
    /// Unrecovered failures are returned as errors; they carry the execution
    /// id so the failed record can still be fetched.
    pub async fn execute_workflow(
        &self,
        workflow_id: &str,
        input_variables: Map<String, Value>,
        options: ExecuteOptions,
    ) -> Result<Execution, WorkflowError> {
        self.execute_at_depth(workflow_id.to_string(), input_variables, options, 0)
            .await
    }

    fn execute_at_depth(
        &self,
        workflow_id: String,
        input_variables: Map<String, Value>,
        options: ExecuteOptions,
        depth: u32,
    ) -> ExecutionFuture<'_> {
        Box::pin(async move {
            if depth > self.settings.max_workflow_depth {
                return Err(WorkflowError::configuration(format!(
                    "workflow '{workflow_id}' exceeds max nesting depth {}",
                    self.settings.max_workflow_depth
                )));
            }
            let compiled = self
                .registry
                .compiled(&workflow_id)
                .ok_or_else(|| WorkflowError::configuration(format!("unknown workflow '{workflow_id}'")))?;
            if input_variables.contains_key(STEPS_ROOT) {
                return Err(WorkflowError::configuration(format!(
                    "input variable '{STEPS_ROOT}' is reserved for step results"
                )));
            }

            let definition = &compiled.definition;
            let mut variables = definition.variables.clone();
            variables.extend(input_variables);

            let execution = Execution::new(definition, variables);
            let tracker = self.store.insert(execution.clone());
            let guard = ActiveExecution::start(&tracker, self.observer.as_ref(), &execution);

            tracing::info!(
                execution_id = %tracker.execution_id(),
                workflow = workflow_id.as_str(),
                depth,
                dry_run = options.dry_run,
                "starting workflow execution"
            );

            let result = match self.drive(&compiled, &tracker, &options).await {
                Ok(RunOutcome::Finished) => {
                    if tracker.transition(ExecutionStatus::Completed) {
                        self.run_actions(&compiled, &definition.on_success, &compiled.on_success, &tracker, depth)
                            .await;
                    }
                    Ok(())
                }
                Ok(RunOutcome::DryRun) => {
                    tracker.transition(ExecutionStatus::Completed);
                    Ok(())
                }
                Ok(RunOutcome::Cancelled) => Ok(()),
                Err(err) => {
                    tracing::warn!(
                        execution_id = %tracker.execution_id(),
                        workflow = workflow_id.as_str(),
                        error = %err,
                        "workflow execution failed"
                    );
                    // Configuration errors fail fast without hooks.
                    let failed = tracker.fail(err.to_string());
                    if failed && !matches!(err, WorkflowError::Configuration(_)) {
                        self.run_actions(&compiled, &definition.on_failure, &compiled.on_failure, &tracker, depth)
                            .await;
                    }
                    Err(err)
                }
            };

            let snapshot = tracker.snapshot();
            drop(guard);

            result?;
            snapshot.ok_or_else(|| {
                WorkflowError::configuration(format!(
                    "execution {} was evicted before it could be returned",
                    tracker.execution_id()
                ))
            })
        })
    }

    /// Preconditions and the step loop.
    async fn drive(
        &self,
        compiled: &CompiledWorkflow,
        tracker: &ExecutionTracker,
        options: &ExecuteOptions,
    ) -> Result<RunOutcome, WorkflowError> {
        let definition = &compiled.definition;
        let execution_id = tracker.execution_id();

        let scope = self.scope(tracker)?;
        let unmet = self
            .evaluator
            .first_unmet(&definition.preconditions, &scope)
            .map_err(|err| match err {
                WorkflowError::Predicate { .. } => WorkflowError::PreconditionNotMet {
                    workflow_id: definition.id.clone(),
                    execution_id,
                    reason: err.to_string(),
                },
                other => other,
            })?;
        if let Some(index) = unmet {
            let condition = &definition.preconditions[index];
            let subject = condition.predicate.as_deref().unwrap_or(condition.field.as_str());
            return Err(WorkflowError::PreconditionNotMet {
                workflow_id: definition.id.clone(),
                execution_id,
                reason: format!(
                    "precondition {index} ({:?} on '{subject}') not met",
                    condition.condition_type
                ),
            });
        }

        tracker.transition(ExecutionStatus::Running);

        if options.dry_run {
            tracing::info!(execution_id = %execution_id, "dry run, no steps executed");
            return Ok(RunOutcome::DryRun);
        }

        for (step, template) in definition.steps.iter().zip(&compiled.step_templates) {
            if tracker.is_cancelled() {
                tracing::info!(
                    execution_id = %execution_id,
                    next_step = step.id.as_str(),
                    "execution cancelled, stopping before next step"
                );
                return Ok(RunOutcome::Cancelled);
            }

            let scope = self.scope(tracker)?;
            let outcome = match self.evaluator.first_unmet(&step.conditions, &scope) {
                Ok(Some(index)) => {
                    tracing::debug!(
                        execution_id = %execution_id,
                        step_id = step.id.as_str(),
                        condition = index,
                        "step conditions not met, skipping"
                    );
                    if let Some(skipped) = tracker.skip_step(&step.id) {
                        self.observer.step_advanced(execution_id, &skipped);
                    }
                    continue;
                }
                Ok(None) => {
                    tracker.start_step(&step.id);
                    self.executor.execute(step, template, tracker).await
                }
                Err(err @ WorkflowError::Predicate { .. }) => {
                    tracker.start_step(&step.id);
                    Err(StepFailure {
                        error: OperationError::Failed(err.to_string()),
                        attempts: 0,
                    })
                }
                Err(other) => return Err(other),
            };

            match outcome {
                Ok(success) => {
                    if let Some(done) = tracker.complete_step(&step.id, success.result) {
                        if let Some(callback) = &options.step_callback {
                            callback(&done);
                        }
                        self.observer.step_advanced(execution_id, &done);
                    }
                }
                Err(StepFailure { error, attempts }) => {
                    let message = error.to_string();
                    if let Some(failed) = tracker.fail_step(&step.id, message.clone()) {
                        self.observer.step_advanced(execution_id, &failed);
                    }
                    if step.error_handling == ErrorHandling::Continue {
                        tracing::warn!(
                            execution_id = %execution_id,
                            step_id = step.id.as_str(),
                            attempts,
                            error = %message,
                            "step failed, continuing"
                        );
                        continue;
                    }
                    if tracker.is_cancelled() {
                        tracing::info!(
                            execution_id = %execution_id,
                            step_id = step.id.as_str(),
                            "step failed after cancellation"
                        );
                        return Ok(RunOutcome::Cancelled);
                    }
                    return Err(WorkflowError::StepFailed {
                        workflow_id: definition.id.clone(),
                        execution_id,
                        step_id: step.id.clone(),
                        attempts,
                        message,
                    });
                }
            }
        }

        Ok(RunOutcome::Finished)
    }

    fn scope(&self, tracker: &ExecutionTracker) -> Result<Execution, WorkflowError> {
        tracker.snapshot().ok_or_else(|| {
            WorkflowError::configuration(format!(
                "execution {} was evicted while running",
                tracker.execution_id()
            ))
        })
    }

    /// Run hook actions in order. Failures are logged, never propagated.
    async fn run_actions(
        &self,
        compiled: &CompiledWorkflow,
        actions: &[WorkflowAction],
        templates: &[ParamTemplate],
        tracker: &ExecutionTracker,
        depth: u32,
    ) {
        let execution_id = tracker.execution_id();
        let workflow_id = compiled.id();

        for (index, (action, template)) in actions.iter().zip(templates).enumerate() {
            let Some(parameters) = tracker.with_execution(|exec| template.resolve(exec)) else {
                return;
            };
            let result = match ActionPlan::from_parameters(action.action_type, parameters) {
                Ok(plan) => self.apply_action(plan, tracker, depth).await,
                Err(err) => Err(err),
            };
            if let Err(err) = result {
                tracing::warn!(
                    execution_id = %execution_id,
                    workflow = workflow_id,
                    action = index,
                    action_type = ?action.action_type,
                    error = %err,
                    "workflow action failed"
                );
            }
        }
    }

    async fn apply_action(
        &self,
        plan: ActionPlan,
        tracker: &ExecutionTracker,
        depth: u32,
    ) -> Result<(), ActionError> {
        let execution_id = tracker.execution_id();
        match plan {
            ActionPlan::Notify(parameters) => {
                self.observer
                    .notify(execution_id, tracker.workflow_id(), &parameters);
            }
            ActionPlan::Log { level, message } => {
                emit_log(level, tracker.workflow_id(), execution_id, &message);
            }
            ActionPlan::SetVariable { name, value } => {
                tracker.set_variable(&name, value);
            }
            ActionPlan::RunWorkflow {
                workflow_id,
                variables,
            } => {
                let child = self
                    .execute_at_depth(workflow_id, variables, ExecuteOptions::default(), depth + 1)
                    .await
                    .map_err(|e| ActionError::Failed(e.to_string()))?;
                tracing::info!(
                    execution_id = %execution_id,
                    child_execution_id = %child.execution_id,
                    child_workflow = child.workflow_id.as_str(),
                    status = %child.status,
                    "nested workflow finished"
                );
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("workflows", &self.registry.len())
            .field("executions", &self.store.len())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
