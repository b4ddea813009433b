//! Workflow domain types for Conductor.
//!
//! Defines the canonical representation of a workflow: YAML/JSON documents and
//! programmatic callers both produce `WorkflowDefinition`. This module also
//! contains the execution tracking types (`Execution`, `StepExecution`) that
//! the engine mutates while a run is in flight.
//!
//! Serialized field names are camelCase (`errorHandling`, `maxAttempts`,
//! `backoffMs`, `onSuccess`, ...) so externally authored documents and
//! in-process definitions share one shape.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Workflow Definition
// ---------------------------------------------------------------------------

/// A named, ordered sequence of steps plus optional guard and hook metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDefinition {
    /// Registry key. Unique per registry.
    pub id: String,
    /// Human-readable workflow name.
    pub name: String,
    /// Optional longer description.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Free-form grouping used by `list(category)`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub category: String,
    /// Steps, executed strictly in this order.
    pub steps: Vec<WorkflowStep>,
    /// Default variables, overridden key by key by caller input.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub variables: Map<String, Value>,
    /// Conditions that must all hold before any step runs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preconditions: Vec<Condition>,
    /// Actions run after a successful execution.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub on_success: Vec<WorkflowAction>,
    /// Actions run after an unrecovered failure.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub on_failure: Vec<WorkflowAction>,
}

impl WorkflowDefinition {
    /// Create a definition with the given id and steps; `name` defaults to the id.
    pub fn new(id: impl Into<String>, steps: Vec<WorkflowStep>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            description: String::new(),
            category: String::new(),
            steps,
            variables: Map::new(),
            preconditions: Vec::new(),
            on_success: Vec::new(),
            on_failure: Vec::new(),
        }
    }

    /// Look up a step by its id.
    pub fn step(&self, step_id: &str) -> Option<&WorkflowStep> {
        self.steps.iter().find(|s| s.id == step_id)
    }
}

// ---------------------------------------------------------------------------
// Step Definition
// ---------------------------------------------------------------------------

/// One unit of work bound to a single named external operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStep {
    /// Step ID, unique within its workflow.
    pub id: String,
    /// Human-readable step name.
    #[serde(default)]
    pub name: String,
    /// Operation name, resolved by the external invoker.
    pub operation: String,
    /// Parameter template: nested literals and whole-leaf `${path}` references.
    #[serde(default = "empty_object")]
    pub parameters: Value,
    /// Gating conditions, AND-combined.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    /// Retry policy applied to operation failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryPolicy>,
    /// What a terminal failure of this step does to the run.
    #[serde(default)]
    pub error_handling: ErrorHandling,
    /// Per-attempt timeout in milliseconds.
    #[serde(rename = "timeout", default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

impl WorkflowStep {
    /// Create a step with an empty parameter template and default handling.
    pub fn new(id: impl Into<String>, operation: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            operation: operation.into(),
            parameters: empty_object(),
            conditions: Vec::new(),
            retry: None,
            error_handling: ErrorHandling::Fail,
            timeout_ms: None,
        }
    }

    /// Builder: set the parameter template.
    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = parameters;
        self
    }

    /// Builder: add a gating condition.
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Builder: set the retry policy.
    pub fn with_retry(mut self, max_attempts: u32, backoff_ms: u64) -> Self {
        self.retry = Some(RetryPolicy {
            max_attempts,
            backoff_ms,
        });
        self
    }

    /// Builder: set the error handling mode.
    pub fn with_error_handling(mut self, error_handling: ErrorHandling) -> Self {
        self.error_handling = error_handling;
        self
    }

    /// Builder: set the per-attempt timeout.
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    /// The retry policy the executor actually applies.
    ///
    /// An explicit `retry` wins. `errorHandling: retry` without a policy falls
    /// back to [`RetryPolicy::default`]. Otherwise the step gets one attempt.
    pub fn effective_retry(&self) -> Option<RetryPolicy> {
        match (&self.retry, self.error_handling) {
            (Some(policy), _) => Some(policy.clone()),
            (None, ErrorHandling::Retry) => Some(RetryPolicy::default()),
            (None, _) => None,
        }
    }
}

/// What happens to the run when a step fails terminally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorHandling {
    /// Abort the remaining steps and fail the execution.
    #[default]
    Fail,
    /// Record the failure and proceed to the next step.
    Continue,
    /// Retry with the default policy when none is configured, then fail.
    Retry,
}

// ---------------------------------------------------------------------------
// Retry Policy
// ---------------------------------------------------------------------------

/// Retry configuration for a workflow step.
///
/// Backoff is linear: the wait before attempt `n + 1` is `backoff_ms * n`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first (default 3).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base backoff in milliseconds (default 1000).
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    1000
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

// ---------------------------------------------------------------------------
// Conditions
// ---------------------------------------------------------------------------

/// A gating predicate checked before a step or a whole workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Family of the check.
    #[serde(rename = "type")]
    pub condition_type: ConditionType,
    /// Dotted path into the execution scope (e.g. `steps.a.result.status`).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub field: String,
    /// Operator; defaults per type when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<ConditionOperator>,
    /// Comparison value or regex pattern. An explicit `null` is kept as a value.
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub value: Option<Value>,
    /// Name of a predicate registered with the engine (`custom` only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicate: Option<String>,
}

/// Keeps `value: null` distinct from a missing `value`.
fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl Condition {
    fn new(
        condition_type: ConditionType,
        field: impl Into<String>,
        operator: ConditionOperator,
        value: Option<Value>,
    ) -> Self {
        Self {
            condition_type,
            field: field.into(),
            operator: Some(operator),
            value,
            predicate: None,
        }
    }

    /// `value`/`equals`.
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(
            ConditionType::Value,
            field,
            ConditionOperator::Equals,
            Some(value.into()),
        )
    }

    /// `value`/`notEquals`.
    pub fn not_equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(
            ConditionType::Value,
            field,
            ConditionOperator::NotEquals,
            Some(value.into()),
        )
    }

    /// `value`/`contains`.
    pub fn contains(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(
            ConditionType::Value,
            field,
            ConditionOperator::Contains,
            Some(value.into()),
        )
    }

    /// `exists`/`exists`.
    pub fn exists(field: impl Into<String>) -> Self {
        Self::new(ConditionType::Exists, field, ConditionOperator::Exists, None)
    }

    /// `regex`/`matches`.
    pub fn matches(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::new(
            ConditionType::Regex,
            field,
            ConditionOperator::Matches,
            Some(Value::String(pattern.into())),
        )
    }

    /// `custom`, delegating to the named predicate.
    pub fn custom(predicate: impl Into<String>) -> Self {
        Self {
            condition_type: ConditionType::Custom,
            field: String::new(),
            operator: None,
            value: None,
            predicate: Some(predicate.into()),
        }
    }

    /// The operator applied, falling back to the type's natural operator.
    ///
    /// `custom` conditions have no operator.
    pub fn effective_operator(&self) -> Option<ConditionOperator> {
        self.operator.or(match self.condition_type {
            ConditionType::Value => Some(ConditionOperator::Equals),
            ConditionType::Exists => Some(ConditionOperator::Exists),
            ConditionType::Regex => Some(ConditionOperator::Matches),
            ConditionType::Custom => None,
        })
    }
}

/// Family of a gating condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionType {
    Value,
    Exists,
    Regex,
    Custom,
}

/// Operator applied by a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    Contains,
    Exists,
    Matches,
}

impl ConditionOperator {
    /// Whether this operator is meaningful for the given condition type.
    pub fn applies_to(self, condition_type: ConditionType) -> bool {
        match condition_type {
            ConditionType::Value => matches!(
                self,
                ConditionOperator::Equals | ConditionOperator::NotEquals | ConditionOperator::Contains
            ),
            ConditionType::Exists => self == ConditionOperator::Exists,
            ConditionType::Regex => self == ConditionOperator::Matches,
            ConditionType::Custom => true,
        }
    }
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// A success/failure hook run after the step loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowAction {
    #[serde(rename = "type")]
    pub action_type: ActionType,
    /// Free-form parameters; whole-leaf `${path}` references are resolved.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub parameters: Map<String, Value>,
}

impl WorkflowAction {
    pub fn new(action_type: ActionType, parameters: Value) -> Self {
        let parameters = match parameters {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            action_type,
            parameters,
        }
    }
}

/// Kind of workflow action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionType {
    /// Forward parameters to the observer's notify hook.
    Notify,
    /// Emit `message` through the engine's log.
    Log,
    /// Set variable `name` to `value` in the execution scope.
    SetVariable,
    /// Execute workflow `workflowId` with `variables`.
    RunWorkflow,
}

// ---------------------------------------------------------------------------
// Execution Status
// ---------------------------------------------------------------------------

/// Overall status of an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl ExecutionStatus {
    /// Completed, failed, and cancelled are final.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ExecutionStatus::Completed | ExecutionStatus::Failed | ExecutionStatus::Cancelled
        )
    }

    /// Legal transitions of the execution state machine.
    ///
    /// `pending -> running -> {completed, failed, cancelled}`, plus
    /// `pending -> failed` for precondition and setup failures.
    pub fn can_transition_to(self, next: ExecutionStatus) -> bool {
        use ExecutionStatus::*;
        matches!(
            (self, next),
            (Pending, Running) | (Pending, Failed) | (Running, Completed) | (Running, Failed) | (Running, Cancelled)
        )
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExecutionStatus::Pending => "pending",
            ExecutionStatus::Running => "running",
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Status of an individual step within an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

impl StepStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, StepStatus::Completed | StepStatus::Failed | StepStatus::Skipped)
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StepStatus::Pending => "pending",
            StepStatus::Running => "running",
            StepStatus::Completed => "completed",
            StepStatus::Failed => "failed",
            StepStatus::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Execution records
// ---------------------------------------------------------------------------

/// One run instance of a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Execution {
    pub workflow_id: String,
    /// UUIDv7, unique for the lifetime of the process.
    pub execution_id: Uuid,
    pub status: ExecutionStatus,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_step_id: Option<String>,
    /// One entry per definition step, in definition order.
    pub steps: Vec<StepExecution>,
    /// Flat variable bag: defaults merged with caller input.
    pub variables: Map<String, Value>,
    /// Engine-written step results, shaped `{ "<id>": { "result": <value> } }`.
    #[serde(default)]
    pub step_results: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Execution {
    /// Create a `pending` execution with one `pending` entry per step.
    pub fn new(definition: &WorkflowDefinition, variables: Map<String, Value>) -> Self {
        Self {
            workflow_id: definition.id.clone(),
            execution_id: Uuid::now_v7(),
            status: ExecutionStatus::Pending,
            start_time: Utc::now(),
            end_time: None,
            current_step_id: None,
            steps: definition
                .steps
                .iter()
                .map(|s| StepExecution::pending(&s.id))
                .collect(),
            variables,
            step_results: Map::new(),
            error: None,
        }
    }

    pub fn step(&self, step_id: &str) -> Option<&StepExecution> {
        self.steps.iter().find(|s| s.step_id == step_id)
    }

    pub fn step_mut(&mut self, step_id: &str) -> Option<&mut StepExecution> {
        self.steps.iter_mut().find(|s| s.step_id == step_id)
    }

    /// The recorded result of a completed step.
    pub fn step_result(&self, step_id: &str) -> Option<&Value> {
        self.step_results.get(step_id).and_then(|entry| entry.get("result"))
    }

    /// Count of step entries in the given status.
    pub fn count_steps(&self, status: StepStatus) -> usize {
        self.steps.iter().filter(|s| s.status == status).count()
    }
}

/// Per-step bookkeeping within an execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepExecution {
    pub step_id: String,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Operation invocations made so far (0 for skipped or never-run steps).
    pub attempts: u32,
}

impl StepExecution {
    pub fn pending(step_id: impl Into<String>) -> Self {
        Self {
            step_id: step_id.into(),
            status: StepStatus::Pending,
            start_time: None,
            end_time: None,
            result: None,
            error: None,
            attempts: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_workflow() -> WorkflowDefinition {
        let mut def = WorkflowDefinition::new(
            "provision-app",
            vec![
                WorkflowStep::new("create", "apps:create")
                    .with_parameters(json!({ "name": "${appName}", "region": "eu" }))
                    .with_retry(3, 250),
                WorkflowStep::new("activate", "apps:activate")
                    .with_parameters(json!({ "id": "${steps.create.result.id}" }))
                    .with_condition(Condition::equals("steps.create.result.status", "CREATED"))
                    .with_error_handling(ErrorHandling::Continue)
                    .with_timeout_ms(5_000),
            ],
        );
        def.category = "apps".to_string();
        def.variables.insert("appName".to_string(), json!("demo"));
        def.preconditions.push(Condition::exists("appName"));
        def.on_success.push(WorkflowAction::new(
            ActionType::Log,
            json!({ "message": "provisioned" }),
        ));
        def
    }

    #[test]
    fn test_workflow_definition_json_roundtrip() {
        let def = sample_workflow();
        let json = serde_json::to_string(&def).unwrap();
        let parsed: WorkflowDefinition = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, def);
    }

    #[test]
    fn test_camel_case_field_names() {
        let value = serde_json::to_value(sample_workflow()).unwrap();
        assert!(value.get("onSuccess").is_some());
        let step = &value["steps"][1];
        assert_eq!(step["errorHandling"], json!("continue"));
        assert_eq!(step["timeout"], json!(5_000));
        assert_eq!(value["steps"][0]["retry"]["maxAttempts"], json!(3));
        assert_eq!(value["steps"][0]["retry"]["backoffMs"], json!(250));
    }

    #[test]
    fn test_parse_yaml_workflow() {
        let yaml = r#"
id: onboarding
name: Customer onboarding
category: crm
variables:
  tier: gold
preconditions:
  - type: exists
    field: customerId
steps:
  - id: lookup
    operation: customers:get
    parameters:
      id: "${customerId}"
  - id: welcome
    operation: mail:send
    errorHandling: retry
    conditions:
      - type: regex
        field: steps.lookup.result.email
        value: ".+@.+"
    parameters:
      to: "${steps.lookup.result.email}"
onFailure:
  - type: notify
    parameters:
      channel: ops
"#;
        let def: WorkflowDefinition = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(def.id, "onboarding");
        assert_eq!(def.steps.len(), 2);
        assert_eq!(def.steps[0].error_handling, ErrorHandling::Fail);
        assert_eq!(def.steps[1].error_handling, ErrorHandling::Retry);
        assert_eq!(
            def.steps[1].conditions[0].effective_operator(),
            Some(ConditionOperator::Matches)
        );
        assert_eq!(def.on_failure[0].action_type, ActionType::Notify);
        assert_eq!(def.variables["tier"], json!("gold"));
    }

    #[test]
    fn test_missing_parameters_default_to_empty_object() {
        let step: WorkflowStep = serde_json::from_value(json!({
            "id": "a",
            "operation": "noop"
        }))
        .unwrap();
        assert_eq!(step.parameters, json!({}));
        assert!(step.retry.is_none());
        assert!(step.timeout_ms.is_none());
    }

    #[test]
    fn test_retry_policy_defaults() {
        let policy: RetryPolicy = serde_json::from_value(json!({})).unwrap();
        assert_eq!(policy, RetryPolicy::default());
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.backoff_ms, 1000);
    }

    #[test]
    fn test_effective_retry() {
        let plain = WorkflowStep::new("a", "noop");
        assert!(plain.effective_retry().is_none());

        let retrying = WorkflowStep::new("a", "noop").with_error_handling(ErrorHandling::Retry);
        assert_eq!(retrying.effective_retry(), Some(RetryPolicy::default()));

        let explicit = WorkflowStep::new("a", "noop")
            .with_error_handling(ErrorHandling::Continue)
            .with_retry(5, 10);
        assert_eq!(explicit.effective_retry().unwrap().max_attempts, 5);
    }

    #[test]
    fn test_condition_explicit_null_value_is_kept() {
        let cond: Condition = serde_json::from_value(json!({
            "type": "value",
            "field": "x",
            "value": null
        }))
        .unwrap();
        assert_eq!(cond.value, Some(Value::Null));

        let cond: Condition = serde_json::from_value(json!({
            "type": "value",
            "field": "x"
        }))
        .unwrap();
        assert_eq!(cond.value, None);
    }

    #[test]
    fn test_operator_applies_to() {
        assert!(ConditionOperator::Contains.applies_to(ConditionType::Value));
        assert!(!ConditionOperator::Matches.applies_to(ConditionType::Value));
        assert!(ConditionOperator::Exists.applies_to(ConditionType::Exists));
        assert!(!ConditionOperator::Equals.applies_to(ConditionType::Regex));
    }

    #[test]
    fn test_execution_status_transitions() {
        use ExecutionStatus::*;
        assert!(Pending.can_transition_to(Running));
        assert!(Pending.can_transition_to(Failed));
        assert!(Running.can_transition_to(Cancelled));
        assert!(!Pending.can_transition_to(Cancelled));
        assert!(!Completed.can_transition_to(Failed));
        assert!(!Cancelled.can_transition_to(Completed));
        assert!(Cancelled.is_terminal());
        assert!(!Running.is_terminal());
    }

    #[test]
    fn test_status_serde() {
        assert_eq!(
            serde_json::to_value(ExecutionStatus::Cancelled).unwrap(),
            json!("cancelled")
        );
        assert_eq!(serde_json::to_value(StepStatus::Skipped).unwrap(), json!("skipped"));
        assert_eq!(StepStatus::Running.to_string(), "running");
    }

    #[test]
    fn test_new_execution_has_pending_steps() {
        let def = sample_workflow();
        let exec = Execution::new(&def, def.variables.clone());
        assert_eq!(exec.status, ExecutionStatus::Pending);
        assert_eq!(exec.steps.len(), 2);
        assert_eq!(exec.count_steps(StepStatus::Pending), 2);
        assert_eq!(exec.steps[0].step_id, "create");
        assert!(exec.step_result("create").is_none());
    }

    #[test]
    fn test_execution_ids_are_unique() {
        let def = sample_workflow();
        let a = Execution::new(&def, Map::new());
        let b = Execution::new(&def, Map::new());
        assert_ne!(a.execution_id, b.execution_id);
    }
}
