//! Workflow definition parsing, validation, and filesystem operations.
//!
//! Converts YAML/JSON documents into `WorkflowDefinition`s, validates the
//! structural constraints the engine relies on (unique step IDs, well-formed
//! conditions and retry policies), and discovers workflow files on disk.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use conductor_types::workflow::{Condition, ConditionType, WorkflowDefinition};
use thiserror::Error;
use uuid::Uuid;

use super::path::{FieldPath, STEPS_ROOT};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that can occur during workflow operations.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Unknown workflow, malformed definition, invalid pattern or template,
    /// reserved variable, unknown predicate. Fails fast; nothing is retried.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The workflow's preconditions did not hold; no step ran.
    #[error("workflow '{workflow_id}' precondition not met: {reason}")]
    PreconditionNotMet {
        workflow_id: String,
        execution_id: Uuid,
        reason: String,
    },

    /// A step failed terminally and its error handling aborted the run.
    #[error("workflow '{workflow_id}' step '{step_id}' failed after {attempts} attempt(s): {message}")]
    StepFailed {
        workflow_id: String,
        execution_id: Uuid,
        step_id: String,
        attempts: u32,
        message: String,
    },

    /// A custom predicate reported an error.
    #[error("custom predicate '{name}' failed: {message}")]
    Predicate { name: String, message: String },

    /// YAML/JSON parse failure.
    #[error("parse error: {0}")]
    Parse(String),

    /// Filesystem I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkflowError {
    pub fn configuration(message: impl Into<String>) -> Self {
        WorkflowError::Configuration(message.into())
    }

    /// The execution this error belongs to, when one was created.
    pub fn execution_id(&self) -> Option<Uuid> {
        match self {
            WorkflowError::PreconditionNotMet { execution_id, .. }
            | WorkflowError::StepFailed { execution_id, .. } => Some(*execution_id),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse a YAML or JSON document into validated definitions.
///
/// A document is either a single definition or a bundle with the definitions
/// under a top-level `workflows` list.
pub fn parse_workflow_document(content: &str) -> Result<Vec<WorkflowDefinition>, WorkflowError> {
    let document: serde_yaml_ng::Value =
        serde_yaml_ng::from_str(content).map_err(|e| WorkflowError::Parse(e.to_string()))?;

    let is_bundle = document
        .as_mapping()
        .is_some_and(|m| m.contains_key("workflows"));

    let definitions = if is_bundle {
        #[derive(serde::Deserialize)]
        struct WorkflowBundle {
            workflows: Vec<WorkflowDefinition>,
        }
        let bundle: WorkflowBundle =
            serde_yaml_ng::from_value(document).map_err(|e| WorkflowError::Parse(e.to_string()))?;
        bundle.workflows
    } else {
        let single: WorkflowDefinition =
            serde_yaml_ng::from_value(document).map_err(|e| WorkflowError::Parse(e.to_string()))?;
        vec![single]
    };

    for def in &definitions {
        validate_definition(def)?;
    }
    Ok(definitions)
}

/// Serialize a `WorkflowDefinition` to a YAML string.
pub fn serialize_workflow_yaml(def: &WorkflowDefinition) -> Result<String, WorkflowError> {
    serde_yaml_ng::to_string(def).map_err(|e| WorkflowError::Parse(e.to_string()))
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate structural constraints on a `WorkflowDefinition`.
///
/// Checks:
/// - Workflow id is non-empty
/// - At least one step exists, every step has an id and an operation
/// - All step IDs are unique
/// - Retry policies allow at least one attempt, timeouts are > 0
/// - Conditions are well formed (see [`validate_condition`])
/// - Default variables do not use the reserved `steps` name
pub fn validate_definition(def: &WorkflowDefinition) -> Result<(), WorkflowError> {
    if def.id.trim().is_empty() {
        return Err(WorkflowError::configuration("workflow id must not be empty"));
    }

    if def.steps.is_empty() {
        return Err(WorkflowError::configuration(format!(
            "workflow '{}' must have at least one step",
            def.id
        )));
    }

    let mut seen_ids = HashSet::new();
    for step in &def.steps {
        if step.id.is_empty() {
            return Err(WorkflowError::configuration(format!(
                "workflow '{}' has a step with an empty id",
                def.id
            )));
        }
        if !seen_ids.insert(step.id.as_str()) {
            return Err(WorkflowError::configuration(format!(
                "workflow '{}' has duplicate step ID '{}'",
                def.id, step.id
            )));
        }
        if step.operation.trim().is_empty() {
            return Err(WorkflowError::configuration(format!(
                "step '{}' has no operation",
                step.id
            )));
        }
        if let Some(retry) = &step.retry {
            if retry.max_attempts < 1 {
                return Err(WorkflowError::configuration(format!(
                    "step '{}': retry.maxAttempts must be >= 1",
                    step.id
                )));
            }
        }
        if step.timeout_ms == Some(0) {
            return Err(WorkflowError::configuration(format!(
                "step '{}': timeout must be > 0",
                step.id
            )));
        }
        for condition in &step.conditions {
            validate_condition(condition)
                .map_err(|e| WorkflowError::configuration(format!("step '{}': {e}", step.id)))?;
        }
    }

    for condition in &def.preconditions {
        validate_condition(condition)
            .map_err(|e| WorkflowError::configuration(format!("precondition: {e}")))?;
    }

    if def.variables.contains_key(STEPS_ROOT) {
        return Err(WorkflowError::configuration(format!(
            "workflow '{}': variable name '{STEPS_ROOT}' is reserved for step results",
            def.id
        )));
    }

    Ok(())
}

/// Validate one condition: operator/type pairing, field path, regex pattern,
/// and a predicate name for `custom` conditions.
pub fn validate_condition(condition: &Condition) -> Result<(), String> {
    if let Some(op) = condition.operator {
        if !op.applies_to(condition.condition_type) {
            return Err(format!(
                "operator {op:?} is not valid for {:?} conditions",
                condition.condition_type
            ));
        }
    }

    if condition.condition_type == ConditionType::Custom {
        return match condition.predicate.as_deref() {
            Some(name) if !name.is_empty() => Ok(()),
            _ => Err("custom condition requires a predicate name".to_string()),
        };
    }

    FieldPath::parse(&condition.field).map_err(|e| e.to_string())?;

    if condition.condition_type == ConditionType::Regex {
        let pattern = condition
            .value
            .as_ref()
            .and_then(|v| v.as_str())
            .ok_or_else(|| format!("regex condition on '{}' requires a string pattern", condition.field))?;
        regex::Regex::new(pattern).map_err(|e| format!("invalid regex pattern '{pattern}': {e}"))?;
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Filesystem operations
// ---------------------------------------------------------------------------

/// Load all workflow definitions from a YAML or JSON file.
pub fn load_workflow_file(path: &Path) -> Result<Vec<WorkflowDefinition>, WorkflowError> {
    let content = std::fs::read_to_string(path)?;
    parse_workflow_document(&content)
}

/// Save a workflow definition to a YAML file.
///
/// Creates parent directories if they don't exist.
pub fn save_workflow_file(path: &Path, def: &WorkflowDefinition) -> Result<(), WorkflowError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let yaml = serialize_workflow_yaml(def)?;
    std::fs::write(path, yaml)?;
    Ok(())
}

/// Workflow document paths (`.yaml`, `.yml`, `.json`) under `dir`,
/// recursively, in sorted order. A missing directory yields no files.
pub fn workflow_files(dir: &Path) -> Result<Vec<PathBuf>, WorkflowError> {
    let mut files = Vec::new();
    if dir.exists() {
        collect_files(dir, &mut files)?;
    }
    Ok(files)
}

fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), WorkflowError> {
    let mut paths = std::fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()?;
    paths.sort();

    for path in paths {
        if path.is_dir() {
            collect_files(&path, files)?;
            continue;
        }
        let is_document = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| matches!(ext, "yaml" | "yml" | "json"));
        if is_document {
            files.push(path);
        }
    }
    Ok(())
}

/// Discover all workflow definitions under `base_dir`.
///
/// Files that fail to parse or validate are skipped with a warning.
pub fn discover_workflows(
    base_dir: &Path,
) -> Result<Vec<(PathBuf, WorkflowDefinition)>, WorkflowError> {
    let mut results = Vec::new();
    for path in workflow_files(base_dir)? {
        match load_workflow_file(&path) {
            Ok(defs) => results.extend(defs.into_iter().map(|d| (path.clone(), d))),
            Err(err) => {
                tracing::warn!(?path, error = %err, "skipping unparseable workflow file");
            }
        }
    }
    Ok(results)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
