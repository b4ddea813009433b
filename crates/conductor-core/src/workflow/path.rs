//! Dotted field paths into an execution's scope.
//!
//! The scope has two roots: the flat variable bag, and `steps`, which exposes
//! engine-written step results as `steps.<stepId>.result.<...>`. Numeric
//! segments index into arrays.

use std::fmt;

use conductor_types::workflow::Execution;
use serde_json::Value;

use super::definition::WorkflowError;

/// Reserved scope root for step results.
pub const STEPS_ROOT: &str = "steps";

/// A parsed, non-empty dotted path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// Parse `a.b.c`. Empty paths and empty segments are rejected.
    pub fn parse(raw: &str) -> Result<Self, WorkflowError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(WorkflowError::configuration("empty field path"));
        }
        let segments: Vec<String> = raw.split('.').map(str::to_string).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(WorkflowError::configuration(format!(
                "field path '{raw}' has an empty segment"
            )));
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The step id this path reads from, for `steps.<id>...` paths.
    pub fn step_reference(&self) -> Option<&str> {
        match self.segments.as_slice() {
            [root, step, ..] if root == STEPS_ROOT => Some(step.as_str()),
            _ => None,
        }
    }

    /// Resolve against an execution. `None` means absent.
    pub fn lookup<'a>(&self, execution: &'a Execution) -> Option<&'a Value> {
        let (first, rest) = self.segments.split_first()?;
        if first == STEPS_ROOT {
            let (step_id, rest) = rest.split_first()?;
            let entry = execution.step_results.get(step_id)?;
            walk(entry, rest)
        } else {
            let root = execution.variables.get(first)?;
            walk(root, rest)
        }
    }
}

fn walk<'a>(mut current: &'a Value, segments: &[String]) -> Option<&'a Value> {
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}
