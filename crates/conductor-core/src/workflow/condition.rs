//! Gating condition evaluation.
//!
//! Conditions read a value from the execution scope through [`FieldPath`] and
//! apply their operator. `custom` conditions delegate to a predicate
//! registered by name. Lists of conditions are AND-combined and stop at the
//! first unmet one.

use std::sync::Arc;

use conductor_types::workflow::{Condition, ConditionOperator, ConditionType, Execution};
use dashmap::DashMap;
use regex::Regex;
use serde_json::{Number, Value};

use super::definition::WorkflowError;
use super::path::FieldPath;

/// Error reported by a custom predicate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct PredicateError(pub String);

/// A host-supplied predicate over the whole execution.
pub type CustomPredicate = Arc<dyn Fn(&Execution) -> Result<bool, PredicateError> + Send + Sync>;

/// Evaluates conditions. Holds named predicates and a compiled-regex cache.
#[derive(Default)]
pub struct ConditionEvaluator {
    predicates: DashMap<String, CustomPredicate>,
    patterns: DashMap<String, Regex>,
}

impl ConditionEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a named predicate.
    pub fn register_predicate<F>(&self, name: impl Into<String>, predicate: F)
    where
        F: Fn(&Execution) -> Result<bool, PredicateError> + Send + Sync + 'static,
    {
        self.predicates.insert(name.into(), Arc::new(predicate));
    }

    pub fn has_predicate(&self, name: &str) -> bool {
        self.predicates.contains_key(name)
    }

    pub fn evaluate(&self, condition: &Condition, execution: &Execution) -> Result<bool, WorkflowError> {
        if condition.condition_type == ConditionType::Custom {
            return self.evaluate_custom(condition, execution);
        }

        let path = FieldPath::parse(&condition.field)?;
        let actual = path.lookup(execution);

        match condition.effective_operator() {
            Some(ConditionOperator::Equals) => Ok(strict_equals(actual, condition.value.as_ref())),
            Some(ConditionOperator::NotEquals) => Ok(!strict_equals(actual, condition.value.as_ref())),
            Some(ConditionOperator::Contains) => {
                let haystack = coerce_string(actual);
                let needle = coerce_string(condition.value.as_ref());
                Ok(haystack.contains(&needle))
            }
            Some(ConditionOperator::Exists) => Ok(actual.is_some()),
            Some(ConditionOperator::Matches) => {
                let pattern = condition
                    .value
                    .as_ref()
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        WorkflowError::configuration(format!(
                            "regex condition on '{}' requires a string pattern",
                            condition.field
                        ))
                    })?;
                let regex = self.compiled(pattern)?;
                Ok(regex.is_match(&coerce_string(actual)))
            }
            None => Err(WorkflowError::configuration(format!(
                "condition on '{}' has no operator",
                condition.field
            ))),
        }
    }

    /// Index of the first unmet condition, or `None` when all hold.
    pub fn first_unmet(
        &self,
        conditions: &[Condition],
        execution: &Execution,
    ) -> Result<Option<usize>, WorkflowError> {
        for (index, condition) in conditions.iter().enumerate() {
            if !self.evaluate(condition, execution)? {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }

    pub fn all_met(&self, conditions: &[Condition], execution: &Execution) -> Result<bool, WorkflowError> {
        Ok(self.first_unmet(conditions, execution)?.is_none())
    }

    fn evaluate_custom(&self, condition: &Condition, execution: &Execution) -> Result<bool, WorkflowError> {
        let name = condition
            .predicate
            .as_deref()
            .ok_or_else(|| WorkflowError::configuration("custom condition requires a predicate name"))?;
        // No map guard is held while the predicate runs.
        let predicate = self
            .predicates
            .get(name)
            .map(|p| Arc::clone(p.value()))
            .ok_or_else(|| WorkflowError::configuration(format!("unknown custom predicate '{name}'")))?;
        predicate(execution).map_err(|e| WorkflowError::Predicate {
            name: name.to_string(),
            message: e.0,
        })
    }

    fn compiled(&self, pattern: &str) -> Result<Regex, WorkflowError> {
        if let Some(regex) = self.patterns.get(pattern) {
            return Ok(regex.clone());
        }
        let regex = Regex::new(pattern)
            .map_err(|e| WorkflowError::configuration(format!("invalid regex pattern '{pattern}': {e}")))?;
        self.patterns.insert(pattern.to_string(), regex.clone());
        Ok(regex)
    }
}

impl std::fmt::Debug for ConditionEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<String> = self.predicates.iter().map(|e| e.key().clone()).collect();
        names.sort_unstable();
        f.debug_struct("ConditionEvaluator")
            .field("predicates", &names)
            .field("cached_patterns", &self.patterns.len())
            .finish()
    }
}

/// Type-and-value equality. Absent only equals absent; numbers compare by
/// numeric value so `1` and `1.0` are equal.
fn strict_equals(actual: Option<&Value>, expected: Option<&Value>) -> bool {
    match (actual, expected) {
        (None, None) => true,
        (Some(Value::Number(a)), Some(Value::Number(b))) => numbers_equal(a, b),
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Integers compare exactly; f64 only when one side is a float.
fn numbers_equal(a: &Number, b: &Number) -> bool {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return x == y;
    }
    if a.is_f64() || b.is_f64() {
        return a.as_f64() == b.as_f64();
    }
    // A negative i64 against a u64 above i64::MAX.
    false
}

/// String form used by `contains` and `matches`.
fn coerce_string(value: Option<&Value>) -> String {
    match value {
        None => "undefined".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
