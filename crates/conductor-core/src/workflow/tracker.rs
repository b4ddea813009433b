//! Execution records.
//!
//! [`ExecutionStore`] holds every `Execution` created in this process, keyed
//! by execution id. [`ExecutionTracker`] is the driver's handle on one record:
//! the driver is its single writer, readers get snapshot clones, and
//! `cancel` only touches status and end time. A record stays in the store
//! until its driver releases it. Map guards are never held across an await.

use std::sync::Arc;

use chrono::Utc;
use conductor_types::workflow::{Execution, ExecutionStatus, StepExecution, StepStatus};
use dashmap::{DashMap, DashSet};
use serde_json::{json, Value};
use uuid::Uuid;

/// Concurrent store of execution records.
#[derive(Debug, Clone, Default)]
pub struct ExecutionStore {
    executions: Arc<DashMap<Uuid, Execution>>,
    /// Records whose driver has not released them yet.
    active: Arc<DashSet<Uuid>>,
}

impl ExecutionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new record and return the driver's handle on it.
    pub fn insert(&self, execution: Execution) -> ExecutionTracker {
        let tracker = ExecutionTracker {
            store: self.clone(),
            execution_id: execution.execution_id,
            workflow_id: execution.workflow_id.clone(),
        };
        self.active.insert(execution.execution_id);
        self.executions.insert(execution.execution_id, execution);
        tracker
    }

    pub fn get(&self, execution_id: Uuid) -> Option<Execution> {
        self.executions.get(&execution_id).map(|e| e.value().clone())
    }

    /// Snapshots ordered by execution id (creation order for UUIDv7).
    pub fn list(&self, workflow_id: Option<&str>) -> Vec<Execution> {
        let mut out: Vec<Execution> = self
            .executions
            .iter()
            .filter(|e| workflow_id.is_none_or(|id| e.workflow_id == id))
            .map(|e| e.value().clone())
            .collect();
        out.sort_by_key(|e| e.execution_id);
        out
    }

    /// Mark a running execution cancelled. Returns whether it took effect.
    pub fn cancel(&self, execution_id: Uuid) -> bool {
        match self.executions.get_mut(&execution_id) {
            Some(mut exec) if exec.status == ExecutionStatus::Running => {
                exec.status = ExecutionStatus::Cancelled;
                exec.end_time = Some(Utc::now());
                true
            }
            _ => false,
        }
    }

    /// Remove a record that is neither running nor still held by its driver.
    /// Returns the removed snapshot.
    pub fn evict(&self, execution_id: Uuid) -> Option<Execution> {
        self.executions
            .remove_if(&execution_id, |id, exec| {
                exec.status != ExecutionStatus::Running && !self.active.contains(id)
            })
            .map(|(_, exec)| exec)
    }

    /// Whether the driver of `execution_id` still holds its record.
    pub fn is_active(&self, execution_id: Uuid) -> bool {
        self.active.contains(&execution_id)
    }

    pub fn len(&self) -> usize {
        self.executions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.executions.is_empty()
    }
}

/// The driver's handle on one execution record.
#[derive(Debug, Clone)]
pub struct ExecutionTracker {
    store: ExecutionStore,
    execution_id: Uuid,
    workflow_id: String,
}

impl ExecutionTracker {
    pub fn execution_id(&self) -> Uuid {
        self.execution_id
    }

    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    pub fn snapshot(&self) -> Option<Execution> {
        self.store.get(self.execution_id)
    }

    pub fn status(&self) -> Option<ExecutionStatus> {
        self.with_execution(|e| e.status)
    }

    /// The driver is done with this record; it may now be evicted.
    pub fn release(&self) {
        self.store.active.remove(&self.execution_id);
    }

    pub fn is_cancelled(&self) -> bool {
        self.status() == Some(ExecutionStatus::Cancelled)
    }

    /// Run `f` against the current record. `None` if it was evicted.
    pub fn with_execution<R>(&self, f: impl FnOnce(&Execution) -> R) -> Option<R> {
        self.store.executions.get(&self.execution_id).map(|e| f(e.value()))
    }

    fn update<R>(&self, f: impl FnOnce(&mut Execution) -> R) -> Option<R> {
        self.store
            .executions
            .get_mut(&self.execution_id)
            .map(|mut e| f(e.value_mut()))
    }

    /// Apply a legal status transition. Terminal states stamp the end time.
    pub fn transition(&self, next: ExecutionStatus) -> bool {
        self.update(|exec| {
            if !exec.status.can_transition_to(next) {
                return false;
            }
            exec.status = next;
            if next.is_terminal() {
                exec.end_time = Some(Utc::now());
                exec.current_step_id = None;
            }
            true
        })
        .unwrap_or(false)
    }

    /// Transition to `failed` and record the error message.
    pub fn fail(&self, message: impl Into<String>) -> bool {
        let message = message.into();
        self.update(|exec| {
            if !exec.status.can_transition_to(ExecutionStatus::Failed) {
                return false;
            }
            exec.status = ExecutionStatus::Failed;
            exec.end_time = Some(Utc::now());
            exec.current_step_id = None;
            exec.error = Some(message);
            true
        })
        .unwrap_or(false)
    }

    pub fn start_step(&self, step_id: &str) {
        self.update(|exec| {
            exec.current_step_id = Some(step_id.to_string());
            if let Some(step) = exec.step_mut(step_id) {
                step.status = StepStatus::Running;
                step.start_time = Some(Utc::now());
            }
        });
    }

    /// Count one more operation invocation. Returns the new attempt number.
    pub fn record_attempt(&self, step_id: &str) -> u32 {
        self.update(|exec| {
            exec.step_mut(step_id).map(|step| {
                step.attempts += 1;
                step.attempts
            })
        })
        .flatten()
        .unwrap_or(0)
    }

    /// Mark a step completed and publish its result under `steps.<id>.result`.
    /// Returns the updated step, or `None` if it was already terminal.
    pub fn complete_step(&self, step_id: &str, result: Value) -> Option<StepExecution> {
        self.update(|exec| {
            let step = exec.step_mut(step_id).filter(|s| !s.status.is_terminal())?;
            step.status = StepStatus::Completed;
            step.end_time = Some(Utc::now());
            step.result = Some(result.clone());
            let snapshot = step.clone();
            exec.step_results
                .insert(step_id.to_string(), json!({ "result": result }));
            Some(snapshot)
        })
        .flatten()
    }

    pub fn fail_step(&self, step_id: &str, error: impl Into<String>) -> Option<StepExecution> {
        let error = error.into();
        self.finish_step(step_id, |step| {
            step.status = StepStatus::Failed;
            step.error = Some(error);
        })
    }

    pub fn skip_step(&self, step_id: &str) -> Option<StepExecution> {
        self.finish_step(step_id, |step| {
            step.status = StepStatus::Skipped;
            step.attempts = 0;
        })
    }

    fn finish_step(&self, step_id: &str, f: impl FnOnce(&mut StepExecution)) -> Option<StepExecution> {
        self.update(|exec| {
            let step = exec.step_mut(step_id).filter(|s| !s.status.is_terminal())?;
            f(step);
            step.end_time = Some(Utc::now());
            Some(step.clone())
        })
        .flatten()
    }

    pub fn set_variable(&self, name: &str, value: Value) {
        self.update(|exec| {
            exec.variables.insert(name.to_string(), value);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conductor_types::workflow::{WorkflowDefinition, WorkflowStep};
    use serde_json::Map;

    fn tracker() -> (ExecutionStore, ExecutionTracker) {
        let def = WorkflowDefinition::new(
            "wf",
            vec![WorkflowStep::new("a", "noop"), WorkflowStep::new("b", "noop")],
        );
        let store = ExecutionStore::new();
        let tracker = store.insert(Execution::new(&def, Map::new()));
        (store, tracker)
    }

    #[test]
    fn transitions_follow_state_machine() {
        let (_, t) = tracker();
        assert!(!t.transition(ExecutionStatus::Completed));
        assert!(t.transition(ExecutionStatus::Running));
        assert!(t.transition(ExecutionStatus::Completed));
        assert!(!t.transition(ExecutionStatus::Failed));
        let snap = t.snapshot().unwrap();
        assert_eq!(snap.status, ExecutionStatus::Completed);
        assert!(snap.end_time.is_some());
    }

    #[test]
    fn step_terminal_status_is_set_once() {
        let (_, t) = tracker();
        t.start_step("a");
        assert_eq!(t.record_attempt("a"), 1);
        assert_eq!(t.record_attempt("a"), 2);

        let done = t.complete_step("a", json!({ "value": 1 })).unwrap();
        assert_eq!(done.status, StepStatus::Completed);
        assert_eq!(done.attempts, 2);
        assert!(t.fail_step("a", "late").is_none());
        assert!(t.complete_step("a", json!(null)).is_none());

        let snap = t.snapshot().unwrap();
        assert_eq!(snap.step_result("a"), Some(&json!({ "value": 1 })));
        assert_eq!(snap.current_step_id.as_deref(), Some("a"));
    }

    #[test]
    fn skip_resets_attempts() {
        let (_, t) = tracker();
        let skipped = t.skip_step("b").unwrap();
        assert_eq!(skipped.status, StepStatus::Skipped);
        assert_eq!(skipped.attempts, 0);
        assert!(skipped.end_time.is_some());
    }

    #[test]
    fn cancel_only_affects_running() {
        let (store, t) = tracker();
        assert!(!store.cancel(t.execution_id()));
        assert_eq!(t.status(), Some(ExecutionStatus::Pending));

        t.transition(ExecutionStatus::Running);
        assert!(store.cancel(t.execution_id()));
        assert!(t.is_cancelled());
        assert!(t.snapshot().unwrap().end_time.is_some());
        assert!(!store.cancel(t.execution_id()));
        assert!(!store.cancel(Uuid::now_v7()));
    }

    #[test]
    fn evict_refuses_running() {
        let (store, t) = tracker();
        t.transition(ExecutionStatus::Running);
        assert!(store.evict(t.execution_id()).is_none());
        t.fail("boom");
        assert!(store.evict(t.execution_id()).is_none());
        t.release();
        assert!(!store.is_active(t.execution_id()));
        let evicted = store.evict(t.execution_id()).unwrap();
        assert_eq!(evicted.error.as_deref(), Some("boom"));
        assert!(store.is_empty());
        assert!(t.snapshot().is_none());
    }

    #[test]
    fn evict_waits_for_release_of_cancelled_record() {
        let (store, t) = tracker();
        t.transition(ExecutionStatus::Running);
        assert!(store.cancel(t.execution_id()));
        assert!(store.is_active(t.execution_id()));
        assert!(store.evict(t.execution_id()).is_none());
        assert!(t.snapshot().is_some());

        t.release();
        assert!(store.evict(t.execution_id()).is_some());
    }

    #[test]
    fn list_filters_by_workflow() {
        let (store, first) = tracker();
        let other = WorkflowDefinition::new("other", vec![WorkflowStep::new("x", "noop")]);
        store.insert(Execution::new(&other, Map::new()));
        let second = store.insert(Execution::new(
            &WorkflowDefinition::new("wf", vec![WorkflowStep::new("a", "noop")]),
            Map::new(),
        ));

        let ids: Vec<Uuid> = store.list(Some("wf")).iter().map(|e| e.execution_id).collect();
        assert_eq!(ids, vec![first.execution_id(), second.execution_id()]);
        assert_eq!(store.list(None).len(), 3);
    }
}
