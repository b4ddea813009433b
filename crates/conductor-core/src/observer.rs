//! Observability port.
//!
//! [`WorkflowObserver`] receives lifecycle hooks from the orchestrator and the
//! step executor: an execution became active, a step reached a terminal
//! status, an operation succeeded (audit), a `notify` action fired, and the
//! execution is no longer active. Every hook has a no-op default.
//!
//! Stock implementations:
//! - [`NoopObserver`] -- discards everything.
//! - [`TracingObserver`] -- structured `tracing` events.
//! - [`EventBusObserver`] -- publishes [`WorkflowEvent`]s on an [`EventBus`].
//! - [`ObserverSet`] -- fans out to several observers.

use std::sync::Arc;

use conductor_types::event::{AuditRecord, WorkflowEvent};
use conductor_types::workflow::{Execution, ExecutionStatus, StepExecution};
use serde_json::Value;
use uuid::Uuid;

use crate::event::bus::EventBus;

/// Hooks the engine calls out to. Implementations must be cheap and must not
/// block: they run inline on the execution's driver.
pub trait WorkflowObserver: Send + Sync {
    /// The execution was created and is now active.
    fn execution_started(&self, _execution: &Execution) {}

    /// A step reached a terminal status (completed, failed, or skipped).
    fn step_advanced(&self, _execution_id: Uuid, _step: &StepExecution) {}

    /// An operation attempt succeeded.
    fn audit(&self, _record: &AuditRecord) {}

    /// A `notify` action fired with its resolved parameters.
    fn notify(&self, _execution_id: Uuid, _workflow_id: &str, _parameters: &Value) {}

    /// The execution is no longer active. Called exactly once per execution,
    /// on every exit path.
    fn execution_finished(&self, _execution_id: Uuid, _workflow_id: &str, _status: ExecutionStatus) {}
}

// ---------------------------------------------------------------------------
// NoopObserver
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl WorkflowObserver for NoopObserver {}

// ---------------------------------------------------------------------------
// TracingObserver
// ---------------------------------------------------------------------------

/// Logs every hook as a structured `tracing` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl WorkflowObserver for TracingObserver {
    fn execution_started(&self, execution: &Execution) {
        tracing::info!(
            execution_id = %execution.execution_id,
            workflow = execution.workflow_id.as_str(),
            steps = execution.steps.len(),
            "execution active"
        );
    }

    fn step_advanced(&self, execution_id: Uuid, step: &StepExecution) {
        tracing::info!(
            execution_id = %execution_id,
            step_id = step.step_id.as_str(),
            status = %step.status,
            attempts = step.attempts,
            "step advanced"
        );
    }

    fn audit(&self, record: &AuditRecord) {
        tracing::info!(
            target: "conductor::audit",
            execution_id = %record.execution_id,
            workflow = record.workflow_id.as_str(),
            step_id = record.step_id.as_str(),
            operation = record.operation.as_str(),
            parameters = %record.parameters,
            success = record.success,
            "operation invoked"
        );
    }

    fn notify(&self, execution_id: Uuid, workflow_id: &str, parameters: &Value) {
        tracing::info!(
            execution_id = %execution_id,
            workflow = workflow_id,
            parameters = %parameters,
            "workflow notification"
        );
    }

    fn execution_finished(&self, execution_id: Uuid, workflow_id: &str, status: ExecutionStatus) {
        tracing::info!(
            execution_id = %execution_id,
            workflow = workflow_id,
            status = %status,
            "execution inactive"
        );
    }
}

// ---------------------------------------------------------------------------
// EventBusObserver
// ---------------------------------------------------------------------------

/// Publishes every hook as a [`WorkflowEvent`].
#[derive(Debug, Clone)]
pub struct EventBusObserver {
    bus: EventBus,
}

impl EventBusObserver {
    pub fn new(bus: EventBus) -> Self {
        Self { bus }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }
}

impl WorkflowObserver for EventBusObserver {
    fn execution_started(&self, execution: &Execution) {
        self.bus.publish(WorkflowEvent::ExecutionStarted {
            execution_id: execution.execution_id,
            workflow_id: execution.workflow_id.clone(),
        });
    }

    fn step_advanced(&self, execution_id: Uuid, step: &StepExecution) {
        self.bus.publish(WorkflowEvent::StepAdvanced {
            execution_id,
            step_id: step.step_id.clone(),
            status: step.status,
            attempts: step.attempts,
        });
    }

    fn audit(&self, record: &AuditRecord) {
        self.bus.publish(WorkflowEvent::OperationAudited(record.clone()));
    }

    fn notify(&self, execution_id: Uuid, workflow_id: &str, parameters: &Value) {
        self.bus.publish(WorkflowEvent::Notification {
            execution_id,
            workflow_id: workflow_id.to_string(),
            parameters: parameters.clone(),
        });
    }

    fn execution_finished(&self, execution_id: Uuid, workflow_id: &str, status: ExecutionStatus) {
        self.bus.publish(WorkflowEvent::ExecutionFinished {
            execution_id,
            workflow_id: workflow_id.to_string(),
            status,
        });
    }
}

// ---------------------------------------------------------------------------
// ObserverSet
// ---------------------------------------------------------------------------

/// Forwards every hook to each member, in insertion order.
#[derive(Clone, Default)]
pub struct ObserverSet {
    observers: Vec<Arc<dyn WorkflowObserver>>,
}

impl ObserverSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, observer: Arc<dyn WorkflowObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl WorkflowObserver for ObserverSet {
    fn execution_started(&self, execution: &Execution) {
        for o in &self.observers {
            o.execution_started(execution);
        }
    }

    fn step_advanced(&self, execution_id: Uuid, step: &StepExecution) {
        for o in &self.observers {
            o.step_advanced(execution_id, step);
        }
    }

    fn audit(&self, record: &AuditRecord) {
        for o in &self.observers {
            o.audit(record);
        }
    }

    fn notify(&self, execution_id: Uuid, workflow_id: &str, parameters: &Value) {
        for o in &self.observers {
            o.notify(execution_id, workflow_id, parameters);
        }
    }

    fn execution_finished(&self, execution_id: Uuid, workflow_id: &str, status: ExecutionStatus) {
        for o in &self.observers {
            o.execution_finished(execution_id, workflow_id, status);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingObserver;
    use conductor_types::workflow::StepStatus;

    #[test]
    fn event_bus_observer_publishes_step_events() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        let observer = EventBusObserver::new(bus);

        let mut step = StepExecution::pending("a");
        step.status = StepStatus::Completed;
        step.attempts = 2;
        observer.step_advanced(Uuid::nil(), &step);

        match rx.try_recv().unwrap() {
            WorkflowEvent::StepAdvanced { step_id, status, attempts, .. } => {
                assert_eq!(step_id, "a");
                assert_eq!(status, StepStatus::Completed);
                assert_eq!(attempts, 2);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn observer_set_fans_out() {
        let first = Arc::new(RecordingObserver::default());
        let second = Arc::new(RecordingObserver::default());
        let set = ObserverSet::new().with(first.clone()).with(second.clone());
        assert_eq!(set.len(), 2);

        set.execution_finished(Uuid::nil(), "wf", ExecutionStatus::Completed);

        assert_eq!(first.events(), vec!["finished:completed".to_string()]);
        assert_eq!(second.events(), vec!["finished:completed".to_string()]);
    }

    #[test]
    fn noop_observer_accepts_everything() {
        let observer = NoopObserver;
        observer.notify(Uuid::nil(), "wf", &Value::Null);
        observer.execution_finished(Uuid::nil(), "wf", ExecutionStatus::Failed);
    }
}
