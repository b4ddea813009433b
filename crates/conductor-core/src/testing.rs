//! Shared fixtures for unit tests.

use std::sync::Mutex;

use conductor_types::event::AuditRecord;
use conductor_types::workflow::{Execution, ExecutionStatus, StepExecution};
use serde_json::Value;
use uuid::Uuid;

use crate::observer::WorkflowObserver;

/// Observer that records every hook as a short string.
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<String>>,
    audits: Mutex<Vec<AuditRecord>>,
    notifications: Mutex<Vec<Value>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn audits(&self) -> Vec<AuditRecord> {
        self.audits.lock().unwrap().clone()
    }

    pub fn notifications(&self) -> Vec<Value> {
        self.notifications.lock().unwrap().clone()
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl WorkflowObserver for RecordingObserver {
    fn execution_started(&self, execution: &Execution) {
        self.push(format!("started:{}", execution.workflow_id));
    }

    fn step_advanced(&self, _execution_id: Uuid, step: &StepExecution) {
        self.push(format!("step:{}:{}", step.step_id, step.status));
    }

    fn audit(&self, record: &AuditRecord) {
        self.audits.lock().unwrap().push(record.clone());
    }

    fn notify(&self, _execution_id: Uuid, _workflow_id: &str, parameters: &Value) {
        self.notifications.lock().unwrap().push(parameters.clone());
    }

    fn execution_finished(&self, _execution_id: Uuid, _workflow_id: &str, status: ExecutionStatus) {
        self.push(format!("finished:{status}"));
    }
}
