//! Event types for the Conductor observer bus.
//!
//! `WorkflowEvent` is the unified event type broadcast while executions run.
//! All variants are Clone + Send + Sync for use with tokio broadcast channels.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::workflow::{ExecutionStatus, StepStatus};

/// Audit record for one successful operation invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    pub execution_id: Uuid,
    pub workflow_id: String,
    pub step_id: String,
    pub operation: String,
    /// Parameters as resolved for the audited attempt.
    pub parameters: Value,
    pub success: bool,
}

/// Events emitted during workflow execution.
///
/// Used by the event bus to communicate execution lifecycle and audit
/// records to subscribers (CLI progress, logging, external telemetry).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkflowEvent {
    /// An execution was created and is now active.
    ExecutionStarted {
        execution_id: Uuid,
        workflow_id: String,
    },

    /// A step reached a terminal status.
    StepAdvanced {
        execution_id: Uuid,
        step_id: String,
        status: StepStatus,
        attempts: u32,
    },

    /// A successful operation invocation.
    OperationAudited(AuditRecord),

    /// A `notify` action fired.
    Notification {
        execution_id: Uuid,
        workflow_id: String,
        parameters: Value,
    },

    /// The execution is no longer active.
    ExecutionFinished {
        execution_id: Uuid,
        workflow_id: String,
        status: ExecutionStatus,
    },
}

impl WorkflowEvent {
    /// The execution this event belongs to.
    pub fn execution_id(&self) -> Uuid {
        match self {
            WorkflowEvent::ExecutionStarted { execution_id, .. }
            | WorkflowEvent::StepAdvanced { execution_id, .. }
            | WorkflowEvent::Notification { execution_id, .. }
            | WorkflowEvent::ExecutionFinished { execution_id, .. } => *execution_id,
            WorkflowEvent::OperationAudited(record) => record.execution_id,
        }
    }
}
