//! Success and failure hooks.
//!
//! An action's parameters are resolved against the final scope, then
//! interpreted into an [`ActionPlan`]. Malformed parameters surface as an
//! [`ActionError`]; the orchestrator logs it and moves on.

use conductor_types::workflow::ActionType;
use serde_json::{Map, Value};

use super::path::STEPS_ROOT;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("{action} action requires a string '{field}' parameter")]
    MissingParameter { action: &'static str, field: &'static str },

    #[error("setVariable cannot write the reserved 'steps' variable")]
    ReservedVariable,

    #[error("unknown log level '{0}'")]
    UnknownLevel(String),

    #[error("runWorkflow 'variables' must be an object")]
    InvalidVariables,

    #[error("{0}")]
    Failed(String),
}

/// Log level for `log` actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn parse(level: &str) -> Result<Self, ActionError> {
        match level.to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(ActionError::UnknownLevel(level.to_string())),
        }
    }
}

/// A resolved, interpreted action.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionPlan {
    Notify(Value),
    Log { level: LogLevel, message: String },
    SetVariable { name: String, value: Value },
    RunWorkflow { workflow_id: String, variables: Map<String, Value> },
}

impl ActionPlan {
    /// Interpret resolved parameters for `action_type`.
    pub fn from_parameters(action_type: ActionType, parameters: Value) -> Result<Self, ActionError> {
        let mut params = match parameters {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        match action_type {
            ActionType::Notify => Ok(ActionPlan::Notify(Value::Object(params))),
            ActionType::Log => {
                let message = match params.remove("message") {
                    Some(Value::String(s)) => s,
                    Some(other) => other.to_string(),
                    None => {
                        return Err(ActionError::MissingParameter {
                            action: "log",
                            field: "message",
                        });
                    }
                };
                let level = match params.get("level").and_then(Value::as_str) {
                    Some(level) => LogLevel::parse(level)?,
                    None => LogLevel::Info,
                };
                Ok(ActionPlan::Log { level, message })
            }
            ActionType::SetVariable => {
                let name = take_string(&mut params, "setVariable", "name")?;
                if name == STEPS_ROOT {
                    return Err(ActionError::ReservedVariable);
                }
                let value = params.remove("value").unwrap_or(Value::Null);
                Ok(ActionPlan::SetVariable { name, value })
            }
            ActionType::RunWorkflow => {
                let workflow_id = take_string(&mut params, "runWorkflow", "workflowId")?;
                let variables = match params.remove("variables") {
                    None | Some(Value::Null) => Map::new(),
                    Some(Value::Object(map)) => map,
                    Some(_) => return Err(ActionError::InvalidVariables),
                };
                Ok(ActionPlan::RunWorkflow {
                    workflow_id,
                    variables,
                })
            }
        }
    }
}

fn take_string(
    params: &mut Map<String, Value>,
    action: &'static str,
    field: &'static str,
) -> Result<String, ActionError> {
    match params.remove(field) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s),
        _ => Err(ActionError::MissingParameter { action, field }),
    }
}

/// Emit a `log` action's message at its level.
pub fn emit_log(level: LogLevel, workflow_id: &str, execution_id: uuid::Uuid, message: &str) {
    match level {
        LogLevel::Trace => tracing::trace!(workflow = workflow_id, execution_id = %execution_id, "{message}"),
        LogLevel::Debug => tracing::debug!(workflow = workflow_id, execution_id = %execution_id, "{message}"),
        LogLevel::Info => tracing::info!(workflow = workflow_id, execution_id = %execution_id, "{message}"),
        LogLevel::Warn => tracing::warn!(workflow = workflow_id, execution_id = %execution_id, "{message}"),
        LogLevel::Error => tracing::error!(workflow = workflow_id, execution_id = %execution_id, "{message}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn log_defaults_to_info() {
        let plan = ActionPlan::from_parameters(ActionType::Log, json!({ "message": "done" })).unwrap();
        assert_eq!(
            plan,
            ActionPlan::Log {
                level: LogLevel::Info,
                message: "done".into()
            }
        );

        let plan =
            ActionPlan::from_parameters(ActionType::Log, json!({ "message": 5, "level": "WARN" })).unwrap();
        assert_eq!(
            plan,
            ActionPlan::Log {
                level: LogLevel::Warn,
                message: "5".into()
            }
        );
    }

    #[test]
    fn log_requires_message_and_known_level() {
        assert!(ActionPlan::from_parameters(ActionType::Log, json!({})).is_err());
        let err = ActionPlan::from_parameters(ActionType::Log, json!({ "message": "x", "level": "loud" }))
            .unwrap_err();
        assert_eq!(err, ActionError::UnknownLevel("loud".into()));
    }

    #[test]
    fn set_variable_refuses_reserved_name() {
        let err = ActionPlan::from_parameters(ActionType::SetVariable, json!({ "name": "steps", "value": 1 }))
            .unwrap_err();
        assert_eq!(err, ActionError::ReservedVariable);

        let plan = ActionPlan::from_parameters(ActionType::SetVariable, json!({ "name": "done" })).unwrap();
        assert_eq!(
            plan,
            ActionPlan::SetVariable {
                name: "done".into(),
                value: Value::Null
            }
        );
    }

    #[test]
    fn run_workflow_reads_id_and_variables() {
        let plan = ActionPlan::from_parameters(
            ActionType::RunWorkflow,
            json!({ "workflowId": "child", "variables": { "x": 1 } }),
        )
        .unwrap();
        match plan {
            ActionPlan::RunWorkflow { workflow_id, variables } => {
                assert_eq!(workflow_id, "child");
                assert_eq!(variables["x"], json!(1));
            }
            other => panic!("unexpected plan: {other:?}"),
        }

        assert!(ActionPlan::from_parameters(ActionType::RunWorkflow, json!({})).is_err());
        assert_eq!(
            ActionPlan::from_parameters(ActionType::RunWorkflow, json!({ "workflowId": "c", "variables": [] }))
                .unwrap_err(),
            ActionError::InvalidVariables
        );
    }

    #[test]
    fn notify_forwards_everything() {
        let plan = ActionPlan::from_parameters(ActionType::Notify, json!({ "channel": "ops" })).unwrap();
        assert_eq!(plan, ActionPlan::Notify(json!({ "channel": "ops" })));
    }
}
