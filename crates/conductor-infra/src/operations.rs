//! Built-in operations for running workflows from the command line.
//!
//! | name    | parameters          | result |
//! |---------|---------------------|--------|
//! | `noop`  | any                 | `{}` |
//! | `echo`  | any                 | the parameters |
//! | `sleep` | `ms`                | `{ "sleptMs": ms }` |
//! | `fail`  | `message` (opt.)    | always fails |
//! | `env`   | `name`              | `{ "name": ..., "value": ... }`, value `null` when unset |

use std::time::Duration;

use conductor_core::invoker::{OperationError, OperationTable};
use serde_json::{json, Value};

/// Upper bound for a single `sleep` call.
const MAX_SLEEP_MS: u64 = 600_000;

pub fn builtin_operations() -> OperationTable {
    let mut table = OperationTable::new();
    register_builtins(&mut table);
    table
}

/// Add the built-ins to an existing table, replacing same-named entries.
pub fn register_builtins(table: &mut OperationTable) {
    table.register("noop", |_| async { Ok(json!({})) });
    table.register("echo", |params| async move { Ok(params) });
    table.register("sleep", sleep);
    table.register("fail", |params: Value| async move {
        let message = params
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("operation failed")
            .to_string();
        Err(OperationError::Failed(message))
    });
    table.register("env", |params: Value| async move {
        let Some(name) = params.get("name").and_then(Value::as_str) else {
            return Err(OperationError::failed("env requires a string 'name' parameter"));
        };
        let value = std::env::var(name).ok();
        Ok(json!({ "name": name, "value": value }))
    });
}

async fn sleep(params: Value) -> Result<Value, OperationError> {
    let ms = params
        .get("ms")
        .and_then(Value::as_u64)
        .ok_or_else(|| OperationError::failed("sleep requires a non-negative integer 'ms' parameter"))?;
    if ms > MAX_SLEEP_MS {
        return Err(OperationError::failed(format!(
            "sleep of {ms} ms exceeds the {MAX_SLEEP_MS} ms limit"
        )));
    }
    tokio::time::sleep(Duration::from_millis(ms)).await;
    Ok(json!({ "sleptMs": ms }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use conductor_core::invoker::OperationInvoker;

    #[test]
    fn registers_all_builtins() {
        let table = builtin_operations();
        assert_eq!(table.names(), vec!["echo", "env", "fail", "noop", "sleep"]);
    }

    #[tokio::test]
    async fn echo_and_noop() {
        let table = builtin_operations();
        assert_eq!(table.invoke("noop", json!({ "x": 1 })).await.unwrap(), json!({}));
        assert_eq!(
            table.invoke("echo", json!({ "msg": "hi" })).await.unwrap(),
            json!({ "msg": "hi" })
        );
    }

    #[tokio::test]
    async fn fail_uses_message() {
        let table = builtin_operations();
        let err = table.invoke("fail", json!({ "message": "nope" })).await.unwrap_err();
        assert_eq!(err, OperationError::Failed("nope".into()));
        let err = table.invoke("fail", json!({})).await.unwrap_err();
        assert_eq!(err.to_string(), "operation failed");
    }

    #[tokio::test]
    async fn sleep_validates_and_waits() {
        let table = builtin_operations();
        assert_eq!(
            table.invoke("sleep", json!({ "ms": 5 })).await.unwrap(),
            json!({ "sleptMs": 5 })
        );
        assert!(table.invoke("sleep", json!({})).await.is_err());
        assert!(table.invoke("sleep", json!({ "ms": -1 })).await.is_err());
        assert!(table.invoke("sleep", json!({ "ms": MAX_SLEEP_MS + 1 })).await.is_err());
    }

    #[tokio::test]
    async fn env_reads_variable() {
        let table = builtin_operations();
        let out = table.invoke("env", json!({ "name": "PATH" })).await.unwrap();
        assert_eq!(out["name"], json!("PATH"));
        assert!(out["value"].is_string());

        let out = table
            .invoke("env", json!({ "name": "CONDUCTOR_SURELY_UNSET_VARIABLE" }))
            .await
            .unwrap();
        assert_eq!(out["value"], Value::Null);
        assert!(table.invoke("env", json!({})).await.is_err());
    }
}
