//! Operation invocation port.
//!
//! The engine knows operations only by name. [`OperationInvoker`] is the
//! capability it calls into; hosts implement it over whatever catalogue they
//! own. [`OperationTable`] is the stock adapter: a name -> handler table.
//!
//! The trait returns boxed futures so it stays object-safe behind
//! `Arc<dyn OperationInvoker>`.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;

/// Boxed future returned by an operation invocation.
pub type OperationFuture<'a> = Pin<Box<dyn Future<Output = Result<Value, OperationError>> + Send + 'a>>;

/// Errors raised by an operation invocation.
///
/// Absorbed by a step's retry policy before becoming terminal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OperationError {
    /// The invoker has no operation under this name.
    #[error("unknown operation '{0}'")]
    UnknownOperation(String),

    /// The operation ran and reported a failure.
    #[error("{0}")]
    Failed(String),

    /// The attempt exceeded its timeout.
    #[error("operation timed out after {0} ms")]
    TimedOut(u64),
}

impl OperationError {
    pub fn failed(message: impl Into<String>) -> Self {
        OperationError::Failed(message.into())
    }
}

/// Capability to invoke a named operation with resolved parameters.
pub trait OperationInvoker: Send + Sync {
    fn invoke<'a>(&'a self, operation: &'a str, parameters: Value) -> OperationFuture<'a>;
}

type Handler = Arc<dyn Fn(Value) -> OperationFuture<'static> + Send + Sync>;

/// Invoker backed by an owned name -> handler table.
#[derive(Clone, Default)]
pub struct OperationTable {
    handlers: HashMap<String, Handler>,
}

impl OperationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the handler for `name`.
    pub fn register<F, Fut>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, OperationError>> + Send + 'static,
    {
        let handler: Handler = Arc::new(move |params: Value| -> OperationFuture<'static> {
            Box::pin(handler(params))
        });
        self.handlers.insert(name.into(), handler);
    }

    /// Builder form of [`register`](Self::register).
    pub fn with<F, Fut>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, OperationError>> + Send + 'static,
    {
        self.register(name, handler);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered operation names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for OperationTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationTable")
            .field("operations", &self.names())
            .finish()
    }
}

impl OperationInvoker for OperationTable {
    fn invoke<'a>(&'a self, operation: &'a str, parameters: Value) -> OperationFuture<'a> {
        match self.handlers.get(operation) {
            Some(handler) => handler(parameters),
            None => Box::pin(std::future::ready(Err(OperationError::UnknownOperation(
                operation.to_string(),
            )))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn table_dispatches_by_name() {
        let table = OperationTable::new()
            .with("echo", |params| async move { Ok(params) })
            .with("boom", |_| async { Err(OperationError::failed("kaput")) });

        let out = table.invoke("echo", json!({ "msg": "hi" })).await.unwrap();
        assert_eq!(out, json!({ "msg": "hi" }));

        let err = table.invoke("boom", json!({})).await.unwrap_err();
        assert_eq!(err.to_string(), "kaput");
    }

    #[tokio::test]
    async fn unknown_operation_is_an_error() {
        let table = OperationTable::new();
        let err = table.invoke("missing", json!({})).await.unwrap_err();
        assert_eq!(err, OperationError::UnknownOperation("missing".to_string()));
    }

    #[tokio::test]
    async fn usable_as_trait_object() {
        let invoker: Arc<dyn OperationInvoker> =
            Arc::new(OperationTable::new().with("noop", |_| async { Ok(json!({})) }));
        assert_eq!(invoker.invoke("noop", Value::Null).await.unwrap(), json!({}));
    }

    #[test]
    fn names_are_sorted() {
        let table = OperationTable::new()
            .with("b", |_| async { Ok(Value::Null) })
            .with("a", |_| async { Ok(Value::Null) });
        assert_eq!(table.names(), vec!["a", "b"]);
        assert!(table.contains("a"));
        assert!(!table.contains("c"));
    }
}
