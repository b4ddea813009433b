//! Parameter templates.
//!
//! A step's `parameters` tree is parsed once at registration into a
//! [`ParamTemplate`]. Leaves whose entire string is `${path}` become
//! references; every other leaf passes through unchanged. Resolution never
//! fails: an absent reference drops its key from a map, becomes `null` inside
//! a list, and resolves to `null` at the root.

use conductor_types::workflow::Execution;
use serde_json::{Map, Value};

use super::definition::WorkflowError;
use super::path::FieldPath;

/// A parsed parameter tree.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamTemplate {
    Literal(Value),
    Reference(FieldPath),
    Object(Vec<(String, ParamTemplate)>),
    List(Vec<ParamTemplate>),
}

impl ParamTemplate {
    pub fn parse(value: &Value) -> Result<Self, WorkflowError> {
        match value {
            Value::Object(map) => map
                .iter()
                .map(|(k, v)| Ok((k.clone(), Self::parse(v)?)))
                .collect::<Result<Vec<_>, WorkflowError>>()
                .map(ParamTemplate::Object),
            Value::Array(items) => items
                .iter()
                .map(Self::parse)
                .collect::<Result<Vec<_>, _>>()
                .map(ParamTemplate::List),
            Value::String(s) => match whole_reference(s) {
                Some(inner) => FieldPath::parse(inner)
                    .map(ParamTemplate::Reference)
                    .map_err(|e| WorkflowError::configuration(format!("template '{s}': {e}"))),
                None => Ok(ParamTemplate::Literal(value.clone())),
            },
            other => Ok(ParamTemplate::Literal(other.clone())),
        }
    }

    /// Parse an action's parameter map.
    pub fn parse_map(map: &Map<String, Value>) -> Result<Self, WorkflowError> {
        map.iter()
            .map(|(k, v)| Ok((k.clone(), Self::parse(v)?)))
            .collect::<Result<Vec<_>, WorkflowError>>()
            .map(ParamTemplate::Object)
    }

    pub fn resolve(&self, execution: &Execution) -> Value {
        self.resolve_inner(execution).unwrap_or(Value::Null)
    }

    fn resolve_inner(&self, execution: &Execution) -> Option<Value> {
        match self {
            ParamTemplate::Literal(v) => Some(v.clone()),
            ParamTemplate::Reference(path) => path.lookup(execution).cloned(),
            ParamTemplate::Object(fields) => {
                let mut out = Map::with_capacity(fields.len());
                for (key, field) in fields {
                    if let Some(v) = field.resolve_inner(execution) {
                        out.insert(key.clone(), v);
                    }
                }
                Some(Value::Object(out))
            }
            ParamTemplate::List(items) => Some(Value::Array(
                items
                    .iter()
                    .map(|item| item.resolve_inner(execution).unwrap_or(Value::Null))
                    .collect(),
            )),
        }
    }

    /// Every path referenced anywhere in the tree.
    pub fn references(&self) -> Vec<&FieldPath> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references<'a>(&'a self, out: &mut Vec<&'a FieldPath>) {
        match self {
            ParamTemplate::Literal(_) => {}
            ParamTemplate::Reference(path) => out.push(path),
            ParamTemplate::Object(fields) => {
                for (_, field) in fields {
                    field.collect_references(out);
                }
            }
            ParamTemplate::List(items) => {
                for item in items {
                    item.collect_references(out);
                }
            }
        }
    }
}

/// The inner path of a string that is exactly one `${...}` reference.
fn whole_reference(s: &str) -> Option<&str> {
    let inner = s.strip_prefix("${")?.strip_suffix('}')?;
    if inner.contains('}') || inner.contains("${") {
        return None;
    }
    Some(inner)
}
