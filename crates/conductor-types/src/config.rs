//! Engine configuration types for Conductor.
//!
//! `EngineConfig` represents the top-level `config.toml` that controls step
//! timeouts, nested workflow depth, and where workflow documents live.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level configuration for the workflow engine.
///
/// All fields have sensible defaults; an empty file is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Timeout applied to steps that don't set their own (None = no timeout).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_step_timeout_ms: Option<u64>,

    /// Maximum nesting of `runWorkflow` actions.
    #[serde(default = "default_max_workflow_depth")]
    pub max_workflow_depth: u32,

    /// Directory scanned for workflow documents when no path is given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflows_dir: Option<PathBuf>,

    /// Capacity of the broadcast channel used for workflow events.
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,
}

fn default_max_workflow_depth() -> u32 {
    16
}

fn default_event_bus_capacity() -> usize {
    1024
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_step_timeout_ms: None,
            max_workflow_depth: default_max_workflow_depth(),
            workflows_dir: None,
            event_bus_capacity: default_event_bus_capacity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_config_default_values() {
        let config = EngineConfig::default();
        assert_eq!(config.max_workflow_depth, 16);
        assert_eq!(config.event_bus_capacity, 1024);
        assert!(config.default_step_timeout_ms.is_none());
        assert!(config.workflows_dir.is_none());
    }

    #[test]
    fn test_engine_config_toml_partial() {
        let toml_str = r#"
default_step_timeout_ms = 30000
workflows_dir = "/srv/workflows"
"#;
        let config: EngineConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.default_step_timeout_ms, Some(30_000));
        assert_eq!(config.max_workflow_depth, 16);
        assert_eq!(config.workflows_dir, Some(PathBuf::from("/srv/workflows")));
    }

    #[test]
    fn test_engine_config_empty_toml_is_default() {
        let config: EngineConfig = toml::from_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
    }
}
