//! Application state wiring the engine together.
//!
//! AppState holds the loaded config, the event bus the CLI subscribes to for
//! progress, and the orchestrator backed by the built-in operation table.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use conductor_core::event::bus::EventBus;
use conductor_core::observer::{EventBusObserver, ObserverSet, TracingObserver};
use conductor_core::workflow::orchestrator::{Orchestrator, OrchestratorSettings};
use conductor_core::workflow::registry::WorkflowRegistry;
use conductor_infra::config::{load_engine_config, resolve_config_path};
use conductor_infra::operations::builtin_operations;
use conductor_types::config::EngineConfig;

#[derive(Clone)]
pub struct AppState {
    pub config: EngineConfig,
    pub config_path: Option<PathBuf>,
    pub event_bus: EventBus,
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    /// Load config and wire the orchestrator.
    pub async fn init(config_override: Option<&Path>) -> anyhow::Result<Self> {
        let config_path = resolve_config_path(config_override);
        let config = match &config_path {
            Some(path) => load_engine_config(path).await,
            None => EngineConfig::default(),
        };
        Ok(Self::with_config(config, config_path))
    }

    pub fn with_config(config: EngineConfig, config_path: Option<PathBuf>) -> Self {
        let event_bus = EventBus::new(config.event_bus_capacity);
        let observer = ObserverSet::new()
            .with(Arc::new(TracingObserver))
            .with(Arc::new(EventBusObserver::new(event_bus.clone())));

        let orchestrator = Orchestrator::new(
            Arc::new(WorkflowRegistry::new()),
            Arc::new(builtin_operations()),
            Arc::new(observer),
        )
        .with_settings(OrchestratorSettings::from(&config));

        tracing::debug!(
            config = ?config_path,
            max_workflow_depth = config.max_workflow_depth,
            "application state ready"
        );

        Self {
            config,
            config_path,
            event_bus,
            orchestrator: Arc::new(orchestrator),
        }
    }

    /// A CLI path argument, or `workflows_dir` from config.
    pub fn workflows_path(&self, explicit: Option<PathBuf>) -> anyhow::Result<PathBuf> {
        explicit
            .or_else(|| self.config.workflows_dir.clone())
            .ok_or_else(|| anyhow::anyhow!("no workflow path given and no `workflows_dir` configured"))
    }
}
