//! In-memory workflow definition store.
//!
//! Definitions are compiled on registration: validated, and their parameter
//! templates parsed once. Registration is insert-or-replace by id.

use std::collections::HashSet;
use std::sync::Arc;

use conductor_types::workflow::WorkflowDefinition;
use dashmap::DashMap;

use super::definition::{validate_definition, WorkflowError};
use super::template::ParamTemplate;

/// A validated definition with its templates parsed.
#[derive(Debug, Clone)]
pub struct CompiledWorkflow {
    pub definition: WorkflowDefinition,
    /// One template per step, in step order.
    pub step_templates: Vec<ParamTemplate>,
    pub on_success: Vec<ParamTemplate>,
    pub on_failure: Vec<ParamTemplate>,
}

impl CompiledWorkflow {
    pub fn compile(definition: WorkflowDefinition) -> Result<Self, WorkflowError> {
        validate_definition(&definition)?;

        let mut earlier_steps: HashSet<&str> = HashSet::new();
        let mut step_templates = Vec::with_capacity(definition.steps.len());
        for step in &definition.steps {
            let template = ParamTemplate::parse(&step.parameters)
                .map_err(|e| WorkflowError::configuration(format!("step '{}': {e}", step.id)))?;
            for reference in template.references() {
                if let Some(target) = reference.step_reference() {
                    if !earlier_steps.contains(target) {
                        tracing::warn!(
                            workflow = definition.id.as_str(),
                            step_id = step.id.as_str(),
                            reference = %reference,
                            "parameter references a step that has not run yet; it will resolve as absent"
                        );
                    }
                }
            }
            earlier_steps.insert(step.id.as_str());
            step_templates.push(template);
        }

        let on_success = compile_actions(&definition, &definition.on_success, "onSuccess")?;
        let on_failure = compile_actions(&definition, &definition.on_failure, "onFailure")?;

        Ok(Self {
            definition,
            step_templates,
            on_success,
            on_failure,
        })
    }

    pub fn id(&self) -> &str {
        &self.definition.id
    }
}

fn compile_actions(
    definition: &WorkflowDefinition,
    actions: &[conductor_types::workflow::WorkflowAction],
    hook: &str,
) -> Result<Vec<ParamTemplate>, WorkflowError> {
    actions
        .iter()
        .enumerate()
        .map(|(index, action)| {
            ParamTemplate::parse_map(&action.parameters).map_err(|e| {
                WorkflowError::configuration(format!(
                    "workflow '{}' {hook}[{index}]: {e}",
                    definition.id
                ))
            })
        })
        .collect()
}

/// Stores compiled definitions by id.
#[derive(Debug, Default)]
pub struct WorkflowRegistry {
    workflows: DashMap<String, Arc<CompiledWorkflow>>,
}

impl WorkflowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile and store a definition. Returns `true` if it replaced one.
    pub fn register(&self, definition: WorkflowDefinition) -> Result<bool, WorkflowError> {
        let compiled = CompiledWorkflow::compile(definition)?;
        let id = compiled.id().to_string();
        let replaced = self.workflows.insert(id.clone(), Arc::new(compiled)).is_some();
        tracing::debug!(workflow = id.as_str(), replaced, "workflow registered");
        Ok(replaced)
    }

    pub fn get(&self, id: &str) -> Option<WorkflowDefinition> {
        self.workflows.get(id).map(|w| w.definition.clone())
    }

    pub fn compiled(&self, id: &str) -> Option<Arc<CompiledWorkflow>> {
        self.workflows.get(id).map(|w| Arc::clone(w.value()))
    }

    /// All definitions, or those in `category`, sorted by id.
    pub fn list(&self, category: Option<&str>) -> Vec<WorkflowDefinition> {
        let mut out: Vec<WorkflowDefinition> = self
            .workflows
            .iter()
            .filter(|w| category.is_none_or(|c| w.definition.category == c))
            .map(|w| w.definition.clone())
            .collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out
    }

    pub fn unregister(&self, id: &str) -> bool {
        self.workflows.remove(id).is_some()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.workflows.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.workflows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workflows.is_empty()
    }
}
