//! CLI workflow subcommands: run, validate, list.
//!
//! Definitions are read from a single YAML/JSON file or discovered under a
//! directory, registered with the orchestrator, then executed or listed.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use console::style;
use serde_json::{Map, Value};
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

use conductor_core::workflow::definition::{discover_workflows, load_workflow_file, workflow_files};
use conductor_core::workflow::orchestrator::ExecuteOptions;
use conductor_core::workflow::registry::CompiledWorkflow;
use conductor_types::event::WorkflowEvent;
use conductor_types::workflow::{Execution, ExecutionStatus, StepStatus, WorkflowDefinition};

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Read definitions from a file, or every workflow document under a directory.
pub fn load_definitions(path: &Path) -> Result<Vec<(PathBuf, WorkflowDefinition)>> {
    if path.is_dir() {
        return discover_workflows(path)
            .with_context(|| format!("Failed to scan {}", path.display()));
    }
    let defs = load_workflow_file(path)
        .with_context(|| format!("Failed to load workflow file {}", path.display()))?;
    Ok(defs.into_iter().map(|d| (path.to_path_buf(), d)).collect())
}

/// Load and register every definition found at `path`.
pub fn register_definitions(state: &AppState, path: &Path) -> Result<Vec<(PathBuf, WorkflowDefinition)>> {
    let defs = load_definitions(path)?;
    for (file, def) in &defs {
        let replaced = state
            .orchestrator
            .register_workflow(def.clone())
            .with_context(|| format!("Failed to register '{}' from {}", def.id, file.display()))?;
        if replaced {
            tracing::warn!(workflow = def.id.as_str(), file = %file.display(), "duplicate workflow id, later definition wins");
        }
    }
    Ok(defs)
}

/// Merge `--vars` JSON and `--var key=value` pairs into one variable map.
///
/// Pair values are parsed as JSON when they parse, otherwise kept as strings.
pub fn parse_variables(vars_json: Option<&str>, pairs: &[String]) -> Result<Map<String, Value>> {
    let mut variables = match vars_json {
        Some(raw) => match serde_json::from_str::<Value>(raw).context("--vars is not valid JSON")? {
            Value::Object(map) => map,
            _ => bail!("--vars must be a JSON object"),
        },
        None => Map::new(),
    };

    for pair in pairs {
        let Some((key, raw)) = pair.split_once('=') else {
            bail!("--var '{pair}' must have the form KEY=VALUE");
        };
        let key = key.trim();
        if key.is_empty() {
            bail!("--var '{pair}' has an empty key");
        }
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        variables.insert(key.to_string(), value);
    }

    Ok(variables)
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
pub async fn handle_run(
    state: &AppState,
    path: &Path,
    workflow_id: &str,
    vars: &[String],
    vars_json: Option<&str>,
    dry_run: bool,
    json: bool,
    quiet: bool,
) -> Result<()> {
    register_definitions(state, path)?;
    if state.orchestrator.get_workflow(workflow_id).is_none() {
        bail!("Workflow '{workflow_id}' not found in {}", path.display());
    }
    let input = parse_variables(vars_json, vars)?;
    let show_progress = !json && !quiet;

    if show_progress {
        println!();
        println!(
            "  {} Running workflow '{}'{}",
            style("▶").bold(),
            style(workflow_id).cyan(),
            if dry_run { " (dry run)" } else { "" }
        );
        println!();
    }

    let mut events = state.event_bus.subscribe();
    let orchestrator = state.orchestrator.clone();
    let id = workflow_id.to_string();
    let mut run = tokio::spawn(async move {
        orchestrator
            .execute_workflow(&id, input, ExecuteOptions::new().with_dry_run(dry_run))
            .await
    });

    let outcome = loop {
        tokio::select! {
            joined = &mut run => break joined.context("workflow task panicked")?,
            event = events.recv() => match event {
                Ok(event) if show_progress => print_event(&event),
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "progress output lagged");
                }
                Err(RecvError::Closed) => {}
            },
        }
    };

    loop {
        match events.try_recv() {
            Ok(event) if show_progress => print_event(&event),
            Ok(_) | Err(TryRecvError::Lagged(_)) => {}
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
        }
    }

    match outcome {
        Ok(execution) => {
            if !quiet {
                display_execution(&execution, json)?;
            }
            if execution.status == ExecutionStatus::Cancelled {
                bail!("Workflow '{workflow_id}' was cancelled");
            }
            Ok(())
        }
        Err(err) => {
            if let Some(execution) = err.execution_id().and_then(|id| state.orchestrator.get_execution(id)) {
                if !quiet {
                    display_execution(&execution, json)?;
                }
            }
            Err(anyhow::Error::new(err).context(format!("Workflow '{workflow_id}' failed")))
        }
    }
}

fn print_event(event: &WorkflowEvent) {
    match event {
        WorkflowEvent::StepAdvanced {
            step_id,
            status,
            attempts,
            ..
        } => {
            let marker = match status {
                StepStatus::Completed => style("✓").green(),
                StepStatus::Failed => style("✗").red(),
                _ => style("–").dim(),
            };
            let attempts = match attempts {
                0 => String::new(),
                1 => " (1 attempt)".to_string(),
                n => format!(" ({n} attempts)"),
            };
            println!("  {marker} {step_id} {}{}", style(status).dim(), style(attempts).dim());
        }
        WorkflowEvent::Notification {
            workflow_id,
            parameters,
            ..
        } => {
            println!(
                "  {} notify from '{}': {}",
                style("✉").yellow(),
                workflow_id,
                parameters
            );
        }
        WorkflowEvent::ExecutionStarted { .. }
        | WorkflowEvent::ExecutionFinished { .. }
        | WorkflowEvent::OperationAudited(_) => {}
    }
}

fn format_status(status: ExecutionStatus) -> Cell {
    let text = status.to_string();
    match status {
        ExecutionStatus::Completed => Cell::new(text).fg(Color::Green),
        ExecutionStatus::Failed => Cell::new(text).fg(Color::Red),
        ExecutionStatus::Cancelled => Cell::new(text).fg(Color::Yellow),
        ExecutionStatus::Pending | ExecutionStatus::Running => Cell::new(text),
    }
}

fn format_step_status(status: StepStatus) -> Cell {
    let text = status.to_string();
    match status {
        StepStatus::Completed => Cell::new(text).fg(Color::Green),
        StepStatus::Failed => Cell::new(text).fg(Color::Red),
        StepStatus::Skipped => Cell::new(text).fg(Color::DarkGrey),
        StepStatus::Pending | StepStatus::Running => Cell::new(text),
    }
}

/// Compact one-line rendering of a step result, truncated for tables.
fn summarize(value: &Value, max: usize) -> String {
    let text = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if text.chars().count() <= max {
        return text;
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

fn display_execution(execution: &Execution, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(execution)?);
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Step").fg(Color::Cyan),
            Cell::new("Status"),
            Cell::new("Attempts"),
            Cell::new("Result / Error"),
        ]);

    for step in &execution.steps {
        let detail = match (&step.error, &step.result) {
            (Some(error), _) => error.clone(),
            (None, Some(result)) => summarize(result, 60),
            (None, None) => "-".to_string(),
        };
        table.add_row(vec![
            Cell::new(&step.step_id),
            format_step_status(step.status),
            Cell::new(step.attempts),
            Cell::new(detail),
        ]);
    }

    let elapsed = execution
        .end_time
        .map(|end| format!("{} ms", (end - execution.start_time).num_milliseconds()))
        .unwrap_or_else(|| "-".to_string());

    println!();
    println!(
        "  Execution {} of '{}'",
        style(execution.execution_id).dim(),
        style(&execution.workflow_id).cyan()
    );
    println!();
    println!("{table}");
    println!();

    let mut summary = Table::new();
    summary
        .load_preset(presets::NOTHING)
        .add_row(vec![Cell::new("Status"), format_status(execution.status)])
        .add_row(vec![Cell::new("Elapsed"), Cell::new(elapsed)]);
    if let Some(error) = &execution.error {
        summary.add_row(vec![Cell::new("Error"), Cell::new(error).fg(Color::Red)]);
    }
    println!("{summary}");
    println!();

    Ok(())
}

// ---------------------------------------------------------------------------
// Validate
// ---------------------------------------------------------------------------

/// Outcome of validating one document.
#[derive(Debug)]
pub struct FileReport {
    pub file: PathBuf,
    pub workflows: Vec<String>,
    pub error: Option<String>,
}

/// Parse, validate, and compile each document at `path`.
pub fn validate_path(path: &Path) -> Result<Vec<FileReport>> {
    let files = if path.is_dir() {
        workflow_files(path).with_context(|| format!("Failed to scan {}", path.display()))?
    } else {
        vec![path.to_path_buf()]
    };

    let mut seen: HashMap<String, PathBuf> = HashMap::new();
    let mut reports = Vec::with_capacity(files.len());
    for file in files {
        let report = match load_workflow_file(&file) {
            Ok(defs) => {
                let mut workflows = Vec::with_capacity(defs.len());
                let mut error = None;
                for def in defs {
                    if let Some(previous) = seen.get(&def.id) {
                        error = Some(format!(
                            "workflow id '{}' is also defined in {}",
                            def.id,
                            previous.display()
                        ));
                        break;
                    }
                    seen.insert(def.id.clone(), file.clone());
                    workflows.push(def.id.clone());
                    if let Err(err) = CompiledWorkflow::compile(def) {
                        error = Some(err.to_string());
                        break;
                    }
                }
                FileReport {
                    file,
                    workflows,
                    error,
                }
            }
            Err(err) => FileReport {
                file,
                workflows: Vec::new(),
                error: Some(err.to_string()),
            },
        };
        reports.push(report);
    }
    Ok(reports)
}

pub fn handle_validate(path: &Path, json: bool, quiet: bool) -> Result<()> {
    let reports = validate_path(path)?;
    let failed = reports.iter().filter(|r| r.error.is_some()).count();

    if json {
        let out: Vec<_> = reports
            .iter()
            .map(|r| {
                serde_json::json!({
                    "file": r.file.display().to_string(),
                    "workflows": r.workflows,
                    "valid": r.error.is_none(),
                    "error": r.error,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else if !quiet {
        println!();
        for r in &reports {
            match &r.error {
                None => println!(
                    "  {} {} ({})",
                    style("✓").green(),
                    r.file.display(),
                    r.workflows.join(", ")
                ),
                Some(error) => println!(
                    "  {} {}: {}",
                    style("✗").red(),
                    r.file.display(),
                    style(error).red()
                ),
            }
        }
        println!();
    }

    if reports.is_empty() {
        bail!("No workflow documents found at {}", path.display());
    }
    if failed > 0 {
        bail!("{failed} of {} workflow files failed validation", reports.len());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// List
// ---------------------------------------------------------------------------

pub fn handle_list(state: &AppState, path: &Path, category: Option<&str>, json: bool) -> Result<()> {
    let sources: HashMap<String, PathBuf> = register_definitions(state, path)?
        .into_iter()
        .map(|(file, def)| (def.id, file))
        .collect();
    let defs = state.orchestrator.list_workflows(category);

    if json {
        let out: Vec<_> = defs
            .iter()
            .map(|d| {
                serde_json::json!({
                    "id": d.id,
                    "name": d.name,
                    "category": d.category,
                    "description": d.description,
                    "steps": d.steps.len(),
                    "file": sources.get(&d.id).map(|p| p.display().to_string()),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if defs.is_empty() {
        println!();
        println!("  No workflows found.");
        println!(
            "  Check a definition with: {}",
            style("conductor validate <file.yaml>").dim()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("ID").fg(Color::Cyan),
            Cell::new("Name"),
            Cell::new("Category"),
            Cell::new("Steps"),
            Cell::new("File"),
        ]);

    for d in &defs {
        let category = if d.category.is_empty() { "-" } else { d.category.as_str() };
        let file = sources
            .get(&d.id)
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            Cell::new(&d.id),
            Cell::new(&d.name),
            Cell::new(category),
            Cell::new(d.steps.len()),
            Cell::new(file),
        ]);
    }

    println!();
    println!("{table}");
    println!();

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
