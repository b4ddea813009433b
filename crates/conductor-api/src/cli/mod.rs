//! CLI command definitions for the `conductor` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod workflow;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use conductor_infra::config::CONFIG_ENV_VAR;

/// Run and inspect workflow definitions.
#[derive(Parser)]
#[command(name = "conductor", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for info, -vv for debug, -vvv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit log lines as JSON.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Export spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    /// Engine config file (defaults to the platform config directory).
    #[arg(long, global = true, env = CONFIG_ENV_VAR)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Execute a workflow from a file or directory of definitions.
    Run {
        /// Workflow file or directory.
        path: PathBuf,

        /// Workflow id to execute.
        workflow_id: String,

        /// Input variable as key=value (value parsed as JSON when possible). Repeatable.
        #[arg(long = "var", value_name = "KEY=VALUE")]
        vars: Vec<String>,

        /// Input variables as a JSON object; `--var` entries override its keys.
        #[arg(long = "vars", value_name = "JSON")]
        vars_json: Option<String>,

        /// Check preconditions and complete without running steps.
        #[arg(long)]
        dry_run: bool,
    },

    /// Parse and validate workflow definitions.
    Validate {
        /// Workflow file or directory (defaults to `workflows_dir` from config).
        path: Option<PathBuf>,
    },

    /// List workflow definitions.
    #[command(alias = "ls")]
    List {
        /// Workflow file or directory (defaults to `workflows_dir` from config).
        path: Option<PathBuf>,

        /// Only show workflows in this category.
        #[arg(long)]
        category: Option<String>,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}
