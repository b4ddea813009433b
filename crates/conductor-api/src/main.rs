//! Conductor CLI entry point.
//!
//! Binary name: `conductor`
//!
//! Parses CLI arguments, initializes tracing and the engine, then dispatches
//! to the matching command handler.

mod cli;
mod state;

use clap::Parser;
use clap_complete::generate;
use conductor_observe::tracing_setup::{filter_for_verbosity, init_tracing, shutdown_tracing, TracingOptions};

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(&TracingOptions {
        filter: filter_for_verbosity(cli.verbose, cli.quiet).to_string(),
        json: cli.log_json,
        enable_otel: cli.otel,
    })
    .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "conductor", &mut std::io::stdout());
        return Ok(());
    }

    let result = run(cli).await;
    shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let state = AppState::init(cli.config.as_deref()).await?;

    match cli.command {
        Commands::Run {
            path,
            workflow_id,
            vars,
            vars_json,
            dry_run,
        } => {
            cli::workflow::handle_run(
                &state,
                &path,
                &workflow_id,
                &vars,
                vars_json.as_deref(),
                dry_run,
                cli.json,
                cli.quiet,
            )
            .await?;
        }

        Commands::Validate { path } => {
            let path = state.workflows_path(path)?;
            cli::workflow::handle_validate(&path, cli.json, cli.quiet)?;
        }

        Commands::List { path, category } => {
            let path = state.workflows_path(path)?;
            cli::workflow::handle_list(&state, &path, category.as_deref(), cli.json)?;
        }

        // Handled before state init
        Commands::Completions { .. } => {}
    }

    Ok(())
}
