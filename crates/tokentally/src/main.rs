// SPDX-FileCopyrightText: 2026 Tokentally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tokentally - LLM cost reports from the call log and session snapshot.
//!
//! Read-only: this binary never writes to the metrics directory.

mod report;

use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tokentally_config::TokentallyConfig;
use tokentally_core::TokentallyError;
use tokentally_cost::analysis::{analyze_by_session, load_cost_log, session_records, summarize};
use tokentally_cost::ledger::COST_LOG_FILE;
use tokentally_cost::{CallRecord, SnapshotStore};
use tracing::warn;

/// Tokentally - LLM cost reports.
#[derive(Parser, Debug)]
#[command(name = "tokentally", version, about, long_about = None)]
struct Cli {
    /// Call log to read (defaults to `<log-dir>/cost_log.csv`).
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Metrics directory (defaults to `metrics.log_dir` from config).
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Emit JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    /// Disable colors.
    #[arg(long, global = true)]
    plain: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Totals across every session, by agent and by model.
    Summary,
    /// Statistics and call history for one session.
    Session {
        /// Session id to report on.
        id: String,
    },
    /// List session ids with call counts and cost.
    Sessions,
    /// Print the live session snapshot.
    Snapshot,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match tokentally_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            tokentally_config::render_errors(&errors);
            std::process::exit(1);
        }
    };
    init_tracing(&config.logging.level);

    if let Err(e) = run(cli, &config).await {
        eprintln!("tokentally: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: &TokentallyConfig) -> Result<(), TokentallyError> {
    let log_dir = cli
        .log_dir
        .unwrap_or_else(|| PathBuf::from(&config.metrics.log_dir));
    let log_file = cli.log_file.unwrap_or_else(|| log_dir.join(COST_LOG_FILE));
    let color = !cli.plain && !cli.json && std::io::stdout().is_terminal();

    match cli.command.unwrap_or(Commands::Summary) {
        Commands::Summary => {
            let summary = summarize(&read_records(&log_file)?);
            if cli.json {
                print_json(&summary)?;
            } else {
                print!("{}", report::render_summary(&summary, color));
            }
        }
        Commands::Session { id } => {
            let records = read_records(&log_file)?;
            let calls: Vec<&CallRecord> = session_records(&records, &id).collect();
            let sessions = analyze_by_session(&records);
            let Some(rollup) = sessions.get(&id) else {
                return Err(TokentallyError::invalid_input(format!(
                    "no data found for session `{id}`"
                )));
            };
            if cli.json {
                print_json(rollup)?;
            } else {
                print!("{}", report::render_session(rollup, &calls, color));
            }
        }
        Commands::Sessions => {
            let sessions = analyze_by_session(&read_records(&log_file)?);
            if cli.json {
                print_json(&report::session_list(&sessions))?;
            } else {
                print!("{}", report::render_session_list(&sessions, color));
            }
        }
        Commands::Snapshot => {
            let sessions = SnapshotStore::in_dir(&log_dir).load().await?;
            if cli.json {
                print_json(&sessions)?;
            } else {
                print!("{}", report::render_session_list(&sessions, color));
            }
        }
    }
    Ok(())
}

/// A missing call log reads as no calls.
fn read_records(path: &Path) -> Result<Vec<CallRecord>, TokentallyError> {
    if !path.exists() {
        warn!(path = %path.display(), "cost log not found");
        return Ok(Vec::new());
    }
    load_cost_log(path)
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<(), TokentallyError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| TokentallyError::Internal(format!("failed to encode JSON: {e}")))?;
    println!("{json}");
    Ok(())
}

/// Initialize the tracing subscriber with an env filter.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tokentally={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "tokentally",
            "session",
            "abc",
            "--json",
            "--log-dir",
            "/tmp/m",
        ])
        .unwrap();
        assert!(cli.json);
        assert_eq!(cli.log_dir.as_deref(), Some(Path::new("/tmp/m")));
        assert!(matches!(cli.command, Some(Commands::Session { ref id }) if id == "abc"));
    }

    #[test]
    fn no_subcommand_means_summary() {
        let cli = Cli::try_parse_from(["tokentally"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn binary_loads_config_defaults() {
        let config = tokentally_config::load_and_validate_str("").expect("default config should be valid");
        assert_eq!(config.metrics.log_dir, "logs/metrics");
    }
}
