// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! crosspost - relays feed posts to a microblogging platform.
//!
//! This is the binary entry point. Each tick handles at most one item.

mod app;
mod pending;
mod publisher;
mod run;
mod shutdown;
mod status;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use crosspost_config::CrosspostConfig;
use crosspost_core::CrosspostError;
use crosspost_storage::SqliteStorage;

use crate::pending::PendingCommands;

/// crosspost - relays feed posts to a microblogging platform, one per tick.
#[derive(Parser, Debug)]
#[command(name = "crosspost", version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file instead of the XDG lookup.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run exactly one tick and print its outcome.
    Tick {
        /// Log payloads instead of posting, against a copy of the database.
        #[arg(long)]
        dry_run: bool,
    },
    /// Tick every `scheduler.interval_secs` until SIGINT/SIGTERM.
    Run {
        /// Log payloads instead of posting, against a copy of the database.
        #[arg(long)]
        dry_run: bool,
    },
    /// Show queue statistics and stalled entries.
    Status {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
        /// Disable colors.
        #[arg(long)]
        plain: bool,
    },
    /// Inspect and resolve retry queue entries.
    Pending {
        #[command(subcommand)]
        action: PendingCommands,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => crosspost_config::load_and_validate_path(path),
        None => crosspost_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            crosspost_config::render_errors(&errors);
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config.bot.log_level);
    crosspost_engine::recording::register_metrics();

    match execute(cli.command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "crosspost failed");
            ExitCode::FAILURE
        }
    }
}

async fn execute(command: Commands, config: &CrosspostConfig) -> Result<(), CrosspostError> {
    let store = app::open_store(config).await?;
    let max_attempts = config.queue.max_attempts;

    let result = match command {
        Commands::Tick { dry_run } => tick_command(config, &store, dry_run).await,
        Commands::Run { dry_run } => run_command(config, &store, dry_run).await,
        Commands::Status { json, plain } => {
            status::run_status(
                &store,
                &config.storage.database_path,
                max_attempts,
                json,
                plain,
            )
            .await
        }
        Commands::Pending { action } => {
            pending::run_pending(&store, max_attempts, action)
                .await
                .map(|lines| lines.iter().for_each(|line| println!("{line}")))
        }
    };

    finish(result, store.close().await)
}

async fn tick_command(
    config: &CrosspostConfig,
    store: &SqliteStorage,
    dry_run: bool,
) -> Result<(), CrosspostError> {
    let target = app::publish_target(config, store, dry_run).await?;
    let orchestrator =
        app::build_orchestrator(config, target.store.clone(), target.publisher.clone());
    run::run_tick(&orchestrator).await.map(|_| ())
}

async fn run_command(
    config: &CrosspostConfig,
    store: &SqliteStorage,
    dry_run: bool,
) -> Result<(), CrosspostError> {
    let target = app::publish_target(config, store, dry_run).await?;
    let orchestrator =
        app::build_orchestrator(config, target.store.clone(), target.publisher.clone());
    let cancel = shutdown::install_signal_handler();
    info!(bot = %config.bot.name, dry_run, "crosspost running");
    let interval = Duration::from_secs(config.scheduler.interval_secs);
    run::run_loop(&orchestrator, interval, cancel).await;
    Ok(())
}

/// The command's result wins over a failed close, which is only logged.
fn finish(
    result: Result<(), CrosspostError>,
    closed: Result<(), CrosspostError>,
) -> Result<(), CrosspostError> {
    if let Err(e) = closed {
        warn!(error = %e, "failed to close store");
    }
    result
}

/// Initialize the tracing subscriber with an env filter.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("crosspost={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_pending_reject() {
        let cli = Cli::try_parse_from(["crosspost", "pending", "reject", "abc123"]).unwrap();
        match cli.command {
            Commands::Pending {
                action: PendingCommands::Reject { item_id },
            } => assert_eq!(item_id, "abc123"),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_global_config_flag() {
        let cli =
            Cli::try_parse_from(["crosspost", "status", "--json", "--config", "/tmp/c.toml"])
                .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
        assert!(matches!(cli.command, Commands::Status { json: true, .. }));
    }

    #[test]
    fn binary_loads_config_defaults() {
        let config = crosspost_config::load_and_validate_str("")
            .expect("default config should be valid");
        assert_eq!(config.bot.name, "crosspost");
    }

    #[test]
    fn parses_dry_run_flag() {
        let cli = Cli::try_parse_from(["crosspost", "run", "--dry-run"]).unwrap();
        assert!(matches!(cli.command, Commands::Run { dry_run: true }));
        let cli = Cli::try_parse_from(["crosspost", "tick"]).unwrap();
        assert!(matches!(cli.command, Commands::Tick { dry_run: false }));
    }

    fn temp_config(dir: &tempfile::TempDir) -> CrosspostConfig {
        let mut config = CrosspostConfig::default();
        config.storage.database_path = dir.path().join("q.db").display().to_string();
        config.media.scratch_dir = Some(dir.path().display().to_string());
        config
    }

    #[tokio::test]
    async fn tick_against_fresh_database_is_idle() {
        let dir = tempfile::tempdir().unwrap();
        let config = temp_config(&dir);

        let store = app::open_store(&config).await.unwrap();
        let target = app::publish_target(&config, &store, true).await.unwrap();
        let orchestrator =
            app::build_orchestrator(&config, target.store.clone(), target.publisher.clone());
        let outcome = orchestrator.tick().await.unwrap();
        assert_eq!(outcome.to_string(), "idle");
    }

    #[tokio::test]
    async fn tick_without_dry_run_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let config = temp_config(&dir);

        let err = execute(Commands::Tick { dry_run: false }, &config).await.unwrap_err();
        assert!(matches!(err, CrosspostError::Config(ref msg) if msg.contains("--dry-run")));
    }

    #[tokio::test]
    async fn dry_run_never_records_into_the_real_store() {
        use crosspost_core::{Item, PendingStore, SeenStore};

        let dir = tempfile::tempdir().unwrap();
        let config = temp_config(&dir);
        let store = app::open_store(&config).await.unwrap();
        let item = Item::new("queued", "retry me", vec![]).unwrap();
        store.upsert_pending(&item, chrono::Utc::now(), 3).await.unwrap();

        let target = app::publish_target(&config, &store, true).await.unwrap();
        let orchestrator =
            app::build_orchestrator(&config, target.store.clone(), target.publisher.clone());
        let outcome = orchestrator.tick().await.unwrap();
        assert!(outcome.to_string().starts_with("published(dry-run-"));
        assert!(target.store.has_seen("queued").await.unwrap());

        assert!(!store.has_seen("queued").await.unwrap());
        assert!(store.contains_pending("queued").await.unwrap());
    }

    #[test]
    fn close_failure_does_not_mask_command_error() {
        let result = finish(
            Err(CrosspostError::Config("bad".to_string())),
            Err(CrosspostError::Internal("close".to_string())),
        );
        assert!(matches!(result, Err(CrosspostError::Config(_))));
        assert!(finish(Ok(()), Err(CrosspostError::Internal("close".to_string()))).is_ok());
    }
}
