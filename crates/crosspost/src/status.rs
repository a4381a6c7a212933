// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `crosspost status` command implementation.
//!
//! Reads queue statistics and the stalled entries straight from the store.
//! `--json` prints a structured report for scripting.

use std::io::IsTerminal;

use chrono::SecondsFormat;
use serde::Serialize;

use crosspost_core::{CrosspostError, PendingEntry, PendingStore, QueueStats};
use crosspost_storage::SqliteStorage;

/// A stalled entry as shown to operators.
#[derive(Debug, Serialize)]
pub struct StalledEntry {
    pub item_id: String,
    pub attempts: u32,
    pub last_attempt_at: String,
}

impl From<&PendingEntry> for StalledEntry {
    fn from(entry: &PendingEntry) -> Self {
        Self {
            item_id: entry.item_id.clone(),
            attempts: entry.attempts,
            last_attempt_at: entry
                .last_attempt_at
                .to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

/// Structured status output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub database_path: String,
    pub max_attempts: u32,
    #[serde(flatten)]
    pub stats: QueueStats,
    pub stalled: Vec<StalledEntry>,
}

pub async fn collect_status(
    store: &SqliteStorage,
    database_path: &str,
    max_attempts: u32,
) -> Result<StatusReport, CrosspostError> {
    let stats = store.stats(max_attempts).await?;
    let stalled = store
        .list_stalled(max_attempts)
        .await?
        .iter()
        .map(StalledEntry::from)
        .collect();
    Ok(StatusReport {
        database_path: database_path.to_string(),
        max_attempts,
        stats,
        stalled,
    })
}

/// Run the `crosspost status` command.
///
/// If `--plain` is passed or stdout is not a TTY, disables colors.
pub async fn run_status(
    store: &SqliteStorage,
    database_path: &str,
    max_attempts: u32,
    json: bool,
    plain: bool,
) -> Result<(), CrosspostError> {
    let report = collect_status(store, database_path, max_attempts).await?;
    if json {
        let rendered = serde_json::to_string_pretty(&report)
            .map_err(|e| CrosspostError::Internal(format!("failed to render status: {e}")))?;
        println!("{rendered}");
    } else {
        let use_color = !plain && std::io::stdout().is_terminal();
        print_report(&report, use_color);
    }
    Ok(())
}

fn print_report(report: &StatusReport, use_color: bool) {
    let stats = &report.stats;
    println!();
    println!("  crosspost status");
    println!("  {}", "-".repeat(35));
    println!("    Database:        {}", report.database_path);
    println!("    Cached batches:  {}", stats.batches);
    println!("    Cached items:    {}", stats.cached_items);
    println!("    Resolved (seen): {}", stats.seen_total);
    println!("    Pending:         {}", stats.pending_total);

    if stats.stalled_total == 0 {
        if use_color {
            use colored::Colorize;
            println!("    Stalled:         {}", "0".green());
        } else {
            println!("    Stalled:         0");
        }
        println!();
        return;
    }

    if use_color {
        use colored::Colorize;
        println!(
            "    Stalled:         {}",
            stats.stalled_total.to_string().yellow()
        );
    } else {
        println!("    Stalled:         {} [ATTENTION]", stats.stalled_total);
    }
    for entry in &report.stalled {
        println!(
            "      {}  {}/{} attempts, last {}",
            entry.item_id, entry.attempts, report.max_attempts, entry.last_attempt_at
        );
    }
    println!();
    println!("  Retry with: crosspost pending clear <id>   Give up with: crosspost pending reject <id>");
    println!();
}
