// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `crosspost pending` operator tooling.
//!
//! Stalled entries never retry on their own. An operator either clears one
//! (the item becomes discoverable again and starts over) or rejects it
//! (the item is resolved and never published).

use chrono::SecondsFormat;
use clap::Subcommand;
use tracing::info;

use crosspost_core::{CrosspostError, PendingStore, SeenStore};
use crosspost_storage::SqliteStorage;

#[derive(Subcommand, Debug)]
pub enum PendingCommands {
    /// List every pending entry, stalled ones included.
    List,
    /// Remove one entry so the item can be rediscovered.
    Clear {
        /// Item id to remove.
        item_id: String,
    },
    /// Remove every entry that used up its attempts.
    ClearStalled,
    /// Resolve one entry without publishing it.
    Reject {
        /// Item id to resolve.
        item_id: String,
    },
}

/// Executes a pending subcommand and returns the lines to print.
pub async fn run_pending(
    store: &SqliteStorage,
    max_attempts: u32,
    command: PendingCommands,
) -> Result<Vec<String>, CrosspostError> {
    match command {
        PendingCommands::List => {
            let entries = store.list_pending().await?;
            if entries.is_empty() {
                return Ok(vec!["no pending entries".to_string()]);
            }
            Ok(entries
                .iter()
                .map(|entry| {
                    let marker = if entry.is_retryable(max_attempts) {
                        "retryable"
                    } else {
                        "stalled"
                    };
                    format!(
                        "{}\t{}/{}\t{}\t{}",
                        entry.item_id,
                        entry.attempts,
                        max_attempts,
                        marker,
                        entry.last_attempt_at.to_rfc3339_opts(SecondsFormat::Secs, true)
                    )
                })
                .collect())
        }
        PendingCommands::Clear { item_id } => {
            let removed = store.remove_pending(&item_id).await?;
            if removed {
                info!(item_id = %item_id, "pending entry cleared by operator");
                Ok(vec![format!("cleared {item_id}")])
            } else {
                Ok(vec![format!("{item_id} is not pending")])
            }
        }
        PendingCommands::ClearStalled => {
            let count = store.clear_stalled(max_attempts).await?;
            info!(count, "stalled entries cleared by operator");
            Ok(vec![format!("cleared {count} stalled entries")])
        }
        PendingCommands::Reject { item_id } => {
            if !store.contains_pending(&item_id).await? {
                if let Some(record) = store.seen_record(&item_id).await? {
                    let at = record.resolved_at.to_rfc3339_opts(SecondsFormat::Secs, true);
                    return Ok(vec![format!("{item_id} was already resolved at {at}")]);
                }
                return Ok(vec![format!("{item_id} is not pending")]);
            }
            // Seen first: a crash in between leaves a seen id that discovery
            // purges from the queue, never a republish.
            store.mark_seen(&item_id).await?;
            store.remove_pending(&item_id).await?;
            info!(item_id = %item_id, "pending entry rejected by operator");
            Ok(vec![format!("rejected {item_id}")])
        }
    }
}
