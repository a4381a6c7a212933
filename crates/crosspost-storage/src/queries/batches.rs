// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Discovery batch cache operations.

use chrono::{DateTime, Utc};
use crosspost_core::{Batch, CrosspostError, Item};
use rusqlite::params;

use crate::database::Database;
use crate::models::{format_timestamp, BatchRow};

/// All cached batches, oldest first.
pub async fn list(db: &Database) -> Result<Vec<Batch>, CrosspostError> {
    let rows = db
        .connection()
        .call(|conn| -> Result<Vec<BatchRow>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT batch_id, selector, fetched_at, items_json
                 FROM batches ORDER BY batch_id ASC",
            )?;
            let rows = stmt.query_map([], BatchRow::from_row)?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    rows.into_iter().map(BatchRow::into_batch).collect()
}

/// Store a batch, then trim the cache to the newest `max_batches`.
///
/// Returns the new batch id and how many older batches were evicted.
pub async fn insert(
    db: &Database,
    selector: &str,
    items: &[Item],
    fetched_at: DateTime<Utc>,
    max_batches: usize,
) -> Result<(i64, usize), CrosspostError> {
    let selector = selector.to_string();
    let items_json = serde_json::to_string(items).map_err(CrosspostError::storage)?;
    let fetched_at = format_timestamp(fetched_at);
    let keep = i64::try_from(max_batches.max(1)).unwrap_or(i64::MAX);

    db.connection()
        .call(move |conn| -> Result<(i64, usize), rusqlite::Error> {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO batches (selector, fetched_at, items_json) VALUES (?1, ?2, ?3)",
                params![selector, fetched_at, items_json],
            )?;
            let batch_id = tx.last_insert_rowid();
            let evicted = tx.execute(
                "DELETE FROM batches WHERE batch_id NOT IN
                 (SELECT batch_id FROM batches ORDER BY batch_id DESC LIMIT ?1)",
                params![keep],
            )?;
            tx.commit()?;
            Ok((batch_id, evicted))
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn remove(db: &Database, batch_id: i64) -> Result<(), CrosspostError> {
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute("DELETE FROM batches WHERE batch_id = ?1", params![batch_id])?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}
