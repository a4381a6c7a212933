// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Seen-set operations.

use crosspost_core::{CrosspostError, SeenRecord};
use rusqlite::{OptionalExtension, params};

use crate::database::Database;
use crate::models::parse_timestamp;

/// Whether `item_id` has been resolved (published or rejected).
pub async fn has_seen(db: &Database, item_id: &str) -> Result<bool, CrosspostError> {
    let item_id = item_id.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM seen WHERE item_id = ?1)",
                params![item_id],
                |row| row.get(0),
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Record `item_id` as resolved. Returns true if the row was newly inserted.
pub async fn mark_seen(db: &Database, item_id: &str) -> Result<bool, CrosspostError> {
    let item_id = item_id.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO seen (item_id) VALUES (?1)",
                params![item_id],
            )?;
            Ok(inserted > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// The seen row for `item_id`, if it was resolved.
pub async fn get(db: &Database, item_id: &str) -> Result<Option<SeenRecord>, CrosspostError> {
    let item_id = item_id.to_string();
    let row = db
        .connection()
        .call(move |conn| -> Result<Option<(String, String)>, rusqlite::Error> {
            conn.query_row(
                "SELECT item_id, resolved_at FROM seen WHERE item_id = ?1",
                params![item_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    row.map(|(item_id, resolved_at)| {
        Ok(SeenRecord {
            item_id,
            resolved_at: parse_timestamp(&resolved_at)?,
        })
    })
    .transpose()
}

pub async fn count(db: &Database) -> Result<u64, CrosspostError> {
    db.connection()
        .call(|conn| -> Result<i64, rusqlite::Error> {
            conn.query_row("SELECT COUNT(*) FROM seen", [], |row| row.get(0))
        })
        .await
        .map(|n| n.max(0) as u64)
        .map_err(crate::database::map_tr_err)
}
