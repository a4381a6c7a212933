// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retry queue operations.
//!
//! Ordering is `last_attempt_at` ascending with `rowid` as the tie-break, so
//! entries recorded in the same millisecond keep insertion order. An upsert
//! keeps the row's `rowid`.

use chrono::{DateTime, Utc};
use crosspost_core::{CrosspostError, Item, PendingEntry};
use rusqlite::params;

use crate::database::Database;
use crate::models::{format_timestamp, PendingRow};

const SELECT_COLUMNS: &str = "SELECT item_id, text, media_refs, attempts, last_attempt_at FROM pending";

/// Result of an upsert: the stored entry and any ids evicted to make room.
#[derive(Debug, Clone)]
pub struct UpsertOutcome {
    pub entry: PendingEntry,
    pub evicted: Vec<String>,
    /// Set when only stalled entries were left to evict.
    pub over_capacity: bool,
}

/// Entries with fewer than `max_attempts` attempts, oldest first.
pub async fn list_retryable(
    db: &Database,
    max_attempts: u32,
) -> Result<Vec<PendingEntry>, CrosspostError> {
    query_entries(
        db,
        format!("{SELECT_COLUMNS} WHERE attempts < ?1 ORDER BY last_attempt_at ASC, rowid ASC"),
        Some(max_attempts),
    )
    .await
}

/// Entries at or above `max_attempts`, oldest first.
pub async fn list_stalled(
    db: &Database,
    max_attempts: u32,
) -> Result<Vec<PendingEntry>, CrosspostError> {
    query_entries(
        db,
        format!("{SELECT_COLUMNS} WHERE attempts >= ?1 ORDER BY last_attempt_at ASC, rowid ASC"),
        Some(max_attempts),
    )
    .await
}

pub async fn list_all(db: &Database) -> Result<Vec<PendingEntry>, CrosspostError> {
    query_entries(
        db,
        format!("{SELECT_COLUMNS} ORDER BY last_attempt_at ASC, rowid ASC"),
        None,
    )
    .await
}

async fn query_entries(
    db: &Database,
    sql: String,
    max_attempts: Option<u32>,
) -> Result<Vec<PendingEntry>, CrosspostError> {
    let rows = db
        .connection()
        .call(move |conn| -> Result<Vec<PendingRow>, rusqlite::Error> {
            let mut stmt = conn.prepare(&sql)?;
            let rows = match max_attempts {
                Some(max) => stmt.query_map(params![max], PendingRow::from_row)?,
                None => stmt.query_map([], PendingRow::from_row)?,
            };
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    rows.into_iter().map(PendingRow::into_entry).collect()
}

pub async fn contains(db: &Database, item_id: &str) -> Result<bool, CrosspostError> {
    let item_id = item_id.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM pending WHERE item_id = ?1)",
                params![item_id],
                |row| row.get(0),
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Record a failed attempt for `item`.
///
/// A new id is inserted with `attempts = 1`; an existing id gets its content
/// replaced, `attempts` incremented and `last_attempt_at` refreshed. When a new
/// id would push the queue past `capacity`, the retryable entries
/// (`attempts < max_attempts`) with the oldest `last_attempt_at` are deleted
/// first. Stalled entries are never evicted: if too few retryable entries
/// exist, the queue grows past `capacity` and `over_capacity` is set.
/// All of it runs in one transaction.
pub async fn upsert(
    db: &Database,
    item: &Item,
    attempted_at: DateTime<Utc>,
    capacity: usize,
    max_attempts: u32,
) -> Result<UpsertOutcome, CrosspostError> {
    let item_id = item.id().to_string();
    let text = item.text().to_string();
    let media_refs = serde_json::to_string(item.media_refs()).map_err(CrosspostError::storage)?;
    let attempted_at = format_timestamp(attempted_at);
    let capacity = i64::try_from(capacity.max(1)).unwrap_or(i64::MAX);

    let (row, evicted, over_capacity) = db
        .connection()
        .call(move |conn| -> Result<(PendingRow, Vec<String>, bool), rusqlite::Error> {
            let tx = conn.transaction()?;

            let exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM pending WHERE item_id = ?1)",
                params![item_id],
                |row| row.get(0),
            )?;

            let mut evicted = Vec::new();
            let mut over_capacity = false;
            if !exists {
                let queued: i64 = tx.query_row("SELECT COUNT(*) FROM pending", [], |row| row.get(0))?;
                let overflow = queued + 1 - capacity;
                if overflow > 0 {
                    {
                        let mut stmt = tx.prepare(
                            "SELECT item_id FROM pending
                             WHERE attempts < ?2
                             ORDER BY last_attempt_at ASC, rowid ASC
                             LIMIT ?1",
                        )?;
                        evicted = stmt
                            .query_map(params![overflow, max_attempts], |row| row.get(0))?
                            .collect::<Result<Vec<String>, _>>()?;
                    }
                    for id in &evicted {
                        tx.execute("DELETE FROM pending WHERE item_id = ?1", params![id])?;
                    }
                    over_capacity = (evicted.len() as i64) < overflow;
                }
            }

            let row = tx.query_row(
                "INSERT INTO pending (item_id, text, media_refs, attempts, last_attempt_at)
                 VALUES (?1, ?2, ?3, 1, ?4)
                 ON CONFLICT(item_id) DO UPDATE SET
                     text = excluded.text,
                     media_refs = excluded.media_refs,
                     attempts = pending.attempts + 1,
                     last_attempt_at = excluded.last_attempt_at
                 RETURNING item_id, text, media_refs, attempts, last_attempt_at",
                params![item_id, text, media_refs, attempted_at],
                PendingRow::from_row,
            )?;

            tx.commit()?;
            Ok((row, evicted, over_capacity))
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    Ok(UpsertOutcome {
        entry: row.into_entry()?,
        evicted,
        over_capacity,
    })
}

/// Delete the entry for `item_id`. Returns whether a row existed.
pub async fn remove(db: &Database, item_id: &str) -> Result<bool, CrosspostError> {
    let item_id = item_id.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let deleted = conn.execute("DELETE FROM pending WHERE item_id = ?1", params![item_id])?;
            Ok(deleted > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Delete every entry with `attempts >= max_attempts`. Returns the count.
pub async fn clear_stalled(db: &Database, max_attempts: u32) -> Result<u64, CrosspostError> {
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute("DELETE FROM pending WHERE attempts >= ?1", params![max_attempts])
        })
        .await
        .map(|n| n as u64)
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use crosspost_core::MediaRef;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_760_000_000 + secs, 0).unwrap()
    }

    fn item(id: &str) -> Item {
        Item::new(id, format!("text for {id}"), vec![]).unwrap()
    }

    #[tokio::test]
    async fn first_upsert_inserts_with_one_attempt() {
        let (db, _dir) = setup_db().await;

        let outcome = upsert(&db, &item("c"), at(0), 16, 3).await.unwrap();
        assert_eq!(outcome.entry.item_id, "c");
        assert_eq!(outcome.entry.attempts, 1);
        assert_eq!(outcome.entry.last_attempt_at, at(0));
        assert!(outcome.evicted.is_empty());
        assert!(contains(&db, "c").await.unwrap());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn repeated_upsert_increments_and_replaces_content() {
        let (db, _dir) = setup_db().await;

        upsert(&db, &item("d"), at(0), 16, 3).await.unwrap();
        let updated = Item::new(
            "d",
            "new text",
            vec![MediaRef::image("https://cdn.example/a,b.jpg")],
        )
        .unwrap();
        let outcome = upsert(&db, &updated, at(10), 16, 3).await.unwrap();

        assert_eq!(outcome.entry.attempts, 2);
        assert_eq!(outcome.entry.text, "new text");
        assert_eq!(outcome.entry.media_refs, updated.media_refs());
        assert_eq!(outcome.entry.last_attempt_at, at(10));
        assert_eq!(list_all(&db).await.unwrap().len(), 1);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn retryable_excludes_exhausted_entries() {
        let (db, _dir) = setup_db().await;

        for i in 0..3 {
            upsert(&db, &item("d"), at(i), 16, 3).await.unwrap();
        }
        upsert(&db, &item("e"), at(5), 16, 3).await.unwrap();

        let retryable = list_retryable(&db, 3).await.unwrap();
        assert_eq!(retryable.len(), 1);
        assert_eq!(retryable[0].item_id, "e");

        let stalled = list_stalled(&db, 3).await.unwrap();
        assert_eq!(stalled.len(), 1);
        assert_eq!(stalled[0].item_id, "d");
        assert_eq!(stalled[0].attempts, 3);

        assert_eq!(clear_stalled(&db, 3).await.unwrap(), 1);
        assert!(!contains(&db, "d").await.unwrap());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn retryable_ordered_by_last_attempt_then_insertion() {
        let (db, _dir) = setup_db().await;

        upsert(&db, &item("late"), at(20), 16, 3).await.unwrap();
        upsert(&db, &item("tie-1"), at(10), 16, 3).await.unwrap();
        upsert(&db, &item("tie-2"), at(10), 16, 3).await.unwrap();

        let ids: Vec<String> = list_retryable(&db, 3)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.item_id)
            .collect();
        assert_eq!(ids, vec!["tie-1", "tie-2", "late"]);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn full_queue_evicts_oldest_attempt() {
        let (db, _dir) = setup_db().await;

        upsert(&db, &item("a"), at(5), 2, 3).await.unwrap();
        upsert(&db, &item("b"), at(1), 2, 3).await.unwrap();

        // Updating a queued id never evicts.
        let outcome = upsert(&db, &item("a"), at(6), 2, 3).await.unwrap();
        assert!(outcome.evicted.is_empty());

        let outcome = upsert(&db, &item("c"), at(7), 2, 3).await.unwrap();
        assert_eq!(outcome.evicted, vec!["b"]);

        let ids: Vec<String> = list_all(&db).await.unwrap().into_iter().map(|e| e.item_id).collect();
        assert_eq!(ids, vec!["a", "c"]);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn single_slot_queue_is_last_write_wins() {
        let (db, _dir) = setup_db().await;

        upsert(&db, &item("a"), at(0), 1, 3).await.unwrap();
        let outcome = upsert(&db, &item("b"), at(1), 1, 3).await.unwrap();
        assert_eq!(outcome.evicted, vec!["a"]);
        assert_eq!(outcome.entry.attempts, 1);
        assert_eq!(list_all(&db).await.unwrap().len(), 1);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn stalled_entries_are_never_evicted() {
        let (db, _dir) = setup_db().await;

        for i in 0..3 {
            upsert(&db, &item("stuck"), at(i), 2, 3).await.unwrap();
        }
        upsert(&db, &item("b"), at(10), 2, 3).await.unwrap();

        // The retryable entry goes even though "stuck" is older.
        let outcome = upsert(&db, &item("c"), at(11), 2, 3).await.unwrap();
        assert_eq!(outcome.evicted, vec!["b"]);
        assert!(!outcome.over_capacity);
        assert!(contains(&db, "stuck").await.unwrap());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn queue_of_stalled_entries_grows_past_capacity() {
        let (db, _dir) = setup_db().await;

        for i in 0..3 {
            upsert(&db, &item("stuck"), at(i), 1, 3).await.unwrap();
        }
        let outcome = upsert(&db, &item("next"), at(5), 1, 3).await.unwrap();
        assert!(outcome.evicted.is_empty());
        assert!(outcome.over_capacity);

        let stalled = list_stalled(&db, 3).await.unwrap();
        assert_eq!(stalled.len(), 1);
        assert_eq!(stalled[0].item_id, "stuck");
        assert_eq!(list_all(&db).await.unwrap().len(), 2);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let (db, _dir) = setup_db().await;

        upsert(&db, &item("x"), at(0), 16, 3).await.unwrap();
        assert!(remove(&db, "x").await.unwrap());
        assert!(!remove(&db, "x").await.unwrap());
        assert!(list_all(&db).await.unwrap().is_empty());

        db.close().await.unwrap();
    }
}
