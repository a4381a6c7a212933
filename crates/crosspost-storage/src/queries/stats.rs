// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Aggregate counts for `crosspost status`.

use crosspost_core::{CrosspostError, QueueStats};
use rusqlite::params;

use crate::database::Database;

/// Snapshot of every table in one read on the writer thread.
pub async fn queue_stats(db: &Database, max_attempts: u32) -> Result<QueueStats, CrosspostError> {
    db.connection()
        .call(move |conn| -> Result<QueueStats, rusqlite::Error> {
            let count = |sql: &str| -> Result<u64, rusqlite::Error> {
                conn.query_row(sql, [], |row| row.get::<_, i64>(0))
                    .map(|n| n.max(0) as u64)
            };
            let stalled: i64 = conn.query_row(
                "SELECT COUNT(*) FROM pending WHERE attempts >= ?1",
                params![max_attempts],
                |row| row.get(0),
            )?;
            Ok(QueueStats {
                batches: count("SELECT COUNT(*) FROM batches")?,
                cached_items: count(
                    "SELECT COALESCE(SUM(json_array_length(items_json)), 0) FROM batches",
                )?,
                seen_total: count("SELECT COUNT(*) FROM seen")?,
                pending_total: count("SELECT COUNT(*) FROM pending")?,
                stalled_total: stalled.max(0) as u64,
            })
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crosspost_core::Item;
    use tempfile::tempdir;

    use crate::queries::{batches, pending, seen};

    #[tokio::test]
    async fn stats_reflect_every_table() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("s.db").to_str().unwrap())
            .await
            .unwrap();

        assert_eq!(queue_stats(&db, 3).await.unwrap(), QueueStats::default());

        let items: Vec<Item> = (0..3)
            .map(|i| Item::new(format!("i{i}"), "t", vec![]).unwrap())
            .collect();
        batches::insert(&db, "sel", &items, Utc::now(), 2).await.unwrap();
        seen::mark_seen(&db, "old").await.unwrap();
        for _ in 0..3 {
            pending::upsert(&db, &items[0], Utc::now(), 16, 3).await.unwrap();
        }
        pending::upsert(&db, &items[1], Utc::now(), 16, 3).await.unwrap();

        let stats = queue_stats(&db, 3).await.unwrap();
        assert_eq!(stats.batches, 1);
        assert_eq!(stats.cached_items, 3);
        assert_eq!(stats.seen_total, 1);
        assert_eq!(stats.pending_total, 2);
        assert_eq!(stats.stalled_total, 1);

        db.close().await.unwrap();
    }
}
