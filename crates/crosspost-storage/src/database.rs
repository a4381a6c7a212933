// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes.

use std::path::Path;
use std::time::Duration;

use crosspost_core::CrosspostError;
use tracing::debug;

use crate::migrations;

/// Handle to the crosspost SQLite database.
///
/// Cloning the inner connection is cheap; every clone talks to the same
/// background thread.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (or create) the database at `path` in WAL mode and apply migrations.
    pub async fn open(path: &str) -> Result<Self, CrosspostError> {
        Self::open_with_options(path, true).await
    }

    pub async fn open_with_options(path: &str, wal_mode: bool) -> Result<Self, CrosspostError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(CrosspostError::storage)?;
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| CrosspostError::Storage {
                source: Box::new(e),
            })?;

        conn.call(move |conn| -> Result<(), rusqlite::Error> {
            conn.busy_timeout(Duration::from_secs(5))?;
            if wal_mode {
                let mode: String =
                    conn.query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))?;
                debug!(journal_mode = %mode, "journal mode set");
                conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
            }
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        let applied = conn
            .call(|conn| migrations::run_migrations(conn))
            .await
            .map_err(CrosspostError::storage)?;
        debug!(path, applied, "database opened");

        Ok(Self { conn })
    }

    /// The shared connection. Query modules go through `call()` on it.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoint the WAL so the main database file is self-contained.
    pub async fn checkpoint(&self) -> Result<(), CrosspostError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.query_row("PRAGMA wal_checkpoint(TRUNCATE);", [], |_| Ok(()))
            })
            .await
            .map_err(map_tr_err)
    }

    /// Write a consistent copy of the whole database to `dest`, which must
    /// not exist yet.
    pub async fn snapshot_to(&self, dest: &str) -> Result<(), CrosspostError> {
        let dest = dest.to_string();
        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute("VACUUM INTO ?1", rusqlite::params![dest])?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    /// Checkpoint and release the handle. The background thread exits once
    /// every clone of the connection is dropped.
    pub async fn close(self) -> Result<(), CrosspostError> {
        self.checkpoint().await
    }
}

/// Convert a tokio-rusqlite error into `CrosspostError::Storage`.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> CrosspostError {
    CrosspostError::Storage {
        source: Box::new(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_creates_schema() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/dir/crosspost.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        assert!(path.exists());

        let tables: Vec<String> = db
            .connection()
            .call(|conn| -> Result<Vec<String>, rusqlite::Error> {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_master WHERE type = 'table' AND name IN
                     ('seen', 'pending', 'batches') ORDER BY name",
                )?;
                stmt.query_map([], |row| row.get(0))?.collect()
            })
            .await
            .unwrap();
        assert_eq!(tables, vec!["batches", "pending", "seen"]);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn snapshot_is_independent_of_source() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("live.db");
        let copy = dir.path().join("copy.db");

        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute("INSERT INTO seen (item_id) VALUES ('before')", [])?;
                Ok(())
            })
            .await
            .unwrap();
        db.snapshot_to(copy.to_str().unwrap()).await.unwrap();

        let snapshot = Database::open(copy.to_str().unwrap()).await.unwrap();
        snapshot
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute("INSERT INTO seen (item_id) VALUES ('after')", [])?;
                Ok(())
            })
            .await
            .unwrap();

        let live: Vec<String> = db
            .connection()
            .call(|conn| -> Result<Vec<String>, rusqlite::Error> {
                let mut stmt = conn.prepare("SELECT item_id FROM seen")?;
                stmt.query_map([], |row| row.get(0))?.collect()
            })
            .await
            .unwrap();
        assert_eq!(live, vec!["before"]);

        snapshot.close().await.unwrap();
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn reopen_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("crosspost.db");
        let path = path.to_str().unwrap();

        let db = Database::open(path).await.unwrap();
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute("INSERT INTO seen (item_id) VALUES ('kept')", [])?;
                Ok(())
            })
            .await
            .unwrap();
        db.close().await.unwrap();

        let db = Database::open(path).await.unwrap();
        let count: i64 = db
            .connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row("SELECT COUNT(*) FROM seen", [], |row| row.get(0))
            })
            .await
            .unwrap();
        assert_eq!(count, 1);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn open_without_wal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plain.db");
        let db = Database::open_with_options(path.to_str().unwrap(), false)
            .await
            .unwrap();
        let mode: String = db
            .connection()
            .call(|conn| -> Result<String, rusqlite::Error> {
                conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))
            })
            .await
            .unwrap();
        assert_ne!(mode.to_lowercase(), "wal");
    }
}
