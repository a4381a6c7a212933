// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the queue store traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashSet;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crosspost_config::model::StorageConfig;
use crosspost_core::{
    Adapter, AdapterType, Batch, BatchStore, CrosspostError, HealthStatus, Item, PendingEntry,
    PendingStore, QueueStats, SeenRecord, SeenStore,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed queue store.
///
/// Wraps a [`Database`] handle and delegates to the typed query modules. The
/// database is opened on [`SqliteStorage::initialize`]. Positive seen lookups
/// are cached in memory; the table stays authoritative.
pub struct SqliteStorage {
    config: StorageConfig,
    capacity: usize,
    db: OnceCell<Database>,
    seen_cache: DashSet<String>,
}

impl SqliteStorage {
    /// Create a store for `config` whose retry queue holds at most `capacity` entries.
    ///
    /// The database connection is not opened until [`initialize`](Self::initialize) is called.
    pub fn new(config: StorageConfig, capacity: usize) -> Self {
        Self {
            config,
            capacity: capacity.max(1),
            db: OnceCell::new(),
            seen_cache: DashSet::new(),
        }
    }

    /// Construct and initialize in one step.
    pub async fn open(config: StorageConfig, capacity: usize) -> Result<Self, CrosspostError> {
        let storage = Self::new(config, capacity);
        storage.initialize().await?;
        Ok(storage)
    }

    pub async fn initialize(&self) -> Result<(), CrosspostError> {
        let db =
            Database::open_with_options(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| CrosspostError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    /// Checkpoint the WAL. The store stays usable afterwards.
    pub async fn close(&self) -> Result<(), CrosspostError> {
        self.db()?.checkpoint().await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    /// Copy the database to `dest` for work that must not touch this store.
    pub async fn snapshot(&self, dest: &str) -> Result<(), CrosspostError> {
        self.db()?.snapshot_to(dest).await?;
        debug!(dest, "database snapshot written");
        Ok(())
    }

    pub async fn stats(&self, max_attempts: u32) -> Result<QueueStats, CrosspostError> {
        queries::stats::queue_stats(self.db()?, max_attempts).await
    }

    /// Returns the underlying Database, or an error if not initialized.
    fn db(&self) -> Result<&Database, CrosspostError> {
        self.db.get().ok_or_else(|| CrosspostError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl Adapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> HealthStatus {
        let db = match self.db() {
            Ok(db) => db,
            Err(e) => return HealthStatus::Unhealthy(e.to_string()),
        };
        let probe = db
            .connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row("SELECT 1", [], |row| row.get(0))
            })
            .await;
        match probe {
            Ok(_) => HealthStatus::Healthy,
            Err(e) => HealthStatus::Unhealthy(e.to_string()),
        }
    }
}

#[async_trait]
impl SeenStore for SqliteStorage {
    async fn has_seen(&self, item_id: &str) -> Result<bool, CrosspostError> {
        if self.seen_cache.contains(item_id) {
            return Ok(true);
        }
        let seen = queries::seen::has_seen(self.db()?, item_id).await?;
        if seen {
            self.seen_cache.insert(item_id.to_string());
        }
        Ok(seen)
    }

    async fn mark_seen(&self, item_id: &str) -> Result<(), CrosspostError> {
        let inserted = queries::seen::mark_seen(self.db()?, item_id).await?;
        if !inserted {
            debug!(item_id, "item already marked seen");
        }
        // Only cache after the row is durable.
        self.seen_cache.insert(item_id.to_string());
        Ok(())
    }

    async fn seen_record(&self, item_id: &str) -> Result<Option<SeenRecord>, CrosspostError> {
        queries::seen::get(self.db()?, item_id).await
    }

    async fn seen_count(&self) -> Result<u64, CrosspostError> {
        queries::seen::count(self.db()?).await
    }
}

#[async_trait]
impl PendingStore for SqliteStorage {
    async fn list_retryable(&self, max_attempts: u32) -> Result<Vec<PendingEntry>, CrosspostError> {
        queries::pending::list_retryable(self.db()?, max_attempts).await
    }

    async fn list_pending(&self) -> Result<Vec<PendingEntry>, CrosspostError> {
        queries::pending::list_all(self.db()?).await
    }

    async fn contains_pending(&self, item_id: &str) -> Result<bool, CrosspostError> {
        queries::pending::contains(self.db()?, item_id).await
    }

    async fn upsert_pending(
        &self,
        item: &Item,
        attempted_at: DateTime<Utc>,
        max_attempts: u32,
    ) -> Result<PendingEntry, CrosspostError> {
        let outcome = queries::pending::upsert(
            self.db()?,
            item,
            attempted_at,
            self.capacity,
            max_attempts,
        )
        .await?;
        for evicted in &outcome.evicted {
            warn!(
                item_id = %evicted,
                capacity = self.capacity,
                replaced_by = item.id(),
                "retry queue full, evicted oldest pending entry"
            );
        }
        if outcome.over_capacity {
            warn!(
                item_id = item.id(),
                capacity = self.capacity,
                "retry queue full of stalled entries, exceeding capacity"
            );
        }
        Ok(outcome.entry)
    }

    async fn remove_pending(&self, item_id: &str) -> Result<bool, CrosspostError> {
        queries::pending::remove(self.db()?, item_id).await
    }

    async fn list_stalled(&self, max_attempts: u32) -> Result<Vec<PendingEntry>, CrosspostError> {
        queries::pending::list_stalled(self.db()?, max_attempts).await
    }

    async fn clear_stalled(&self, max_attempts: u32) -> Result<u64, CrosspostError> {
        queries::pending::clear_stalled(self.db()?, max_attempts).await
    }
}

#[async_trait]
impl BatchStore for SqliteStorage {
    async fn list_batches(&self) -> Result<Vec<Batch>, CrosspostError> {
        queries::batches::list(self.db()?).await
    }

    async fn add_batch(
        &self,
        selector: &str,
        items: &[Item],
        max_batches: usize,
    ) -> Result<i64, CrosspostError> {
        let (batch_id, evicted) =
            queries::batches::insert(self.db()?, selector, items, Utc::now(), max_batches).await?;
        if evicted > 0 {
            debug!(evicted, max_batches, "dropped oldest cached batches");
        }
        Ok(batch_id)
    }

    async fn remove_batch(&self, batch_id: i64) -> Result<(), CrosspostError> {
        queries::batches::remove(self.db()?, batch_id).await
    }
}
