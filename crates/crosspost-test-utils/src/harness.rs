// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness with a temporary SQLite store and one of each mock adapter.

use std::path::PathBuf;
use std::sync::Arc;

use crosspost_config::model::StorageConfig;
use crosspost_core::{CrosspostError, PendingEntry, PendingStore, SeenStore};
use crosspost_storage::SqliteStorage;

use crate::mock_media::MockMediaPipeline;
use crate::mock_publisher::MockPublisher;
use crate::mock_source::MockSource;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    capacity: usize,
    media: Option<MockMediaPipeline>,
    publisher: Option<MockPublisher>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            capacity: 16,
            media: None,
            publisher: None,
        }
    }

    /// Retry queue capacity for the store.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_media(mut self, media: MockMediaPipeline) -> Self {
        self.media = Some(media);
        self
    }

    pub fn with_publisher(mut self, publisher: MockPublisher) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// Build the harness, opening a fresh database in a temporary directory.
    pub async fn build(self) -> Result<TestHarness, CrosspostError> {
        let temp_dir = tempfile::TempDir::new().map_err(CrosspostError::storage)?;
        let db_path = temp_dir.path().join("test.db");
        let scratch_root = temp_dir.path().join("scratch");
        std::fs::create_dir_all(&scratch_root).map_err(CrosspostError::storage)?;

        let storage_config = StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
        };
        let store = SqliteStorage::open(storage_config, self.capacity).await?;

        Ok(TestHarness {
            store: Arc::new(store),
            source: Arc::new(MockSource::new()),
            media: Arc::new(self.media.unwrap_or_default()),
            publisher: Arc::new(self.publisher.unwrap_or_default()),
            scratch_root,
            _temp_dir: temp_dir,
        })
    }
}

/// A temporary store plus mocks. Everything on disk is removed on drop.
pub struct TestHarness {
    pub store: Arc<SqliteStorage>,
    pub source: Arc<MockSource>,
    pub media: Arc<MockMediaPipeline>,
    pub publisher: Arc<MockPublisher>,
    /// Directory tick scratch directories are created under.
    pub scratch_root: PathBuf,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Harness with default options. Panics if the store cannot be opened.
    pub async fn new() -> Self {
        Self::builder()
            .build()
            .await
            .expect("failed to build test harness")
    }

    pub async fn is_seen(&self, item_id: &str) -> bool {
        self.store.has_seen(item_id).await.expect("seen lookup")
    }

    pub async fn pending(&self) -> Vec<PendingEntry> {
        self.store.list_pending().await.expect("pending listing")
    }

    /// Entries left under the scratch root (tick directories that were not removed).
    pub fn scratch_leftovers(&self) -> Vec<PathBuf> {
        std::fs::read_dir(&self.scratch_root)
            .map(|entries| entries.filter_map(|e| e.ok().map(|e| e.path())).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn harness_opens_empty_store() {
        let harness = TestHarness::new().await;
        assert!(harness.pending().await.is_empty());
        assert!(!harness.is_seen("anything").await);
        assert!(harness.scratch_leftovers().is_empty());
        assert!(harness.scratch_root.exists());
    }
}
