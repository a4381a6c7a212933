// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wiring of configuration, store, and adapters into an [`Orchestrator`].

use std::sync::Arc;

use tempfile::TempDir;
use tracing::{debug, info};

use crosspost_config::CrosspostConfig;
use crosspost_config::model::StorageConfig;
use crosspost_core::{ContentSource, CrosspostError, MediaPipeline, Publisher, QueueStore};
use crosspost_engine::{Composer, DiscoveryBridge, DiscoverySettings, EngineSettings, Orchestrator};
use crosspost_http::{HttpMediaPipeline, JsonFeedSource, ProxyPool};
use crosspost_storage::SqliteStorage;

use crate::publisher::DryRunPublisher;

/// Opens the SQLite store described by `[storage]` and `[queue]`.
pub async fn open_store(config: &CrosspostConfig) -> Result<Arc<SqliteStorage>, CrosspostError> {
    let store = SqliteStorage::open(config.storage.clone(), config.queue.capacity).await?;
    Ok(Arc::new(store))
}

/// Builds the orchestrator with the HTTP adapters and the given publisher.
pub fn build_orchestrator(
    config: &CrosspostConfig,
    store: Arc<SqliteStorage>,
    publisher: Arc<dyn Publisher>,
) -> Orchestrator {
    let pool = Arc::new(ProxyPool::new(&config.egress, config.source.user_agent.clone()));

    let source = JsonFeedSource::from_config(config, pool.clone())
        .map(|source| Arc::new(source) as Arc<dyn ContentSource>);
    if source.is_none() {
        debug!("no source.base_url configured, discovery disabled");
    }
    let media: Arc<dyn MediaPipeline> = Arc::new(HttpMediaPipeline::from_config(config, pool));

    let discovery = DiscoveryBridge::new(
        source,
        Composer::from_config(config),
        DiscoverySettings::from_config(config),
    );
    let store: Arc<dyn QueueStore> = store;

    Orchestrator::new(
        store,
        discovery,
        media,
        publisher,
        EngineSettings::from_config(config),
    )
}

/// The store and publisher a `tick` or `run` works against.
pub struct PublishTarget {
    pub store: Arc<SqliteStorage>,
    pub publisher: Arc<dyn Publisher>,
    _snapshot_dir: TempDir,
}

/// Picks the publisher for `tick` and `run`.
///
/// Only the dry-run publisher exists. It runs against a throwaway copy of
/// `store`, so previewed items never reach the durable seen set.
pub async fn publish_target(
    config: &CrosspostConfig,
    store: &SqliteStorage,
    dry_run: bool,
) -> Result<PublishTarget, CrosspostError> {
    if !dry_run {
        return Err(CrosspostError::Config(
            "no publisher is configured; pass --dry-run to preview posts against a copy of the database"
                .to_string(),
        ));
    }

    let snapshot_dir = tempfile::Builder::new()
        .prefix("crosspost-dry-run-")
        .tempdir()
        .map_err(CrosspostError::storage)?;
    let path = snapshot_dir.path().join("dry-run.db").display().to_string();
    store.snapshot(&path).await?;
    let copy = SqliteStorage::open(
        StorageConfig {
            database_path: path.clone(),
            wal_mode: config.storage.wal_mode,
        },
        config.queue.capacity,
    )
    .await?;
    info!(path = %path, "dry run: working on a copy of the database, nothing is recorded");

    Ok(PublishTarget {
        store: Arc::new(copy),
        publisher: Arc::new(DryRunPublisher::new()),
        _snapshot_dir: snapshot_dir,
    })
}
