// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Content discovery bridge.
//!
//! Hands the orchestrator the next item that is neither seen nor pending.
//! Fetched listings are cached as batches so one fetch feeds several ticks;
//! the cache is scanned oldest batch first and a batch with nothing left to
//! offer is dropped. Only when every cached batch is exhausted does the bridge
//! go back to the content source, picking one configured selector at random.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crosspost_config::model::CrosspostConfig;
use crosspost_core::{
    BatchStore, ContentSource, CrosspostError, Failure, Item, PendingStore, QueueStore, SeenStore,
    Stage,
};
use rand::seq::SliceRandom;
use tracing::{debug, info, warn};

use crate::compose::Composer;

/// Result of asking the bridge for work.
#[derive(Debug)]
pub enum Discovery {
    /// An item that has never been resolved or queued.
    Candidate(Item),
    /// Nothing new is available right now.
    Exhausted,
    /// The content source failed; nothing was discovered.
    SourceFailed(Failure),
}

/// Settings the bridge needs from configuration.
#[derive(Debug, Clone)]
pub struct DiscoverySettings {
    pub selectors: Vec<String>,
    pub fetch_limit: usize,
    pub max_batches: usize,
    pub fetch_timeout: Duration,
}

impl DiscoverySettings {
    pub fn from_config(config: &CrosspostConfig) -> Self {
        Self {
            selectors: config.source.selectors.clone(),
            fetch_limit: config.source.fetch_limit,
            max_batches: config.queue.max_batches,
            fetch_timeout: config.timeouts.fetch(),
        }
    }
}

/// Wraps a [`ContentSource`] and filters out resolved and queued items.
pub struct DiscoveryBridge {
    source: Option<Arc<dyn ContentSource>>,
    composer: Composer,
    settings: DiscoverySettings,
}

impl DiscoveryBridge {
    pub fn new(
        source: Option<Arc<dyn ContentSource>>,
        composer: Composer,
        settings: DiscoverySettings,
    ) -> Self {
        Self {
            source,
            composer,
            settings,
        }
    }

    /// Return the next unseen, non-pending item, fetching a new batch when
    /// the cache runs dry. Store errors propagate; source errors do not.
    pub async fn next_unseen(&self, store: &dyn QueueStore) -> Result<Discovery, CrosspostError> {
        for batch in store.list_batches().await? {
            if let Some(item) = first_unresolved(store, &batch.items).await? {
                debug!(item_id = item.id(), batch_id = batch.batch_id, "candidate from cached batch");
                return Ok(Discovery::Candidate(item));
            }
            debug!(batch_id = batch.batch_id, selector = %batch.selector, "cached batch exhausted");
            store.remove_batch(batch.batch_id).await?;
        }

        let Some(source) = &self.source else {
            return Ok(Discovery::Exhausted);
        };
        let Some(selector) = self.pick_selector() else {
            return Ok(Discovery::Exhausted);
        };

        let fetched = tokio::time::timeout(
            self.settings.fetch_timeout,
            source.fetch_batch(&selector, self.settings.fetch_limit),
        )
        .await;
        let raw_items = match fetched {
            Ok(Ok(raw_items)) => raw_items,
            Ok(Err(failure)) => {
                warn!(selector = %selector, error = %failure, "content fetch failed");
                return Ok(Discovery::SourceFailed(failure));
            }
            Err(_) => {
                let failure = Failure::timeout(Stage::Fetch, self.settings.fetch_timeout);
                warn!(selector = %selector, error = %failure, "content fetch timed out");
                return Ok(Discovery::SourceFailed(failure));
            }
        };

        let mut ids = HashSet::new();
        let items: Vec<Item> = raw_items
            .iter()
            .filter_map(|raw| self.composer.compose(raw))
            .filter(|item| ids.insert(item.id().to_string()))
            .collect();
        info!(
            selector = %selector,
            fetched = raw_items.len(),
            usable = items.len(),
            "fetched content batch"
        );
        if items.is_empty() {
            return Ok(Discovery::Exhausted);
        }

        let batch_id = store
            .add_batch(&selector, &items, self.settings.max_batches)
            .await?;
        match first_unresolved(store, &items).await? {
            Some(item) => Ok(Discovery::Candidate(item)),
            None => {
                store.remove_batch(batch_id).await?;
                Ok(Discovery::Exhausted)
            }
        }
    }

    fn pick_selector(&self) -> Option<String> {
        let mut rng = rand::thread_rng();
        self.settings.selectors.choose(&mut rng).cloned()
    }
}

async fn first_unresolved(
    store: &dyn QueueStore,
    items: &[Item],
) -> Result<Option<Item>, CrosspostError> {
    for item in items {
        if store.has_seen(item.id()).await? || store.contains_pending(item.id()).await? {
            continue;
        }
        return Ok(Some(item.clone()));
    }
    Ok(None)
}
