// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The per-tick publish state machine.
//!
//! One tick picks exactly one item (the oldest retryable pending entry, else a
//! newly discovered one), materializes its media into a scratch directory
//! owned by the tick, publishes it, and records the outcome:
//!
//! - published: mark seen, then drop any pending entry
//! - fatal failure: mark seen, then drop any pending entry
//! - retryable failure: upsert the pending entry; at the attempt limit it stalls
//!
//! Adapter failures end in one of those transitions and never escape. Store
//! errors abort the tick with `Err`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use crosspost_config::model::CrosspostConfig;
use crosspost_core::{
    CrosspostError, Failure, FailureKind, Item, LocalMedia, MediaConstraints, MediaPipeline,
    PendingStore, Publisher, QueueStore, SeenStore, Stage,
};
use tracing::{debug, info, warn};

use crate::classifier::{classify_attempt, Disposition};
use crate::discovery::{Discovery, DiscoveryBridge};
use crate::outcome::TickOutcome;
use crate::recording;

/// Orchestrator settings derived from configuration.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub max_attempts: u32,
    pub constraints: MediaConstraints,
    /// Parent directory for per-tick scratch directories.
    pub scratch_root: PathBuf,
    pub media_timeout: Duration,
    pub publish_timeout: Duration,
}

impl EngineSettings {
    pub fn from_config(config: &CrosspostConfig) -> Self {
        Self {
            max_attempts: config.queue.max_attempts,
            constraints: config.media.constraints(),
            scratch_root: config.media.scratch_root(),
            media_timeout: config.timeouts.media(),
            publish_timeout: config.timeouts.publish(),
        }
    }
}

/// Where this tick's item came from.
enum Candidate {
    Retry { item: Item, previous_attempts: u32 },
    Fresh(Item),
}

/// Drives one item per tick through media materialization and publishing.
pub struct Orchestrator {
    store: Arc<dyn QueueStore>,
    discovery: DiscoveryBridge,
    media: Arc<dyn MediaPipeline>,
    publisher: Arc<dyn Publisher>,
    settings: EngineSettings,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn QueueStore>,
        discovery: DiscoveryBridge,
        media: Arc<dyn MediaPipeline>,
        publisher: Arc<dyn Publisher>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            store,
            discovery,
            media,
            publisher,
            settings,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Run one tick.
    ///
    /// Returns `Err` only when the durable store fails; in that case the
    /// item's disposition is unknown and nothing further was recorded.
    pub async fn tick(&self) -> Result<TickOutcome, CrosspostError> {
        let outcome = match self.run_tick().await {
            Ok(outcome) => outcome,
            Err(e) => {
                recording::record_tick("store-error");
                return Err(e);
            }
        };
        recording::record_tick(outcome.label());
        // Every outcome can change the stalled set: an upsert may have grown
        // it, and discovery purges or operator commands between ticks shrink it.
        let stalled = self.store.list_stalled(self.settings.max_attempts).await?;
        recording::set_pending_stalled(stalled.len());
        info!(outcome = %outcome, item_id = outcome.item_id().unwrap_or("-"), "tick complete");
        Ok(outcome)
    }

    async fn run_tick(&self) -> Result<TickOutcome, CrosspostError> {
        let candidate = match self.next_candidate().await? {
            Ok(Some(candidate)) => candidate,
            Ok(None) => return Ok(TickOutcome::Idle),
            Err(failure) => {
                return Ok(TickOutcome::DiscoveryFailed {
                    reason: failure.to_string(),
                })
            }
        };

        let (item, previous_attempts) = match candidate {
            Candidate::Retry {
                item,
                previous_attempts,
            } => (item, previous_attempts),
            Candidate::Fresh(item) => (item, 0),
        };
        debug!(item_id = item.id(), previous_attempts, "processing item");
        self.process(&item).await
    }

    /// Oldest retryable pending entry first, then discovery.
    ///
    /// The outer `Result` carries store errors, the inner one a source failure.
    async fn next_candidate(&self) -> Result<Result<Option<Candidate>, Failure>, CrosspostError> {
        let max_attempts = self.settings.max_attempts;
        for entry in self.store.list_retryable(max_attempts).await? {
            // A crash between mark_seen and remove leaves a resolved entry behind.
            if self.store.has_seen(&entry.item_id).await? {
                warn!(item_id = %entry.item_id, "purging pending entry for an already resolved item");
                self.store.remove_pending(&entry.item_id).await?;
                continue;
            }
            match entry.to_item() {
                Ok(item) => {
                    return Ok(Ok(Some(Candidate::Retry {
                        item,
                        previous_attempts: entry.attempts,
                    })));
                }
                Err(e) => {
                    warn!(item_id = %entry.item_id, error = %e, "pending entry no longer valid, rejecting");
                    self.resolve(&entry.item_id).await?;
                }
            }
        }

        match self.discovery.next_unseen(self.store.as_ref()).await? {
            Discovery::Candidate(item) => Ok(Ok(Some(Candidate::Fresh(item)))),
            Discovery::Exhausted => Ok(Ok(None)),
            Discovery::SourceFailed(failure) => Ok(Err(failure)),
        }
    }

    async fn process(&self, item: &Item) -> Result<TickOutcome, CrosspostError> {
        let started = Instant::now();

        // Dropped on every exit path, including cancellation of the tick future.
        let scratch = if item.media_refs().is_empty() {
            None
        } else {
            match tempfile::Builder::new()
                .prefix("crosspost-tick-")
                .tempdir_in(&self.settings.scratch_root)
            {
                Ok(dir) => Some(dir),
                Err(e) => {
                    let failure = Failure::new(
                        Stage::Materialize,
                        FailureKind::StorageUnavailable,
                        format!("cannot create scratch directory: {e}"),
                    );
                    return self.fail(item, failure).await;
                }
            }
        };

        let mut local_media: Vec<LocalMedia> = Vec::with_capacity(item.media_refs().len());
        if let Some(scratch) = &scratch {
            for (index, media_ref) in item.media_refs().iter().enumerate() {
                let materialized = tokio::time::timeout(
                    self.settings.media_timeout,
                    self.media.materialize(
                        media_ref,
                        index,
                        &self.settings.constraints,
                        scratch.path(),
                    ),
                )
                .await;
                match materialized {
                    Ok(Ok(local)) => local_media.push(local),
                    Ok(Err(failure)) => return self.fail(item, failure).await,
                    Err(_) => {
                        let failure = Failure::timeout(Stage::Materialize, self.settings.media_timeout);
                        return self.fail(item, failure).await;
                    }
                }
            }
        }

        if item.text().trim().is_empty() && local_media.is_empty() {
            return self.reject(item, "empty-payload".to_string()).await;
        }

        let published = tokio::time::timeout(
            self.settings.publish_timeout,
            self.publisher.publish(item.text(), &local_media),
        )
        .await;
        let receipt = match published {
            Ok(Ok(receipt)) => receipt,
            Ok(Err(failure)) => return self.fail(item, failure).await,
            Err(_) => {
                let failure = Failure::timeout(Stage::Publish, self.settings.publish_timeout);
                return self.fail(item, failure).await;
            }
        };

        self.resolve(item.id()).await?;
        recording::record_publish_latency(started.elapsed().as_secs_f64());
        info!(item_id = item.id(), remote_id = %receipt.remote_id, "published");
        Ok(TickOutcome::Published {
            item_id: item.id().to_string(),
            remote_id: receipt.remote_id,
        })
    }

    /// Route an adapter failure through the classifier.
    async fn fail(&self, item: &Item, failure: Failure) -> Result<TickOutcome, CrosspostError> {
        let max_attempts = self.settings.max_attempts;

        let preview = crate::classifier::classify(&failure);
        if preview.is_fatal() {
            warn!(item_id = item.id(), error = %failure, reason = preview.reason, "permanent failure");
            return self.reject(item, preview.reason.to_string()).await;
        }

        let entry = self.store.upsert_pending(item, Utc::now(), max_attempts).await?;
        let classification = classify_attempt(&failure, entry.attempts, max_attempts);
        match classification.disposition {
            Disposition::ExhaustedAttempts => {
                warn!(
                    item_id = item.id(),
                    attempt = entry.attempts,
                    max_attempts,
                    error = %failure,
                    "attempts exhausted, pending entry stalled until an operator clears it"
                );
                Ok(TickOutcome::Stalled {
                    item_id: item.id().to_string(),
                    attempt: entry.attempts,
                    max_attempts,
                    reason: classification.reason.to_string(),
                })
            }
            // Fatal was handled above.
            Disposition::Retryable | Disposition::Fatal => {
                let retry_after = failure.retry_after();
                warn!(
                    item_id = item.id(),
                    attempt = entry.attempts,
                    max_attempts,
                    stage = %failure.stage,
                    error = %failure,
                    retry_after_secs = retry_after.map(|d| d.as_secs()),
                    "attempt failed, retry scheduled"
                );
                Ok(TickOutcome::RetryScheduled {
                    item_id: item.id().to_string(),
                    attempt: entry.attempts,
                    max_attempts,
                    reason: classification.reason.to_string(),
                    retry_after,
                })
            }
        }
    }

    async fn reject(&self, item: &Item, reason: String) -> Result<TickOutcome, CrosspostError> {
        self.resolve(item.id()).await?;
        info!(item_id = item.id(), reason = %reason, "rejected");
        Ok(TickOutcome::Rejected {
            item_id: item.id().to_string(),
            reason,
        })
    }

    /// Seen first: if removal then fails, the next tick purges the leftover
    /// entry instead of publishing it again.
    async fn resolve(&self, item_id: &str) -> Result<(), CrosspostError> {
        self.store.mark_seen(item_id).await?;
        self.store.remove_pending(item_id).await?;
        Ok(())
    }
}
