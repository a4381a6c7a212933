// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable store traits for the seen set, pending queue, and batch cache.
//!
//! Every method returns [`CrosspostError`] on storage trouble; callers must
//! propagate it rather than guess an item's disposition.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::CrosspostError;
use crate::types::{Batch, Item, PendingEntry, SeenRecord};

/// Append-only set of resolved item ids.
#[async_trait]
pub trait SeenStore: Send + Sync {
    async fn has_seen(&self, item_id: &str) -> Result<bool, CrosspostError>;

    /// Idempotent: marking an already-seen id is a no-op.
    async fn mark_seen(&self, item_id: &str) -> Result<(), CrosspostError>;

    /// When and whether `item_id` was resolved.
    async fn seen_record(&self, item_id: &str) -> Result<Option<SeenRecord>, CrosspostError>;

    async fn seen_count(&self) -> Result<u64, CrosspostError>;
}

/// Bounded table of items awaiting another publish attempt.
#[async_trait]
pub trait PendingStore: Send + Sync {
    /// Entries with `attempts < max_attempts`, oldest `last_attempt_at` first.
    async fn list_retryable(&self, max_attempts: u32) -> Result<Vec<PendingEntry>, CrosspostError>;

    /// All entries, stalled ones included, oldest first.
    async fn list_pending(&self) -> Result<Vec<PendingEntry>, CrosspostError>;

    async fn contains_pending(&self, item_id: &str) -> Result<bool, CrosspostError>;

    /// Inserts with `attempts = 1`, or replaces content and increments
    /// `attempts` when the id is already queued. Returns the stored entry.
    ///
    /// Making room for a new id only evicts entries below `max_attempts`.
    async fn upsert_pending(
        &self,
        item: &Item,
        attempted_at: DateTime<Utc>,
        max_attempts: u32,
    ) -> Result<PendingEntry, CrosspostError>;

    /// Idempotent removal. Returns whether an entry existed.
    async fn remove_pending(&self, item_id: &str) -> Result<bool, CrosspostError>;

    /// Entries that used up their attempts and wait for an operator.
    async fn list_stalled(&self, max_attempts: u32) -> Result<Vec<PendingEntry>, CrosspostError>;

    /// Deletes every entry with `attempts >= max_attempts`. Returns the count.
    async fn clear_stalled(&self, max_attempts: u32) -> Result<u64, CrosspostError>;
}

/// FIFO cache of fetched listings.
#[async_trait]
pub trait BatchStore: Send + Sync {
    /// All cached batches, oldest first.
    async fn list_batches(&self) -> Result<Vec<Batch>, CrosspostError>;

    /// Stores a batch, evicting the oldest ones beyond `max_batches`.
    async fn add_batch(
        &self,
        selector: &str,
        items: &[Item],
        max_batches: usize,
    ) -> Result<i64, CrosspostError>;

    async fn remove_batch(&self, batch_id: i64) -> Result<(), CrosspostError>;
}

/// Everything the publish engine needs from durable storage.
pub trait QueueStore: SeenStore + PendingStore + BatchStore {}

impl<T: SeenStore + PendingStore + BatchStore> QueueStore for T {}
