// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Content source adapter trait.

use async_trait::async_trait;

use crate::failure::Failure;
use crate::traits::adapter::Adapter;
use crate::types::RawItem;

/// Fetches candidate items from an external content feed.
#[async_trait]
pub trait ContentSource: Adapter {
    /// Fetches up to `limit` items for the given selector (e.g. a community name).
    async fn fetch_batch(&self, selector: &str, limit: usize) -> Result<Vec<RawItem>, Failure>;
}
