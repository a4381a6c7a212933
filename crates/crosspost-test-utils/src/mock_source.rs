// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock content source with scripted batches.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crosspost_core::{Adapter, AdapterType, ContentSource, Failure, RawItem};

/// A content source that replays queued results in order.
///
/// When the script runs out, `fetch_batch` returns an empty listing.
pub struct MockSource {
    scripted: Mutex<VecDeque<Result<Vec<RawItem>, Failure>>>,
    calls: Mutex<Vec<(String, usize)>>,
    delay: Option<Duration>,
}

impl MockSource {
    pub fn new() -> Self {
        Self {
            scripted: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Sleep this long inside every fetch, for timeout tests.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub async fn push_batch(&self, items: Vec<RawItem>) {
        self.scripted.lock().await.push_back(Ok(items));
    }

    pub async fn push_failure(&self, failure: Failure) {
        self.scripted.lock().await.push_back(Err(failure));
    }

    /// Every `(selector, limit)` pair passed to `fetch_batch`.
    pub async fn calls(&self) -> Vec<(String, usize)> {
        self.calls.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }
}

impl Default for MockSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Adapter for MockSource {
    fn name(&self) -> &str {
        "mock-source"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Source
    }
}

#[async_trait]
impl ContentSource for MockSource {
    async fn fetch_batch(&self, selector: &str, limit: usize) -> Result<Vec<RawItem>, Failure> {
        self.calls.lock().await.push((selector.to_string(), limit));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.scripted.lock().await.pop_front().unwrap_or(Ok(Vec::new()))
    }
}
