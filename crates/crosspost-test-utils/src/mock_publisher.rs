// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock publisher with scripted results and captured calls.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crosspost_core::{Adapter, AdapterType, Failure, LocalMedia, PublishReceipt, Publisher};

/// One captured `publish` call.
#[derive(Debug, Clone)]
pub struct PublishCall {
    pub text: String,
    pub media: Vec<LocalMedia>,
    /// Whether every media file existed on disk when the call was made.
    pub media_present: bool,
}

/// A publisher that replays queued results, then succeeds with
/// `remote-<n>` ids once the script is empty.
pub struct MockPublisher {
    scripted: Mutex<VecDeque<Result<PublishReceipt, Failure>>>,
    calls: Mutex<Vec<PublishCall>>,
    next_id: AtomicU64,
    delay: Option<Duration>,
}

impl MockPublisher {
    pub fn new() -> Self {
        Self {
            scripted: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            delay: None,
        }
    }

    /// Sleep this long inside every publish, for timeout tests.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub async fn push_failure(&self, failure: Failure) {
        self.scripted.lock().await.push_back(Err(failure));
    }

    pub async fn push_success(&self, remote_id: &str) {
        self.scripted.lock().await.push_back(Ok(PublishReceipt {
            remote_id: remote_id.to_string(),
        }));
    }

    pub async fn calls(&self) -> Vec<PublishCall> {
        self.calls.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }

    /// Texts passed to `publish`, in call order.
    pub async fn texts(&self) -> Vec<String> {
        self.calls.lock().await.iter().map(|c| c.text.clone()).collect()
    }
}

impl Default for MockPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Adapter for MockPublisher {
    fn name(&self) -> &str {
        "mock-publisher"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Publisher
    }
}

#[async_trait]
impl Publisher for MockPublisher {
    async fn publish(&self, text: &str, media: &[LocalMedia]) -> Result<PublishReceipt, Failure> {
        self.calls.lock().await.push(PublishCall {
            text: text.to_string(),
            media: media.to_vec(),
            media_present: media.iter().all(|m| m.path.exists()),
        });
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.scripted.lock().await.pop_front() {
            Some(result) => result,
            None => {
                let n = self.next_id.fetch_add(1, Ordering::Relaxed);
                Ok(PublishReceipt {
                    remote_id: format!("remote-{n}"),
                })
            }
        }
    }
}
