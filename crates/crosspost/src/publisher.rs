// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Publisher that logs the payload instead of posting it.

use async_trait::async_trait;
use tracing::info;

use crosspost_core::{Adapter, AdapterType, Failure, LocalMedia, PublishReceipt, Publisher};

/// Logs what would be posted and returns a synthetic remote id.
#[derive(Debug, Default)]
pub struct DryRunPublisher;

impl DryRunPublisher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Adapter for DryRunPublisher {
    fn name(&self) -> &str {
        "dry-run"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Publisher
    }
}

#[async_trait]
impl Publisher for DryRunPublisher {
    async fn publish(&self, text: &str, media: &[LocalMedia]) -> Result<PublishReceipt, Failure> {
        let remote_id = format!("dry-run-{}", uuid::Uuid::new_v4().simple());
        let files: Vec<String> = media.iter().map(|m| m.path.display().to_string()).collect();
        info!(
            remote_id = %remote_id,
            chars = text.chars().count(),
            media = ?files,
            "dry run: would publish\n{text}"
        );
        Ok(PublishReceipt { remote_id })
    }
}
