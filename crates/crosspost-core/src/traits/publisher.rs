// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Publisher adapter trait.

use async_trait::async_trait;

use crate::failure::Failure;
use crate::traits::adapter::Adapter;
use crate::types::{LocalMedia, PublishReceipt};

/// Performs the external calls that create the visible post.
///
/// The post-creation call is the only side effect that must never repeat;
/// media uploads may be redone on a retried attempt.
#[async_trait]
pub trait Publisher: Adapter {
    async fn publish(&self, text: &str, media: &[LocalMedia]) -> Result<PublishReceipt, Failure>;
}
