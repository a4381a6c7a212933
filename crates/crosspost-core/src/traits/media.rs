// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Media pipeline adapter trait.

use std::path::Path;

use async_trait::async_trait;

use crate::failure::Failure;
use crate::traits::adapter::Adapter;
use crate::types::{LocalMedia, MediaConstraints, MediaRef};

/// Turns a remote media reference into a local, publish-ready file.
///
/// Implementations must write only inside `scratch`, which the caller owns
/// and deletes at the end of the tick. Any fallback chain (direct fetch,
/// authenticated fetch, stream merging) stays behind this interface.
#[async_trait]
pub trait MediaPipeline: Adapter {
    async fn materialize(
        &self,
        media: &MediaRef,
        index: usize,
        constraints: &MediaConstraints,
        scratch: &Path,
    ) -> Result<LocalMedia, Failure>;
}
