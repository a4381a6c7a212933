// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock media pipeline that writes placeholder files.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crosspost_core::{
    Adapter, AdapterType, Failure, FailureKind, LocalMedia, MediaConstraints, MediaKind,
    MediaPipeline, MediaRef, Stage,
};

const PLACEHOLDER: &[u8] = b"crosspost-mock-media";

/// One recorded `materialize` call.
#[derive(Debug, Clone)]
pub struct MaterializeCall {
    pub url: String,
    pub index: usize,
    pub scratch: PathBuf,
}

/// A media pipeline that "downloads" by writing a small file into the scratch
/// directory. Videos longer than the constraint fail with `MediaTooLong`, like
/// a real probe would; other failures are scripted per URL.
pub struct MockMediaPipeline {
    failures: Mutex<HashMap<String, VecDeque<Failure>>>,
    calls: Mutex<Vec<MaterializeCall>>,
    written: Mutex<Vec<PathBuf>>,
    delay: Option<Duration>,
}

impl MockMediaPipeline {
    pub fn new() -> Self {
        Self {
            failures: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            written: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Sleep this long after writing each file, for timeout tests.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Make the next materialization of `url` fail with `failure`.
    pub async fn fail_next(&self, url: &str, failure: Failure) {
        self.failures
            .lock()
            .await
            .entry(url.to_string())
            .or_default()
            .push_back(failure);
    }

    pub async fn calls(&self) -> Vec<MaterializeCall> {
        self.calls.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }

    /// Every file this pipeline created, for cleanup assertions.
    pub async fn written_paths(&self) -> Vec<PathBuf> {
        self.written.lock().await.clone()
    }
}

impl Default for MockMediaPipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Adapter for MockMediaPipeline {
    fn name(&self) -> &str {
        "mock-media"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Media
    }
}

#[async_trait]
impl MediaPipeline for MockMediaPipeline {
    async fn materialize(
        &self,
        media: &MediaRef,
        index: usize,
        constraints: &MediaConstraints,
        scratch: &Path,
    ) -> Result<LocalMedia, Failure> {
        self.calls.lock().await.push(MaterializeCall {
            url: media.url().to_string(),
            index,
            scratch: scratch.to_path_buf(),
        });

        let scripted = self
            .failures
            .lock()
            .await
            .get_mut(media.url())
            .and_then(VecDeque::pop_front);
        if let Some(failure) = scripted {
            return Err(failure);
        }

        if let MediaRef::Video {
            duration_secs: Some(secs),
            ..
        } = media
            && *secs > constraints.max_duration_secs
        {
            return Err(Failure::new(
                Stage::Materialize,
                FailureKind::MediaTooLong,
                format!("video is {secs}s, limit {}s", constraints.max_duration_secs),
            ));
        }

        let kind = media.kind();
        let ext = match kind {
            MediaKind::Image => "jpg",
            MediaKind::Video => "mp4",
        };
        let path = scratch.join(format!("media-{index}.{ext}"));
        tokio::fs::write(&path, PLACEHOLDER).await.map_err(|e| {
            Failure::new(Stage::Materialize, FailureKind::StorageUnavailable, e.to_string())
        })?;
        self.written.lock().await.push(path.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        Ok(LocalMedia {
            path,
            kind,
            bytes: PLACEHOLDER.len() as u64,
        })
    }
}
