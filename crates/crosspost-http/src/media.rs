// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Media download into the tick's scratch directory.
//!
//! Checks what can be checked before downloading (index limit, reported
//! video duration), then streams the body to `media-{index}.{ext}` while
//! verifying the content type matches the expected media kind.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crosspost_config::CrosspostConfig;
use crosspost_core::{
    Adapter, AdapterType, Failure, FailureKind, LocalMedia, MediaConstraints, MediaKind,
    MediaPipeline, MediaRef, Stage,
};

use crate::egress::ProxyPool;
use crate::response::{request_failure, status_failure};

/// Downloads remote media over HTTP.
pub struct HttpMediaPipeline {
    pool: Arc<ProxyPool>,
    timeout: Duration,
}

impl HttpMediaPipeline {
    pub fn new(pool: Arc<ProxyPool>, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    pub fn from_config(config: &CrosspostConfig, pool: Arc<ProxyPool>) -> Self {
        Self::new(pool, config.timeouts.media())
    }

    async fn download(
        &self,
        url: &str,
        kind: MediaKind,
        index: usize,
        scratch: &Path,
    ) -> Result<LocalMedia, Failure> {
        let client = self.pool.client(Stage::Materialize).await?;
        let mut response = match client.get(url).timeout(self.timeout).send().await {
            Ok(response) => response,
            Err(e) => {
                if e.is_connect() {
                    self.pool.invalidate().await;
                }
                return Err(request_failure(Stage::Materialize, &e));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let body = response.text().await.unwrap_or_default();
            warn!(url, status = %status, "media request failed");
            return Err(status_failure(Stage::Materialize, status, &headers, &body));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_ascii_lowercase());
        let extension = extension_for(kind, content_type.as_deref()).ok_or_else(|| {
            Failure::new(
                Stage::Materialize,
                FailureKind::UnsupportedMedia,
                format!(
                    "expected {kind}, got content type `{}`",
                    content_type.as_deref().unwrap_or_default()
                ),
            )
        })?;

        let path = scratch.join(format!("media-{index}.{extension}"));
        let mut file = tokio::fs::File::create(&path)
            .await
            .map_err(|e| scratch_failure(&path, e))?;
        let mut bytes: u64 = 0;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| request_failure(Stage::Materialize, &e))?
        {
            file.write_all(&chunk)
                .await
                .map_err(|e| scratch_failure(&path, e))?;
            bytes += chunk.len() as u64;
        }
        file.flush().await.map_err(|e| scratch_failure(&path, e))?;

        if bytes == 0 {
            return Err(Failure::new(
                Stage::Materialize,
                FailureKind::TransientIo,
                format!("empty media body from {url}"),
            ));
        }

        debug!(url, path = %path.display(), bytes, "media materialized");
        Ok(LocalMedia { path, kind, bytes })
    }
}

fn scratch_failure(path: &Path, err: std::io::Error) -> Failure {
    Failure::new(
        Stage::Materialize,
        FailureKind::StorageUnavailable,
        format!("writing {}: {err}", path.display()),
    )
}

/// File extension for a downloaded body, or `None` when the content type
/// does not match the media kind. A missing content type is trusted.
fn extension_for(kind: MediaKind, content_type: Option<&str>) -> Option<&'static str> {
    let Some(content_type) = content_type else {
        return Some(match kind {
            MediaKind::Image => "jpg",
            MediaKind::Video => "mp4",
        });
    };
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    match (kind, essence) {
        (MediaKind::Image, "image/jpeg" | "image/jpg" | "image/pjpeg") => Some("jpg"),
        (MediaKind::Image, "image/png") => Some("png"),
        (MediaKind::Image, "image/gif") => Some("gif"),
        (MediaKind::Image, "image/webp") => Some("webp"),
        (MediaKind::Video, "video/mp4") => Some("mp4"),
        (MediaKind::Video, "video/quicktime") => Some("mov"),
        (MediaKind::Video, "application/octet-stream") => Some("mp4"),
        (MediaKind::Image, "application/octet-stream") => Some("jpg"),
        _ => None,
    }
}

#[async_trait]
impl Adapter for HttpMediaPipeline {
    fn name(&self) -> &str {
        "http-media"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Media
    }
}

#[async_trait]
impl MediaPipeline for HttpMediaPipeline {
    async fn materialize(
        &self,
        media: &MediaRef,
        index: usize,
        constraints: &MediaConstraints,
        scratch: &Path,
    ) -> Result<LocalMedia, Failure> {
        if index >= constraints.max_count {
            return Err(Failure::new(
                Stage::Materialize,
                FailureKind::UnsupportedMedia,
                format!("media #{index} exceeds the limit of {}", constraints.max_count),
            ));
        }

        if let MediaRef::Video {
            duration_secs: Some(duration),
            ..
        } = media
            && *duration > constraints.max_duration_secs
        {
            return Err(Failure::new(
                Stage::Materialize,
                FailureKind::MediaTooLong,
                format!(
                    "video is {duration}s, limit is {}s",
                    constraints.max_duration_secs
                ),
            ));
        }

        self.download(media.url(), media.kind(), index, scratch).await
    }
}
