// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON feed content source.
//!
//! Fetches `GET {base_url}/{selector}.json?limit={n}` and expects a body of
//! the form `{"items": [RawItem, ...]}`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crosspost_config::CrosspostConfig;
use crosspost_core::{
    Adapter, AdapterType, ContentSource, Failure, FailureKind, HealthStatus, RawItem, Stage,
};

use crate::egress::ProxyPool;
use crate::response::{request_failure, status_failure};

#[derive(Debug, Deserialize)]
struct FeedResponse {
    #[serde(default)]
    items: Vec<RawItem>,
}

/// Content source backed by an HTTP JSON feed.
pub struct JsonFeedSource {
    base_url: String,
    pool: Arc<ProxyPool>,
    timeout: Duration,
}

impl JsonFeedSource {
    pub fn new(base_url: impl Into<String>, pool: Arc<ProxyPool>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            pool,
            timeout,
        }
    }

    /// Builds the source described by `[source]`, or `None` when no base URL
    /// is configured.
    pub fn from_config(config: &CrosspostConfig, pool: Arc<ProxyPool>) -> Option<Self> {
        config
            .source
            .base_url
            .as_ref()
            .map(|base| Self::new(base.clone(), pool, config.timeouts.fetch()))
    }

    fn listing_url(&self, selector: &str, limit: usize) -> String {
        format!("{}/{}.json?limit={limit}", self.base_url, selector.trim())
    }
}

#[async_trait]
impl Adapter for JsonFeedSource {
    fn name(&self) -> &str {
        "json-feed"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Source
    }

    async fn health_check(&self) -> HealthStatus {
        match self.pool.client(Stage::Fetch).await {
            Ok(_) => HealthStatus::Healthy,
            Err(failure) => HealthStatus::Unhealthy(failure.to_string()),
        }
    }
}

#[async_trait]
impl ContentSource for JsonFeedSource {
    async fn fetch_batch(&self, selector: &str, limit: usize) -> Result<Vec<RawItem>, Failure> {
        if selector.trim().is_empty() || selector.contains(['/', '?', '#']) {
            return Err(Failure::new(
                Stage::Fetch,
                FailureKind::NotFound,
                format!("invalid selector `{selector}`"),
            ));
        }

        let client = self.pool.client(Stage::Fetch).await?;
        let url = self.listing_url(selector, limit);
        debug!(url = %url, "fetching listing");

        let response = match client.get(&url).timeout(self.timeout).send().await {
            Ok(response) => response,
            Err(e) => {
                if e.is_connect() {
                    self.pool.invalidate().await;
                }
                return Err(request_failure(Stage::Fetch, &e));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let body = response.text().await.unwrap_or_default();
            warn!(selector, status = %status, "listing request failed");
            return Err(status_failure(Stage::Fetch, status, &headers, &body));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| request_failure(Stage::Fetch, &e))?;
        let feed: FeedResponse = serde_json::from_slice(&body).map_err(|e| {
            Failure::new(
                Stage::Fetch,
                FailureKind::Unknown,
                format!("malformed listing for `{selector}`: {e}"),
            )
        })?;

        let mut items = feed.items;
        items.truncate(limit);
        debug!(selector, count = items.len(), "listing fetched");
        Ok(items)
    }
}
