// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound proxy selection.
//!
//! Proxies are probed in configured order and the first one answering the
//! probe URL with HTTP 200 carries the traffic. The chosen client is cached
//! for a while and dropped as soon as a request through it fails to connect.

use std::fmt;
use std::time::{Duration, Instant};

use crosspost_config::model::{EgressConfig, ProxyConfig};
use crosspost_core::{Failure, FailureKind, Stage};
use reqwest::StatusCode;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// How long a selection is reused before the proxies are probed again.
const SELECTION_TTL: Duration = Duration::from_secs(15 * 60);

/// Where outbound requests currently go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EgressRoute {
    Direct,
    Proxy { label: String },
}

impl fmt::Display for EgressRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EgressRoute::Direct => f.write_str("direct"),
            EgressRoute::Proxy { label } => write!(f, "proxy `{label}`"),
        }
    }
}

struct Selection {
    route: EgressRoute,
    client: reqwest::Client,
    chosen_at: Instant,
}

/// Ordered set of HTTP proxies with a direct-connection fallback.
pub struct ProxyPool {
    proxies: Vec<ProxyConfig>,
    probe_url: String,
    probe_timeout: Duration,
    fallback_direct: bool,
    user_agent: String,
    selected: Mutex<Option<Selection>>,
}

impl ProxyPool {
    pub fn new(config: &EgressConfig, user_agent: impl Into<String>) -> Self {
        Self {
            proxies: config.proxies.clone(),
            probe_url: config.probe_url.clone(),
            probe_timeout: Duration::from_secs(config.probe_timeout_secs),
            fallback_direct: config.fallback_direct,
            user_agent: user_agent.into(),
            selected: Mutex::new(None),
        }
    }

    /// A pool that always connects directly.
    pub fn direct(user_agent: impl Into<String>) -> Self {
        Self::new(&EgressConfig::default(), user_agent)
    }

    /// Returns a client bound to the current route, probing if needed.
    ///
    /// Fails with [`FailureKind::ProxyUnavailable`] when every proxy is
    /// offline and direct fallback is disabled.
    pub async fn client(&self, stage: Stage) -> Result<reqwest::Client, Failure> {
        let mut selected = self.selected.lock().await;
        if let Some(selection) = selected.as_ref()
            && selection.chosen_at.elapsed() < SELECTION_TTL
        {
            return Ok(selection.client.clone());
        }

        let (route, client) = self.select(stage).await?;
        info!(route = %route, "egress route selected");
        *selected = Some(Selection {
            route,
            client: client.clone(),
            chosen_at: Instant::now(),
        });
        Ok(client)
    }

    /// The route of the cached selection, if any.
    pub async fn current_route(&self) -> Option<EgressRoute> {
        self.selected.lock().await.as_ref().map(|s| s.route.clone())
    }

    /// Forgets the cached selection so the next request probes again.
    pub async fn invalidate(&self) {
        if let Some(selection) = self.selected.lock().await.take() {
            debug!(route = %selection.route, "egress selection invalidated");
        }
    }

    async fn select(&self, stage: Stage) -> Result<(EgressRoute, reqwest::Client), Failure> {
        if self.proxies.is_empty() {
            return Ok((EgressRoute::Direct, self.direct_client(stage)?));
        }

        for proxy in &self.proxies {
            match self.proxy_client(proxy) {
                Ok(client) => {
                    if self.probe(&client, proxy).await {
                        let route = EgressRoute::Proxy {
                            label: proxy.label.clone(),
                        };
                        return Ok((route, client));
                    }
                }
                Err(e) => {
                    warn!(proxy = %proxy.label, error = %e, "invalid proxy settings, skipping");
                }
            }
        }

        if self.fallback_direct {
            warn!("all proxies offline, falling back to a direct connection");
            return Ok((EgressRoute::Direct, self.direct_client(stage)?));
        }
        Err(Failure::new(
            stage,
            FailureKind::ProxyUnavailable,
            format!("all {} configured proxies are offline", self.proxies.len()),
        ))
    }

    async fn probe(&self, client: &reqwest::Client, proxy: &ProxyConfig) -> bool {
        let result = client
            .get(&self.probe_url)
            .timeout(self.probe_timeout)
            .send()
            .await;
        match result {
            Ok(response) if response.status() == StatusCode::OK => {
                debug!(proxy = %proxy.label, "proxy online");
                true
            }
            Ok(response) => {
                warn!(proxy = %proxy.label, status = %response.status(), "proxy probe rejected");
                false
            }
            Err(e) => {
                warn!(proxy = %proxy.label, error = %e, "proxy offline");
                false
            }
        }
    }

    fn proxy_client(&self, proxy: &ProxyConfig) -> Result<reqwest::Client, reqwest::Error> {
        let mut upstream = reqwest::Proxy::all(proxy_url(proxy))?;
        if let Some(username) = &proxy.username {
            upstream = upstream.basic_auth(username, proxy.password.as_deref().unwrap_or(""));
        }
        reqwest::Client::builder()
            .user_agent(self.user_agent.as_str())
            .proxy(upstream)
            .build()
    }

    fn direct_client(&self, stage: Stage) -> Result<reqwest::Client, Failure> {
        reqwest::Client::builder()
            .user_agent(self.user_agent.as_str())
            .no_proxy()
            .build()
            .map_err(|e| {
                Failure::new(
                    stage,
                    FailureKind::Unknown,
                    format!("failed to build HTTP client: {e}"),
                )
            })
    }
}

fn proxy_url(proxy: &ProxyConfig) -> String {
    format!("http://{}:{}", proxy.host, proxy.port)
}
