// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for crosspost.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::path::PathBuf;
use std::time::Duration;

use crosspost_core::{MediaConstraints, MAX_IMAGES};
use serde::{Deserialize, Serialize};

/// Top-level crosspost configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CrosspostConfig {
    /// Bot identity and logging.
    #[serde(default)]
    pub bot: BotConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Retry queue and discovery cache limits.
    #[serde(default)]
    pub queue: QueueConfig,

    /// Content source settings.
    #[serde(default)]
    pub source: SourceConfig,

    /// Text composition settings.
    #[serde(default)]
    pub compose: ComposeConfig,

    /// Media materialization settings.
    #[serde(default)]
    pub media: MediaConfig,

    /// Deadlines for external calls.
    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// Outbound proxy settings.
    #[serde(default)]
    pub egress: EgressConfig,

    /// Tick scheduling for `crosspost run`.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

/// Bot identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BotConfig {
    /// Display name used in logs.
    #[serde(default = "default_bot_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: default_bot_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_bot_name() -> String {
    "crosspost".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    "crosspost.db".to_string()
}

fn default_wal_mode() -> bool {
    true
}

/// Retry queue configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    /// Attempts after which a pending entry stalls.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Maximum pending entries. A new id arriving at a full queue evicts the
    /// entry with the oldest last attempt; 1 gives a single-slot queue.
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Maximum cached discovery batches (FIFO).
    #[serde(default = "default_max_batches")]
    pub max_batches: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            capacity: default_capacity(),
            max_batches: default_max_batches(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_capacity() -> usize {
    16
}

fn default_max_batches() -> usize {
    2
}

/// Content source configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    /// Base URL of the JSON feed. `None` disables discovery (retries only).
    #[serde(default)]
    pub base_url: Option<String>,

    /// Feed selectors (e.g. community names); one is picked at random per fetch.
    #[serde(default)]
    pub selectors: Vec<String>,

    /// Items requested per fetch.
    #[serde(default = "default_fetch_limit")]
    pub fetch_limit: usize,

    /// User-Agent sent with feed and media requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            selectors: Vec::new(),
            fetch_limit: default_fetch_limit(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_fetch_limit() -> usize {
    25
}

fn default_user_agent() -> String {
    concat!("crosspost/", env!("CARGO_PKG_VERSION")).to_string()
}

/// Text composition configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ComposeConfig {
    /// Platform character budget for the rendered text.
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
        }
    }
}

fn default_max_chars() -> usize {
    280
}

/// Media materialization configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MediaConfig {
    /// Parent directory for per-tick scratch directories.
    /// Defaults to the system temporary directory.
    #[serde(default)]
    pub scratch_dir: Option<String>,

    /// Maximum images per post.
    #[serde(default = "default_max_images")]
    pub max_images: usize,

    /// Platform hard limit for video duration.
    #[serde(default = "default_max_video_duration_secs")]
    pub max_video_duration_secs: u32,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            scratch_dir: None,
            max_images: default_max_images(),
            max_video_duration_secs: default_max_video_duration_secs(),
        }
    }
}

impl MediaConfig {
    pub fn constraints(&self) -> MediaConstraints {
        MediaConstraints {
            max_duration_secs: self.max_video_duration_secs,
            max_count: self.max_images,
        }
    }

    pub fn scratch_root(&self) -> PathBuf {
        self.scratch_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir)
    }
}

fn default_max_images() -> usize {
    MAX_IMAGES
}

fn default_max_video_duration_secs() -> u32 {
    140
}

/// Deadlines for every external call.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TimeoutConfig {
    #[serde(default = "default_fetch_secs")]
    pub fetch_secs: u64,

    #[serde(default = "default_media_secs")]
    pub media_secs: u64,

    #[serde(default = "default_publish_secs")]
    pub publish_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            fetch_secs: default_fetch_secs(),
            media_secs: default_media_secs(),
            publish_secs: default_publish_secs(),
        }
    }
}

impl TimeoutConfig {
    pub fn fetch(&self) -> Duration {
        Duration::from_secs(self.fetch_secs)
    }

    pub fn media(&self) -> Duration {
        Duration::from_secs(self.media_secs)
    }

    pub fn publish(&self) -> Duration {
        Duration::from_secs(self.publish_secs)
    }
}

fn default_fetch_secs() -> u64 {
    30
}

fn default_media_secs() -> u64 {
    120
}

fn default_publish_secs() -> u64 {
    60
}

/// Outbound proxy configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EgressConfig {
    /// Proxies in priority order; the first one that answers the probe wins.
    #[serde(default)]
    pub proxies: Vec<ProxyConfig>,

    /// URL fetched through each proxy to check it is online.
    #[serde(default = "default_probe_url")]
    pub probe_url: String,

    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,

    /// Use a direct connection when every configured proxy is offline.
    #[serde(default = "default_fallback_direct")]
    pub fallback_direct: bool,
}

impl Default for EgressConfig {
    fn default() -> Self {
        Self {
            proxies: Vec::new(),
            probe_url: default_probe_url(),
            probe_timeout_secs: default_probe_timeout_secs(),
            fallback_direct: default_fallback_direct(),
        }
    }
}

fn default_probe_url() -> String {
    "https://www.reddit.com/".to_string()
}

fn default_probe_timeout_secs() -> u64 {
    8
}

fn default_fallback_direct() -> bool {
    true
}

/// A single HTTP proxy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProxyConfig {
    pub label: String,

    pub host: String,

    #[serde(default = "default_proxy_port")]
    pub port: u16,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,
}

fn default_proxy_port() -> u16 {
    8080
}

/// Tick scheduling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SchedulerConfig {
    /// Seconds between ticks in `crosspost run`.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
        }
    }
}

fn default_interval_secs() -> u64 {
    3600
}
