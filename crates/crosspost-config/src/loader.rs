// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./crosspost.toml` > `~/.config/crosspost/crosspost.toml` >
//! `/etc/crosspost/crosspost.toml` with environment variable overrides via `CROSSPOST_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::CrosspostConfig;

/// Top-level sections, used to turn `CROSSPOST_QUEUE_MAX_ATTEMPTS` into `queue.max_attempts`.
const SECTIONS: &[&str] = &[
    "bot",
    "storage",
    "queue",
    "source",
    "compose",
    "media",
    "timeouts",
    "egress",
    "scheduler",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/crosspost/crosspost.toml` (system-wide)
/// 3. `~/.config/crosspost/crosspost.toml` (user XDG config)
/// 4. `./crosspost.toml` (local directory)
/// 5. `CROSSPOST_*` environment variables
pub fn load_config() -> Result<CrosspostConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<CrosspostConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CrosspostConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<CrosspostConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CrosspostConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(CrosspostConfig::default()))
        .merge(Toml::file("/etc/crosspost/crosspost.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("crosspost/crosspost.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("crosspost.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `CROSSPOST_QUEUE_MAX_ATTEMPTS` must map to `queue.max_attempts`,
/// not `queue.max.attempts`.
fn env_provider() -> Env {
    Env::prefixed("CROSSPOST_").map(|key| map_env_key(key.as_str()).into())
}

/// Replace the first `<section>_` prefix with `<section>.`.
pub(crate) fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_map_to_sections() {
        assert_eq!(map_env_key("queue_max_attempts"), "queue.max_attempts");
        assert_eq!(map_env_key("source_base_url"), "source.base_url");
        assert_eq!(map_env_key("timeouts_publish_secs"), "timeouts.publish_secs");
        assert_eq!(map_env_key("bot_log_level"), "bot.log_level");
    }

    #[test]
    fn unknown_prefix_is_left_alone() {
        assert_eq!(map_env_key("mystery"), "mystery");
    }
}
