// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks semantic constraints serde cannot express: positive limits,
//! well-formed URLs, and unique proxy labels.

use std::collections::HashSet;

use crosspost_core::MAX_IMAGES;

use crate::diagnostic::ConfigError;
use crate::model::CrosspostConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every violation instead of failing fast.
pub fn validate_config(config: &CrosspostConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    if config.queue.max_attempts == 0 {
        fail("queue.max_attempts must be at least 1".to_string());
    }
    if config.queue.capacity == 0 {
        fail("queue.capacity must be at least 1".to_string());
    }
    if config.queue.max_batches == 0 {
        fail("queue.max_batches must be at least 1".to_string());
    }

    if let Some(base_url) = &config.source.base_url {
        if !is_http_url(base_url) {
            fail(format!(
                "source.base_url `{base_url}` must start with http:// or https://"
            ));
        }
        if config.source.selectors.is_empty() {
            fail("source.selectors must list at least one selector when source.base_url is set"
                .to_string());
        }
    }
    if config.source.selectors.iter().any(|s| s.trim().is_empty()) {
        fail("source.selectors must not contain empty entries".to_string());
    }
    if config.source.fetch_limit == 0 {
        fail("source.fetch_limit must be at least 1".to_string());
    }

    // Room for at least "...\n" plus some text.
    if config.compose.max_chars < 8 {
        fail(format!(
            "compose.max_chars must be at least 8, got {}",
            config.compose.max_chars
        ));
    }

    if config.media.max_images == 0 || config.media.max_images > MAX_IMAGES {
        fail(format!(
            "media.max_images must be between 1 and {MAX_IMAGES}, got {}",
            config.media.max_images
        ));
    }
    if config.media.max_video_duration_secs == 0 {
        fail("media.max_video_duration_secs must be positive".to_string());
    }

    for (name, secs) in [
        ("fetch_secs", config.timeouts.fetch_secs),
        ("media_secs", config.timeouts.media_secs),
        ("publish_secs", config.timeouts.publish_secs),
    ] {
        if secs == 0 {
            fail(format!("timeouts.{name} must be positive"));
        }
    }

    if !is_http_url(&config.egress.probe_url) {
        fail(format!(
            "egress.probe_url `{}` must start with http:// or https://",
            config.egress.probe_url
        ));
    }
    let mut labels = HashSet::new();
    for (i, proxy) in config.egress.proxies.iter().enumerate() {
        if proxy.host.trim().is_empty() {
            fail(format!("egress.proxies[{i}].host must not be empty"));
        }
        if !labels.insert(proxy.label.as_str()) {
            fail(format!("duplicate proxy label `{}` in [[egress.proxies]]", proxy.label));
        }
        if proxy.password.is_some() && proxy.username.is_none() {
            fail(format!("egress.proxies[{i}] has a password but no username"));
        }
    }

    if config.scheduler.interval_secs == 0 {
        fail("scheduler.interval_secs must be positive".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}
