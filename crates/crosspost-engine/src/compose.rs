// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turning raw source items into publishable [`Item`]s.
//!
//! Text is `title`, a newline, then `body`, fitted to the platform's
//! character budget with the permalink appended when one exists. Lengths are
//! counted in Unicode scalar values. A video wins over images; images are
//! capped at the configured count.

use crosspost_config::model::CrosspostConfig;
use crosspost_core::{Item, MediaRef, RawItem};
use tracing::debug;

const ELLIPSIS: &str = "...";

/// Builds items from raw source data.
#[derive(Debug, Clone, Copy)]
pub struct Composer {
    max_chars: usize,
    max_images: usize,
}

impl Composer {
    pub fn new(max_chars: usize, max_images: usize) -> Self {
        Self {
            max_chars,
            max_images,
        }
    }

    pub fn from_config(config: &CrosspostConfig) -> Self {
        Self::new(config.compose.max_chars, config.media.max_images)
    }

    /// Compose an item, or `None` when the raw item must be skipped
    /// (pinned, or nothing at all to publish).
    pub fn compose(&self, raw: &RawItem) -> Option<Item> {
        if raw.stickied {
            debug!(item_id = %raw.id, "skipping stickied item");
            return None;
        }

        let text = self.compose_text(&raw.title, &raw.body, raw.permalink.as_deref());
        let media = self.select_media(raw);
        if text.is_empty() && media.is_empty() {
            debug!(item_id = %raw.id, "skipping item with no text and no media");
            return None;
        }

        match Item::new(raw.id.clone(), text, media) {
            Ok(item) => Some(item),
            Err(e) => {
                debug!(item_id = %raw.id, error = %e, "skipping malformed item");
                None
            }
        }
    }

    /// Render the post text within `max_chars`.
    pub fn compose_text(&self, title: &str, body: &str, permalink: Option<&str>) -> String {
        let title = title.trim();
        let body = body.trim();
        let content = match (title.is_empty(), body.is_empty()) {
            (_, true) => title.to_string(),
            (true, false) => body.to_string(),
            (false, false) => format!("{title}\n{body}"),
        };
        let link = permalink.map(str::trim).filter(|l| !l.is_empty());

        match link {
            Some(link) if content.is_empty() => truncate(link, self.max_chars),
            Some(link) => {
                let link_len = char_len(link);
                if char_len(&content) + 1 + link_len <= self.max_chars {
                    return format!("{content}\n{link}");
                }
                // "...\n" plus the link must leave room for some text.
                let overhead = char_len(ELLIPSIS) + 1 + link_len;
                if overhead >= self.max_chars {
                    return truncate(&content, self.max_chars);
                }
                let head = take_chars(&content, self.max_chars - overhead);
                format!("{}{ELLIPSIS}\n{link}", head.trim_end())
            }
            None => truncate(&content, self.max_chars),
        }
    }

    /// Pick the media to publish: the video alone if present, else images.
    pub fn select_media(&self, raw: &RawItem) -> Vec<MediaRef> {
        if let Some(video) = &raw.video {
            return vec![MediaRef::video(video.url.clone(), video.duration_secs)];
        }
        raw.images
            .iter()
            .filter(|url| !url.trim().is_empty())
            .take(self.max_images)
            .map(|url| MediaRef::image(url.clone()))
            .collect()
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn take_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if char_len(s) <= max_chars {
        return s.to_string();
    }
    let keep = max_chars.saturating_sub(char_len(ELLIPSIS));
    format!("{}{ELLIPSIS}", take_chars(s, keep))
}
