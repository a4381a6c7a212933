// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across adapter trait boundaries.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::CrosspostError;

/// Maximum number of images the target platform accepts on one post.
pub const MAX_IMAGES: usize = 4;

/// A reference to remote media attached to an item.
///
/// Stored in the pending queue as a tagged JSON array, so URLs containing
/// any delimiter round-trip unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MediaRef {
    Image {
        url: String,
    },
    Video {
        url: String,
        /// Duration reported by the source, when known.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration_secs: Option<u32>,
    },
}

impl MediaRef {
    pub fn image(url: impl Into<String>) -> Self {
        MediaRef::Image { url: url.into() }
    }

    pub fn video(url: impl Into<String>, duration_secs: Option<u32>) -> Self {
        MediaRef::Video {
            url: url.into(),
            duration_secs,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            MediaRef::Image { url } | MediaRef::Video { url, .. } => url,
        }
    }

    pub fn kind(&self) -> MediaKind {
        match self {
            MediaRef::Image { .. } => MediaKind::Image,
            MediaRef::Video { .. } => MediaKind::Video,
        }
    }
}

/// Media category, used for upload routing and content-type checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

/// A unit of content to publish.
///
/// Immutable once built: a failed attempt produces a new pending entry, never
/// a modified item. Construction enforces the platform media rule of one
/// video or up to [`MAX_IMAGES`] images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ItemParts", into = "ItemParts")]
pub struct Item {
    id: String,
    text: String,
    media: Vec<MediaRef>,
}

impl Item {
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        media: Vec<MediaRef>,
    ) -> Result<Self, CrosspostError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(CrosspostError::Validation("item id must not be empty".into()));
        }
        validate_media(&id, &media)?;
        Ok(Self {
            id,
            text: text.into(),
            media,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn media_refs(&self) -> &[MediaRef] {
        &self.media
    }
}

fn validate_media(id: &str, media: &[MediaRef]) -> Result<(), CrosspostError> {
    let videos = media.iter().filter(|m| m.kind() == MediaKind::Video).count();
    if videos > 0 && media.len() > 1 {
        return Err(CrosspostError::Validation(format!(
            "item {id}: a video cannot be combined with other media"
        )));
    }
    if media.len() > MAX_IMAGES {
        return Err(CrosspostError::Validation(format!(
            "item {id}: {} images exceeds the limit of {MAX_IMAGES}",
            media.len()
        )));
    }
    Ok(())
}

/// Serde shadow of [`Item`] so deserialized items go through validation.
#[derive(Serialize, Deserialize)]
struct ItemParts {
    id: String,
    text: String,
    #[serde(default)]
    media: Vec<MediaRef>,
}

impl TryFrom<ItemParts> for Item {
    type Error = CrosspostError;

    fn try_from(parts: ItemParts) -> Result<Self, Self::Error> {
        Item::new(parts.id, parts.text, parts.media)
    }
}

impl From<Item> for ItemParts {
    fn from(item: Item) -> Self {
        ItemParts {
            id: item.id,
            text: item.text,
            media: item.media,
        }
    }
}

/// An item as returned by a content source, before composition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawItem {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub permalink: Option<String>,
    /// Pinned posts are never republished.
    #[serde(default)]
    pub stickied: bool,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub video: Option<RawVideo>,
}

/// A video attachment on a raw item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawVideo {
    pub url: String,
    #[serde(default)]
    pub duration_secs: Option<u32>,
}

/// A durable retry record for an item that failed in a retryable way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEntry {
    pub item_id: String,
    pub text: String,
    pub media_refs: Vec<MediaRef>,
    pub attempts: u32,
    pub last_attempt_at: DateTime<Utc>,
}

impl PendingEntry {
    /// Whether this entry may still be selected for another attempt.
    pub fn is_retryable(&self, max_attempts: u32) -> bool {
        self.attempts < max_attempts
    }

    /// Rebuilds the immutable item this entry was recorded for.
    pub fn to_item(&self) -> Result<Item, CrosspostError> {
        Item::new(
            self.item_id.clone(),
            self.text.clone(),
            self.media_refs.clone(),
        )
    }
}

/// Marks an item id as permanently resolved (published or rejected).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeenRecord {
    pub item_id: String,
    pub resolved_at: DateTime<Utc>,
}

/// A cached listing fetched from the content source.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub batch_id: i64,
    pub selector: String,
    pub fetched_at: DateTime<Utc>,
    pub items: Vec<Item>,
}

/// Limits the media pipeline must enforce while materializing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaConstraints {
    pub max_duration_secs: u32,
    pub max_count: usize,
}

/// A publish-ready media file in the tick's scratch directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalMedia {
    pub path: PathBuf,
    pub kind: MediaKind,
    pub bytes: u64,
}

/// Successful publish acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReceipt {
    pub remote_id: String,
}

/// Snapshot of queue state for operators.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub batches: u64,
    pub cached_items: u64,
    pub seen_total: u64,
    pub pending_total: u64,
    pub stalled_total: u64,
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the role an adapter plays around the publish engine.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Source,
    Media,
    Publisher,
    Storage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_rejects_video_mixed_with_images() {
        let err = Item::new(
            "a",
            "text",
            vec![MediaRef::video("v.mp4", None), MediaRef::image("i.jpg")],
        )
        .unwrap_err();
        assert!(matches!(err, CrosspostError::Validation(_)));
    }

    #[test]
    fn item_rejects_more_than_four_images() {
        let media = (0..5).map(|i| MediaRef::image(format!("{i}.jpg"))).collect();
        assert!(Item::new("a", "text", media).is_err());
    }

    #[test]
    fn item_rejects_blank_id() {
        assert!(Item::new("  ", "text", vec![]).is_err());
    }

    #[test]
    fn item_deserialization_is_validated() {
        let json = r#"{"id":"x","text":"t","media":[
            {"kind":"video","url":"a.mp4"},{"kind":"image","url":"b.jpg"}]}"#;
        assert!(serde_json::from_str::<Item>(json).is_err());
    }

    #[test]
    fn media_refs_with_commas_survive_serialization() {
        let media = vec![
            MediaRef::image("https://cdn.example/a,b;c|d.jpg?x=1,2"),
            MediaRef::image("https://cdn.example/\"quoted\".png"),
        ];
        let json = serde_json::to_string(&media).unwrap();
        let back: Vec<MediaRef> = serde_json::from_str(&json).unwrap();
        assert_eq!(media, back);
    }

    #[test]
    fn pending_entry_retry_eligibility() {
        let entry = PendingEntry {
            item_id: "d".into(),
            text: "t".into(),
            media_refs: vec![],
            attempts: 2,
            last_attempt_at: Utc::now(),
        };
        assert!(entry.is_retryable(3));
        let exhausted = PendingEntry { attempts: 3, ..entry };
        assert!(!exhausted.is_retryable(3));
    }

    #[test]
    fn adapter_type_round_trips_through_strings() {
        use std::str::FromStr;
        for variant in [
            AdapterType::Source,
            AdapterType::Media,
            AdapterType::Publisher,
            AdapterType::Storage,
        ] {
            let parsed = AdapterType::from_str(&variant.to_string()).unwrap();
            assert_eq!(variant, parsed);
        }
    }
}
