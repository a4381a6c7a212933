// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row types for storage entities and their conversion to domain types.
//!
//! Rows hold raw column values so they can cross the tokio-rusqlite thread
//! boundary; JSON and timestamp decoding happens on the caller's side.

use chrono::{DateTime, SecondsFormat, Utc};
use crosspost_core::{Batch, CrosspostError, Item, MediaRef, PendingEntry};

/// Render a timestamp the way every table stores it (RFC 3339, millisecond
/// precision, `Z` suffix), so text ordering matches time ordering.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, CrosspostError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(CrosspostError::storage)
}

/// A row of the `pending` table.
#[derive(Debug, Clone)]
pub struct PendingRow {
    pub item_id: String,
    pub text: String,
    pub media_refs: String,
    pub attempts: i64,
    pub last_attempt_at: String,
}

impl PendingRow {
    pub(crate) fn from_row(row: &rusqlite::Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            item_id: row.get(0)?,
            text: row.get(1)?,
            media_refs: row.get(2)?,
            attempts: row.get(3)?,
            last_attempt_at: row.get(4)?,
        })
    }

    pub fn into_entry(self) -> Result<PendingEntry, CrosspostError> {
        let media_refs: Vec<MediaRef> =
            serde_json::from_str(&self.media_refs).map_err(CrosspostError::storage)?;
        let attempts = u32::try_from(self.attempts).map_err(CrosspostError::storage)?;
        Ok(PendingEntry {
            item_id: self.item_id,
            text: self.text,
            media_refs,
            attempts,
            last_attempt_at: parse_timestamp(&self.last_attempt_at)?,
        })
    }
}

/// A row of the `batches` table.
#[derive(Debug, Clone)]
pub struct BatchRow {
    pub batch_id: i64,
    pub selector: String,
    pub fetched_at: String,
    pub items_json: String,
}

impl BatchRow {
    pub(crate) fn from_row(row: &rusqlite::Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            batch_id: row.get(0)?,
            selector: row.get(1)?,
            fetched_at: row.get(2)?,
            items_json: row.get(3)?,
        })
    }

    pub fn into_batch(self) -> Result<Batch, CrosspostError> {
        let items: Vec<Item> =
            serde_json::from_str(&self.items_json).map_err(CrosspostError::storage)?;
        Ok(Batch {
            batch_id: self.batch_id,
            selector: self.selector,
            fetched_at: parse_timestamp(&self.fetched_at)?,
            items,
        })
    }
}
