// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Structured result of one tick.

use std::fmt;
use std::time::Duration;

/// What a tick did. Renders as a compact one-line summary via `Display`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The publisher accepted the item.
    Published { item_id: String, remote_id: String },
    /// The item was given up on and marked seen.
    Rejected { item_id: String, reason: String },
    /// The attempt failed retryably; the item waits in the pending queue.
    RetryScheduled {
        item_id: String,
        attempt: u32,
        max_attempts: u32,
        reason: String,
        retry_after: Option<Duration>,
    },
    /// The attempt failed retryably but used up the budget; needs an operator.
    Stalled {
        item_id: String,
        attempt: u32,
        max_attempts: u32,
        reason: String,
    },
    /// Nothing to do this tick.
    Idle,
    /// The content source could not be reached; nothing was attempted.
    DiscoveryFailed { reason: String },
}

impl TickOutcome {
    /// Stable label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            TickOutcome::Published { .. } => "published",
            TickOutcome::Rejected { .. } => "rejected",
            TickOutcome::RetryScheduled { .. } => "retry-scheduled",
            TickOutcome::Stalled { .. } => "stalled",
            TickOutcome::Idle => "idle",
            TickOutcome::DiscoveryFailed { .. } => "discovery-failed",
        }
    }

    pub fn item_id(&self) -> Option<&str> {
        match self {
            TickOutcome::Published { item_id, .. }
            | TickOutcome::Rejected { item_id, .. }
            | TickOutcome::RetryScheduled { item_id, .. }
            | TickOutcome::Stalled { item_id, .. } => Some(item_id),
            TickOutcome::Idle | TickOutcome::DiscoveryFailed { .. } => None,
        }
    }
}

impl fmt::Display for TickOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TickOutcome::Published { remote_id, .. } => write!(f, "published({remote_id})"),
            TickOutcome::Rejected { reason, .. } => write!(f, "rejected({reason})"),
            TickOutcome::RetryScheduled {
                attempt,
                max_attempts,
                ..
            } => write!(f, "retry-scheduled(attempt {attempt}/{max_attempts})"),
            TickOutcome::Stalled {
                attempt,
                max_attempts,
                ..
            } => write!(f, "stalled(attempt {attempt}/{max_attempts})"),
            TickOutcome::Idle => write!(f, "idle"),
            TickOutcome::DiscoveryFailed { reason } => write!(f, "discovery-failed({reason})"),
        }
    }
}
