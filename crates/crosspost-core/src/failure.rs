// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Failure descriptions reported by the external adapters.
//!
//! A [`Failure`] is data, not an error: the orchestrator catches it at its
//! boundary and hands it to the retry classifier. Adapters should fill in a
//! structured [`FailureKind`] (and the HTTP status where one exists) whenever
//! they can; [`FailureKind::Unknown`] falls back to message inspection.

use std::fmt;
use std::time::Duration;

use strum::Display;

/// Pipeline step that produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Stage {
    Fetch,
    Materialize,
    Publish,
}

/// Structured failure categories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// Network or I/O blip.
    TransientIo,
    /// An external call exceeded its deadline.
    Timeout,
    /// The remote asked us to slow down.
    RateLimited { retry_after: Option<Duration> },
    /// The egress proxy could not be reached right now.
    ProxyUnavailable,
    /// Local scratch storage was temporarily unusable.
    StorageUnavailable,
    /// Media format the platform does not accept.
    UnsupportedMedia,
    /// Video longer than the platform limit.
    MediaTooLong,
    /// The platform refused the content itself.
    ContentRejected,
    /// Credentials rejected with no remediation available to this process.
    AuthorizationDenied,
    /// The referenced resource does not exist.
    NotFound,
    /// No available egress path supports this kind of request.
    EgressIncompatible,
    /// The adapter could not categorize the failure.
    Unknown,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::TransientIo => "transient-io",
            FailureKind::Timeout => "timeout",
            FailureKind::RateLimited { .. } => "rate-limited",
            FailureKind::ProxyUnavailable => "proxy-unavailable",
            FailureKind::StorageUnavailable => "storage-unavailable",
            FailureKind::UnsupportedMedia => "unsupported-media",
            FailureKind::MediaTooLong => "media-too-long",
            FailureKind::ContentRejected => "content-rejected",
            FailureKind::AuthorizationDenied => "authorization-denied",
            FailureKind::NotFound => "not-found",
            FailureKind::EgressIncompatible => "egress-incompatible",
            FailureKind::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// A failure reported by a source, media pipeline, or publisher call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub stage: Stage,
    pub kind: FailureKind,
    pub http_status: Option<u16>,
    pub message: String,
}

impl Failure {
    pub fn new(stage: Stage, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            stage,
            kind,
            http_status: None,
            message: message.into(),
        }
    }

    /// A failure carrying only an HTTP status, to be classified from it.
    pub fn http(stage: Stage, status: u16, message: impl Into<String>) -> Self {
        Self {
            stage,
            kind: FailureKind::Unknown,
            http_status: Some(status),
            message: message.into(),
        }
    }

    pub fn timeout(stage: Stage, after: Duration) -> Self {
        Self::new(
            stage,
            FailureKind::Timeout,
            format!("{stage} timed out after {after:?}"),
        )
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }

    /// Suggested backoff when the remote rate-limited us.
    pub fn retry_after(&self) -> Option<Duration> {
        match self.kind {
            FailureKind::RateLimited { retry_after } => retry_after,
            _ => None,
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.stage, self.kind)?;
        if let Some(status) = self.http_status {
            write!(f, " (HTTP {status})")?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        Ok(())
    }
}
