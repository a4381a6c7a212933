// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retry-versus-fatal classification of adapter failures.
//!
//! Pure functions of the failure description: no store access, no I/O.
//! Signals are consulted in order of reliability: the structured
//! [`FailureKind`], then the HTTP status, then a short list of message
//! patterns. Anything still undecided is retryable, because a wrong Fatal
//! marks the item seen and loses it for good while a wrong Retryable only
//! costs a bounded number of attempts.

use crosspost_core::{Failure, FailureKind};

/// What to do with an item after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// A later attempt may succeed.
    Retryable,
    /// No attempt can succeed; give the item up.
    Fatal,
    /// Retryable in nature, but the attempt budget is spent.
    ExhaustedAttempts,
}

impl std::fmt::Display for Disposition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Disposition::Retryable => write!(f, "retryable"),
            Disposition::Fatal => write!(f, "fatal"),
            Disposition::ExhaustedAttempts => write!(f, "exhausted-attempts"),
        }
    }
}

/// Result of classifying a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub disposition: Disposition,
    /// Short machine-friendly reason, used in outcome lines and logs.
    pub reason: &'static str,
}

impl Classification {
    const fn retryable(reason: &'static str) -> Self {
        Self {
            disposition: Disposition::Retryable,
            reason,
        }
    }

    const fn fatal(reason: &'static str) -> Self {
        Self {
            disposition: Disposition::Fatal,
            reason,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.disposition == Disposition::Fatal
    }
}

/// Message fragments that indicate a transient condition. Checked before the
/// fatal patterns so mixed messages stay retryable.
const RETRYABLE_PATTERNS: &[&str] = &[
    "rate limit",
    "too many requests",
    "timed out",
    "timeout",
    "temporarily",
    "try again",
    "connection reset",
    "connection refused",
    "service unavailable",
    "over capacity",
];

/// Message fragments that indicate a permanent condition.
const FATAL_PATTERNS: &[(&str, &str)] = &[
    ("unsupported media", "unsupported-media"),
    ("unsupported format", "unsupported-media"),
    ("invalid media", "unsupported-media"),
    ("duration too long", "media-too-long"),
    ("exceeds maximum duration", "media-too-long"),
    ("duplicate content", "content-rejected"),
    ("not allowed to create", "content-rejected"),
    ("violates", "content-rejected"),
    ("unauthorized", "authorization-denied"),
    ("forbidden", "authorization-denied"),
    ("invalid or expired token", "authorization-denied"),
    ("not found", "not-found"),
];

/// Classify a failure as [`Disposition::Retryable`] or [`Disposition::Fatal`].
pub fn classify(failure: &Failure) -> Classification {
    match &failure.kind {
        FailureKind::TransientIo => Classification::retryable("transient-io"),
        FailureKind::RateLimited { .. } => Classification::retryable("rate-limited"),
        FailureKind::ProxyUnavailable => Classification::retryable("proxy-unavailable"),
        FailureKind::StorageUnavailable => Classification::retryable("storage-unavailable"),
        FailureKind::UnsupportedMedia => Classification::fatal("unsupported-media"),
        FailureKind::MediaTooLong => Classification::fatal("media-too-long"),
        FailureKind::ContentRejected => Classification::fatal("content-rejected"),
        FailureKind::AuthorizationDenied => Classification::fatal("authorization-denied"),
        FailureKind::NotFound => Classification::fatal("not-found"),
        FailureKind::EgressIncompatible => Classification::fatal("egress-incompatible"),
        // A timeout stays retryable unless the message clearly says otherwise.
        FailureKind::Timeout => classify_message(&failure.message)
            .filter(Classification::is_fatal)
            .unwrap_or(Classification::retryable("timeout")),
        FailureKind::Unknown => failure
            .http_status
            .and_then(classify_status)
            .or_else(|| classify_message(&failure.message))
            .unwrap_or(Classification::retryable("unclassified")),
    }
}

/// Like [`classify`], but turns a retryable failure into
/// [`Disposition::ExhaustedAttempts`] once `attempts` reaches `max_attempts`.
///
/// `attempts` counts the attempt that just failed.
pub fn classify_attempt(failure: &Failure, attempts: u32, max_attempts: u32) -> Classification {
    let classification = classify(failure);
    if classification.disposition == Disposition::Retryable && attempts >= max_attempts {
        Classification {
            disposition: Disposition::ExhaustedAttempts,
            reason: classification.reason,
        }
    } else {
        classification
    }
}

fn classify_status(status: u16) -> Option<Classification> {
    match status {
        401 | 403 => Some(Classification::fatal("authorization-denied")),
        404 | 410 => Some(Classification::fatal("not-found")),
        413 | 415 => Some(Classification::fatal("unsupported-media")),
        408 => Some(Classification::retryable("timeout")),
        429 => Some(Classification::retryable("rate-limited")),
        500..=599 => Some(Classification::retryable("server-error")),
        // Other 4xx codes are too broad to give an item up on.
        _ => None,
    }
}

fn classify_message(message: &str) -> Option<Classification> {
    let lower = message.to_lowercase();
    if RETRYABLE_PATTERNS.iter().any(|p| lower.contains(p)) {
        return Some(Classification::retryable("transient-message"));
    }
    FATAL_PATTERNS
        .iter()
        .find(|(pattern, _)| lower.contains(pattern))
        .map(|(_, reason)| Classification::fatal(*reason))
}
