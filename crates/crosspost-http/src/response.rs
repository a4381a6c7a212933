// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping of reqwest errors and HTTP statuses onto [`Failure`].

use std::time::Duration;

use crosspost_core::{Failure, FailureKind, Stage};
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, RETRY_AFTER};

/// Longest error body echoed into a failure message.
const MAX_BODY_CHARS: usize = 200;

pub(crate) fn request_failure(stage: Stage, err: &reqwest::Error) -> Failure {
    let kind = if err.is_timeout() {
        FailureKind::Timeout
    } else if err.is_connect() || err.is_request() || err.is_body() {
        FailureKind::TransientIo
    } else {
        FailureKind::Unknown
    };
    let failure = Failure::new(stage, kind, err.to_string());
    match err.status() {
        Some(status) => failure.with_status(status.as_u16()),
        None => failure,
    }
}

/// A non-success response. 429 carries the `Retry-After` hint; everything
/// else is left to status classification.
pub(crate) fn status_failure(
    stage: Stage,
    status: StatusCode,
    headers: &HeaderMap,
    body: &str,
) -> Failure {
    let message = summarize_body(status, body);
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Failure::new(
            stage,
            FailureKind::RateLimited {
                retry_after: retry_after(headers),
            },
            message,
        )
        .with_status(status.as_u16());
    }
    Failure::http(stage, status.as_u16(), message)
}

/// Parses a delta-seconds `Retry-After`. HTTP-date values are ignored.
pub(crate) fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

fn summarize_body(status: StatusCode, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return status.to_string();
    }
    let snippet: String = body.chars().take(MAX_BODY_CHARS).collect();
    format!("{status}: {snippet}")
}
