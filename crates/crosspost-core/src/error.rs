// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the crosspost workspace.
//!
//! [`CrosspostError`] is reserved for hard failures that must abort a tick
//! (storage, configuration, programming errors). Failures reported by the
//! external adapters are plain values of [`crate::failure::Failure`] and are
//! routed through the retry classifier instead.

use thiserror::Error;

/// The primary error type used across crosspost traits and core operations.
#[derive(Debug, Error)]
pub enum CrosspostError {
    /// Configuration errors (invalid TOML, missing required fields, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    ///
    /// Never swallowed: losing a seen mark or a pending entry risks a double
    /// publish or a silent drop.
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A domain value violated a construction invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Adapter setup errors (HTTP client construction, invalid endpoint).
    #[error("adapter error: {message}")]
    Adapter {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CrosspostError {
    /// Wraps any error as a storage error.
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        CrosspostError::Storage {
            source: Box::new(err),
        }
    }

    /// Returns true if this error came from the durable store.
    pub fn is_storage(&self) -> bool {
        matches!(self, CrosspostError::Storage { .. })
    }
}
