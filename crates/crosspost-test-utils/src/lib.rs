// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for crosspost integration tests.
//!
//! Provides scripted mock adapters and a harness backed by a temporary
//! SQLite store, for fast deterministic tests without network access.
//!
//! # Components
//!
//! - [`MockSource`] - content source returning pre-configured batches
//! - [`MockMediaPipeline`] - writes placeholder files into the scratch directory
//! - [`MockPublisher`] - records publish calls and replays scripted results
//! - [`TestHarness`] - temporary store plus one of each mock

pub mod harness;
pub mod mock_media;
pub mod mock_publisher;
pub mod mock_source;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_media::{MaterializeCall, MockMediaPipeline};
pub use mock_publisher::{MockPublisher, PublishCall};
pub use mock_source::MockSource;
