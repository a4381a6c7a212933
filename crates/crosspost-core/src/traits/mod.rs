// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams between the publish engine and its collaborators.
//!
//! External adapters extend the [`Adapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod media;
pub mod publisher;
pub mod source;
pub mod storage;

pub use adapter::Adapter;
pub use media::MediaPipeline;
pub use publisher::Publisher;
pub use source::ContentSource;
pub use storage::{BatchStore, PendingStore, QueueStore, SeenStore};
