// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for crosspost.
//!
//! Provides the domain types, the failure taxonomy, and the trait seams
//! between the publish engine, its durable store, and the external source,
//! media, and publisher adapters.

pub mod error;
pub mod failure;
pub mod traits;
pub mod types;

pub use error::CrosspostError;
pub use failure::{Failure, FailureKind, Stage};
pub use types::{
    AdapterType, Batch, HealthStatus, Item, LocalMedia, MediaConstraints, MediaKind, MediaRef,
    PendingEntry, PublishReceipt, QueueStats, RawItem, RawVideo, SeenRecord, MAX_IMAGES,
};

pub use traits::{
    Adapter, BatchStore, ContentSource, MediaPipeline, PendingStore, Publisher, QueueStore,
    SeenStore,
};
