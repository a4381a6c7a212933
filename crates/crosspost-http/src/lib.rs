// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP adapters for crosspost.
//!
//! [`JsonFeedSource`] fetches candidate listings, [`HttpMediaPipeline`]
//! downloads attachments into the tick's scratch directory, and both route
//! their requests through a shared [`ProxyPool`].

pub mod egress;
pub mod feed;
pub mod media;
mod response;

pub use egress::{EgressRoute, ProxyPool};
pub use feed::JsonFeedSource;
pub use media::HttpMediaPipeline;
