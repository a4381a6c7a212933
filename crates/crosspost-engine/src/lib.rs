// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Publish queue and retry engine for crosspost.
//!
//! - [`classifier`]: pure retry-versus-fatal decisions
//! - [`compose`]: raw source items to publishable items
//! - [`discovery`]: the bridge that finds the next unseen item
//! - [`orchestrator`]: the one-item-per-tick state machine
//! - [`outcome`]: the structured tick result

pub mod classifier;
pub mod compose;
pub mod discovery;
pub mod orchestrator;
pub mod outcome;
pub mod recording;

pub use classifier::{classify, classify_attempt, Classification, Disposition};
pub use compose::Composer;
pub use discovery::{Discovery, DiscoveryBridge, DiscoverySettings};
pub use orchestrator::{EngineSettings, Orchestrator};
pub use outcome::TickOutcome;
