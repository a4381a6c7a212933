// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base adapter trait that all external adapters implement.

use async_trait::async_trait;

use crate::types::{AdapterType, HealthStatus};

/// The base trait for sources, media pipelines, and publishers.
#[async_trait]
pub trait Adapter: Send + Sync + 'static {
    /// Returns the human-readable name of this adapter instance.
    fn name(&self) -> &str;

    /// Returns the role this adapter plays.
    fn adapter_type(&self) -> AdapterType;

    /// Performs a health check and returns the adapter's current status.
    async fn health_check(&self) -> HealthStatus {
        HealthStatus::Healthy
    }
}
