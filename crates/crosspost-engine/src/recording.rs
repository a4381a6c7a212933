// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade: without an installed recorder every call is a
//! no-op, so the engine never depends on an exporter being present.

use metrics::{describe_counter, describe_gauge, describe_histogram};

/// Register all crosspost metric descriptions.
pub fn register_metrics() {
    describe_counter!("crosspost_ticks_total", "Ticks completed, by outcome");
    describe_gauge!(
        "crosspost_pending_stalled",
        "Pending entries that used up their attempts"
    );
    describe_histogram!(
        "crosspost_publish_latency_seconds",
        "Time from starting an item to the publisher accepting it"
    );
}

pub fn record_tick(outcome: &'static str) {
    metrics::counter!("crosspost_ticks_total", "outcome" => outcome).increment(1);
}

pub fn set_pending_stalled(count: usize) {
    metrics::gauge!("crosspost_pending_stalled").set(count as f64);
}

pub fn record_publish_latency(seconds: f64) {
    metrics::histogram!("crosspost_publish_latency_seconds").record(seconds);
}
