// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `crosspost tick` and `crosspost run`.

use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crosspost_core::CrosspostError;
use crosspost_engine::{Orchestrator, TickOutcome};

/// One-line rendering of a tick result, store errors included.
pub fn outcome_line(result: &Result<TickOutcome, CrosspostError>) -> String {
    match result {
        Ok(outcome) => outcome.to_string(),
        Err(e) => format!("store-error({})", e.to_string().replace('\n', " ")),
    }
}

/// Runs exactly one tick and prints its outcome line.
pub async fn run_tick(orchestrator: &Orchestrator) -> Result<TickOutcome, CrosspostError> {
    let result = orchestrator.tick().await;
    println!("{}", outcome_line(&result));
    result
}

/// Ticks every `interval` until `cancel` fires. Returns the number of ticks run.
///
/// Cancellation is only observed between ticks. Store errors are logged and
/// the loop carries on; the failed tick recorded nothing.
pub async fn run_loop(
    orchestrator: &Orchestrator,
    interval: Duration,
    cancel: CancellationToken,
) -> u64 {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut ticks = 0;

    info!(interval_secs = interval.as_secs(), "scheduler started");
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let result = orchestrator.tick().await;
        ticks += 1;
        match &result {
            Ok(outcome) => info!(tick = ticks, outcome = %outcome, "tick finished"),
            Err(e) => error!(tick = ticks, error = %e, "tick aborted by store error"),
        }
    }
    info!(ticks, "scheduler stopped");
    ticks
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crosspost_config::CrosspostConfig;
    use crosspost_core::{QueueStore, RawItem};
    use crosspost_engine::{Composer, DiscoveryBridge, DiscoverySettings, EngineSettings};
    use crosspost_test_utils::TestHarness;

    fn raw(id: &str) -> RawItem {
        RawItem {
            id: id.to_string(),
            title: format!("post {id}"),
            body: String::new(),
            permalink: None,
            stickied: false,
            images: Vec::new(),
            video: None,
        }
    }

    async fn orchestrator(items: Vec<RawItem>) -> (TestHarness, Orchestrator) {
        let harness = TestHarness::new().await;
        harness.source.push_batch(items).await;

        let mut config = CrosspostConfig::default();
        config.source.selectors = vec!["test".to_string()];
        let discovery = DiscoveryBridge::new(
            Some(harness.source.clone()),
            Composer::from_config(&config),
            DiscoverySettings::from_config(&config),
        );
        let mut settings = EngineSettings::from_config(&config);
        settings.scratch_root = harness.scratch_root.clone();
        let store: Arc<dyn QueueStore> = harness.store.clone();
        let orchestrator = Orchestrator::new(
            store,
            discovery,
            harness.media.clone(),
            harness.publisher.clone(),
            settings,
        );
        (harness, orchestrator)
    }

    #[test]
    fn store_errors_render_as_one_line() {
        let err = CrosspostError::Storage {
            source: "disk I/O error".into(),
        };
        let line = outcome_line(&Err(err));
        assert!(line.starts_with("store-error("));
        assert!(!line.contains('\n'));
    }

    #[tokio::test]
    async fn single_tick_publishes_one_item() {
        let (harness, orchestrator) = orchestrator(vec![raw("a"), raw("b")]).await;
        let outcome = run_tick(&orchestrator).await.unwrap();
        assert!(matches!(outcome, TickOutcome::Published { .. }));
        assert_eq!(harness.publisher.call_count().await, 1);
    }

    #[tokio::test]
    async fn cancelled_loop_runs_no_ticks() {
        let (harness, orchestrator) = orchestrator(vec![raw("a")]).await;
        let cancel = CancellationToken::new();
        cancel.cancel();
        let ticks = run_loop(&orchestrator, Duration::from_millis(10), cancel).await;
        assert_eq!(ticks, 0);
        assert_eq!(harness.publisher.call_count().await, 0);
    }

    #[tokio::test]
    async fn loop_ticks_until_cancelled() {
        let (harness, orchestrator) = orchestrator(vec![raw("a"), raw("b"), raw("c")]).await;
        let cancel = CancellationToken::new();
        let stopper = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            stopper.cancel();
        });

        let ticks = run_loop(&orchestrator, Duration::from_millis(20), cancel).await;
        assert!(ticks >= 3);
        assert_eq!(harness.publisher.call_count().await, 3);
        assert!(harness.is_seen("c").await);
    }
}
