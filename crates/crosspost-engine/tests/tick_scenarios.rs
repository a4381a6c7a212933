// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tick tests against a temporary SQLite store and mock adapters.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use crosspost_config::model::StorageConfig;
use crosspost_core::{
    Failure, FailureKind, Item, MediaConstraints, PendingStore, RawItem, RawVideo, SeenStore,
    Stage,
};
use crosspost_engine::{
    Composer, DiscoveryBridge, DiscoverySettings, EngineSettings, Orchestrator, TickOutcome,
};
use crosspost_storage::SqliteStorage;
use crosspost_test_utils::{MockMediaPipeline, MockPublisher, TestHarness};

const MAX_ATTEMPTS: u32 = 3;

fn settings(harness: &TestHarness) -> EngineSettings {
    EngineSettings {
        max_attempts: MAX_ATTEMPTS,
        constraints: MediaConstraints {
            max_duration_secs: 140,
            max_count: 4,
        },
        scratch_root: harness.scratch_root.clone(),
        media_timeout: Duration::from_secs(5),
        publish_timeout: Duration::from_secs(5),
    }
}

fn orchestrator_with(harness: &TestHarness, settings: EngineSettings) -> Orchestrator {
    let discovery = DiscoveryBridge::new(
        Some(harness.source.clone()),
        Composer::new(280, 4),
        DiscoverySettings {
            selectors: vec!["Overwatch".to_string()],
            fetch_limit: 25,
            max_batches: 2,
            fetch_timeout: Duration::from_secs(5),
        },
    );
    Orchestrator::new(
        harness.store.clone(),
        discovery,
        harness.media.clone(),
        harness.publisher.clone(),
        settings,
    )
}

fn orchestrator(harness: &TestHarness) -> Orchestrator {
    orchestrator_with(harness, settings(harness))
}

fn text_item(id: &str, title: &str) -> RawItem {
    RawItem {
        id: id.to_string(),
        title: title.to_string(),
        body: String::new(),
        permalink: None,
        stickied: false,
        images: vec![],
        video: None,
    }
}

fn transient() -> Failure {
    Failure::new(Stage::Publish, FailureKind::TransientIo, "connection reset by peer")
}

// 1. A text-only item is published and resolved.
#[tokio::test]
async fn text_item_is_published_and_marked_seen() {
    let harness = TestHarness::new().await;
    harness.source.push_batch(vec![text_item("A", "hello")]).await;
    let engine = orchestrator(&harness);

    let outcome = engine.tick().await.unwrap();
    assert_eq!(
        outcome,
        TickOutcome::Published {
            item_id: "A".into(),
            remote_id: "remote-1".into()
        }
    );
    assert!(harness.is_seen("A").await);
    assert!(harness.pending().await.is_empty());
    assert_eq!(harness.publisher.texts().await, vec!["hello"]);
}

// 2. A video over the duration limit is rejected before publishing.
#[tokio::test]
async fn overlong_video_is_rejected_without_publishing() {
    let harness = TestHarness::new().await;
    let mut raw = text_item("B", "long clip");
    raw.video = Some(RawVideo {
        url: "https://v.example/B/DASH_720.mp4".into(),
        duration_secs: Some(600),
    });
    harness.source.push_batch(vec![raw]).await;
    let engine = orchestrator(&harness);

    let outcome = engine.tick().await.unwrap();
    assert_eq!(outcome.to_string(), "rejected(media-too-long)");
    assert!(harness.is_seen("B").await);
    assert!(harness.pending().await.is_empty());
    assert_eq!(harness.publisher.call_count().await, 0);
    assert!(harness.scratch_leftovers().is_empty());
}

// 3. A transient publish failure is retried on the next tick before any discovery.
#[tokio::test]
async fn transient_failure_is_retried_next_tick() {
    let harness = TestHarness::new().await;
    let mut raw = text_item("C", "with image");
    raw.images = vec!["https://i.example/C.jpg".into()];
    harness
        .source
        .push_batch(vec![raw, text_item("other", "next in line")])
        .await;
    harness.publisher.push_failure(transient()).await;
    let engine = orchestrator(&harness);

    let first = engine.tick().await.unwrap();
    assert_eq!(first.to_string(), "retry-scheduled(attempt 1/3)");
    let pending = harness.pending().await;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].item_id, "C");
    assert_eq!(pending[0].attempts, 1);
    assert!(!harness.is_seen("C").await);

    let second = engine.tick().await.unwrap();
    assert_eq!(second.item_id(), Some("C"));
    assert!(matches!(second, TickOutcome::Published { .. }));
    assert!(harness.is_seen("C").await);
    assert!(harness.pending().await.is_empty());
    assert!(!harness.is_seen("other").await);
    assert_eq!(harness.source.call_count().await, 1);
}

// 4. Three retryable failures stall the entry; it is never selected again.
#[tokio::test]
async fn exhausted_entry_stalls_and_is_not_selected() {
    let harness = TestHarness::new().await;
    harness.source.push_batch(vec![text_item("D", "doomed")]).await;
    for _ in 0..3 {
        harness.publisher.push_failure(transient()).await;
    }
    let engine = orchestrator(&harness);

    assert_eq!(engine.tick().await.unwrap().to_string(), "retry-scheduled(attempt 1/3)");
    assert_eq!(engine.tick().await.unwrap().to_string(), "retry-scheduled(attempt 2/3)");
    assert_eq!(engine.tick().await.unwrap().to_string(), "stalled(attempt 3/3)");

    let pending = harness.pending().await;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].attempts, 3);
    assert!(harness.store.list_retryable(3).await.unwrap().is_empty());
    assert!(!harness.is_seen("D").await);

    // Nothing left to do; the stalled entry waits for an operator.
    assert_eq!(engine.tick().await.unwrap(), TickOutcome::Idle);
    assert_eq!(harness.publisher.call_count().await, 3);
    assert_eq!(harness.pending().await[0].attempts, 3);
}

#[tokio::test]
async fn stalled_entry_survives_a_full_single_slot_queue() {
    let harness = TestHarness::builder().with_capacity(1).build().await.unwrap();
    harness
        .source
        .push_batch(vec![text_item("D", "doomed"), text_item("X", "next")])
        .await;
    for _ in 0..4 {
        harness.publisher.push_failure(transient()).await;
    }
    let engine = orchestrator(&harness);

    for _ in 0..3 {
        engine.tick().await.unwrap();
    }
    // The queue is full of a stalled entry; X still gets queued beside it.
    assert_eq!(engine.tick().await.unwrap().to_string(), "retry-scheduled(attempt 1/3)");
    let stalled = harness.store.list_stalled(MAX_ATTEMPTS).await.unwrap();
    assert_eq!(stalled.len(), 1);
    assert_eq!(stalled[0].item_id, "D");
    assert_eq!(harness.pending().await.len(), 2);

    assert!(matches!(engine.tick().await.unwrap(), TickOutcome::Published { .. }));
    assert_eq!(engine.tick().await.unwrap(), TickOutcome::Idle);

    let doomed_calls = harness
        .publisher
        .texts()
        .await
        .into_iter()
        .filter(|text| text == "doomed")
        .count();
    assert_eq!(doomed_calls, MAX_ATTEMPTS as usize);
    assert!(!harness.is_seen("D").await);
    assert_eq!(harness.store.list_stalled(MAX_ATTEMPTS).await.unwrap()[0].attempts, 3);
}

// 5. An empty payload is rejected locally.
#[tokio::test]
async fn empty_payload_is_rejected_without_publisher() {
    let harness = TestHarness::new().await;
    let empty = Item::new("E", "   ", vec![]).unwrap();
    harness.store.upsert_pending(&empty, Utc::now(), MAX_ATTEMPTS).await.unwrap();
    let engine = orchestrator(&harness);

    let outcome = engine.tick().await.unwrap();
    assert_eq!(outcome.to_string(), "rejected(empty-payload)");
    assert!(harness.is_seen("E").await);
    assert!(harness.pending().await.is_empty());
    assert_eq!(harness.publisher.call_count().await, 0);
}

#[tokio::test]
async fn fatal_publish_status_marks_seen() {
    let harness = TestHarness::new().await;
    harness.source.push_batch(vec![text_item("F", "forbidden")]).await;
    harness
        .publisher
        .push_failure(Failure::http(Stage::Publish, 403, "You are not permitted"))
        .await;
    let engine = orchestrator(&harness);

    assert_eq!(
        engine.tick().await.unwrap().to_string(),
        "rejected(authorization-denied)"
    );
    assert!(harness.is_seen("F").await);
    assert!(harness.pending().await.is_empty());
}

#[tokio::test]
async fn fatal_failure_on_retry_removes_pending_entry() {
    let harness = TestHarness::new().await;
    harness.source.push_batch(vec![text_item("G", "gone")]).await;
    harness.publisher.push_failure(transient()).await;
    harness
        .publisher
        .push_failure(Failure::new(Stage::Publish, FailureKind::NotFound, "gone"))
        .await;
    let engine = orchestrator(&harness);

    engine.tick().await.unwrap();
    assert_eq!(harness.pending().await.len(), 1);
    assert_eq!(engine.tick().await.unwrap().to_string(), "rejected(not-found)");
    assert!(harness.pending().await.is_empty());
    assert!(harness.is_seen("G").await);
}

#[tokio::test]
async fn one_item_per_tick() {
    let harness = TestHarness::new().await;
    harness
        .source
        .push_batch(vec![text_item("1", "one"), text_item("2", "two")])
        .await;
    let engine = orchestrator(&harness);

    engine.tick().await.unwrap();
    assert_eq!(harness.publisher.call_count().await, 1);
    engine.tick().await.unwrap();
    assert_eq!(harness.publisher.texts().await, vec!["one", "two"]);
    assert_eq!(engine.tick().await.unwrap(), TickOutcome::Idle);
}

#[tokio::test]
async fn scratch_files_exist_during_publish_and_vanish_after() {
    let harness = TestHarness::new().await;
    let mut ok = text_item("img-ok", "gallery");
    ok.images = vec!["https://i.example/1.jpg".into(), "https://i.example/2.jpg".into()];
    let mut bad = text_item("img-bad", "gallery again");
    bad.images = vec!["https://i.example/3.jpg".into()];
    harness.source.push_batch(vec![ok, bad]).await;
    harness.publisher.push_success("r-ok").await;
    harness.publisher.push_failure(transient()).await;
    let engine = orchestrator(&harness);

    engine.tick().await.unwrap();
    engine.tick().await.unwrap();

    let calls = harness.publisher.calls().await;
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].media.len(), 2);
    assert!(calls.iter().all(|c| c.media_present));

    let written = harness.media.written_paths().await;
    assert_eq!(written.len(), 3);
    assert!(written.iter().all(|p| !p.exists()));
    assert!(harness.scratch_leftovers().is_empty());
}

#[tokio::test]
async fn media_failure_is_classified_like_publish_failure() {
    let harness = TestHarness::new().await;
    let mut raw = text_item("M", "flaky cdn");
    raw.images = vec!["https://i.example/m.jpg".into()];
    harness.source.push_batch(vec![raw]).await;
    harness
        .media
        .fail_next(
            "https://i.example/m.jpg",
            Failure::http(Stage::Materialize, 502, "bad gateway"),
        )
        .await;
    let engine = orchestrator(&harness);

    assert_eq!(engine.tick().await.unwrap().to_string(), "retry-scheduled(attempt 1/3)");
    assert_eq!(harness.publisher.call_count().await, 0);
    assert!(matches!(engine.tick().await.unwrap(), TickOutcome::Published { .. }));
    assert_eq!(harness.media.call_count().await, 2);
}

#[tokio::test]
async fn rate_limit_backoff_is_carried_in_outcome() {
    let harness = TestHarness::new().await;
    harness.source.push_batch(vec![text_item("R", "busy")]).await;
    harness
        .publisher
        .push_failure(Failure::new(
            Stage::Publish,
            FailureKind::RateLimited {
                retry_after: Some(Duration::from_secs(900)),
            },
            "too many requests",
        ))
        .await;
    let engine = orchestrator(&harness);

    match engine.tick().await.unwrap() {
        TickOutcome::RetryScheduled {
            retry_after,
            reason,
            ..
        } => {
            assert_eq!(retry_after, Some(Duration::from_secs(900)));
            assert_eq!(reason, "rate-limited");
        }
        other => panic!("expected retry, got {other:?}"),
    }
}

#[tokio::test]
async fn publish_timeout_is_retryable() {
    let harness = TestHarness::builder()
        .with_publisher(MockPublisher::new().with_delay(Duration::from_millis(300)))
        .build()
        .await
        .unwrap();
    harness.source.push_batch(vec![text_item("T", "slow")]).await;
    let mut settings = settings(&harness);
    settings.publish_timeout = Duration::from_millis(20);
    let engine = orchestrator_with(&harness, settings);

    match engine.tick().await.unwrap() {
        TickOutcome::RetryScheduled { reason, attempt, .. } => {
            assert_eq!(reason, "timeout");
            assert_eq!(attempt, 1);
        }
        other => panic!("expected retry, got {other:?}"),
    }
    assert!(!harness.is_seen("T").await);
}

#[tokio::test]
async fn media_timeout_is_retryable_and_cleans_scratch() {
    let harness = TestHarness::builder()
        .with_media(MockMediaPipeline::new().with_delay(Duration::from_millis(300)))
        .build()
        .await
        .unwrap();
    let mut raw = text_item("MT", "slow cdn");
    raw.images = vec!["https://i.example/mt.jpg".into()];
    harness.source.push_batch(vec![raw]).await;
    let mut settings = settings(&harness);
    settings.media_timeout = Duration::from_millis(20);
    let engine = orchestrator_with(&harness, settings);

    match engine.tick().await.unwrap() {
        TickOutcome::RetryScheduled { reason, attempt, .. } => {
            assert_eq!(reason, "timeout");
            assert_eq!(attempt, 1);
        }
        other => panic!("expected retry, got {other:?}"),
    }
    assert_eq!(harness.publisher.call_count().await, 0);
    let written = harness.media.written_paths().await;
    assert_eq!(written.len(), 1);
    assert!(!written[0].exists());
    assert!(harness.scratch_leftovers().is_empty());
}

#[tokio::test]
async fn cancelled_tick_removes_scratch_and_records_nothing() {
    let harness = TestHarness::builder()
        .with_publisher(MockPublisher::new().with_delay(Duration::from_millis(500)))
        .build()
        .await
        .unwrap();
    let mut raw = text_item("CX", "interrupted");
    raw.images = vec!["https://i.example/cx.jpg".into()];
    harness.source.push_batch(vec![raw]).await;
    let engine = orchestrator(&harness);

    // Dropped while the publisher is in flight, as on shutdown.
    let interrupted = tokio::time::timeout(Duration::from_millis(50), engine.tick()).await;
    assert!(interrupted.is_err());

    let calls = harness.publisher.calls().await;
    assert_eq!(calls.len(), 1);
    assert!(calls[0].media_present);
    assert!(harness.scratch_leftovers().is_empty());
    assert!(!harness.is_seen("CX").await);
    assert!(harness.pending().await.is_empty());
}

#[test]
fn stalled_gauge_follows_every_tick() {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    metrics::with_local_recorder(&recorder, || {
        runtime.block_on(async {
            let harness = TestHarness::new().await;
            let stuck = Item::new("Z", "stuck", vec![]).unwrap();
            for _ in 0..MAX_ATTEMPTS {
                harness
                    .store
                    .upsert_pending(&stuck, Utc::now(), MAX_ATTEMPTS)
                    .await
                    .unwrap();
            }
            harness.source.push_batch(vec![text_item("A", "hello")]).await;
            let engine = orchestrator(&harness);

            assert!(matches!(engine.tick().await.unwrap(), TickOutcome::Published { .. }));
            assert!(handle.render().contains("crosspost_pending_stalled 1"));

            harness.store.clear_stalled(MAX_ATTEMPTS).await.unwrap();
            assert_eq!(engine.tick().await.unwrap(), TickOutcome::Idle);
            assert!(handle.render().contains("crosspost_pending_stalled 0"));
        });
    });
}

#[tokio::test]
async fn resolved_pending_entry_is_purged_not_republished() {
    let harness = TestHarness::new().await;
    let item = Item::new("P", "already out", vec![]).unwrap();
    harness.store.upsert_pending(&item, Utc::now(), MAX_ATTEMPTS).await.unwrap();
    harness.store.mark_seen("P").await.unwrap();
    let engine = orchestrator(&harness);

    assert_eq!(engine.tick().await.unwrap(), TickOutcome::Idle);
    assert!(harness.pending().await.is_empty());
    assert_eq!(harness.publisher.call_count().await, 0);
}

#[tokio::test]
async fn source_failure_reports_discovery_failed() {
    let harness = TestHarness::new().await;
    harness
        .source
        .push_failure(Failure::http(Stage::Fetch, 503, "upstream down"))
        .await;
    let engine = orchestrator(&harness);

    let outcome = engine.tick().await.unwrap();
    assert!(outcome.to_string().starts_with("discovery-failed("));
    assert!(harness.pending().await.is_empty());
}

#[tokio::test]
async fn store_failure_aborts_tick() {
    let harness = TestHarness::new().await;
    let dir = tempfile::tempdir().unwrap();
    // Never initialized: every store call fails.
    let broken = Arc::new(SqliteStorage::new(
        StorageConfig {
            database_path: dir.path().join("x.db").to_string_lossy().to_string(),
            wal_mode: true,
        },
        16,
    ));
    let engine = Orchestrator::new(
        broken,
        DiscoveryBridge::new(
            Some(harness.source.clone()),
            Composer::new(280, 4),
            DiscoverySettings {
                selectors: vec!["s".into()],
                fetch_limit: 5,
                max_batches: 2,
                fetch_timeout: Duration::from_secs(1),
            },
        ),
        harness.media.clone(),
        harness.publisher.clone(),
        settings(&harness),
    );

    let err = engine.tick().await.unwrap_err();
    assert!(err.is_storage());
    assert_eq!(harness.publisher.call_count().await, 0);
}

#[tokio::test]
async fn seen_items_are_never_republished_across_refetches() {
    let harness = TestHarness::new().await;
    harness.source.push_batch(vec![text_item("S", "once")]).await;
    harness.source.push_batch(vec![text_item("S", "once")]).await;
    let engine = orchestrator(&harness);

    assert!(matches!(engine.tick().await.unwrap(), TickOutcome::Published { .. }));
    assert_eq!(engine.tick().await.unwrap(), TickOutcome::Idle);
    assert_eq!(harness.publisher.call_count().await, 1);
    assert_eq!(harness.store.seen_count().await.unwrap(), 1);
}
