//! Start/stop lifecycle of the background listening loop.

use std::sync::Arc;
use std::time::Duration;

use recapture_common::{ListeningConfig, Severity};
use recapture_listening::testing::{record, trend, MemoryStore, MockConnector};
use recapture_listening::traits::SourceConnector;
use recapture_listening::{ListenerState, ListeningDeps, ListeningScheduler};

fn fast_config() -> ListeningConfig {
    ListeningConfig {
        poll_interval: Duration::from_millis(20),
        ..ListeningConfig::default()
    }
}

fn scheduler(store: &Arc<MemoryStore>, conn: &Arc<MockConnector>) -> ListeningScheduler {
    ListeningScheduler::new(
        ListeningDeps::builder()
            .store(store.clone())
            .connectors(vec![conn.clone() as Arc<dyn SourceConnector>])
            .config(fast_config())
            .build(),
    )
}

async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

#[tokio::test]
async fn start_and_stop_are_idempotent() {
    let store = Arc::new(MemoryStore::new());
    let conn = Arc::new(MockConnector::new("reddit", vec![]));
    let scheduler = scheduler(&store, &conn);

    assert_eq!(scheduler.state().await, ListenerState::Stopped);
    scheduler.stop().await;

    scheduler.start().await.unwrap();
    scheduler.start().await.unwrap();
    assert!(scheduler.is_running().await);

    scheduler.stop().await;
    scheduler.stop().await;
    assert_eq!(scheduler.state().await, ListenerState::Stopped);
}

#[tokio::test]
async fn running_loop_polls_repeatedly() {
    let store = Arc::new(MemoryStore::new());
    let conn = Arc::new(MockConnector::new("reddit", vec![record("reddit_1", "hi")]));
    let scheduler = scheduler(&store, &conn);

    scheduler.start().await.unwrap();
    assert!(eventually(|| conn.fetch_count() >= 3).await);
    scheduler.stop().await;

    let status = scheduler.status().await;
    assert_eq!(status.state, ListenerState::Stopped);
    assert!(status.cycles_completed >= 2);
    assert_eq!(status.totals.results_persisted, 1);
    assert_eq!(store.result_count(), 1);
}

#[tokio::test]
async fn no_writes_after_stop_returns() {
    let store = Arc::new(MemoryStore::new());
    let conn = Arc::new(
        MockConnector::new("reddit", vec![record("reddit_1", "a"), record("reddit_2", "b")])
            .with_delay(Duration::from_millis(200)),
    );
    let scheduler = scheduler(&store, &conn);

    scheduler.start().await.unwrap();
    assert!(eventually(|| conn.fetch_count() >= 1).await);
    scheduler.stop().await;

    let attempts = store.write_attempts();
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(store.write_attempts(), attempts);
    assert_eq!(attempts, 0);

    let status = scheduler.status().await;
    assert!(status.last_cycle.is_some_and(|c| c.cancelled));
}

#[tokio::test]
async fn trends_are_snapshotted_at_start() {
    let store = Arc::new(MemoryStore::new());
    let conn = Arc::new(MockConnector::new("reddit", vec![record("reddit_1", "burn it down")]));
    let scheduler = scheduler(&store, &conn);

    scheduler.start().await.unwrap();
    assert!(eventually(|| store.result("reddit_1").is_some()).await);

    store.add_trend(trend("Accelerationism", Severity::High, &["burn it down"]));
    conn.set_records(vec![record("reddit_2", "burn it down")]);
    assert!(eventually(|| store.result("reddit_2").is_some()).await);
    assert!(store.result("reddit_2").unwrap().matched_trend_id.is_none());

    scheduler.stop().await;
    conn.set_records(vec![record("reddit_3", "burn it down")]);
    scheduler.start().await.unwrap();
    assert_eq!(scheduler.status().await.trends_loaded, 1);
    assert!(eventually(|| store.result("reddit_3").is_some()).await);
    scheduler.stop().await;

    let matched = store.result("reddit_3").unwrap();
    assert_eq!(matched.matched_trend_topic.as_deref(), Some("Accelerationism"));
    assert_eq!(matched.severity, Severity::High);
}

#[tokio::test]
async fn start_fails_when_trends_cannot_load() {
    let store = Arc::new(MemoryStore::new());
    store.fail_reads(true);
    let conn = Arc::new(MockConnector::new("reddit", vec![]));
    let scheduler = scheduler(&store, &conn);

    assert!(scheduler.start().await.is_err());
    assert_eq!(scheduler.state().await, ListenerState::Stopped);
    assert_eq!(conn.fetch_count(), 0);
}

#[tokio::test]
async fn zero_interval_loop_still_stops() {
    let store = Arc::new(MemoryStore::new());
    let scheduler = ListeningScheduler::new(
        ListeningDeps::builder()
            .store(store.clone())
            .config(ListeningConfig {
                poll_interval: Duration::ZERO,
                ..ListeningConfig::default()
            })
            .build(),
    );

    scheduler.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    tokio::time::timeout(Duration::from_secs(3), scheduler.stop())
        .await
        .expect("stop() must return while cycles are back to back");
    assert_eq!(scheduler.state().await, ListenerState::Stopped);
    assert!(scheduler.status().await.cycles_completed > 0);
}

#[tokio::test]
async fn overrunning_cycles_run_back_to_back_without_overlap() {
    let store = Arc::new(MemoryStore::new());
    let delay = Duration::from_millis(150);
    let interval = Duration::from_millis(100);
    let conn = Arc::new(MockConnector::new("reddit", vec![]).with_delay(delay));
    let scheduler = ListeningScheduler::new(
        ListeningDeps::builder()
            .store(store.clone())
            .connectors(vec![conn.clone() as Arc<dyn SourceConnector>])
            .config(ListeningConfig {
                poll_interval: interval,
                ..ListeningConfig::default()
            })
            .build(),
    );

    scheduler.start().await.unwrap();
    assert!(eventually(|| conn.fetch_count() >= 4).await);
    scheduler.stop().await;

    assert_eq!(conn.max_in_flight(), 1);

    let starts = conn.fetch_starts();
    for pair in starts.windows(2) {
        let gap = pair[1] - pair[0];
        assert!(gap >= delay, "next cycle began before the previous one finished: {gap:?}");
        // Sleeping another interval after an overrun would put the gap near 250ms.
        assert!(gap < delay + Duration::from_millis(90), "idle gap after overrun: {gap:?}");
    }
}
