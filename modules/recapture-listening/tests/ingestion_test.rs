//! One-cycle ingestion behavior driven through `ListeningPipeline::run_cycle`
//! against the in-memory store.

use std::sync::Arc;

use recapture_common::{ListeningConfig, Severity, TriageStatus};
use recapture_listening::pipeline::matcher::TrendMatcher;
use recapture_listening::pipeline::scheduler::{CancelSignal, ListeningPipeline};
use recapture_listening::testing::{
    record, trend, FailingConnector, MemoryStore, MockClassifier, MockConnector,
    PanickingConnector,
};
use recapture_listening::traits::{SourceConnector, TextClassifier};
use recapture_listening::ListeningDeps;

fn pipeline(
    store: &Arc<MemoryStore>,
    connectors: Vec<Arc<dyn SourceConnector>>,
    classifier: Option<Arc<dyn TextClassifier>>,
) -> ListeningPipeline {
    ListeningPipeline::new(
        ListeningDeps::builder()
            .store(store.clone())
            .connectors(connectors)
            .classifier(classifier)
            .build(),
    )
}

#[tokio::test]
async fn repeated_cycles_persist_each_record_once() {
    let store = Arc::new(MemoryStore::new());
    let conn = Arc::new(MockConnector::new(
        "reddit",
        vec![record("reddit_1", "hello"), record("reddit_2", "world")],
    ));
    let pipeline = pipeline(&store, vec![conn.clone() as Arc<dyn SourceConnector>], None);
    let matcher = TrendMatcher::new(vec![]);

    let first = pipeline.run_cycle(&matcher, &CancelSignal::never()).await;
    assert_eq!(first.results_persisted, 2);
    assert_eq!(first.duplicates_skipped, 0);

    let second = pipeline.run_cycle(&matcher, &CancelSignal::never()).await;
    assert_eq!(second.results_persisted, 0);
    assert_eq!(second.duplicates_skipped, 2);

    assert_eq!(store.result_count(), 2);
    assert_eq!(conn.fetch_count(), 2);
}

#[tokio::test]
async fn matched_record_carries_trend_and_severity() {
    let store = Arc::new(MemoryStore::new());
    let conn = Arc::new(MockConnector::new(
        "reddit",
        vec![
            record("reddit_1", "We should Burn It Down tonight"),
            record("reddit_2", "nice weather"),
        ],
    ));
    let accel = trend("Accelerationism", Severity::High, &["burn it down"]);
    let matcher = TrendMatcher::new(vec![accel.clone()]);
    let pipeline = pipeline(&store, vec![conn as Arc<dyn SourceConnector>], None);

    pipeline.run_cycle(&matcher, &CancelSignal::never()).await;

    let hit = store.result("reddit_1").unwrap();
    assert_eq!(hit.matched_trend_id, Some(accel.id));
    assert_eq!(hit.matched_trend_topic.as_deref(), Some("Accelerationism"));
    assert_eq!(hit.severity, Severity::High);

    let miss = store.result("reddit_2").unwrap();
    assert_eq!(miss.matched_trend_id, None);
    assert_eq!(miss.severity, Severity::Low);
}

#[tokio::test]
async fn long_content_is_stored_as_preview() {
    let store = Arc::new(MemoryStore::new());
    let long = "x".repeat(800);
    let conn = Arc::new(MockConnector::new("reddit", vec![record("reddit_1", &long)]));
    let pipeline = pipeline(&store, vec![conn as Arc<dyn SourceConnector>], None);

    pipeline
        .run_cycle(&TrendMatcher::new(vec![]), &CancelSignal::never())
        .await;

    let stored = store.result("reddit_1").unwrap();
    assert_eq!(stored.content.chars().count(), 503);
    assert!(stored.content.ends_with("..."));
}

#[tokio::test]
async fn failing_connector_does_not_block_others() {
    let store = Arc::new(MemoryStore::new());
    let good = Arc::new(MockConnector::new("reddit", vec![record("reddit_1", "hi")]));
    let pipeline = pipeline(
        &store,
        vec![
            Arc::new(FailingConnector::new("4chan")) as Arc<dyn SourceConnector>,
            good as Arc<dyn SourceConnector>,
        ],
        None,
    );

    let report = pipeline
        .run_cycle(&TrendMatcher::new(vec![]), &CancelSignal::never())
        .await;

    assert_eq!(report.connectors_polled, 2);
    assert_eq!(report.connector_failures.len(), 1);
    assert_eq!(report.connector_failures[0].connector, "4chan");
    assert_eq!(report.results_persisted, 1);
    assert!(store.result("reddit_1").is_some());
}

#[tokio::test]
async fn panicking_connector_is_contained() {
    let store = Arc::new(MemoryStore::new());
    let good = Arc::new(MockConnector::new("reddit", vec![record("reddit_1", "hi")]));
    let pipeline = pipeline(
        &store,
        vec![
            Arc::new(PanickingConnector) as Arc<dyn SourceConnector>,
            good as Arc<dyn SourceConnector>,
        ],
        None,
    );

    let report = pipeline
        .run_cycle(&TrendMatcher::new(vec![]), &CancelSignal::never())
        .await;

    assert_eq!(report.connector_failures.len(), 1);
    assert_eq!(report.connector_failures[0].connector, "panicking");
    assert_eq!(store.result_count(), 1);
}

#[tokio::test]
async fn failed_write_is_skipped_then_retried_next_cycle() {
    let store = Arc::new(MemoryStore::new());
    store.fail_write_for("reddit_2");
    let conn = Arc::new(MockConnector::new(
        "reddit",
        vec![
            record("reddit_1", "a"),
            record("reddit_2", "b"),
            record("reddit_3", "c"),
        ],
    ));
    let pipeline = pipeline(&store, vec![conn as Arc<dyn SourceConnector>], None);
    let matcher = TrendMatcher::new(vec![]);

    let first = pipeline.run_cycle(&matcher, &CancelSignal::never()).await;
    assert_eq!(first.results_persisted, 2);
    assert_eq!(first.record_failures.len(), 1);
    assert_eq!(first.record_failures[0].external_id, "reddit_2");
    assert!(store.result("reddit_2").is_none());

    store.clear_write_failures();
    let second = pipeline.run_cycle(&matcher, &CancelSignal::never()).await;
    assert_eq!(second.results_persisted, 1);
    assert_eq!(second.duplicates_skipped, 2);
    assert!(store.result("reddit_2").is_some());
}

#[tokio::test]
async fn dedup_read_failure_skips_record_without_writing() {
    let store = Arc::new(MemoryStore::new());
    store.fail_reads(true);
    let conn = Arc::new(MockConnector::new("reddit", vec![record("reddit_1", "a")]));
    let pipeline = pipeline(&store, vec![conn as Arc<dyn SourceConnector>], None);

    let report = pipeline
        .run_cycle(&TrendMatcher::new(vec![]), &CancelSignal::never())
        .await;

    assert_eq!(report.record_failures.len(), 1);
    assert_eq!(store.write_attempts(), 0);
}

#[tokio::test]
async fn classifier_triages_results() {
    let store = Arc::new(MemoryStore::new());
    let conn = Arc::new(MockConnector::new("reddit", vec![record("reddit_1", "a")]));
    let classifier = Arc::new(MockClassifier::scoring(0.05));
    let pipeline = pipeline(
        &store,
        vec![conn as Arc<dyn SourceConnector>],
        Some(classifier.clone() as Arc<dyn TextClassifier>),
    );

    let report = pipeline
        .run_cycle(&TrendMatcher::new(vec![]), &CancelSignal::never())
        .await;

    assert_eq!(report.results_classified, 1);
    let triage = store.result("reddit_1").unwrap().triage.unwrap();
    assert_eq!(triage.status, TriageStatus::Discarded);
    assert_eq!(triage.risk_score, 0.05);
    assert_eq!(classifier.call_count(), 1);
}

#[tokio::test]
async fn classifier_sees_truncated_input() {
    let store = Arc::new(MemoryStore::new());
    let conn = Arc::new(MockConnector::new(
        "reddit",
        vec![record("reddit_1", &"y".repeat(3_000))],
    ));
    let classifier = Arc::new(MockClassifier::scoring(0.9));
    let pipeline = pipeline(
        &store,
        vec![conn as Arc<dyn SourceConnector>],
        Some(classifier.clone() as Arc<dyn TextClassifier>),
    );

    pipeline
        .run_cycle(&TrendMatcher::new(vec![]), &CancelSignal::never())
        .await;

    let inputs = classifier.inputs();
    assert_eq!(inputs.len(), 1);
    assert_eq!(inputs[0].chars().count(), ListeningConfig::default().classifier_input_chars);
    let triage = store.result("reddit_1").unwrap().triage.unwrap();
    assert_eq!(triage.status, TriageStatus::Pending);
}

#[tokio::test]
async fn classifier_failure_still_persists() {
    let store = Arc::new(MemoryStore::new());
    let conn = Arc::new(MockConnector::new("reddit", vec![record("reddit_1", "a")]));
    let pipeline = pipeline(
        &store,
        vec![conn as Arc<dyn SourceConnector>],
        Some(Arc::new(MockClassifier::failing()) as Arc<dyn TextClassifier>),
    );

    let report = pipeline
        .run_cycle(&TrendMatcher::new(vec![]), &CancelSignal::never())
        .await;

    assert_eq!(report.results_persisted, 1);
    assert_eq!(report.results_classified, 0);
    assert!(report.record_failures.is_empty());
    assert!(store.result("reddit_1").unwrap().triage.is_none());
}

#[tokio::test]
async fn no_connectors_is_an_empty_cycle() {
    let store = Arc::new(MemoryStore::new());
    let pipeline = pipeline(&store, vec![], None);

    let report = pipeline
        .run_cycle(&TrendMatcher::new(vec![]), &CancelSignal::never())
        .await;

    assert_eq!(report.connectors_polled, 0);
    assert_eq!(report.failure_count(), 0);
    assert!(!report.cancelled);
}
