//! Listening scheduler: owns the background poll loop.
//!
//! Two states: `Stopped` and `Running`. `start()` snapshots the active trends
//! and spawns the loop; `stop()` signals cancellation and waits for the loop
//! task to exit, so no store write happens after it returns.
//!
//! One cycle: fetch every connector (each on its own task, failures isolated),
//! then dedup → match → classify → persist each record in turn. Cycles never
//! overlap; an overrunning cycle is followed immediately by the next one.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{watch, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use typed_builder::TypedBuilder;

use recapture_common::{FetchedRecord, ListeningConfig, RecaptureError};

use crate::pipeline::dedup::{DedupVerdict, Deduplicator};
use crate::pipeline::matcher::TrendMatcher;
use crate::pipeline::result::{build_result, triage};
use crate::pipeline::stats::{
    ConnectorFailure, CycleReport, ListeningStats, RecordFailure,
};
use crate::traits::{ListeningStore, SourceConnector, TextClassifier};

#[derive(Clone, TypedBuilder)]
pub struct ListeningDeps {
    pub store: Arc<dyn ListeningStore>,
    #[builder(default)]
    pub connectors: Vec<Arc<dyn SourceConnector>>,
    #[builder(default)]
    pub classifier: Option<Arc<dyn TextClassifier>>,
    #[builder(default)]
    pub config: ListeningConfig,
}

// ---------------------------------------------------------------------------
// CancelSignal
// ---------------------------------------------------------------------------

/// Cancellation flag handed to the worker. Checked between records and
/// awaited while the loop waits on connectors or sleeps.
#[derive(Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    fn pair() -> (watch::Sender<bool>, Self) {
        let (tx, rx) = watch::channel(false);
        (tx, Self { rx })
    }

    /// A signal that never fires. For driving single cycles by hand.
    pub fn never() -> Self {
        let (_tx, signal) = Self::pair();
        signal
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation is requested.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                // Sender gone without cancelling: nothing can fire anymore.
                std::future::pending::<()>().await;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// ListeningPipeline: one cycle
// ---------------------------------------------------------------------------

enum RecordOutcome {
    Duplicate,
    Persisted { classified: bool },
}

pub struct ListeningPipeline {
    deps: ListeningDeps,
    dedup: Deduplicator,
}

impl ListeningPipeline {
    pub fn new(deps: ListeningDeps) -> Self {
        let dedup = Deduplicator::new(Arc::clone(&deps.store));
        Self { deps, dedup }
    }

    pub fn config(&self) -> &ListeningConfig {
        &self.deps.config
    }

    /// Run one full cycle. Never fails: every failure lands in the report.
    pub async fn run_cycle(&self, matcher: &TrendMatcher, cancel: &CancelSignal) -> CycleReport {
        let mut report = CycleReport::new(Utc::now());

        let Some(batches) = self.fetch_all(cancel, &mut report).await else {
            report.cancelled = true;
            report.finished_at = Utc::now();
            return report;
        };

        'batches: for (connector, records) in batches {
            for record in records {
                if cancel.is_cancelled() {
                    report.cancelled = true;
                    break 'batches;
                }
                match self.process_record(&record, matcher).await {
                    Ok(RecordOutcome::Duplicate) => report.duplicates_skipped += 1,
                    Ok(RecordOutcome::Persisted { classified }) => {
                        report.results_persisted += 1;
                        if classified {
                            report.results_classified += 1;
                        }
                    }
                    Err(e) => {
                        let err = RecaptureError::RecordProcessing {
                            external_id: record.id.clone(),
                            message: e.to_string(),
                        };
                        warn!(connector = connector.as_str(), error = %err, "Skipping record");
                        report.record_failures.push(RecordFailure {
                            external_id: record.id,
                            error: err.to_string(),
                        });
                    }
                }
            }
        }

        report.finished_at = Utc::now();
        report
    }

    /// Fetch from every connector concurrently, off the caller's task.
    /// Returns `None` if cancelled while waiting.
    async fn fetch_all(
        &self,
        cancel: &CancelSignal,
        report: &mut CycleReport,
    ) -> Option<Vec<(String, Vec<FetchedRecord>)>> {
        let limit = self.deps.config.fetch_limit;
        let handles: Vec<(String, JoinHandle<anyhow::Result<Vec<FetchedRecord>>>)> = self
            .deps
            .connectors
            .iter()
            .map(|connector| {
                let connector = Arc::clone(connector);
                let name = connector.name().to_string();
                (name, tokio::spawn(async move { connector.fetch(limit).await }))
            })
            .collect();

        let mut batches = Vec::with_capacity(handles.len());
        let mut pending = handles.into_iter();
        while let Some((name, mut handle)) = pending.next() {
            let joined = tokio::select! {
                joined = &mut handle => Some(joined),
                _ = cancel.cancelled() => None,
            };
            let Some(joined) = joined else {
                handle.abort();
                for (_, rest) in pending {
                    rest.abort();
                }
                return None;
            };

            report.connectors_polled += 1;
            let fetched = match joined {
                Ok(Ok(records)) => Ok(records),
                Ok(Err(e)) => Err(RecaptureError::ConnectorFetch {
                    connector: name.clone(),
                    message: format!("{e:#}"),
                }),
                Err(e) => Err(RecaptureError::ConnectorFetch {
                    connector: name.clone(),
                    message: format!("connector task failed: {e}"),
                }),
            };

            match fetched {
                Ok(records) => {
                    debug!(connector = name.as_str(), count = records.len(), "Fetched records");
                    report.records_fetched += records.len() as u32;
                    batches.push((name, records));
                }
                Err(e) => {
                    warn!(connector = name.as_str(), error = %e, "Connector fetch failed, skipping");
                    report.connector_failures.push(ConnectorFailure {
                        connector: name,
                        error: e.to_string(),
                    });
                }
            }
        }
        Some(batches)
    }

    async fn process_record(
        &self,
        record: &FetchedRecord,
        matcher: &TrendMatcher,
    ) -> Result<RecordOutcome, RecaptureError> {
        if self.dedup.check(&record.id).await? == DedupVerdict::AlreadyProcessed {
            return Ok(RecordOutcome::Duplicate);
        }

        let matched = matcher.match_content(&record.content);
        let mut result = build_result(record, matched, self.deps.config.content_preview_chars);

        if let Some(classifier) = &self.deps.classifier {
            let input: String = record
                .content
                .chars()
                .take(self.deps.config.classifier_input_chars)
                .collect();
            match classifier.classify(&input).await {
                Ok(classification) => {
                    result.triage = Some(triage(classification, self.deps.config.discard_below));
                }
                Err(e) => {
                    let err = RecaptureError::Classifier(format!("{e:#}"));
                    warn!(external_id = record.id.as_str(), error = %err, "Persisting without triage");
                }
            }
        }

        let written = self
            .deps
            .store
            .upsert_result(&result)
            .await
            .map_err(RecaptureError::store)?;
        if !written {
            return Ok(RecordOutcome::Duplicate);
        }

        debug!(
            external_id = result.id.as_str(),
            severity = %result.severity,
            trend = result.matched_trend_topic.as_deref().unwrap_or("-"),
            "Persisted listening result"
        );
        Ok(RecordOutcome::Persisted {
            classified: result.triage.is_some(),
        })
    }
}

// ---------------------------------------------------------------------------
// ListeningScheduler: Stopped / Running
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListenerState {
    Stopped,
    Running,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListenerStatus {
    pub state: ListenerState,
    pub trends_loaded: usize,
    pub cycles_completed: u64,
    pub last_cycle: Option<CycleReport>,
    pub totals: ListeningStats,
}

#[derive(Default)]
struct Progress {
    last_cycle: Option<CycleReport>,
    totals: ListeningStats,
}

struct Session {
    cancel: watch::Sender<bool>,
    handle: JoinHandle<()>,
    trends_loaded: usize,
}

impl Session {
    fn is_live(&self) -> bool {
        !self.handle.is_finished()
    }
}

pub struct ListeningScheduler {
    pipeline: Arc<ListeningPipeline>,
    session: AsyncMutex<Option<Session>>,
    progress: Arc<Mutex<Progress>>,
}

impl ListeningScheduler {
    pub fn new(deps: ListeningDeps) -> Self {
        Self {
            pipeline: Arc::new(ListeningPipeline::new(deps)),
            session: AsyncMutex::new(None),
            progress: Arc::new(Mutex::new(Progress::default())),
        }
    }

    /// Transition to `Running`. A no-op while already running. The trend set
    /// is read once here; trends added later are invisible until restart.
    pub async fn start(&self) -> Result<(), RecaptureError> {
        let mut session = self.session.lock().await;
        if session.as_ref().is_some_and(Session::is_live) {
            debug!("Listening already running");
            return Ok(());
        }

        let trends = self
            .pipeline
            .deps
            .store
            .get_active_trends()
            .await
            .map_err(RecaptureError::store)?;
        let matcher = TrendMatcher::new(trends);
        let trends_loaded = matcher.len();

        let (cancel_tx, cancel) = CancelSignal::pair();
        let handle = tokio::spawn(listen_loop(
            Arc::clone(&self.pipeline),
            matcher,
            cancel,
            Arc::clone(&self.progress),
        ));

        *session = Some(Session {
            cancel: cancel_tx,
            handle,
            trends_loaded,
        });
        info!(
            trends = trends_loaded,
            connectors = self.pipeline.deps.connectors.len(),
            interval_secs = self.pipeline.config().poll_interval.as_secs_f64(),
            "Listening started"
        );
        Ok(())
    }

    /// Transition to `Stopped`, waiting for the in-flight cycle to exit.
    /// A no-op while already stopped.
    pub async fn stop(&self) {
        let mut session = self.session.lock().await;
        let Some(active) = session.take() else {
            return;
        };
        let _ = active.cancel.send(true);
        if let Err(e) = active.handle.await {
            if e.is_panic() {
                error!(error = %e, "Listening loop panicked");
            }
        }
        info!("Listening stopped");
    }

    pub async fn state(&self) -> ListenerState {
        match self.session.lock().await.as_ref() {
            Some(active) if active.is_live() => ListenerState::Running,
            _ => ListenerState::Stopped,
        }
    }

    pub async fn is_running(&self) -> bool {
        self.state().await == ListenerState::Running
    }

    pub async fn status(&self) -> ListenerStatus {
        let (state, trends_loaded) = match self.session.lock().await.as_ref() {
            Some(active) if active.is_live() => (ListenerState::Running, active.trends_loaded),
            _ => (ListenerState::Stopped, 0),
        };
        let progress = self.progress.lock().unwrap_or_else(|p| p.into_inner());
        ListenerStatus {
            state,
            trends_loaded,
            cycles_completed: progress.totals.cycles,
            last_cycle: progress.last_cycle.clone(),
            totals: progress.totals.clone(),
        }
    }
}

async fn listen_loop(
    pipeline: Arc<ListeningPipeline>,
    matcher: TrendMatcher,
    cancel: CancelSignal,
    progress: Arc<Mutex<Progress>>,
) {
    let interval = pipeline.config().poll_interval;
    loop {
        if cancel.is_cancelled() {
            break;
        }

        let started = Instant::now();
        let report = pipeline.run_cycle(&matcher, &cancel).await;
        if report.failure_count() > 0 {
            warn!(%report, "Listening cycle finished with failures");
        } else {
            info!(%report, "Listening cycle complete");
        }

        let cancelled = report.cancelled;
        {
            let mut progress = progress.lock().unwrap_or_else(|p| p.into_inner());
            progress.totals.absorb(&report);
            progress.last_cycle = Some(report);
        }
        if cancelled {
            break;
        }

        let next = started + interval;
        if Instant::now() >= next {
            debug!("Cycle overran the poll interval, starting next cycle now");
            // A cycle with nothing to await must still let stop() in.
            tokio::task::yield_now().await;
            continue;
        }
        tokio::select! {
            _ = tokio::time::sleep_until(next) => {}
            _ = cancel.cancelled() => break,
        }
    }
    debug!("Listening loop exited");
}
