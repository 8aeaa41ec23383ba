use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ConnectorFailure {
    pub connector: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordFailure {
    pub external_id: String,
    pub error: String,
}

/// Outcome of one poll cycle. Failures are collected here instead of
/// aborting the cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub connectors_polled: u32,
    pub records_fetched: u32,
    pub duplicates_skipped: u32,
    pub results_persisted: u32,
    pub results_classified: u32,
    pub connector_failures: Vec<ConnectorFailure>,
    pub record_failures: Vec<RecordFailure>,
    /// The cycle was interrupted by `stop()` before it finished.
    pub cancelled: bool,
}

impl CycleReport {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            finished_at: started_at,
            connectors_polled: 0,
            records_fetched: 0,
            duplicates_skipped: 0,
            results_persisted: 0,
            results_classified: 0,
            connector_failures: Vec::new(),
            record_failures: Vec::new(),
            cancelled: false,
        }
    }

    pub fn failure_count(&self) -> usize {
        self.connector_failures.len() + self.record_failures.len()
    }
}

impl std::fmt::Display for CycleReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "connectors={} fetched={} duplicates={} persisted={} classified={} connector_failures={} record_failures={}",
            self.connectors_polled,
            self.records_fetched,
            self.duplicates_skipped,
            self.results_persisted,
            self.results_classified,
            self.connector_failures.len(),
            self.record_failures.len(),
        )?;
        if self.cancelled {
            write!(f, " (cancelled)")?;
        }
        Ok(())
    }
}

/// Running totals across every cycle of the scheduler's lifetime.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ListeningStats {
    pub cycles: u64,
    pub records_fetched: u64,
    pub duplicates_skipped: u64,
    pub results_persisted: u64,
    pub results_classified: u64,
    pub connector_failures: u64,
    pub record_failures: u64,
}

impl ListeningStats {
    /// Cancelled cycles contribute their counts but are not completed cycles.
    pub fn absorb(&mut self, report: &CycleReport) {
        if !report.cancelled {
            self.cycles += 1;
        }
        self.records_fetched += report.records_fetched as u64;
        self.duplicates_skipped += report.duplicates_skipped as u64;
        self.results_persisted += report.results_persisted as u64;
        self.results_classified += report.results_classified as u64;
        self.connector_failures += report.connector_failures.len() as u64;
        self.record_failures += report.record_failures.len() as u64;
    }
}
