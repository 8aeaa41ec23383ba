// Test mocks for the listening core.
//
// Mocks matching the trait boundaries:
// - MemoryStore (ListeningStore): stateful in-memory repository
// - MockConnector / FailingConnector / PanickingConnector (SourceConnector)
// - MockClassifier (TextClassifier): fixed score or forced failure
//
// Plus builders for records, posts, subjects, trends and authorities.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use recapture_common::{
    Authority, FetchedRecord, ListeningResult, RiskLevel, Severity, SourcePost, Subject, Trend,
};

use crate::traits::{Classification, ListeningStore, SourceConnector, TextClassifier};

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

pub fn record(id: &str, content: &str) -> FetchedRecord {
    FetchedRecord {
        id: id.to_string(),
        platform: "Reddit".to_string(),
        author: "throwaway".to_string(),
        content: content.to_string(),
        url: format!("https://reddit.com/{id}"),
        timestamp: Utc::now(),
    }
}

pub fn subject(name: &str, risk_level: RiskLevel) -> Subject {
    Subject {
        id: Uuid::new_v4(),
        name: name.to_string(),
        age: 17,
        risk_level,
        notes: None,
    }
}

pub fn post(subject_id: Uuid, id: &str, content: &str, posted_at: DateTime<Utc>) -> SourcePost {
    SourcePost {
        id: id.to_string(),
        subject_id,
        platform: "Reddit".to_string(),
        author: "subject".to_string(),
        content: content.to_string(),
        url: None,
        posted_at,
    }
}

pub fn trend(topic: &str, severity: Severity, phrases: &[&str]) -> Trend {
    Trend {
        id: Uuid::new_v4(),
        topic: topic.to_string(),
        description: String::new(),
        severity,
        phrases: phrases.iter().map(|p| p.to_string()).collect(),
    }
}

pub fn authority(name: &str, role: &str, relation: &str) -> Authority {
    Authority {
        id: Uuid::new_v4(),
        subject_id: Uuid::new_v4(),
        name: name.to_string(),
        role: role.to_string(),
        relation: relation.to_string(),
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MemoryStoreInner {
    results: HashMap<String, ListeningResult>,
    subjects: Vec<Subject>,
    posts: Vec<SourcePost>,
    trends: Vec<Trend>,
    authorities: Vec<Authority>,
    write_attempts: usize,
    failing_writes: HashSet<String>,
}

/// In-memory `ListeningStore`. Reads can be made to fail wholesale and writes
/// can be made to fail per external id.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryStoreInner>,
    fail_reads: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_subject(&self, subject: Subject) {
        self.inner.lock().unwrap().subjects.push(subject);
    }

    pub fn add_post(&self, post: SourcePost) {
        self.inner.lock().unwrap().posts.push(post);
    }

    pub fn add_trend(&self, trend: Trend) {
        self.inner.lock().unwrap().trends.push(trend);
    }

    pub fn add_authority(&self, authority: Authority) {
        self.inner.lock().unwrap().authorities.push(authority);
    }

    pub fn insert_result(&self, result: ListeningResult) {
        self.inner
            .lock()
            .unwrap()
            .results
            .insert(result.id.clone(), result);
    }

    pub fn result(&self, id: &str) -> Option<ListeningResult> {
        self.inner.lock().unwrap().results.get(id).cloned()
    }

    pub fn result_count(&self) -> usize {
        self.inner.lock().unwrap().results.len()
    }

    pub fn write_attempts(&self) -> usize {
        self.inner.lock().unwrap().write_attempts
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_write_for(&self, external_id: &str) {
        self.inner
            .lock()
            .unwrap()
            .failing_writes
            .insert(external_id.to_string());
    }

    pub fn clear_write_failures(&self) {
        self.inner.lock().unwrap().failing_writes.clear();
    }

    fn check_reads(&self) -> Result<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            bail!("MemoryStore: reads disabled");
        }
        Ok(())
    }
}

#[async_trait]
impl ListeningStore for MemoryStore {
    async fn result_exists(&self, external_id: &str) -> Result<bool> {
        self.check_reads()?;
        Ok(self.inner.lock().unwrap().results.contains_key(external_id))
    }

    async fn upsert_result(&self, result: &ListeningResult) -> Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        inner.write_attempts += 1;
        if inner.failing_writes.contains(&result.id) {
            bail!("MemoryStore: write rejected for {}", result.id);
        }
        if inner.results.contains_key(&result.id) {
            return Ok(false);
        }
        inner.results.insert(result.id.clone(), result.clone());
        Ok(true)
    }

    async fn latest_results(&self, offset: u64, limit: u64) -> Result<Vec<ListeningResult>> {
        self.check_reads()?;
        let mut results: Vec<ListeningResult> =
            self.inner.lock().unwrap().results.values().cloned().collect();
        results.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.id.cmp(&b.id)));
        Ok(results
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn count_results(&self) -> Result<u64> {
        self.check_reads()?;
        Ok(self.inner.lock().unwrap().results.len() as u64)
    }

    async fn get_active_trends(&self) -> Result<Vec<Trend>> {
        self.check_reads()?;
        Ok(self.inner.lock().unwrap().trends.clone())
    }

    async fn get_subject(&self, id: Uuid) -> Result<Option<Subject>> {
        self.check_reads()?;
        Ok(self
            .inner
            .lock()
            .unwrap()
            .subjects
            .iter()
            .find(|s| s.id == id)
            .cloned())
    }

    async fn list_subjects(&self) -> Result<Vec<Subject>> {
        self.check_reads()?;
        Ok(self.inner.lock().unwrap().subjects.clone())
    }

    async fn posts_in_window(
        &self,
        subject_id: Uuid,
        since: DateTime<Utc>,
        until: Option<DateTime<Utc>>,
    ) -> Result<Vec<SourcePost>> {
        self.check_reads()?;
        let mut posts: Vec<SourcePost> = self
            .inner
            .lock()
            .unwrap()
            .posts
            .iter()
            .filter(|p| p.subject_id == subject_id)
            .filter(|p| p.posted_at >= since)
            .filter(|p| until.map_or(true, |until| p.posted_at < until))
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.posted_at.cmp(&a.posted_at));
        Ok(posts)
    }

    async fn recent_posts(&self, subject_id: Uuid, limit: u32) -> Result<Vec<SourcePost>> {
        self.check_reads()?;
        let mut posts: Vec<SourcePost> = self
            .inner
            .lock()
            .unwrap()
            .posts
            .iter()
            .filter(|p| p.subject_id == subject_id)
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.posted_at.cmp(&a.posted_at));
        posts.truncate(limit as usize);
        Ok(posts)
    }

    async fn list_authorities(&self, subject_id: Uuid) -> Result<Vec<Authority>> {
        self.check_reads()?;
        Ok(self
            .inner
            .lock()
            .unwrap()
            .authorities
            .iter()
            .filter(|a| a.subject_id == subject_id)
            .cloned()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Connectors
// ---------------------------------------------------------------------------

/// Returns the same configured records on every fetch, optionally after a
/// delay. Counts fetch calls, records when each started, and tracks how many
/// fetches were ever in flight at once.
pub struct MockConnector {
    name: String,
    records: Mutex<Vec<FetchedRecord>>,
    delay: Option<Duration>,
    fetches: AtomicUsize,
    fetch_starts: Mutex<Vec<Instant>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockConnector {
    pub fn new(name: &str, records: Vec<FetchedRecord>) -> Self {
        Self {
            name: name.to_string(),
            records: Mutex::new(records),
            delay: None,
            fetches: AtomicUsize::new(0),
            fetch_starts: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_records(&self, records: Vec<FetchedRecord>) {
        *self.records.lock().unwrap() = records;
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn fetch_starts(&self) -> Vec<Instant> {
        self.fetch_starts.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceConnector for MockConnector {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, limit: u32) -> Result<Vec<FetchedRecord>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.fetch_starts.lock().unwrap().push(Instant::now());
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let records = self.records.lock().unwrap().clone();
        Ok(records.into_iter().take(limit as usize).collect())
    }
}

pub struct FailingConnector {
    name: String,
}

impl FailingConnector {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

#[async_trait]
impl SourceConnector for FailingConnector {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, _limit: u32) -> Result<Vec<FetchedRecord>> {
        bail!("{}: upstream returned 429", self.name)
    }
}

pub struct PanickingConnector;

#[async_trait]
impl SourceConnector for PanickingConnector {
    fn name(&self) -> &str {
        "panicking"
    }

    async fn fetch(&self, _limit: u32) -> Result<Vec<FetchedRecord>> {
        panic!("PanickingConnector: malformed payload")
    }
}

// ---------------------------------------------------------------------------
// MockClassifier
// ---------------------------------------------------------------------------

pub struct MockClassifier {
    risk_score: f64,
    fail: bool,
    calls: AtomicUsize,
    inputs: Mutex<Vec<String>>,
}

impl MockClassifier {
    pub fn scoring(risk_score: f64) -> Self {
        Self {
            risk_score,
            fail: false,
            calls: AtomicUsize::new(0),
            inputs: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::scoring(0.0)
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn inputs(&self) -> Vec<String> {
        self.inputs.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextClassifier for MockClassifier {
    async fn classify(&self, content: &str) -> Result<Classification> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inputs.lock().unwrap().push(content.to_string());
        if self.fail {
            bail!("MockClassifier: model unavailable");
        }
        Ok(Classification {
            risk_score: self.risk_score,
            summary: format!("risk {:.2}", self.risk_score),
        })
    }
}
