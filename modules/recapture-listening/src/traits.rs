// Collaborator boundaries for the listening core.
//
// SourceConnector: one platform's fetcher, producing normalized records.
// ListeningStore: the persisted subject/post/trend/result repository.
// TextClassifier: external content triage model.
//
// Everything behind these traits is swappable for the in-memory mocks in
// `testing`, so matching, dedup and scoring run without a database.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use recapture_common::{Authority, FetchedRecord, ListeningResult, SourcePost, Subject, Trend};

// ---------------------------------------------------------------------------
// SourceConnector
// ---------------------------------------------------------------------------

#[async_trait]
pub trait SourceConnector: Send + Sync {
    /// Short label used in logs and failure reports.
    fn name(&self) -> &str;

    /// Fetch up to `limit` recent records. May fail; callers isolate failures
    /// per connector.
    async fn fetch(&self, limit: u32) -> Result<Vec<FetchedRecord>>;
}

// ---------------------------------------------------------------------------
// ListeningStore
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ListeningStore: Send + Sync {
    // --- Listening results ---

    /// Whether a result with this external id has already been persisted.
    async fn result_exists(&self, external_id: &str) -> Result<bool>;

    /// Insert a result unless its id is already present. Returns `true` if a
    /// row was written.
    async fn upsert_result(&self, result: &ListeningResult) -> Result<bool>;

    /// Results ordered by timestamp, newest first.
    async fn latest_results(&self, offset: u64, limit: u64) -> Result<Vec<ListeningResult>>;

    async fn count_results(&self) -> Result<u64>;

    // --- Trends ---

    async fn get_active_trends(&self) -> Result<Vec<Trend>>;

    // --- Subjects ---

    async fn get_subject(&self, id: Uuid) -> Result<Option<Subject>>;

    async fn list_subjects(&self) -> Result<Vec<Subject>>;

    /// Posts with `since <= posted_at` and, when `until` is given,
    /// `posted_at < until`. Newest first.
    async fn posts_in_window(
        &self,
        subject_id: Uuid,
        since: DateTime<Utc>,
        until: Option<DateTime<Utc>>,
    ) -> Result<Vec<SourcePost>>;

    /// The subject's `limit` most recent posts, newest first.
    async fn recent_posts(&self, subject_id: Uuid, limit: u32) -> Result<Vec<SourcePost>>;

    // --- Authorities ---

    async fn list_authorities(&self, subject_id: Uuid) -> Result<Vec<Authority>>;
}

// ---------------------------------------------------------------------------
// TextClassifier
// ---------------------------------------------------------------------------

/// Risk judgment returned by the external classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Radicalization risk in [0, 1].
    pub risk_score: f64,
    pub summary: String,
}

#[async_trait]
pub trait TextClassifier: Send + Sync {
    async fn classify(&self, content: &str) -> Result<Classification>;
}
