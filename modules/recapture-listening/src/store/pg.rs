//! PgStore: `ListeningStore` backed by Postgres.
//!
//! Plain runtime queries; the tables are owned and migrated elsewhere.
//! Listening results are append-only: an id that already exists is left
//! untouched by `upsert_result`.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use recapture_common::{
    Authority, ListeningResult, RiskLevel, Severity, SourcePost, Subject, Trend, Triage,
    TriageStatus,
};

use crate::traits::ListeningStore;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(8)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

#[derive(sqlx::FromRow)]
struct SubjectRow {
    id: Uuid,
    name: String,
    age: Option<i32>,
    risk_level: Option<String>,
    notes: Option<String>,
}

impl From<SubjectRow> for Subject {
    fn from(row: SubjectRow) -> Self {
        let risk_level = match row.risk_level.as_deref().map(str::parse::<RiskLevel>) {
            Some(Ok(level)) => level,
            _ => {
                warn!(subject_id = %row.id, risk_level = ?row.risk_level, "Unrecognized risk level, using Medium");
                RiskLevel::Medium
            }
        };
        Subject {
            id: row.id,
            name: row.name,
            age: row.age.and_then(|a| u32::try_from(a).ok()).unwrap_or(0),
            risk_level,
            notes: row.notes,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PostRow {
    id: String,
    subject_id: Uuid,
    platform: String,
    author: Option<String>,
    content: String,
    url: Option<String>,
    posted_at: DateTime<Utc>,
}

impl From<PostRow> for SourcePost {
    fn from(row: PostRow) -> Self {
        SourcePost {
            id: row.id,
            subject_id: row.subject_id,
            platform: row.platform,
            author: row.author.unwrap_or_default(),
            content: row.content,
            url: row.url,
            posted_at: row.posted_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct TrendRow {
    id: Uuid,
    topic: String,
    description: Option<String>,
    severity: String,
    phrases: Json<Vec<String>>,
}

impl From<TrendRow> for Trend {
    fn from(row: TrendRow) -> Self {
        Trend {
            id: row.id,
            severity: parse_severity(&row.severity),
            topic: row.topic,
            description: row.description.unwrap_or_default(),
            phrases: row.phrases.0,
        }
    }
}

#[derive(sqlx::FromRow)]
struct AuthorityRow {
    id: Uuid,
    subject_id: Uuid,
    name: String,
    role: String,
    relation: Option<String>,
}

impl From<AuthorityRow> for Authority {
    fn from(row: AuthorityRow) -> Self {
        Authority {
            id: row.id,
            subject_id: row.subject_id,
            name: row.name,
            role: row.role,
            relation: row.relation.unwrap_or_default(),
        }
    }
}

#[derive(sqlx::FromRow)]
struct ResultRow {
    id: String,
    source_platform: String,
    author: String,
    content: String,
    timestamp: DateTime<Utc>,
    url: String,
    matched_trend_id: Option<Uuid>,
    matched_trend_topic: Option<String>,
    severity: String,
    triage_risk_score: Option<f64>,
    triage_summary: Option<String>,
    triage_status: Option<String>,
}

impl From<ResultRow> for ListeningResult {
    fn from(row: ResultRow) -> Self {
        let triage = match (row.triage_risk_score, row.triage_status) {
            (Some(risk_score), Some(status)) => Some(Triage {
                risk_score,
                summary: row.triage_summary.unwrap_or_default(),
                status: status.parse().unwrap_or(TriageStatus::Pending),
            }),
            _ => None,
        };
        ListeningResult {
            id: row.id,
            source_platform: row.source_platform,
            author: row.author,
            content: row.content,
            timestamp: row.timestamp,
            url: row.url,
            matched_trend_id: row.matched_trend_id,
            matched_trend_topic: row.matched_trend_topic,
            severity: parse_severity(&row.severity),
            triage,
        }
    }
}

fn parse_severity(raw: &str) -> Severity {
    raw.parse().unwrap_or_else(|_| {
        warn!(severity = raw, "Unrecognized severity, using Low");
        Severity::Low
    })
}

const RESULT_COLUMNS: &str = "id, source_platform, author, content, timestamp, url, \
     matched_trend_id, matched_trend_topic, severity, \
     triage_risk_score, triage_summary, triage_status";

const POST_COLUMNS: &str = "id, subject_id, platform, author, content, url, posted_at";

// ---------------------------------------------------------------------------
// ListeningStore
// ---------------------------------------------------------------------------

#[async_trait]
impl ListeningStore for PgStore {
    async fn result_exists(&self, external_id: &str) -> Result<bool> {
        let (exists,) = sqlx::query_as::<_, (bool,)>(
            "SELECT EXISTS(SELECT 1 FROM listening_results WHERE id = $1)",
        )
        .bind(external_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn upsert_result(&self, result: &ListeningResult) -> Result<bool> {
        let triage = result.triage.as_ref();
        let outcome = sqlx::query(
            r#"
            INSERT INTO listening_results
                (id, source_platform, author, content, timestamp, url,
                 matched_trend_id, matched_trend_topic, severity,
                 triage_risk_score, triage_summary, triage_status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(&result.id)
        .bind(&result.source_platform)
        .bind(&result.author)
        .bind(&result.content)
        .bind(result.timestamp)
        .bind(&result.url)
        .bind(result.matched_trend_id)
        .bind(&result.matched_trend_topic)
        .bind(result.severity.as_str())
        .bind(triage.map(|t| t.risk_score))
        .bind(triage.map(|t| t.summary.clone()))
        .bind(triage.map(|t| t.status.to_string()))
        .execute(&self.pool)
        .await?;
        Ok(outcome.rows_affected() > 0)
    }

    async fn latest_results(&self, offset: u64, limit: u64) -> Result<Vec<ListeningResult>> {
        let rows = sqlx::query_as::<_, ResultRow>(&format!(
            "SELECT {RESULT_COLUMNS} FROM listening_results \
             ORDER BY timestamp DESC, id ASC OFFSET $1 LIMIT $2"
        ))
        .bind(offset as i64)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(ListeningResult::from).collect())
    }

    async fn count_results(&self) -> Result<u64> {
        let (count,) = sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM listening_results")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn get_active_trends(&self) -> Result<Vec<Trend>> {
        let rows = sqlx::query_as::<_, TrendRow>(
            "SELECT id, topic, description, severity, phrases FROM trends ORDER BY created_at ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Trend::from).collect())
    }

    async fn get_subject(&self, id: Uuid) -> Result<Option<Subject>> {
        let row = sqlx::query_as::<_, SubjectRow>(
            "SELECT id, name, age, risk_level, notes FROM subjects WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Subject::from))
    }

    async fn list_subjects(&self) -> Result<Vec<Subject>> {
        let rows = sqlx::query_as::<_, SubjectRow>(
            "SELECT id, name, age, risk_level, notes FROM subjects ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Subject::from).collect())
    }

    async fn posts_in_window(
        &self,
        subject_id: Uuid,
        since: DateTime<Utc>,
        until: Option<DateTime<Utc>>,
    ) -> Result<Vec<SourcePost>> {
        let rows = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM subject_posts \
             WHERE subject_id = $1 AND posted_at >= $2 AND ($3::timestamptz IS NULL OR posted_at < $3) \
             ORDER BY posted_at DESC"
        ))
        .bind(subject_id)
        .bind(since)
        .bind(until)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(SourcePost::from).collect())
    }

    async fn recent_posts(&self, subject_id: Uuid, limit: u32) -> Result<Vec<SourcePost>> {
        let rows = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM subject_posts \
             WHERE subject_id = $1 ORDER BY posted_at DESC LIMIT $2"
        ))
        .bind(subject_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(SourcePost::from).collect())
    }

    async fn list_authorities(&self, subject_id: Uuid) -> Result<Vec<Authority>> {
        let rows = sqlx::query_as::<_, AuthorityRow>(
            "SELECT id, subject_id, name, role, relation FROM authorities \
             WHERE subject_id = $1 ORDER BY name ASC",
        )
        .bind(subject_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Authority::from).collect())
    }
}
