//! Windowed, escalating risk scoring per subject.
//!
//! The score starts from the subject's static risk level and is raised by
//! lexical escalation checks over the last seven days of posts, compared
//! against the 7–30 day baseline. A snapshot is a pure function of the stored
//! posts and the reference time, see [`assess`].

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use recapture_common::{
    round_to, AtRiskSubject, RecaptureError, RiskLevel, RiskSnapshot, RiskTrend, SourcePost,
    Subject,
};

use crate::traits::ListeningStore;

pub const RECENT_WINDOW_DAYS: i64 = 7;
pub const BASELINE_WINDOW_DAYS: i64 = 30;

pub const VIOLENCE_KEYWORDS: &[&str] = &[
    "hate them",
    "kill",
    "weapon",
    "gun",
    "knife",
    "attack",
    "revenge",
    "burn it down",
    "destroy",
    "violence",
    "hurt",
];

pub const ISOLATION_KEYWORDS: &[&str] = &[
    "alone",
    "lonely",
    "rotting",
    "ldar",
    "no friends",
    "no one cares",
    "forgotten",
    "invisible",
    "isolation",
];

pub const HOPELESSNESS_KEYWORDS: &[&str] = &[
    "it's over",
    "no hope",
    "give up",
    "pointless",
    "why try",
    "doomed",
    "blackpill",
    "cope",
    "rope",
];

const VIOLENCE_BONUS: f64 = 2.0;
const ISOLATION_BONUS: f64 = 1.0;
const HOPELESSNESS_BONUS: f64 = 1.5;
const CONCENTRATION_BONUS: f64 = 1.0;
const MAX_SCORE: f64 = 10.0;

pub fn base_score(level: RiskLevel) -> f64 {
    match level {
        RiskLevel::Low => 2.0,
        RiskLevel::Medium => 5.0,
        RiskLevel::High => 8.0,
        RiskLevel::Critical => 10.0,
    }
}

/// Total non-overlapping occurrences of every keyword in `text`.
pub fn count_hits(text: &str, keywords: &[&str]) -> usize {
    keywords.iter().map(|kw| text.matches(kw).count()).sum()
}

/// Score a subject from its two post windows as of `now`.
pub fn assess(
    subject: &Subject,
    recent: &[SourcePost],
    baseline: &[SourcePost],
    now: DateTime<Utc>,
) -> RiskSnapshot {
    let base = base_score(subject.risk_level);
    let mut score = base;
    let mut indicators = Vec::new();

    let recent_count = recent.len();
    let baseline_count = baseline.len();

    if recent_count as f64 > baseline_count as f64 * 1.5 && recent_count > 5 {
        indicators.push(format!(
            "Increased posting frequency ({recent_count} posts in 7 days vs {baseline_count} in previous 23 days)"
        ));
    }

    let text = recent
        .iter()
        .map(|p| p.content.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");
    let violence = count_hits(&text, VIOLENCE_KEYWORDS);
    let isolation = count_hits(&text, ISOLATION_KEYWORDS);
    let hopelessness = count_hits(&text, HOPELESSNESS_KEYWORDS);

    if violence > 2 {
        indicators.push(format!("Violence-related language detected ({violence} instances)"));
        score += VIOLENCE_BONUS;
    }
    if isolation > 3 {
        indicators.push(format!("Social isolation indicators ({isolation} instances)"));
        score += ISOLATION_BONUS;
    }
    if hopelessness > 4 {
        indicators.push(format!("Hopelessness/despair language ({hopelessness} instances)"));
        score += HOPELESSNESS_BONUS;
    }
    if recent_count >= 5 {
        let ratio = (violence + isolation + hopelessness) as f64 / recent_count as f64;
        if ratio > 0.6 {
            indicators.push("High concentration of concerning content".to_string());
            score += CONCENTRATION_BONUS;
        }
    }

    let score = score.clamp(0.0, MAX_SCORE);

    let trend = if score > base + 1.0 {
        RiskTrend::Increasing
    } else if score < base - 1.0 {
        RiskTrend::Decreasing
    } else {
        RiskTrend::Stable
    };

    let needs_intervention = score >= 7.0 || indicators.len() >= 3 || violence >= 3;
    let confidence = ((recent_count + baseline_count) as f64 / 20.0).min(1.0);

    RiskSnapshot {
        subject_id: subject.id,
        score: round_to(score, 1),
        trend,
        indicators,
        needs_intervention,
        confidence: round_to(confidence, 2),
        computed_at: now,
    }
}

pub struct RiskMonitor {
    store: Arc<dyn ListeningStore>,
}

impl RiskMonitor {
    pub fn new(store: Arc<dyn ListeningStore>) -> Self {
        Self { store }
    }

    pub async fn analyze(&self, subject_id: Uuid) -> Result<RiskSnapshot, RecaptureError> {
        self.analyze_at(subject_id, Utc::now()).await
    }

    /// Analyze against a fixed reference clock.
    pub async fn analyze_at(
        &self,
        subject_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<RiskSnapshot, RecaptureError> {
        let subject = self
            .store
            .get_subject(subject_id)
            .await
            .map_err(RecaptureError::store)?
            .ok_or_else(|| RecaptureError::SubjectNotFound(subject_id.to_string()))?;
        self.analyze_subject(&subject, now).await
    }

    async fn analyze_subject(
        &self,
        subject: &Subject,
        now: DateTime<Utc>,
    ) -> Result<RiskSnapshot, RecaptureError> {
        let recent_start = now - Duration::days(RECENT_WINDOW_DAYS);
        let baseline_start = now - Duration::days(BASELINE_WINDOW_DAYS);

        let recent = self
            .store
            .posts_in_window(subject.id, recent_start, None)
            .await
            .map_err(RecaptureError::store)?;
        let baseline = self
            .store
            .posts_in_window(subject.id, baseline_start, Some(recent_start))
            .await
            .map_err(RecaptureError::store)?;

        let snapshot = assess(subject, &recent, &baseline, now);
        debug!(
            subject_id = %subject.id,
            score = snapshot.score,
            indicators = snapshot.indicators.len(),
            needs_intervention = snapshot.needs_intervention,
            "Risk analysis complete"
        );
        Ok(snapshot)
    }

    pub async fn at_risk_subjects(&self) -> Result<Vec<AtRiskSubject>, RecaptureError> {
        self.at_risk_subjects_at(Utc::now()).await
    }

    /// Every subject needing intervention, highest score first. A subject
    /// whose analysis fails is logged and left out.
    pub async fn at_risk_subjects_at(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<AtRiskSubject>, RecaptureError> {
        let subjects = self
            .store
            .list_subjects()
            .await
            .map_err(RecaptureError::store)?;

        let mut at_risk = Vec::new();
        for subject in subjects {
            match self.analyze_subject(&subject, now).await {
                Ok(analysis) if analysis.needs_intervention => at_risk.push(AtRiskSubject {
                    id: subject.id,
                    name: subject.name,
                    risk_level: subject.risk_level,
                    analysis,
                }),
                Ok(_) => {}
                Err(e) => {
                    warn!(subject_id = %subject.id, error = %e, "Risk analysis failed, skipping subject");
                }
            }
        }

        at_risk.sort_by(|a, b| b.analysis.score.total_cmp(&a.analysis.score));
        Ok(at_risk)
    }
}
