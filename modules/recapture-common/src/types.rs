use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// --- Enums ---

/// Static risk classification assigned to a subject when it is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
            RiskLevel::Critical => "Critical",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(RiskLevel::Low),
            "medium" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            "critical" => Ok(RiskLevel::Critical),
            other => Err(format!("unknown risk level: {other}")),
        }
    }
}

/// Severity attached to a trend, and through it to every matched result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
            Severity::Critical => "Critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            other => Err(format!("unknown severity: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RiskTrend {
    Increasing,
    Decreasing,
    Stable,
}

impl fmt::Display for RiskTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskTrend::Increasing => write!(f, "increasing"),
            RiskTrend::Decreasing => write!(f, "decreasing"),
            RiskTrend::Stable => write!(f, "stable"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TriageStatus {
    Pending,
    Discarded,
}

impl fmt::Display for TriageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriageStatus::Pending => write!(f, "pending"),
            TriageStatus::Discarded => write!(f, "discarded"),
        }
    }
}

impl FromStr for TriageStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TriageStatus::Pending),
            "discarded" => Ok(TriageStatus::Discarded),
            other => Err(format!("unknown triage status: {other}")),
        }
    }
}

// --- Subjects and their content ---

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Subject {
    pub id: Uuid,
    pub name: String,
    pub age: u32,
    pub risk_level: RiskLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// A post attributed to a tracked subject. Immutable once stored.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SourcePost {
    /// External identifier assigned by the originating platform.
    pub id: String,
    pub subject_id: Uuid,
    pub platform: String,
    pub author: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub posted_at: DateTime<Utc>,
}

/// Normalized record emitted by a source connector's `fetch`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FetchedRecord {
    pub id: String,
    pub platform: String,
    pub author: String,
    pub content: String,
    pub url: String,
    pub timestamp: DateTime<Utc>,
}

// --- Trends ---

/// A named harmful-narrative signature. Phrase order is significant only
/// for readability; matching order is decided by the trend list order.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Trend {
    pub id: Uuid,
    pub topic: String,
    #[serde(default)]
    pub description: String,
    pub severity: Severity,
    pub phrases: Vec<String>,
}

// --- Listening results ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Triage {
    pub risk_score: f64,
    pub summary: String,
    pub status: TriageStatus,
}

/// A persisted, deduplicated, trend-annotated content item. Unique by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ListeningResult {
    pub id: String,
    pub source_platform: String,
    pub author: String,
    /// Content preview, cut to the configured length.
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub url: String,
    pub matched_trend_id: Option<Uuid>,
    pub matched_trend_topic: Option<String>,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triage: Option<Triage>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FeedPage {
    pub items: Vec<ListeningResult>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

// --- Risk ---

/// Output of one risk evaluation. Recomputed on demand, never stored.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RiskSnapshot {
    pub subject_id: Uuid,
    pub score: f64,
    pub trend: RiskTrend,
    pub indicators: Vec<String>,
    pub needs_intervention: bool,
    pub confidence: f64,
    pub computed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AtRiskSubject {
    pub id: Uuid,
    pub name: String,
    pub risk_level: RiskLevel,
    pub analysis: RiskSnapshot,
}

// --- Authorities ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Authority {
    pub id: Uuid,
    pub subject_id: Uuid,
    pub name: String,
    /// Role name from the authority taxonomy ("Parent", "Law Enforcement", ...).
    pub role: String,
    /// Free-text relation to the subject ("mother's friend", "therapist", ...).
    pub relation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AuthorityRecommendation {
    pub authority: Authority,
    pub match_score: f64,
    pub matching_themes: Vec<String>,
    pub confidence: f64,
    pub effectiveness: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AuthorityRecommendations {
    pub subject_id: Uuid,
    pub detected_themes: Vec<String>,
    pub recommendations: Vec<AuthorityRecommendation>,
}

/// Round to a fixed number of decimal places for reporting.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_level_parses_case_insensitively() {
        assert_eq!("critical".parse::<RiskLevel>().unwrap(), RiskLevel::Critical);
        assert_eq!(" Medium ".parse::<RiskLevel>().unwrap(), RiskLevel::Medium);
        assert!("severe".parse::<RiskLevel>().is_err());
    }

    #[test]
    fn severity_serializes_as_title_case() {
        let json = serde_json::to_string(&Severity::High).unwrap();
        assert_eq!(json, "\"High\"");
        assert_eq!(Severity::default(), Severity::Low);
    }

    #[test]
    fn risk_trend_serializes_lowercase() {
        let json = serde_json::to_string(&RiskTrend::Increasing).unwrap();
        assert_eq!(json, "\"increasing\"");
    }

    #[test]
    fn round_to_reporting_precision() {
        assert_eq!(round_to(0.654, 2), 0.65);
        assert_eq!(round_to(7.25, 1), 7.3);
    }
}
