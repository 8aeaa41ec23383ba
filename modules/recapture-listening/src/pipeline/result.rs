use recapture_common::{FetchedRecord, ListeningResult, Severity, Trend, Triage, TriageStatus};

use crate::traits::Classification;

/// Cut `content` to `max_chars` characters, marking the cut with "...".
pub fn preview(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &content[..byte_idx]),
        None => content.to_string(),
    }
}

/// Build the result for a fetched record. Unmatched records are `Low`.
pub fn build_result(
    record: &FetchedRecord,
    matched: Option<&Trend>,
    preview_chars: usize,
) -> ListeningResult {
    ListeningResult {
        id: record.id.clone(),
        source_platform: record.platform.clone(),
        author: record.author.clone(),
        content: preview(&record.content, preview_chars),
        timestamp: record.timestamp,
        url: record.url.clone(),
        matched_trend_id: matched.map(|t| t.id),
        matched_trend_topic: matched.map(|t| t.topic.clone()),
        severity: matched.map(|t| t.severity).unwrap_or(Severity::Low),
        triage: None,
    }
}

pub fn triage(classification: Classification, discard_below: f64) -> Triage {
    let status = if classification.risk_score < discard_below {
        TriageStatus::Discarded
    } else {
        TriageStatus::Pending
    };
    Triage {
        risk_score: classification.risk_score,
        summary: classification.summary,
        status,
    }
}
