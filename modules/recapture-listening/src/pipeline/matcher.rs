//! Lexical trend matching.
//!
//! Trends are tried in the order they were loaded and the first trend with
//! any phrase contained in the content wins. Neither severity nor the number
//! of matching phrases affects the choice.

use recapture_common::Trend;

struct PreparedTrend {
    trend: Trend,
    phrases: Vec<String>,
}

/// Immutable snapshot of the active trends for one listening session.
pub struct TrendMatcher {
    trends: Vec<PreparedTrend>,
}

impl TrendMatcher {
    pub fn new(trends: Vec<Trend>) -> Self {
        let trends = trends
            .into_iter()
            .map(|trend| PreparedTrend {
                phrases: trend.phrases.iter().map(|p| p.to_lowercase()).collect(),
                trend,
            })
            .collect();
        Self { trends }
    }

    /// First trend, in snapshot order, with a phrase contained in `content`
    /// (case-insensitive).
    pub fn match_content(&self, content: &str) -> Option<&Trend> {
        let content = content.to_lowercase();
        self.trends
            .iter()
            .find(|prepared| {
                prepared
                    .phrases
                    .iter()
                    .any(|phrase| content.contains(phrase.as_str()))
            })
            .map(|prepared| &prepared.trend)
    }

    pub fn len(&self) -> usize {
        self.trends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trends.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recapture_common::Severity;
    use uuid::Uuid;

    fn trend(topic: &str, severity: Severity, phrases: &[&str]) -> Trend {
        Trend {
            id: Uuid::new_v4(),
            topic: topic.to_string(),
            description: String::new(),
            severity,
            phrases: phrases.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn first_listed_trend_wins() {
        let matcher = TrendMatcher::new(vec![
            trend("A", Severity::Low, &["foo"]),
            trend("B", Severity::Critical, &["foo", "bar"]),
        ]);
        let matched = matcher.match_content("foo bar").unwrap();
        assert_eq!(matched.topic, "A");
    }

    #[test]
    fn later_trend_matches_when_earlier_does_not() {
        let matcher = TrendMatcher::new(vec![
            trend("A", Severity::Low, &["foo"]),
            trend("B", Severity::High, &["bar"]),
        ]);
        assert_eq!(matcher.match_content("just bar here").unwrap().topic, "B");
    }

    #[test]
    fn matching_ignores_case_on_both_sides() {
        let matcher = TrendMatcher::new(vec![trend("Blackpill", Severity::High, &["It's Over"])]);
        assert!(matcher.match_content("honestly IT'S OVER for me").is_some());
    }

    #[test]
    fn phrases_match_as_substrings() {
        let matcher = TrendMatcher::new(vec![trend("Accel", Severity::High, &["accelerat"])]);
        assert!(matcher.match_content("we must accelerate").is_some());
    }

    #[test]
    fn no_match_returns_none() {
        let matcher = TrendMatcher::new(vec![trend("A", Severity::Low, &["foo"])]);
        assert!(matcher.match_content("nothing relevant").is_none());
        assert!(TrendMatcher::new(vec![]).match_content("foo").is_none());
    }
}
