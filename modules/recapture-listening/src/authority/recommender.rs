use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use recapture_common::{
    round_to, Authority, AuthorityRecommendation, AuthorityRecommendations, RecaptureError,
    SourcePost,
};

use super::taxonomy::{profile_for, relationship_strength, GENERAL_THEME, THEME_BUCKETS};
use crate::traits::ListeningStore;

/// Number of most recent posts scanned for themes.
pub const THEME_POST_LIMIT: u32 = 20;

const THEME_WEIGHT: f64 = 0.4;
const RELATIONSHIP_WEIGHT: f64 = 0.3;
const EFFECTIVENESS_WEIGHT: f64 = 0.2;
const AVAILABILITY_WEIGHT: f64 = 0.1;
// Authority availability is not tracked yet.
const AVAILABILITY: f64 = 1.0;

/// Triggered theme buckets across `posts`, deduplicated in detection order.
/// `["general"]` when nothing triggers or there are no posts.
pub fn extract_themes(posts: &[SourcePost]) -> Vec<String> {
    let text = posts
        .iter()
        .map(|p| p.content.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");

    let mut themes: Vec<String> = Vec::new();
    if !posts.is_empty() {
        for bucket in THEME_BUCKETS {
            if bucket.triggers.iter().any(|t| text.contains(t)) {
                for theme in bucket.themes {
                    if !themes.iter().any(|seen| seen == theme) {
                        themes.push(theme.to_string());
                    }
                }
            }
        }
    }

    if themes.is_empty() {
        themes.push(GENERAL_THEME.to_string());
    }
    themes
}

/// Score one authority against the detected themes.
pub fn score(
    authority: &Authority,
    themes: &[String],
    relationship_strength: f64,
) -> AuthorityRecommendation {
    let profile = profile_for(&authority.role);
    let relationship_strength = relationship_strength.clamp(0.0, 1.0);

    let matching_themes: Vec<String> = themes
        .iter()
        .filter(|theme| profile.handles.contains(&theme.as_str()))
        .cloned()
        .collect();

    let theme_match = if themes.is_empty() {
        0.5
    } else {
        matching_themes.len() as f64 / themes.len() as f64
    };

    let match_score = THEME_WEIGHT * theme_match
        + RELATIONSHIP_WEIGHT * relationship_strength
        + EFFECTIVENESS_WEIGHT * profile.effectiveness
        + AVAILABILITY_WEIGHT * AVAILABILITY;
    let confidence = (0.3 * matching_themes.len() as f64 + 0.4 * relationship_strength).min(1.0);

    AuthorityRecommendation {
        authority: authority.clone(),
        match_score: round_to(match_score, 2),
        matching_themes,
        confidence: round_to(confidence, 2),
        effectiveness: profile.effectiveness,
    }
}

/// Rank `authorities` by match score, highest first. Ties keep input order.
pub fn rank(authorities: &[Authority], themes: &[String]) -> Vec<AuthorityRecommendation> {
    let mut ranked: Vec<AuthorityRecommendation> = authorities
        .iter()
        .map(|authority| score(authority, themes, relationship_strength(&authority.relation)))
        .collect();
    ranked.sort_by(|a, b| b.match_score.total_cmp(&a.match_score));
    ranked
}

pub struct AuthorityRecommender {
    store: Arc<dyn ListeningStore>,
}

impl AuthorityRecommender {
    pub fn new(store: Arc<dyn ListeningStore>) -> Self {
        Self { store }
    }

    pub async fn extract_themes(&self, subject_id: Uuid) -> Result<Vec<String>, RecaptureError> {
        let posts = self
            .store
            .recent_posts(subject_id, THEME_POST_LIMIT)
            .await
            .map_err(RecaptureError::store)?;
        Ok(extract_themes(&posts))
    }

    pub async fn recommend(
        &self,
        subject_id: Uuid,
        top_n: usize,
    ) -> Result<AuthorityRecommendations, RecaptureError> {
        self.store
            .get_subject(subject_id)
            .await
            .map_err(RecaptureError::store)?
            .ok_or_else(|| RecaptureError::SubjectNotFound(subject_id.to_string()))?;

        let authorities = self
            .store
            .list_authorities(subject_id)
            .await
            .map_err(RecaptureError::store)?;
        let detected_themes = self.extract_themes(subject_id).await?;

        let mut recommendations = rank(&authorities, &detected_themes);
        recommendations.truncate(top_n);

        debug!(
            %subject_id,
            authorities = authorities.len(),
            themes = ?detected_themes,
            "Authority recommendations ranked"
        );
        Ok(AuthorityRecommendations {
            subject_id,
            detected_themes,
            recommendations,
        })
    }
}
