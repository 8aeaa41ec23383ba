//! Control surface consumed by the outer API layer.

use std::sync::Arc;

use uuid::Uuid;

use recapture_common::{
    AtRiskSubject, AuthorityRecommendations, FeedPage, RecaptureError, RiskSnapshot,
};

use crate::authority::AuthorityRecommender;
use crate::pipeline::scheduler::{ListenerStatus, ListeningDeps, ListeningScheduler};
use crate::risk_monitor::RiskMonitor;
use crate::traits::ListeningStore;

pub const MAX_PAGE_SIZE: u32 = 100;

pub struct ListeningService {
    store: Arc<dyn ListeningStore>,
    scheduler: ListeningScheduler,
    risk: RiskMonitor,
    authorities: AuthorityRecommender,
}

impl ListeningService {
    pub fn new(deps: ListeningDeps) -> Self {
        let store = Arc::clone(&deps.store);
        Self {
            risk: RiskMonitor::new(Arc::clone(&store)),
            authorities: AuthorityRecommender::new(Arc::clone(&store)),
            scheduler: ListeningScheduler::new(deps),
            store,
        }
    }

    pub async fn start_listening(&self) -> Result<(), RecaptureError> {
        self.scheduler.start().await
    }

    pub async fn stop_listening(&self) {
        self.scheduler.stop().await
    }

    pub async fn status(&self) -> ListenerStatus {
        self.scheduler.status().await
    }

    /// One page of the listening feed, newest first. `page` is 1-based.
    pub async fn latest_feed(&self, page: u32, page_size: u32) -> Result<FeedPage, RecaptureError> {
        let page = page.max(1);
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);

        let total = self
            .store
            .count_results()
            .await
            .map_err(RecaptureError::store)?;
        let offset = (page as u64 - 1) * page_size as u64;
        let items = self
            .store
            .latest_results(offset, page_size as u64)
            .await
            .map_err(RecaptureError::store)?;

        Ok(FeedPage {
            items,
            total,
            page,
            page_size,
            total_pages: total.div_ceil(page_size as u64) as u32,
        })
    }

    pub async fn at_risk_subjects(&self) -> Result<Vec<AtRiskSubject>, RecaptureError> {
        self.risk.at_risk_subjects().await
    }

    pub async fn risk_analysis(&self, subject_id: Uuid) -> Result<RiskSnapshot, RecaptureError> {
        self.risk.analyze(subject_id).await
    }

    pub async fn recommended_authorities(
        &self,
        subject_id: Uuid,
        top_n: usize,
    ) -> Result<AuthorityRecommendations, RecaptureError> {
        self.authorities.recommend(subject_id, top_n).await
    }
}
