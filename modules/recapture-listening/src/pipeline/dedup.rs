//! Exact, permanent dedup by external id against the persisted results.

use std::sync::Arc;

use recapture_common::RecaptureError;

use crate::traits::ListeningStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupVerdict {
    New,
    AlreadyProcessed,
}

pub struct Deduplicator {
    store: Arc<dyn ListeningStore>,
}

impl Deduplicator {
    pub fn new(store: Arc<dyn ListeningStore>) -> Self {
        Self { store }
    }

    /// A record is new until a result with its id has been persisted. Records
    /// whose write failed are never seen here, so they are retried next cycle.
    pub async fn check(&self, external_id: &str) -> Result<DedupVerdict, RecaptureError> {
        let exists = self
            .store
            .result_exists(external_id)
            .await
            .map_err(RecaptureError::store)?;
        Ok(if exists {
            DedupVerdict::AlreadyProcessed
        } else {
            DedupVerdict::New
        })
    }
}
