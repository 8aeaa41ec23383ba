use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecaptureError {
    #[error("Connector {connector} failed to fetch: {message}")]
    ConnectorFetch { connector: String, message: String },

    #[error("Failed to process record {external_id}: {message}")]
    RecordProcessing { external_id: String, message: String },

    #[error("Subject not found: {0}")]
    SubjectNotFound(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Classifier error: {0}")]
    Classifier(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl RecaptureError {
    /// Wrap a collaborator failure raised while talking to the store.
    pub fn store(err: impl std::fmt::Display) -> Self {
        RecaptureError::Store(format!("{err:#}"))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RecaptureError::SubjectNotFound(_))
    }
}
