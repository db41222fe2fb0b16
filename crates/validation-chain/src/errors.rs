use thiserror::Error;

/// Failure of an external lookup (subject directory, course store).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),
    #[error("collaborator backend error: {0}")]
    Backend(String),
}

/// Errors that abort a pipeline run. Policy rejections are not errors; they
/// are recorded on the request.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("request {request_id} already carries a decision")]
    AlreadyDecided { request_id: String },
    #[error("stage {stage} failed: {source}")]
    Collaborator {
        stage: &'static str,
        #[source]
        source: CollaboratorError,
    },
}

impl ChainError {
    pub fn collaborator(stage: &'static str, source: CollaboratorError) -> Self {
        ChainError::Collaborator { stage, source }
    }

    /// Collaborator outages may succeed on retry; a re-entry never will.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ChainError::Collaborator { .. })
    }
}
