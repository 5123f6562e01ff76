use thiserror::Error;

/// Why a document could not be classified.
///
/// Surfaced on the job as `status = ERROR` with `error_msg` set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifyError {
    #[error("inference failed: {0}")]
    InferenceFailed(String),

    #[error("internal error: {0}")]
    Internal(String),
}
