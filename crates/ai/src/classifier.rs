use liteaidetect_core::{Classification, DocumentId, Job, JobId};

use crate::result::ClassifyError;

/// Snapshot of the job fields a classifier may look at.
///
/// Classifiers receive a copy, never the stored entity, so they cannot mutate lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationRequest {
    pub job_id: JobId,
    pub document_id: DocumentId,
    pub filename: String,
    pub size_bytes: u64,
    pub language: Option<String>,
    pub storage_key: String,
}

impl From<&Job> for ClassificationRequest {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.id,
            document_id: job.document_id,
            filename: job.filename.clone(),
            size_bytes: job.size_bytes,
            language: job.language.clone(),
            storage_key: job.storage_key.clone(),
        }
    }
}

/// A document classifier.
///
/// Called once per run, at the end of the RUNNING phase. Must be cheap enough to
/// call while lifecycle locks are held; real inference belongs behind a queue.
pub trait Classifier: Send + Sync + 'static {
    /// Tag stamped on every job this classifier analyses.
    fn model_version(&self) -> &str;

    /// Classify one document.
    fn classify(&self, request: &ClassificationRequest) -> Result<Classification, ClassifyError>;
}
