//! The analysis job entity and its lifecycle state machine.

use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classification::{Classification, FeatureSummary, Label};
use crate::error::{DomainError, DomainResult};
use crate::id::{DocumentId, JobId};

/// Model tag stamped on jobs when no classifier-specific version is supplied.
pub const DEFAULT_MODEL_VERSION: &str = "cnn-1d-onnx@0.1.0";

/// Lifecycle status of a job.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// Theoretical initial state; jobs are created directly in `Queued`.
    Pending,
    Queued,
    Running,
    Done,
    /// Classification failed.
    Error,
    Cancelled,
}

impl JobStatus {
    pub const ALL: [JobStatus; 6] = [
        JobStatus::Pending,
        JobStatus::Queued,
        JobStatus::Running,
        JobStatus::Done,
        JobStatus::Error,
        JobStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Queued => "QUEUED",
            JobStatus::Running => "RUNNING",
            JobStatus::Done => "DONE",
            JobStatus::Error => "ERROR",
            JobStatus::Cancelled => "CANCELLED",
        }
    }

    /// Cancel is only honoured while work is outstanding.
    pub fn is_cancellable(&self) -> bool {
        matches!(self, JobStatus::Queued | JobStatus::Running)
    }

    /// Rerun is only honoured once a run has ended, successfully or not.
    pub fn is_rerunnable(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error | JobStatus::Cancelled)
    }
}

impl core::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        JobStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| DomainError::validation(format!("unknown job status: {wanted}")))
    }
}

/// Caller-supplied description of a document to analyse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewJob {
    pub filename: String,
    pub size_bytes: u64,
    pub language: Option<String>,
}

impl NewJob {
    pub fn new(filename: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            filename: filename.into(),
            size_bytes,
            language: None,
        }
    }

    pub fn with_language(mut self, language: Option<String>) -> Self {
        self.language = language.filter(|l| !l.trim().is_empty());
        self
    }
}

/// One document analysis request and its lifecycle state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub document_id: DocumentId,
    pub filename: String,
    pub size_bytes: u64,
    pub language: Option<String>,
    pub status: JobStatus,
    pub ai_probability: Option<f64>,
    pub label: Option<Label>,
    pub model_version: String,
    /// Object key the uploaded document would be stored under.
    #[serde(rename = "s3_key")]
    pub storage_key: String,
    pub created_at: DateTime<Utc>,
    pub queued_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub latency_ms: Option<u64>,
    pub error_msg: Option<String>,
    pub feature_summary: Option<FeatureSummary>,
}

impl Job {
    /// Create a job that is immediately queued (`queued_at == created_at`).
    pub fn new(draft: NewJob, model_version: impl Into<String>, now: DateTime<Utc>) -> Self {
        let id = JobId::new();
        let storage_key = format!("mock/{}/{}", id, draft.filename);
        Self {
            id,
            document_id: DocumentId::new(),
            filename: draft.filename,
            size_bytes: draft.size_bytes,
            language: draft.language,
            status: JobStatus::Queued,
            ai_probability: None,
            label: None,
            model_version: model_version.into(),
            storage_key,
            created_at: now,
            queued_at: Some(now),
            started_at: None,
            finished_at: None,
            latency_ms: None,
            error_msg: None,
            feature_summary: None,
        }
    }

    /// Stored label, or the threshold rule applied to a stored probability.
    pub fn effective_label(&self) -> Option<Label> {
        self.label
            .or_else(|| self.ai_probability.map(Label::from_probability))
    }

    /// QUEUED -> RUNNING.
    pub fn start(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status != JobStatus::Queued {
            return Err(DomainError::invalid_transition(self.status, "start"));
        }
        self.started_at = Some(not_before(now, self.queued_at));
        self.status = JobStatus::Running;
        Ok(())
    }

    /// RUNNING -> DONE, recording the classification and the running-phase latency.
    pub fn complete(&mut self, outcome: Classification, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status != JobStatus::Running {
            return Err(DomainError::invalid_transition(self.status, "complete"));
        }
        let finished = not_before(now, self.started_at);
        self.latency_ms = self
            .started_at
            .map(|started| (finished - started).num_milliseconds().max(0) as u64);
        self.finished_at = Some(finished);
        self.ai_probability = Some(outcome.ai_probability);
        self.label = Some(outcome.label);
        self.feature_summary = Some(outcome.feature_summary);
        self.error_msg = None;
        self.status = JobStatus::Done;
        Ok(())
    }

    /// RUNNING -> ERROR. A failed job never carries a probability or label.
    pub fn fail(&mut self, message: impl Into<String>, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status != JobStatus::Running {
            return Err(DomainError::invalid_transition(self.status, "fail"));
        }
        self.finished_at = Some(not_before(now, self.started_at));
        self.error_msg = Some(message.into());
        self.clear_results();
        self.status = JobStatus::Error;
        Ok(())
    }

    /// QUEUED | RUNNING -> CANCELLED.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if !self.status.is_cancellable() {
            return Err(DomainError::invalid_transition(self.status, "cancel"));
        }
        self.finished_at = Some(not_before(now, self.started_at.or(self.queued_at)));
        self.status = JobStatus::Cancelled;
        Ok(())
    }

    /// DONE | ERROR | CANCELLED -> QUEUED, wiping everything the previous run produced.
    pub fn rerun(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if !self.status.is_rerunnable() {
            return Err(DomainError::invalid_transition(self.status, "rerun"));
        }
        self.queued_at = Some(not_before(now, Some(self.created_at)));
        self.started_at = None;
        self.finished_at = None;
        self.error_msg = None;
        self.clear_results();
        self.status = JobStatus::Queued;
        Ok(())
    }

    /// Verify the entity invariants. Used by tests and debug assertions.
    pub fn check_invariants(&self) -> DomainResult<()> {
        let chain = [Some(self.created_at), self.queued_at, self.started_at, self.finished_at];
        let mut last = None;
        for ts in chain.into_iter().flatten() {
            if last.is_some_and(|prev| ts < prev) {
                return Err(DomainError::validation("timestamps are not monotonic"));
            }
            last = Some(ts);
        }

        if self.ai_probability.is_some() != self.label.is_some() {
            return Err(DomainError::validation(
                "ai_probability and label must be set together",
            ));
        }
        if let (Some(p), Some(label)) = (self.ai_probability, self.label) {
            if Label::from_probability(p) != label {
                return Err(DomainError::validation("label does not match ai_probability"));
            }
        }
        if self.status == JobStatus::Error && self.ai_probability.is_some() {
            return Err(DomainError::validation("failed job carries a classification"));
        }
        if self.status != JobStatus::Done
            && (self.latency_ms.is_some() || self.feature_summary.is_some())
        {
            return Err(DomainError::validation("result fields set outside DONE"));
        }
        Ok(())
    }

    fn clear_results(&mut self) {
        self.ai_probability = None;
        self.label = None;
        self.latency_ms = None;
        self.feature_summary = None;
    }
}

fn not_before(now: DateTime<Utc>, floor: Option<DateTime<Utc>>) -> DateTime<Utc> {
    match floor {
        Some(floor) if floor > now => floor,
        _ => now,
    }
}
