//! Application-facing façade over the store, simulator and aggregations.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::info;

use liteaidetect_ai::Classifier;
use liteaidetect_core::{DomainError, Job, JobId, NewJob};

use super::dashboard::DashboardMetrics;
use super::events::JobEvent;
use super::query::{JobPage, JobQuery};
use super::simulator::{LifecycleError, LifecycleSimulator, SimulatorConfig, TransitionReport};
use super::store::{InMemoryJobStore, JobStore};

/// One file of an upload batch. Only metadata is kept; contents are discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub filename: String,
    pub size_bytes: u64,
}

impl UploadedFile {
    pub fn new(filename: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            filename: filename.into(),
            size_bytes,
        }
    }
}

/// Entry point for creating, listing and steering analysis jobs.
pub struct JobService<S: JobStore + 'static> {
    simulator: LifecycleSimulator<S>,
}

impl<S: JobStore + 'static> Clone for JobService<S> {
    fn clone(&self) -> Self {
        Self {
            simulator: self.simulator.clone(),
        }
    }
}

impl JobService<Arc<InMemoryJobStore>> {
    /// In-memory service on the current tokio runtime.
    pub fn in_memory(
        classifier: Arc<dyn Classifier>,
        config: SimulatorConfig,
    ) -> Result<Self, LifecycleError> {
        let simulator = LifecycleSimulator::builder(InMemoryJobStore::arc(), classifier)
            .config(config)
            .build()?;
        Ok(Self::new(simulator))
    }
}

impl<S: JobStore + 'static> JobService<S> {
    pub fn new(simulator: LifecycleSimulator<S>) -> Self {
        Self { simulator }
    }

    pub fn simulator(&self) -> &LifecycleSimulator<S> {
        &self.simulator
    }

    /// Create one QUEUED job per file, in input order.
    ///
    /// The whole batch is validated before any job is created.
    pub fn create_jobs(
        &self,
        files: Vec<UploadedFile>,
        language: Option<String>,
    ) -> Result<Vec<Job>, LifecycleError> {
        if files.is_empty() {
            return Err(DomainError::validation("at least one file is required").into());
        }
        if let Some(blank) = files.iter().position(|f| f.filename.trim().is_empty()) {
            return Err(DomainError::validation(format!("file #{blank} has no filename")).into());
        }

        let jobs = files
            .into_iter()
            .map(|file| {
                let draft = NewJob::new(file.filename, file.size_bytes)
                    .with_language(language.clone());
                self.simulator.enqueue(draft)
            })
            .collect::<Result<Vec<_>, _>>()?;

        info!(count = jobs.len(), language = ?language, "batch accepted");
        Ok(jobs)
    }

    pub fn list_jobs(&self, query: &JobQuery) -> Result<JobPage, LifecycleError> {
        let jobs = self.simulator.store().scan()?;
        Ok(query.apply(jobs))
    }

    pub fn get_job(&self, job_id: JobId) -> Result<Option<Job>, LifecycleError> {
        Ok(self.simulator.store().get(job_id)?)
    }

    pub fn cancel_job(&self, job_id: JobId) -> Result<TransitionReport, LifecycleError> {
        self.simulator.cancel(job_id)
    }

    pub fn rerun_job(&self, job_id: JobId) -> Result<TransitionReport, LifecycleError> {
        self.simulator.rerun(job_id)
    }

    pub fn dashboard(&self) -> Result<DashboardMetrics, LifecycleError> {
        let jobs = self.simulator.store().scan()?;
        Ok(DashboardMetrics::compute(&jobs))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.simulator.events().subscribe()
    }

    /// Stop all pending lifecycle timers.
    pub fn shutdown(&self) -> usize {
        self.simulator.shutdown()
    }
}
