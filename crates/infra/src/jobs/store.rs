//! Job storage implementations.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use liteaidetect_core::{Job, JobId};

/// Job store abstraction.
pub trait JobStore: Send + Sync {
    /// Insert a newly created job.
    fn insert(&self, job: Job) -> Result<JobId, JobStoreError>;

    /// Get a job by ID.
    fn get(&self, job_id: JobId) -> Result<Option<Job>, JobStoreError>;

    /// Replace an existing job in place.
    fn update(&self, job: &Job) -> Result<(), JobStoreError>;

    /// All jobs, most recently created first.
    fn scan(&self) -> Result<Vec<Job>, JobStoreError>;

    /// Number of stored jobs.
    fn len(&self) -> Result<usize, JobStoreError>;
}

/// Job store error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobStoreError {
    #[error("job not found: {0}")]
    NotFound(JobId),
    #[error("job already exists: {0}")]
    AlreadyExists(JobId),
}

#[derive(Debug, Default)]
struct Inner {
    jobs: HashMap<JobId, Job>,
    /// Insertion order; listing walks it backwards.
    order: Vec<JobId>,
}

/// In-memory job store for tests/dev. State is lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    inner: RwLock<Inner>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl JobStore for InMemoryJobStore {
    fn insert(&self, job: Job) -> Result<JobId, JobStoreError> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if inner.jobs.contains_key(&job.id) {
            return Err(JobStoreError::AlreadyExists(job.id));
        }
        let id = job.id;
        inner.order.push(id);
        inner.jobs.insert(id, job);
        Ok(id)
    }

    fn get(&self, job_id: JobId) -> Result<Option<Job>, JobStoreError> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Ok(inner.jobs.get(&job_id).cloned())
    }

    fn update(&self, job: &Job) -> Result<(), JobStoreError> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        match inner.jobs.get_mut(&job.id) {
            Some(slot) => {
                *slot = job.clone();
                Ok(())
            }
            None => Err(JobStoreError::NotFound(job.id)),
        }
    }

    fn scan(&self) -> Result<Vec<Job>, JobStoreError> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Ok(inner
            .order
            .iter()
            .rev()
            .filter_map(|id| inner.jobs.get(id).cloned())
            .collect())
    }

    fn len(&self) -> Result<usize, JobStoreError> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Ok(inner.jobs.len())
    }
}

impl JobStore for Arc<InMemoryJobStore> {
    fn insert(&self, job: Job) -> Result<JobId, JobStoreError> {
        (**self).insert(job)
    }

    fn get(&self, job_id: JobId) -> Result<Option<Job>, JobStoreError> {
        (**self).get(job_id)
    }

    fn update(&self, job: &Job) -> Result<(), JobStoreError> {
        (**self).update(job)
    }

    fn scan(&self) -> Result<Vec<Job>, JobStoreError> {
        (**self).scan()
    }

    fn len(&self) -> Result<usize, JobStoreError> {
        (**self).len()
    }
}
