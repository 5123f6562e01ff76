//! Lifecycle change notifications.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

use liteaidetect_core::{Job, JobId, JobStatus};

/// Published after every applied lifecycle transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobEvent {
    pub job_id: JobId,
    pub status: JobStatus,
    pub at: DateTime<Utc>,
}

impl JobEvent {
    pub fn from_job(job: &Job, at: DateTime<Utc>) -> Self {
        Self {
            job_id: job.id,
            status: job.status,
            at,
        }
    }
}

/// Lossy fan-out of [`JobEvent`]s; slow subscribers miss events rather than
/// slowing the lifecycle down.
#[derive(Debug, Clone)]
pub struct JobEvents {
    tx: broadcast::Sender<JobEvent>,
}

impl JobEvents {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn publish(&self, event: JobEvent) {
        // No subscribers is fine.
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.tx.subscribe()
    }
}

impl Default for JobEvents {
    fn default() -> Self {
        Self::new(256)
    }
}
