//! Revocable per-job timers.
//!
//! Every armed job owns exactly one spawned task and a [`Ticket`]. A task may
//! only act while its ticket is still the one in the table, and the table is
//! only inspected under the owner's lock, so a revoked task can never apply a
//! stale transition even if it already woke up.

use std::collections::HashMap;
use std::future::Future;

use tokio::runtime::Handle;
use tokio::task::AbortHandle;

use liteaidetect_core::JobId;

/// Identity of one armed timer sequence.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Ticket(u64);

impl core::fmt::Display for Ticket {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug)]
struct Armed {
    ticket: Ticket,
    handle: AbortHandle,
}

/// Table of armed timer tasks, one per job.
///
/// Not synchronised on its own; callers keep it behind the lock that also
/// serialises lifecycle writes.
#[derive(Debug, Default)]
pub struct TimerTable {
    armed: HashMap<JobId, Armed>,
    next_ticket: u64,
}

impl TimerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn the task built by `make` and make it the job's only armed timer.
    ///
    /// A previously armed task for the same job is aborted.
    pub fn arm<F, Fut>(&mut self, runtime: &Handle, job_id: JobId, make: F) -> Ticket
    where
        F: FnOnce(Ticket) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.next_ticket += 1;
        let ticket = Ticket(self.next_ticket);
        let handle = runtime.spawn(make(ticket)).abort_handle();
        if let Some(previous) = self.armed.insert(job_id, Armed { ticket, handle }) {
            previous.handle.abort();
        }
        ticket
    }

    /// Whether `ticket` is still the armed timer for `job_id`.
    pub fn is_current(&self, job_id: JobId, ticket: Ticket) -> bool {
        self.armed
            .get(&job_id)
            .is_some_and(|armed| armed.ticket == ticket)
    }

    /// Called by a task that ran to completion; only removes its own entry.
    pub fn disarm(&mut self, job_id: JobId, ticket: Ticket) -> bool {
        if self.is_current(job_id, ticket) {
            self.armed.remove(&job_id);
            true
        } else {
            false
        }
    }

    /// Remove and abort whatever is armed for `job_id`.
    pub fn revoke(&mut self, job_id: JobId) -> bool {
        match self.armed.remove(&job_id) {
            Some(armed) => {
                armed.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Revoke every armed timer; returns how many were pending.
    pub fn revoke_all(&mut self) -> usize {
        let count = self.armed.len();
        for (_, armed) in self.armed.drain() {
            armed.handle.abort();
        }
        count
    }

    pub fn len(&self) -> usize {
        self.armed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.armed.is_empty()
    }
}
