//! Lifecycle simulator: drives jobs QUEUED -> RUNNING -> DONE on randomized timers.
//!
//! ## Model
//!
//! - Creating (or rerunning) a job arms one timer task that sleeps through the
//!   queue delay, starts the job, sleeps through the run delay, then asks the
//!   [`Classifier`] for a verdict.
//! - Every write happens while holding the timer-table lock, after checking the
//!   task's [`Ticket`] is still current. Cancel and rerun revoke the ticket under
//!   that same lock, so a revoked transition can never land.
//! - Lock order is always timers -> store (-> rng).

use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};

use liteaidetect_ai::{ClassificationRequest, Classifier};
use liteaidetect_core::{DomainError, Job, JobId, NewJob};

use super::clock::{Clock, TokioClock};
use super::events::{JobEvent, JobEvents};
use super::store::{JobStore, JobStoreError};
use super::timers::{Ticket, TimerTable};

/// Uniform delay range `[min_ms, max_ms)`. `min_ms == max_ms` means a fixed delay.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    pub const fn fixed(ms: u64) -> Self {
        Self::new(ms, ms)
    }

    pub fn sample<R: Rng>(&self, rng: &mut R) -> Duration {
        let ms = if self.max_ms <= self.min_ms {
            self.min_ms
        } else {
            rng.random_range(self.min_ms..self.max_ms)
        };
        Duration::from_millis(ms)
    }
}

impl core::fmt::Display for DelayRange {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}-{}", self.min_ms, self.max_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid delay range {0:?}: expected `<min_ms>-<max_ms>` or `<ms>`")]
pub struct InvalidDelayRange(pub String);

impl FromStr for DelayRange {
    type Err = InvalidDelayRange;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidDelayRange(s.to_string());
        let parse = |part: &str| part.trim().parse::<u64>().map_err(|_| invalid());

        match s.split_once('-') {
            Some((min, max)) => {
                let range = DelayRange::new(parse(min)?, parse(max)?);
                if range.max_ms < range.min_ms {
                    return Err(invalid());
                }
                Ok(range)
            }
            None => Ok(DelayRange::fixed(parse(s)?)),
        }
    }
}

/// Timing knobs for the simulator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Delay before QUEUED -> RUNNING (used for both creation and rerun).
    pub queue_delay: DelayRange,
    /// Delay before RUNNING -> DONE.
    pub run_delay: DelayRange,
    /// Seed for delay sampling; `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            queue_delay: DelayRange::new(600, 1_600),
            run_delay: DelayRange::new(1_200, 3_000),
            seed: None,
        }
    }
}

/// Mixed into the configured seed so delay draws never replay the stream of a
/// classifier seeded with the same value.
const DELAY_SEED_SALT: u64 = 0x9e37_79b9_7f4a_7c15;

fn delay_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed ^ DELAY_SEED_SALT),
        None => StdRng::from_os_rng(),
    }
}

/// Lifecycle error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("job not found: {0}")]
    NotFound(JobId),
    #[error(transparent)]
    Store(#[from] JobStoreError),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("no tokio runtime available to schedule lifecycle timers")]
    NoRuntime,
}

/// Outcome of a cancel/rerun request.
///
/// `applied == false` means the job was not in an eligible state; it is
/// returned unchanged so callers can decide whether that matters.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionReport {
    pub job: Job,
    pub applied: bool,
}

impl TransitionReport {
    fn applied(job: Job) -> Self {
        Self { job, applied: true }
    }

    fn skipped(job: Job) -> Self {
        Self { job, applied: false }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Phase {
    Start,
    Finish,
}

struct Inner<S> {
    store: S,
    classifier: Arc<dyn Classifier>,
    clock: Arc<dyn Clock>,
    events: JobEvents,
    config: SimulatorConfig,
    runtime: Handle,
    timers: Mutex<TimerTable>,
    rng: Mutex<StdRng>,
}

/// Drives jobs through their lifecycle. Cheap to clone.
pub struct LifecycleSimulator<S: JobStore + 'static> {
    inner: Arc<Inner<S>>,
}

impl<S: JobStore + 'static> Clone for LifecycleSimulator<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Builder for [`LifecycleSimulator`]; every dependency except store and
/// classifier has a default.
pub struct SimulatorBuilder<S> {
    store: S,
    classifier: Arc<dyn Classifier>,
    clock: Option<Arc<dyn Clock>>,
    events: Option<JobEvents>,
    config: SimulatorConfig,
    runtime: Option<Handle>,
}

impl<S: JobStore + 'static> SimulatorBuilder<S> {
    pub fn config(mut self, config: SimulatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn events(mut self, events: JobEvents) -> Self {
        self.events = Some(events);
        self
    }

    /// Runtime the timer tasks are spawned on (defaults to the current one).
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn build(self) -> Result<LifecycleSimulator<S>, LifecycleError> {
        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|_| LifecycleError::NoRuntime)?,
        };
        let rng = delay_rng(self.config.seed);
        // Anchor inside the runtime context so paused test time is honoured.
        let clock = match self.clock {
            Some(clock) => clock,
            None => {
                let _guard = runtime.enter();
                Arc::new(TokioClock::new()) as Arc<dyn Clock>
            }
        };

        Ok(LifecycleSimulator {
            inner: Arc::new(Inner {
                store: self.store,
                classifier: self.classifier,
                clock,
                events: self.events.unwrap_or_default(),
                config: self.config,
                runtime,
                timers: Mutex::new(TimerTable::new()),
                rng: Mutex::new(rng),
            }),
        })
    }
}

impl<S: JobStore + 'static> LifecycleSimulator<S> {
    pub fn builder(store: S, classifier: Arc<dyn Classifier>) -> SimulatorBuilder<S> {
        SimulatorBuilder {
            store,
            classifier,
            clock: None,
            events: None,
            config: SimulatorConfig::default(),
            runtime: None,
        }
    }

    pub fn store(&self) -> &S {
        &self.inner.store
    }

    pub fn events(&self) -> &JobEvents {
        &self.inner.events
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.inner.config
    }

    pub fn model_version(&self) -> &str {
        self.inner.classifier.model_version()
    }

    /// Create a QUEUED job and arm its lifecycle timers.
    pub fn enqueue(&self, draft: NewJob) -> Result<Job, LifecycleError> {
        let mut timers = self.inner.lock_timers();
        let now = self.inner.clock.now();
        let job = Job::new(draft, self.inner.classifier.model_version(), now);

        self.inner.store.insert(job.clone())?;
        let ticket = self.inner.arm(&mut timers, job.id);

        info!(
            job_id = %job.id,
            filename = %job.filename,
            size_bytes = job.size_bytes,
            %ticket,
            "job queued"
        );
        self.inner.events.publish(JobEvent::from_job(&job, now));
        Ok(job)
    }

    /// Cancel a QUEUED or RUNNING job, revoking its pending timer.
    pub fn cancel(&self, job_id: JobId) -> Result<TransitionReport, LifecycleError> {
        let mut timers = self.inner.lock_timers();
        let mut job = self
            .inner
            .store
            .get(job_id)?
            .ok_or(LifecycleError::NotFound(job_id))?;
        let now = self.inner.clock.now();

        match job.cancel(now) {
            Ok(()) => {
                let revoked = timers.revoke(job_id);
                self.inner.store.update(&job)?;
                info!(job_id = %job_id, revoked, "job cancelled");
                self.inner.events.publish(JobEvent::from_job(&job, now));
                Ok(TransitionReport::applied(job))
            }
            Err(DomainError::InvalidTransition { from, .. }) => {
                debug!(job_id = %job_id, status = %from, "cancel ignored");
                Ok(TransitionReport::skipped(job))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Reset a DONE, ERROR or CANCELLED job to QUEUED and arm a fresh run.
    pub fn rerun(&self, job_id: JobId) -> Result<TransitionReport, LifecycleError> {
        let mut timers = self.inner.lock_timers();
        let mut job = self
            .inner
            .store
            .get(job_id)?
            .ok_or(LifecycleError::NotFound(job_id))?;
        let now = self.inner.clock.now();

        match job.rerun(now) {
            Ok(()) => {
                timers.revoke(job_id);
                self.inner.store.update(&job)?;
                let ticket = self.inner.arm(&mut timers, job_id);
                info!(job_id = %job_id, %ticket, "job requeued");
                self.inner.events.publish(JobEvent::from_job(&job, now));
                Ok(TransitionReport::applied(job))
            }
            Err(DomainError::InvalidTransition { from, .. }) => {
                debug!(job_id = %job_id, status = %from, "rerun ignored");
                Ok(TransitionReport::skipped(job))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Number of jobs with a pending timer.
    pub fn armed(&self) -> usize {
        self.inner.lock_timers().len()
    }

    /// Revoke all pending timers. Jobs keep whatever status they reached.
    pub fn shutdown(&self) -> usize {
        let revoked = self.inner.lock_timers().revoke_all();
        info!(revoked, "lifecycle simulator stopped");
        revoked
    }
}

impl<S: JobStore + 'static> Inner<S> {
    fn lock_timers(&self) -> MutexGuard<'_, TimerTable> {
        self.timers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn sample_delays(&self) -> (Duration, Duration) {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        (
            self.config.queue_delay.sample(&mut *rng),
            self.config.run_delay.sample(&mut *rng),
        )
    }

    /// Arm the two-phase timer task for `job_id`. Caller holds the timer lock.
    fn arm(self: &Arc<Self>, timers: &mut TimerTable, job_id: JobId) -> Ticket {
        let (queue_delay, run_delay) = self.sample_delays();
        let inner = Arc::clone(self);

        timers.arm(&self.runtime, job_id, move |ticket| async move {
            tokio::time::sleep(queue_delay).await;
            if !inner.fire(job_id, ticket, Phase::Start) {
                return;
            }
            tokio::time::sleep(run_delay).await;
            inner.fire(job_id, ticket, Phase::Finish);
        })
    }

    /// Apply one timed transition. Returns whether the task should continue.
    fn fire(&self, job_id: JobId, ticket: Ticket, phase: Phase) -> bool {
        let mut timers = self.lock_timers();
        if !timers.is_current(job_id, ticket) {
            debug!(job_id = %job_id, %ticket, ?phase, "stale timer ignored");
            return false;
        }

        let mut job = match self.store.get(job_id) {
            Ok(Some(job)) => job,
            Ok(None) => {
                warn!(job_id = %job_id, "armed job vanished from store");
                timers.disarm(job_id, ticket);
                return false;
            }
            Err(e) => {
                error!(job_id = %job_id, error = %e, "failed to load job");
                timers.disarm(job_id, ticket);
                return false;
            }
        };

        let now = self.clock.now();
        let applied = match phase {
            Phase::Start => job.start(now),
            Phase::Finish => match self.classifier.classify(&ClassificationRequest::from(&job)) {
                Ok(outcome) => job.complete(outcome, now),
                Err(e) => {
                    warn!(job_id = %job_id, error = %e, "classification failed");
                    job.fail(e.to_string(), now)
                }
            },
        };

        if let Err(e) = applied {
            warn!(job_id = %job_id, error = %e, ?phase, "timed transition rejected");
            timers.disarm(job_id, ticket);
            return false;
        }
        if let Err(e) = self.store.update(&job) {
            error!(job_id = %job_id, error = %e, "failed to persist transition");
            timers.disarm(job_id, ticket);
            return false;
        }
        if phase == Phase::Finish {
            timers.disarm(job_id, ticket);
        }

        info!(
            job_id = %job_id,
            status = %job.status,
            latency_ms = job.latency_ms,
            ai_probability = job.ai_probability,
            "job transitioned"
        );
        self.events.publish(JobEvent::from_job(&job, now));
        phase == Phase::Start
    }
}
