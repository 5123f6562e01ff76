//! Analysis job system: storage, simulated lifecycle, and read-side queries.
//!
//! ## Design
//!
//! - Jobs live in a [`JobStore`]; the store exclusively owns every record
//! - The [`LifecycleSimulator`] is the only writer after creation and drives
//!   QUEUED -> RUNNING -> DONE on revocable timers
//! - Listing and dashboard aggregation are pure reads over a store scan
//!
//! ## Components
//!
//! - `store`: `JobStore` trait and the in-memory implementation
//! - `clock` / `timers`: injectable time source and per-job revocable timers
//! - `simulator`: lifecycle driver (enqueue, cancel, rerun)
//! - `events`: broadcast of applied transitions
//! - `query` / `dashboard`: list/filter/paginate and aggregate metrics
//! - `service`: `JobService` façade used by the API

pub mod clock;
pub mod dashboard;
pub mod events;
pub mod query;
pub mod service;
pub mod simulator;
pub mod store;
pub mod timers;

pub use clock::{Clock, SystemClock, TokioClock};
pub use dashboard::{
    DailyCount, DashboardMetrics, HistogramBucket, LabelCount, LanguageCount, LatencyStats,
    QueueDepth, StatusTotals, VersionCount, HISTOGRAM_BUCKETS,
};
pub use events::{JobEvent, JobEvents};
pub use query::{JobPage, JobQuery, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use service::{JobService, UploadedFile};
pub use simulator::{
    DelayRange, InvalidDelayRange, LifecycleError, LifecycleSimulator, SimulatorBuilder,
    SimulatorConfig, TransitionReport,
};
pub use store::{InMemoryJobStore, JobStore, JobStoreError};
pub use timers::{Ticket, TimerTable};
