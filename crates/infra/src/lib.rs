//! Infrastructure layer: job storage, the simulated lifecycle, and read-side queries.

pub mod jobs;

pub use jobs::{
    DashboardMetrics, InMemoryJobStore, JobEvent, JobPage, JobQuery, JobService, JobStore,
    LifecycleError, LifecycleSimulator, SimulatorConfig, TransitionReport, UploadedFile,
};
