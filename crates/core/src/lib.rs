//! `liteaidetect-core`: domain foundation for document analysis jobs.
//!
//! This crate contains **pure domain** primitives (no runtime, storage or
//! transport concerns). Every timestamp is passed in by the caller so the
//! state machine stays deterministic under test.

pub mod classification;
pub mod error;
pub mod id;
pub mod job;

pub use classification::{Classification, FeatureSummary, Label};
pub use error::{DomainError, DomainResult};
pub use id::{DocumentId, JobId};
pub use job::{Job, JobStatus, NewJob, DEFAULT_MODEL_VERSION};
