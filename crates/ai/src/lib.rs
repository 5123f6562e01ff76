//! `liteaidetect-ai`
//!
//! **Responsibility:** classifier boundary for document analysis.
//!
//! This crate is intentionally **not** part of the job lifecycle:
//! - It never touches the job store or timers.
//! - It turns a [`ClassificationRequest`] into a [`Classification`] or a [`ClassifyError`].
//! - Lifecycle code decides what a failure means (the job moves to `ERROR`).
//!
//! [`Classification`]: liteaidetect_core::Classification

pub mod classifier;
pub mod fixed;
pub mod result;
pub mod synthetic;

pub use classifier::{ClassificationRequest, Classifier};
pub use fixed::FixedClassifier;
pub use result::ClassifyError;
pub use synthetic::{SyntheticClassifier, FeatureRange, FEATURE_RANGES, PROBABILITY_RANGE};
