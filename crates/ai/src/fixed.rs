use liteaidetect_core::{Classification, FeatureSummary, DEFAULT_MODEL_VERSION};

use crate::classifier::{ClassificationRequest, Classifier};
use crate::result::ClassifyError;

/// Deterministic classifier: always returns the same verdict (or the same failure).
///
/// Handy for tests and demos where synthetic randomness gets in the way.
#[derive(Debug, Clone)]
pub struct FixedClassifier {
    model_version: String,
    outcome: Result<Classification, ClassifyError>,
}

impl FixedClassifier {
    /// Always classify with probability `p`.
    ///
    /// Out-of-range values are clamped into `[0, 1]`.
    pub fn probability(p: f64) -> Self {
        let p = if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) };
        let outcome = Classification::new(p, FeatureSummary::new())
            .map_err(|e| ClassifyError::Internal(e.to_string()));
        Self {
            model_version: DEFAULT_MODEL_VERSION.to_string(),
            outcome,
        }
    }

    /// Always fail with `InferenceFailed(message)`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            model_version: DEFAULT_MODEL_VERSION.to_string(),
            outcome: Err(ClassifyError::InferenceFailed(message.into())),
        }
    }

    pub fn with_model_version(mut self, model_version: impl Into<String>) -> Self {
        self.model_version = model_version.into();
        self
    }
}

impl Classifier for FixedClassifier {
    fn model_version(&self) -> &str {
        &self.model_version
    }

    fn classify(&self, _request: &ClassificationRequest) -> Result<Classification, ClassifyError> {
        self.outcome.clone()
    }
}
