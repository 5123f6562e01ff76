//! Randomized stand-in for a real detection model.

use std::ops::Range;
use std::sync::{Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use liteaidetect_core::{Classification, FeatureSummary, DEFAULT_MODEL_VERSION};

use crate::classifier::{ClassificationRequest, Classifier};
use crate::result::ClassifyError;

/// Synthetic AI probabilities are drawn uniformly from this range.
pub const PROBABILITY_RANGE: Range<f64> = 0.15..0.85;

/// Half-open range and precision of one synthetic diagnostic feature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureRange {
    pub name: &'static str,
    pub min: f64,
    pub max: f64,
    /// Decimal places kept; `0` floors to an integer.
    pub decimals: u32,
}

pub const FEATURE_RANGES: [FeatureRange; 5] = [
    FeatureRange { name: "avg_word_len", min: 3.0, max: 6.0, decimals: 2 },
    FeatureRange { name: "ttr", min: 0.3, max: 0.7, decimals: 2 },
    FeatureRange { name: "punctuation_ratio", min: 0.05, max: 0.15, decimals: 3 },
    FeatureRange { name: "ngram_sparsity", min: 0.2, max: 0.8, decimals: 2 },
    FeatureRange { name: "sentence_len_mean", min: 10.0, max: 25.0, decimals: 0 },
];

/// Classifier that fabricates plausible-looking output.
///
/// Never fails. Seed it for reproducible runs.
#[derive(Debug)]
pub struct SyntheticClassifier {
    model_version: String,
    rng: Mutex<StdRng>,
}

impl SyntheticClassifier {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            model_version: DEFAULT_MODEL_VERSION.to_string(),
            rng: Mutex::new(rng),
        }
    }

    pub fn with_model_version(mut self, model_version: impl Into<String>) -> Self {
        self.model_version = model_version.into();
        self
    }
}

impl Default for SyntheticClassifier {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Classifier for SyntheticClassifier {
    fn model_version(&self) -> &str {
        &self.model_version
    }

    fn classify(&self, request: &ClassificationRequest) -> Result<Classification, ClassifyError> {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);

        let p = round_within(
            rng.random_range(PROBABILITY_RANGE),
            3,
            PROBABILITY_RANGE.start,
            PROBABILITY_RANGE.end,
        );

        let mut features = FeatureSummary::new();
        for range in FEATURE_RANGES {
            let raw = rng.random_range(range.min..range.max);
            features.insert(range.name, round_within(raw, range.decimals, range.min, range.max));
        }

        debug!(job_id = %request.job_id, ai_probability = p, "synthetic classification");
        Classification::new(p, features).map_err(|e| ClassifyError::Internal(e.to_string()))
    }
}

/// Round `raw` to `decimals` places (floor when `decimals == 0`) and keep the result in `[min, max)`.
fn round_within(raw: f64, decimals: u32, min: f64, max: f64) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    let mut value = if decimals == 0 {
        raw.floor()
    } else {
        (raw * scale).round() / scale
    };
    if value >= max {
        value = ((max * scale).round() - 1.0) / scale;
    }
    value.max(min)
}
