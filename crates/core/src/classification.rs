//! Classification outcome types shared by classifiers and the job entity.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Probability at or above which a document is labelled AI-generated.
pub const AI_THRESHOLD: f64 = 0.7;

/// Probability at or below which a document is labelled human-written.
pub const HUMAN_THRESHOLD: f64 = 0.3;

/// Classification tag derived from an AI probability.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Label {
    Ai,
    Human,
    Uncertain,
}

impl Label {
    /// Threshold rule: `p >= 0.7` is AI, `p <= 0.3` is human, anything between is uncertain.
    pub fn from_probability(p: f64) -> Self {
        if p >= AI_THRESHOLD {
            Label::Ai
        } else if p <= HUMAN_THRESHOLD {
            Label::Human
        } else {
            Label::Uncertain
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Ai => "AI",
            Label::Human => "HUMAN",
            Label::Uncertain => "UNCERTAIN",
        }
    }
}

impl core::fmt::Display for Label {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named numeric diagnostics produced alongside a classification
/// (average word length, type-token ratio, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureSummary(BTreeMap<String, f64>);

impl FeatureSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_feature(mut self, name: impl Into<String>, value: f64) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Result of classifying one document.
///
/// The label is always derived from the probability, so the pair cannot drift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub ai_probability: f64,
    pub label: Label,
    pub feature_summary: FeatureSummary,
}

impl Classification {
    pub fn new(ai_probability: f64, feature_summary: FeatureSummary) -> DomainResult<Self> {
        if !(0.0..=1.0).contains(&ai_probability) {
            return Err(DomainError::validation(format!(
                "ai_probability must be within [0, 1], got {ai_probability}"
            )));
        }
        Ok(Self {
            ai_probability,
            label: Label::from_probability(ai_probability),
            feature_summary,
        })
    }
}
