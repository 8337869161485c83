//! Prediction result types.
//!
//! Represents the verdict of the lung disease classifier.

use serde::{Deserialize, Serialize};

/// Binary verdict of the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    /// Negative class (label 0)
    #[serde(rename = "NO")]
    No,
    /// Positive class (label 1): lung disease indicated
    #[serde(rename = "YES")]
    Yes,
}

impl Verdict {
    /// Map a class label to a verdict. Only 0 and 1 are valid labels.
    #[must_use]
    pub fn from_label(label: u8) -> Option<Self> {
        match label {
            0 => Some(Self::No),
            1 => Some(Self::Yes),
            _ => None,
        }
    }

    /// Class label of this verdict.
    #[must_use]
    pub fn label(&self) -> u8 {
        match self {
            Self::No => 0,
            Self::Yes => 1,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::No => "NO",
            Self::Yes => "YES",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Format a positive-class probability as a percentage with two decimals.
#[must_use]
pub fn format_confidence(probability: f64) -> String {
    format!("{:.2}%", probability * 100.0)
}

/// Outcome of one prediction request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// "YES" or "NO"
    #[serde(rename = "prediction")]
    pub label: Verdict,

    /// Positive-class probability (0.0 to 1.0)
    pub probability: f64,

    /// Positive-class probability as a percentage string, e.g. "83.42%"
    #[serde(rename = "confidence")]
    pub confidence_percent: String,
}

impl PredictionResult {
    /// Create a result from a verdict and the positive-class probability.
    #[must_use]
    pub fn new(label: Verdict, probability: f64) -> Self {
        Self {
            label,
            probability,
            confidence_percent: format_confidence(probability),
        }
    }

    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.label == Verdict::Yes
    }
}
