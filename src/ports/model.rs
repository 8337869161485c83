//! Model ports: Traits for the two trained artifacts.
//!
//! The pipeline treats the scaler and the classifier as black boxes. Any
//! export format (or a test double) can be plugged in by implementing these
//! traits.

/// Pipeline step that produced an [`InferenceError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferenceStep {
    Scale,
    Assemble,
    Classify,
}

impl std::fmt::Display for InferenceStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scale => write!(f, "scale"),
            Self::Assemble => write!(f, "assemble"),
            Self::Classify => write!(f, "classify"),
        }
    }
}

/// Errors raised while running a single prediction.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InferenceError {
    #[error("{step}: expected {expected} values, got {got}")]
    Shape {
        step: InferenceStep,
        expected: usize,
        got: usize,
    },

    #[error("{step}: non-finite value at position {index}")]
    NonFinite { step: InferenceStep, index: usize },

    #[error("classify: invalid class label {0}")]
    InvalidLabel(u8),

    #[error("classify: probability {0} outside [0, 1]")]
    InvalidProbability(f64),

    #[error("classify: label {label} disagrees with probability {probability} at threshold {threshold}")]
    Inconsistent {
        label: u8,
        probability: f64,
        threshold: f64,
    },

    #[error("{step}: {message}")]
    Artifact { step: InferenceStep, message: String },
}

impl InferenceError {
    /// Step of the pipeline that failed.
    #[must_use]
    pub fn step(&self) -> InferenceStep {
        match self {
            Self::Shape { step, .. } | Self::NonFinite { step, .. } | Self::Artifact { step, .. } => {
                *step
            }
            Self::InvalidLabel(_) | Self::InvalidProbability(_) | Self::Inconsistent { .. } => {
                InferenceStep::Classify
            }
        }
    }
}

/// Fitted transform for the numeric features.
///
/// Implementations must be immutable after construction; they are shared
/// across requests without locking.
pub trait FeatureScaler: Send + Sync {
    /// Number of values accepted by [`transform`](Self::transform).
    fn n_features_in(&self) -> usize;

    /// Column names seen at fit time, when the export recorded them.
    fn feature_names(&self) -> Option<&[String]> {
        None
    }

    /// Normalize one vector of raw magnitudes.
    ///
    /// # Errors
    /// Returns [`InferenceError`] if the input has the wrong length or the
    /// transform fails.
    fn transform(&self, values: &[f64]) -> Result<Vec<f64>, InferenceError>;
}

/// Trained binary classifier over the assembled feature vector.
pub trait RiskClassifier: Send + Sync {
    /// Length of the feature vector expected by the model.
    fn n_features_in(&self) -> usize;

    /// Column names seen at fit time, when the export recorded them.
    fn feature_names(&self) -> Option<&[String]> {
        None
    }

    /// Positive-class probability above which the label is 1.
    fn decision_threshold(&self) -> f64 {
        0.5
    }

    /// Predicted class label (0 or 1).
    ///
    /// # Errors
    /// Returns [`InferenceError`] if the vector cannot be scored.
    fn predict(&self, features: &[f64]) -> Result<u8, InferenceError>;

    /// Probability of the positive class.
    ///
    /// # Errors
    /// Returns [`InferenceError`] if the vector cannot be scored.
    fn predict_proba(&self, features: &[f64]) -> Result<f64, InferenceError>;
}

/// Check that `values` has length `expected` and only finite entries.
///
/// # Errors
/// Returns [`InferenceError::Shape`] or [`InferenceError::NonFinite`].
pub fn check_vector(
    step: InferenceStep,
    values: &[f64],
    expected: usize,
) -> Result<(), InferenceError> {
    if values.len() != expected {
        return Err(InferenceError::Shape {
            step,
            expected,
            got: values.len(),
        });
    }
    if let Some(index) = values.iter().position(|v| !v.is_finite()) {
        return Err(InferenceError::NonFinite { step, index });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_vector() {
        assert!(check_vector(InferenceStep::Scale, &[1.0, 2.0], 2).is_ok());

        let err = check_vector(InferenceStep::Scale, &[1.0], 2).expect_err("must fail");
        assert_eq!(err.step(), InferenceStep::Scale);
        assert_eq!(err.to_string(), "scale: expected 2 values, got 1");

        let err = check_vector(InferenceStep::Classify, &[1.0, f64::NAN], 2).expect_err("must fail");
        assert_eq!(
            err,
            InferenceError::NonFinite {
                step: InferenceStep::Classify,
                index: 1
            }
        );
    }
}
