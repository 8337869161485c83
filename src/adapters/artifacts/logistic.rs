//! Logistic regression export.
//!
//! `p = sigmoid(coefficients · x + intercept)`; the class label is 1 when
//! `p` exceeds the decision threshold.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{check_finite, check_schema_version, default_schema_version, read_json_artifact};
use super::{DigestManifest, LoadError};
use crate::ports::{check_vector, InferenceError, InferenceStep, RiskClassifier};

const ARTIFACT: &str = "classifier";

/// Default threshold: equivalent to the sign of the decision function.
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Trained binary logistic-regression parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_names: Option<Vec<String>>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classes: Option<Vec<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
}

impl LogisticRegression {
    /// Create a model from explicit parameters.
    ///
    /// # Errors
    /// Returns [`LoadError::InvalidParameter`] on empty or non-finite parameters.
    pub fn new(coefficients: Vec<f64>, intercept: f64) -> Result<Self, LoadError> {
        let model = Self {
            schema_version: default_schema_version(),
            feature_names: None,
            coefficients,
            intercept,
            classes: None,
            threshold: None,
        };
        model.check_parameters()?;
        Ok(model)
    }

    /// Attach the column names seen at fit time.
    #[must_use]
    pub fn with_feature_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.feature_names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Override the decision threshold.
    ///
    /// # Errors
    /// Returns [`LoadError::InvalidParameter`] if the threshold is not in (0, 1).
    pub fn with_threshold(mut self, threshold: f64) -> Result<Self, LoadError> {
        self.threshold = Some(threshold);
        self.check_parameters()?;
        Ok(self)
    }

    /// Load a model export from disk.
    ///
    /// # Errors
    /// Returns [`LoadError`] if the file is missing, corrupt, fails the
    /// manifest digest or carries invalid parameters.
    pub fn load(path: &Path, manifest: Option<&DigestManifest>) -> Result<Self, LoadError> {
        let model: Self = read_json_artifact(path, manifest)?;
        check_schema_version(path, model.schema_version)?;
        model.check_parameters()?;

        tracing::info!(
            path = %path.display(),
            n_features = model.coefficients.len(),
            threshold = model.decision_threshold(),
            "Loaded classifier"
        );
        Ok(model)
    }

    /// Raw score `coefficients · x + intercept`.
    ///
    /// # Errors
    /// Returns [`InferenceError`] on a wrong-length or non-finite vector.
    pub fn decision_function(&self, features: &[f64]) -> Result<f64, InferenceError> {
        check_vector(InferenceStep::Classify, features, self.coefficients.len())?;
        let z = self
            .coefficients
            .iter()
            .zip(features)
            .map(|(w, x)| w * x)
            .sum::<f64>()
            + self.intercept;
        Ok(z)
    }

    fn check_parameters(&self) -> Result<(), LoadError> {
        let n = self.coefficients.len();
        if n == 0 {
            return Err(LoadError::InvalidParameter {
                artifact: ARTIFACT,
                message: "no coefficients".into(),
            });
        }
        if let Some(names) = &self.feature_names {
            if names.len() != n {
                return Err(LoadError::InvalidParameter {
                    artifact: ARTIFACT,
                    message: format!("{} feature names for {n} coefficients", names.len()),
                });
            }
        }
        check_finite(ARTIFACT, "coefficients", &self.coefficients)?;
        check_finite(ARTIFACT, "intercept", &[self.intercept])?;
        if let Some(classes) = &self.classes {
            if classes.as_slice() != [0, 1] {
                return Err(LoadError::InvalidParameter {
                    artifact: ARTIFACT,
                    message: format!("expected classes [0, 1], got {classes:?}"),
                });
            }
        }
        if let Some(t) = self.threshold {
            if !(t > 0.0 && t < 1.0) {
                return Err(LoadError::InvalidParameter {
                    artifact: ARTIFACT,
                    message: format!("threshold {t} outside (0, 1)"),
                });
            }
        }
        Ok(())
    }
}

/// Logistic function, stable for large `|z|`.
fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

impl RiskClassifier for LogisticRegression {
    fn n_features_in(&self) -> usize {
        self.coefficients.len()
    }

    fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    fn decision_threshold(&self) -> f64 {
        self.threshold.unwrap_or(DEFAULT_THRESHOLD)
    }

    fn predict(&self, features: &[f64]) -> Result<u8, InferenceError> {
        let p = self.predict_proba(features)?;
        Ok(u8::from(p > self.decision_threshold()))
    }

    fn predict_proba(&self, features: &[f64]) -> Result<f64, InferenceError> {
        let z = self.decision_function(features)?;
        let p = sigmoid(z);
        if !p.is_finite() {
            return Err(InferenceError::InvalidProbability(p));
        }
        Ok(p)
    }
}
