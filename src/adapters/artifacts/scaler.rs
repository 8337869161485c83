//! Standard scaler export: `z = (x - mean) / scale` per dimension.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{check_finite, check_schema_version, default_schema_version, read_json_artifact};
use super::{DigestManifest, LoadError};
use crate::ports::{check_vector, FeatureScaler, InferenceError, InferenceStep};

const ARTIFACT: &str = "scaler";

/// Mean/scale statistics fixed at training time.
///
/// Matches the JSON written by the training export:
/// `{"schema_version": 1, "feature_names": [...], "mean": [...], "scale": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_names: Option<Vec<String>>,
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    /// Create a scaler from explicit statistics.
    ///
    /// # Errors
    /// Returns [`LoadError::InvalidParameter`] on mismatched lengths,
    /// non-finite values or a zero scale.
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Result<Self, LoadError> {
        let scaler = Self {
            schema_version: default_schema_version(),
            feature_names: None,
            mean,
            scale,
        };
        scaler.check_parameters()?;
        Ok(scaler)
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

    /// Load a scaler export from disk.
    ///
    /// # Errors
    /// Returns [`LoadError`] if the file is missing, corrupt, fails the
    /// manifest digest or carries invalid statistics.
    pub fn load(path: &Path, manifest: Option<&DigestManifest>) -> Result<Self, LoadError> {
        let scaler: Self = read_json_artifact(path, manifest)?;
        check_schema_version(path, scaler.schema_version)?;
        scaler.check_parameters()?;

        tracing::info!(
            path = %path.display(),
            n_features = scaler.mean.len(),
            "Loaded scaler"
        );
        Ok(scaler)
    }

    fn check_parameters(&self) -> Result<(), LoadError> {
        let n = self.mean.len();
        if n == 0 {
            return Err(LoadError::InvalidParameter {
                artifact: ARTIFACT,
                message: "no features".into(),
            });
        }
        if self.scale.len() != n {
            return Err(LoadError::InvalidParameter {
                artifact: ARTIFACT,
                message: format!("mean has {n} entries, scale has {}", self.scale.len()),
            });
        }
        if let Some(names) = &self.feature_names {
            if names.len() != n {
                return Err(LoadError::InvalidParameter {
                    artifact: ARTIFACT,
                    message: format!("{} feature names for {n} features", names.len()),
                });
            }
        }
        check_finite(ARTIFACT, "mean", &self.mean)?;
        check_finite(ARTIFACT, "scale", &self.scale)?;
        if let Some(i) = self.scale.iter().position(|s| *s == 0.0) {
            return Err(LoadError::InvalidParameter {
                artifact: ARTIFACT,
                message: format!("scale[{i}] is zero"),
            });
        }
        Ok(())
    }
}

impl FeatureScaler for StandardScaler {
    fn n_features_in(&self) -> usize {
        self.mean.len()
    }

    fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    fn transform(&self, values: &[f64]) -> Result<Vec<f64>, InferenceError> {
        check_vector(InferenceStep::Scale, values, self.mean.len())?;

        let out: Vec<f64> = values
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (mean, scale))| (x - mean) / scale)
            .collect();

        check_vector(InferenceStep::Scale, &out, self.mean.len())?;
        Ok(out)
    }
}
