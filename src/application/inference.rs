//! Inference service: Turns raw form input into a lung disease verdict.
//!
//! This service coordinates:
//! - Validation of the raw record against the feature schema
//! - Scaling of the numeric subset
//! - Assembly of the feature vector in training column order
//! - Classification and formatting of the result

use std::collections::BTreeMap;

use serde_json::Value;

use crate::adapters::artifacts::{LogisticRegression, StandardScaler};
use crate::config::AppConfig;
use crate::domain::{
    FeatureRecord, PredictionResult, RawInput, ValidationError, ValidationMode, Verdict,
    FEATURE_COLUMNS, FEATURE_COUNT, NUMERIC_FEATURES,
};
use crate::ports::{check_vector, FeatureScaler, InferenceError, InferenceStep, RiskClassifier};
use crate::LungRiskError;

use super::store::{ArtifactStore, JsonArtifactStore};

/// Run the pipeline on one validated record.
///
/// Deterministic: the same record and artifacts always give the same result.
///
/// # Errors
/// Returns [`InferenceError`] naming the failing step. Nothing is returned
/// partially.
pub fn predict<S, C>(
    record: &FeatureRecord,
    scaler: &S,
    classifier: &C,
) -> Result<PredictionResult, InferenceError>
where
    S: FeatureScaler + ?Sized,
    C: RiskClassifier + ?Sized,
{
    // Step 1-2: scale the numeric subset
    let scaled = scaler.transform(&record.numeric_values())?;
    check_vector(InferenceStep::Scale, &scaled, NUMERIC_FEATURES.len())?;

    // Step 3: assemble in training column order
    let features = assemble(record, &scaled);
    check_vector(InferenceStep::Assemble, &features, FEATURE_COUNT)?;

    // Step 4: classify
    let label = classifier.predict(&features)?;
    let probability = classifier.predict_proba(&features)?;
    let threshold = classifier.decision_threshold();

    let verdict = Verdict::from_label(label).ok_or(InferenceError::InvalidLabel(label))?;
    if !(0.0..=1.0).contains(&probability) {
        return Err(InferenceError::InvalidProbability(probability));
    }
    let consistent = match verdict {
        Verdict::Yes => probability >= threshold,
        Verdict::No => probability <= threshold,
    };
    if !consistent {
        return Err(InferenceError::Inconsistent {
            label,
            probability,
            threshold,
        });
    }

    // Step 5: format
    Ok(PredictionResult::new(verdict, probability))
}

/// Scaled numerics at their column positions, raw integers elsewhere.
fn assemble(record: &FeatureRecord, scaled: &[f64]) -> Vec<f64> {
    let mut features: Vec<f64> = record.columns().iter().map(|v| *v as f64).collect();
    for (feature, value) in NUMERIC_FEATURES.iter().zip(scaled) {
        features[feature.column_index()] = *value;
    }
    debug_assert_eq!(features.len(), FEATURE_COLUMNS.len());
    features
}

/// Flatten a JSON object into a raw record.
///
/// Strings are taken as-is and numbers in their JSON spelling; any other
/// value keeps its JSON text and fails integer validation later. Returns
/// `None` if `value` is not an object.
#[must_use]
pub fn raw_from_json(value: &Value) -> Option<BTreeMap<String, String>> {
    let object = value.as_object()?;
    Some(
        object
            .iter()
            .map(|(key, v)| {
                let text = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (key.clone(), text)
            })
            .collect(),
    )
}

/// Service for running predictions against a loaded artifact store.
#[derive(Debug)]
pub struct InferenceService<S, C>
where
    S: FeatureScaler,
    C: RiskClassifier,
{
    store: ArtifactStore<S, C>,
    mode: ValidationMode,
}

impl<S, C> InferenceService<S, C>
where
    S: FeatureScaler,
    C: RiskClassifier,
{
    /// Create a new inference service.
    pub fn new(store: ArtifactStore<S, C>, mode: ValidationMode) -> Self {
        tracing::info!(mode = ?mode, "Inference service ready");
        Self { store, mode }
    }

    #[must_use]
    pub fn mode(&self) -> ValidationMode {
        self.mode
    }

    #[must_use]
    pub fn store(&self) -> &ArtifactStore<S, C> {
        &self.store
    }

    /// Validate a raw record using the configured mode.
    ///
    /// # Errors
    /// Returns [`ValidationError`] naming the offending field.
    pub fn validate<R: RawInput + ?Sized>(&self, raw: &R) -> Result<FeatureRecord, ValidationError> {
        FeatureRecord::validate(raw, self.mode).map_err(|e| {
            tracing::debug!(field = e.field(), "Rejected input record");
            e
        })
    }

    /// Predict for a validated record.
    ///
    /// # Errors
    /// Returns [`InferenceError`] if any step of the pipeline fails.
    pub fn predict(&self, record: &FeatureRecord) -> Result<PredictionResult, InferenceError> {
        match predict(record, self.store.scaler(), self.store.classifier()) {
            Ok(result) => {
                tracing::debug!(
                    prediction = %result.label,
                    confidence = %result.confidence_percent,
                    "Prediction complete"
                );
                Ok(result)
            }
            Err(e) => {
                tracing::error!(step = %e.step(), error = %e, "Prediction failed");
                Err(e)
            }
        }
    }

    /// Validate and predict in one call.
    ///
    /// The classifier is never invoked for a record that fails validation.
    ///
    /// # Errors
    /// Returns [`LungRiskError::Validation`] or [`LungRiskError::Inference`].
    pub fn predict_raw<R: RawInput + ?Sized>(
        &self,
        raw: &R,
    ) -> Result<PredictionResult, LungRiskError> {
        let record = self.validate(raw)?;
        Ok(self.predict(&record)?)
    }

    /// Answer one NDJSON request line.
    ///
    /// Returns the serialized [`PredictionResult`] on success, otherwise an
    /// object with a single `error` message.
    #[must_use]
    pub fn predict_json(&self, line: &str) -> Value {
        let outcome = serde_json::from_str::<Value>(line)
            .map_err(LungRiskError::from)
            .and_then(|value| {
                let raw = raw_from_json(&value).ok_or_else(|| {
                    LungRiskError::Serialization(serde::de::Error::custom(
                        "request must be a JSON object",
                    ))
                })?;
                self.predict_raw(&raw)
            })
            .and_then(|result| serde_json::to_value(result).map_err(LungRiskError::from));

        outcome.unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }))
    }

    /// Predict for several records; each succeeds or fails on its own.
    pub fn predict_batch(
        &self,
        records: &[FeatureRecord],
    ) -> Vec<Result<PredictionResult, InferenceError>> {
        records.iter().map(|r| self.predict(r)).collect()
    }
}

impl InferenceService<StandardScaler, LogisticRegression> {
    /// Load the configured artifacts and build a service over them.
    ///
    /// # Errors
    /// Returns [`LungRiskError::Load`] if the artifacts cannot be loaded.
    pub fn from_config(config: &AppConfig) -> crate::Result<Self> {
        let store = JsonArtifactStore::load_paths(&config.artifact_paths())?;
        Ok(Self::new(store, config.validation_mode))
    }
}
