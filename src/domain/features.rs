//! Feature schema for lung disease risk prediction.
//!
//! Declares the 16 patient-reported inputs, the order the classifier was
//! trained with, and which of them are rescaled before classification.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Version of the column layout below. Exported artifacts carry the same
/// number and are rejected at load time when it differs.
pub const FEATURE_SCHEMA_VERSION: u32 = 1;

/// Number of columns in the assembled feature vector.
pub const FEATURE_COUNT: usize = 16;

/// Number of numeric columns passed through the scaler.
pub const NUMERIC_FEATURE_COUNT: usize = 4;

/// A single input field of the prediction form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Feature {
    Age,
    Smoking,
    FingerDiscoloration,
    MentalStress,
    ExposureToPollution,
    LongTermIllness,
    EnergyLevel,
    ImmuneWeakness,
    BreathingIssue,
    AlcoholConsumption,
    ThroatDiscomfort,
    OxygenSaturation,
    ChestTightness,
    FamilyHistory,
    SmokingFamilyHistory,
    StressImmune,
}

/// Column order of the classifier input. Must match training exactly.
pub const FEATURE_COLUMNS: [Feature; FEATURE_COUNT] = [
    Feature::Age,
    Feature::Smoking,
    Feature::FingerDiscoloration,
    Feature::MentalStress,
    Feature::ExposureToPollution,
    Feature::LongTermIllness,
    Feature::EnergyLevel,
    Feature::ImmuneWeakness,
    Feature::BreathingIssue,
    Feature::AlcoholConsumption,
    Feature::ThroatDiscomfort,
    Feature::OxygenSaturation,
    Feature::ChestTightness,
    Feature::FamilyHistory,
    Feature::SmokingFamilyHistory,
    Feature::StressImmune,
];

/// Magnitude features, in scaler input order.
pub const NUMERIC_FEATURES: [Feature; NUMERIC_FEATURE_COUNT] = [
    Feature::Age,
    Feature::OxygenSaturation,
    Feature::EnergyLevel,
    Feature::StressImmune,
];

impl Feature {
    /// Field name as it appears in forms, datasets and artifact exports.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Age => "AGE",
            Self::Smoking => "SMOKING",
            Self::FingerDiscoloration => "FINGER_DISCOLORATION",
            Self::MentalStress => "MENTAL_STRESS",
            Self::ExposureToPollution => "EXPOSURE_TO_POLLUTION",
            Self::LongTermIllness => "LONG_TERM_ILLNESS",
            Self::EnergyLevel => "ENERGY_LEVEL",
            Self::ImmuneWeakness => "IMMUNE_WEAKNESS",
            Self::BreathingIssue => "BREATHING_ISSUE",
            Self::AlcoholConsumption => "ALCOHOL_CONSUMPTION",
            Self::ThroatDiscomfort => "THROAT_DISCOMFORT",
            Self::OxygenSaturation => "OXYGEN_SATURATION",
            Self::ChestTightness => "CHEST_TIGHTNESS",
            Self::FamilyHistory => "FAMILY_HISTORY",
            Self::SmokingFamilyHistory => "SMOKING_FAMILY_HISTORY",
            Self::StressImmune => "STRESS_IMMUNE",
        }
    }

    /// Whether the value is rescaled before classification.
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        NUMERIC_FEATURES.contains(self)
    }

    /// Position of this feature in [`FEATURE_COLUMNS`].
    #[must_use]
    pub fn column_index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Feature {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FEATURE_COLUMNS
            .iter()
            .copied()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownField(s.to_string()))
    }
}

/// Names of [`FEATURE_COLUMNS`], in order.
#[must_use]
pub fn column_names() -> Vec<&'static str> {
    FEATURE_COLUMNS.iter().map(Feature::as_str).collect()
}

/// Names of [`NUMERIC_FEATURES`], in order.
#[must_use]
pub fn numeric_names() -> Vec<&'static str> {
    NUMERIC_FEATURES.iter().map(Feature::as_str).collect()
}

/// Rejection of a raw input record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    Missing(Feature),

    /// `value` is kept for callers but left out of the message, which may
    /// end up in logs.
    #[error("Field {field} is not an integer")]
    NotInteger { field: Feature, value: String },

    #[error("Unknown field: {0}")]
    UnknownField(String),
}

impl ValidationError {
    /// Name of the offending field.
    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Self::Missing(f) | Self::NotInteger { field: f, .. } => f.as_str(),
            Self::UnknownField(name) => name,
        }
    }
}

/// How strictly raw records are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// Keys that are not feature names are ignored.
    #[default]
    Lenient,
    /// Keys that are not feature names are rejected.
    Strict,
}

/// A raw record as handed over by a front end.
pub trait RawInput {
    /// Value submitted for `name`, if any.
    fn value(&self, name: &str) -> Option<&str>;

    /// All submitted keys.
    fn keys(&self) -> Vec<&str>;
}

impl RawInput for HashMap<String, String> {
    fn value(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }

    fn keys(&self) -> Vec<&str> {
        HashMap::keys(self).map(String::as_str).collect()
    }
}

impl RawInput for BTreeMap<String, String> {
    fn value(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }

    fn keys(&self) -> Vec<&str> {
        BTreeMap::keys(self).map(String::as_str).collect()
    }
}

/// A complete, validated set of the 16 inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeatureRecord {
    values: [i64; FEATURE_COUNT],
}

impl FeatureRecord {
    /// Build a record from values already in [`FEATURE_COLUMNS`] order.
    #[must_use]
    pub fn from_columns(values: [i64; FEATURE_COUNT]) -> Self {
        Self { values }
    }

    /// Value of a single feature.
    #[must_use]
    pub fn get(&self, feature: Feature) -> i64 {
        self.values[feature.column_index()]
    }

    /// Replace the value of a single feature.
    pub fn set(&mut self, feature: Feature, value: i64) {
        self.values[feature.column_index()] = value;
    }

    /// Values in [`FEATURE_COLUMNS`] order.
    #[must_use]
    pub fn columns(&self) -> &[i64; FEATURE_COUNT] {
        &self.values
    }

    /// The numeric subset, in scaler input order.
    #[must_use]
    pub fn numeric_values(&self) -> [f64; NUMERIC_FEATURE_COUNT] {
        NUMERIC_FEATURES.map(|f| self.get(f) as f64)
    }

    /// Iterate `(feature, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (Feature, i64)> + '_ {
        FEATURE_COLUMNS.iter().map(move |&f| (f, self.get(f)))
    }

    /// Validate a raw record.
    ///
    /// Fields are checked in column order, so the first missing or
    /// malformed one is reported. No range checks are applied.
    ///
    /// # Errors
    /// Returns [`ValidationError`] naming the offending field.
    pub fn validate<R: RawInput + ?Sized>(
        raw: &R,
        mode: ValidationMode,
    ) -> Result<Self, ValidationError> {
        if mode == ValidationMode::Strict {
            let mut unknown: Vec<&str> = raw
                .keys()
                .into_iter()
                .filter(|k| k.parse::<Feature>().is_err())
                .collect();
            unknown.sort_unstable();
            if let Some(name) = unknown.first() {
                return Err(ValidationError::UnknownField((*name).to_string()));
            }
        }

        let mut values = [0_i64; FEATURE_COUNT];
        for feature in FEATURE_COLUMNS {
            let text = raw
                .value(feature.as_str())
                .ok_or(ValidationError::Missing(feature))?;
            values[feature.column_index()] =
                text.trim()
                    .parse::<i64>()
                    .map_err(|_| ValidationError::NotInteger {
                        field: feature,
                        value: text.to_string(),
                    })?;
        }

        Ok(Self { values })
    }
}

/// Validate a raw record with the given mode.
///
/// # Errors
/// Returns [`ValidationError`] naming the offending field.
pub fn validate<R: RawInput + ?Sized>(
    raw: &R,
    mode: ValidationMode,
) -> Result<FeatureRecord, ValidationError> {
    FeatureRecord::validate(raw, mode)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_input() -> HashMap<String, String> {
        FEATURE_COLUMNS
            .iter()
            .enumerate()
            .map(|(i, f)| (f.as_str().to_string(), i.to_string()))
            .collect()
    }

    #[test]
    fn test_column_order_matches_enum() {
        for (i, f) in FEATURE_COLUMNS.iter().enumerate() {
            assert_eq!(f.column_index(), i);
        }
        assert_eq!(column_names()[11], "OXYGEN_SATURATION");
        assert_eq!(
            numeric_names(),
            vec!["AGE", "OXYGEN_SATURATION", "ENERGY_LEVEL", "STRESS_IMMUNE"]
        );
    }

    #[test]
    fn test_numeric_subset() {
        let numeric: Vec<_> = FEATURE_COLUMNS.iter().filter(|f| f.is_numeric()).collect();
        assert_eq!(numeric.len(), NUMERIC_FEATURE_COUNT);
        assert!(!Feature::Smoking.is_numeric());
    }

    #[test]
    fn test_feature_name_round_trip() {
        for f in FEATURE_COLUMNS {
            assert_eq!(f.as_str().parse::<Feature>(), Ok(f));
        }
        assert!("age".parse::<Feature>().is_err());
    }

    #[test]
    fn test_validate_complete_record() {
        let record = validate(&full_input(), ValidationMode::Lenient).expect("Should validate");
        for (i, (_, value)) in record.iter().enumerate() {
            assert_eq!(value, i as i64);
        }
        assert_eq!(record.numeric_values(), [0.0, 11.0, 6.0, 15.0]);
    }

    #[test]
    fn test_each_missing_field_is_named() {
        for f in FEATURE_COLUMNS {
            let mut raw = full_input();
            raw.remove(f.as_str());
            let err = validate(&raw, ValidationMode::Lenient).expect_err("must fail");
            assert_eq!(err, ValidationError::Missing(f));
            assert_eq!(err.field(), f.as_str());
        }
    }

    #[test]
    fn test_non_integer_is_rejected() {
        let mut raw = full_input();
        raw.insert("ENERGY_LEVEL".into(), "3.5".into());
        let err = validate(&raw, ValidationMode::Lenient).expect_err("must fail");
        assert_eq!(err.field(), "ENERGY_LEVEL");
        assert!(matches!(err, ValidationError::NotInteger { .. }));

        raw.insert("ENERGY_LEVEL".into(), String::new());
        assert!(validate(&raw, ValidationMode::Lenient).is_err());
    }

    #[test]
    fn test_error_message_omits_submitted_value() {
        let mut raw = full_input();
        raw.insert("AGE".into(), "4x7-secret".into());
        let err = validate(&raw, ValidationMode::Lenient).expect_err("must fail");

        assert_eq!(
            err,
            ValidationError::NotInteger {
                field: Feature::Age,
                value: "4x7-secret".into()
            }
        );
        let message = err.to_string();
        assert_eq!(message, "Field AGE is not an integer");
        assert!(!message.contains("4x7"));
    }

    #[test]
    fn test_out_of_range_values_pass_through() {
        let mut raw = full_input();
        raw.insert("AGE".into(), " -4 ".into());
        raw.insert("OXYGEN_SATURATION".into(), "+250".into());
        let record = validate(&raw, ValidationMode::Lenient).expect("Should validate");
        assert_eq!(record.get(Feature::Age), -4);
        assert_eq!(record.get(Feature::OxygenSaturation), 250);
    }

    #[test]
    fn test_unknown_keys_by_mode() {
        let mut raw = full_input();
        raw.insert("GENDER".into(), "1".into());

        assert!(validate(&raw, ValidationMode::Lenient).is_ok());
        let err = validate(&raw, ValidationMode::Strict).expect_err("must fail");
        assert_eq!(err, ValidationError::UnknownField("GENDER".into()));
    }

    #[test]
    fn test_btree_input_is_accepted() {
        let raw: BTreeMap<String, String> = full_input().into_iter().collect();
        assert!(validate(&raw, ValidationMode::Strict).is_ok());
    }
}
