//! Domain layer: Core business types and logic.
//!
//! Pure types for the feature schema and prediction results. Nothing here
//! touches the filesystem or the trained artifacts.

pub mod features;
mod prediction;

pub use features::{
    Feature, FeatureRecord, RawInput, ValidationError, ValidationMode, FEATURE_COLUMNS,
    FEATURE_COUNT, FEATURE_SCHEMA_VERSION, NUMERIC_FEATURES, NUMERIC_FEATURE_COUNT,
};
pub use prediction::{format_confidence, PredictionResult, Verdict};
