//! # Lungrisk
//!
//! Lung disease risk inference from patient-reported features.
//!
//! This crate provides:
//! - Validation of raw form records against a fixed 16-field schema
//! - Scaling and logistic-regression classification with trained artifacts
//! - Aggregate statistics over the training dataset
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core types (feature schema, records, prediction results)
//! - `ports`: Trait definitions for the scaler and classifier
//! - `adapters`: Concrete implementations (JSON artifacts, CSV dataset, log redaction)
//! - `application`: Use cases orchestrating domain and ports
//! - `config`: Paths and modes from file and environment

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use domain::{FeatureRecord, PredictionResult, ValidationError, ValidationMode, Verdict};

/// Result type for lungrisk operations
pub type Result<T> = std::result::Result<T, LungRiskError>;

/// Main error type for lungrisk
#[derive(Debug, thiserror::Error)]
pub enum LungRiskError {
    #[error("Invalid input: {0}")]
    Validation(#[from] domain::ValidationError),

    #[error("Artifact load failed: {0}")]
    Load(#[from] adapters::LoadError),

    #[error("Inference failed: {0}")]
    Inference(#[from] ports::InferenceError),

    #[error("Dataset error: {0}")]
    Dataset(#[from] adapters::DatasetError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
