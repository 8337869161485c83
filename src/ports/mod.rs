//! Ports layer: Trait definitions for external operations.
//!
//! Following Hexagonal Architecture, these traits define the boundary
//! between the inference pipeline and the trained artifacts.

mod model;

pub use model::{check_vector, FeatureScaler, InferenceError, InferenceStep, RiskClassifier};
