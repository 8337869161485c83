//! Adapters layer: Concrete implementations of ports.
//!
//! These modules contain the actual integration with external formats:
//! - `artifacts`: JSON exports of the scaler and classifier, digest manifest
//! - `dataset`: CSV training data for analytics
//! - `sanitize`: Feature value filtering for logs

pub mod artifacts;
pub mod dataset;
pub mod sanitize;

// Re-export error types for lib.rs
pub use artifacts::LoadError;
pub use dataset::DatasetError;
