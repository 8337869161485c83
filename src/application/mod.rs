//! Application layer: Use cases and services.
//!
//! This module orchestrates domain logic with ports to implement
//! the core use cases of the application.

mod analytics;
mod inference;
mod store;

pub use analytics::{AnalyticsService, DatasetSummary, FeatureCorrelation};
pub use inference::{predict, InferenceService};
pub use store::{global_store, ArtifactPaths, ArtifactStore, JsonArtifactStore};
