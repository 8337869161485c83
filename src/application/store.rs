//! Artifact store: The scaler and classifier, loaded once per process.
//!
//! Both artifacts are checked against the feature schema when the store is
//! built: the scaler must accept the numeric subset, the classifier the full
//! column layout, and any recorded column names must match the pipeline
//! order exactly. A store that exists is safe to serve from.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use crate::adapters::artifacts::{DigestManifest, LoadError, LogisticRegression, StandardScaler};
use crate::domain::features::{column_names, numeric_names};
use crate::domain::{FEATURE_COUNT, NUMERIC_FEATURE_COUNT};
use crate::ports::{FeatureScaler, RiskClassifier};

/// Store backed by the JSON artifact exports.
pub type JsonArtifactStore = ArtifactStore<StandardScaler, LogisticRegression>;

/// Where the artifacts live on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub scaler: PathBuf,
    /// Digest manifest; checked when set.
    pub manifest: Option<PathBuf>,
}

impl ArtifactPaths {
    #[must_use]
    pub fn new(model: impl Into<PathBuf>, scaler: impl Into<PathBuf>) -> Self {
        Self {
            model: model.into(),
            scaler: scaler.into(),
            manifest: None,
        }
    }

    #[must_use]
    pub fn with_manifest(mut self, manifest: impl Into<PathBuf>) -> Self {
        self.manifest = Some(manifest.into());
        self
    }
}

/// Read-only holder of the two trained artifacts.
#[derive(Debug)]
pub struct ArtifactStore<S, C>
where
    S: FeatureScaler,
    C: RiskClassifier,
{
    scaler: Arc<S>,
    classifier: Arc<C>,
}

impl<S, C> Clone for ArtifactStore<S, C>
where
    S: FeatureScaler,
    C: RiskClassifier,
{
    fn clone(&self) -> Self {
        Self {
            scaler: Arc::clone(&self.scaler),
            classifier: Arc::clone(&self.classifier),
        }
    }
}

impl<S, C> ArtifactStore<S, C>
where
    S: FeatureScaler,
    C: RiskClassifier,
{
    /// Wrap already constructed artifacts after checking their shapes.
    ///
    /// # Errors
    /// Returns [`LoadError::Shape`] or [`LoadError::ColumnOrder`] if either
    /// artifact does not fit the feature schema.
    pub fn new(scaler: S, classifier: C) -> Result<Self, LoadError> {
        check_layout(
            "scaler",
            scaler.n_features_in(),
            scaler.feature_names(),
            NUMERIC_FEATURE_COUNT,
            &numeric_names(),
        )?;
        check_layout(
            "classifier",
            classifier.n_features_in(),
            classifier.feature_names(),
            FEATURE_COUNT,
            &column_names(),
        )?;

        Ok(Self {
            scaler: Arc::new(scaler),
            classifier: Arc::new(classifier),
        })
    }

    #[must_use]
    pub fn scaler(&self) -> &S {
        &self.scaler
    }

    #[must_use]
    pub fn classifier(&self) -> &C {
        &self.classifier
    }
}

impl JsonArtifactStore {
    /// Load both artifact exports from disk.
    ///
    /// # Errors
    /// Returns [`LoadError`] if either file is missing, corrupt, fails its
    /// digest check or does not fit the feature schema.
    pub fn load(model_path: &Path, scaler_path: &Path) -> Result<Self, LoadError> {
        Self::load_with_manifest(model_path, scaler_path, None)
    }

    /// Load both artifact exports, verifying them against a digest manifest.
    ///
    /// # Errors
    /// See [`load`](Self::load).
    pub fn load_with_manifest(
        model_path: &Path,
        scaler_path: &Path,
        manifest: Option<&DigestManifest>,
    ) -> Result<Self, LoadError> {
        let scaler = StandardScaler::load(scaler_path, manifest)?;
        let classifier = LogisticRegression::load(model_path, manifest)?;
        let store = Self::new(scaler, classifier)?;

        tracing::info!(
            model = %model_path.display(),
            scaler = %scaler_path.display(),
            verified = manifest.is_some(),
            "Artifact store ready"
        );
        Ok(store)
    }

    /// Load the artifacts named by `paths`.
    ///
    /// # Errors
    /// See [`load`](Self::load).
    pub fn load_paths(paths: &ArtifactPaths) -> Result<Self, LoadError> {
        let manifest = paths
            .manifest
            .as_deref()
            .map(DigestManifest::load)
            .transpose()?;
        Self::load_with_manifest(&paths.model, &paths.scaler, manifest.as_ref())
    }
}

fn check_layout(
    artifact: &'static str,
    n_features: usize,
    names: Option<&[String]>,
    expected_len: usize,
    expected_names: &[&str],
) -> Result<(), LoadError> {
    if n_features != expected_len {
        return Err(LoadError::Shape {
            artifact,
            expected: expected_len,
            got: n_features,
        });
    }

    match names {
        Some(names) => {
            if names.iter().map(String::as_str).ne(expected_names.iter().copied()) {
                return Err(LoadError::ColumnOrder {
                    artifact,
                    expected: expected_names.iter().map(|s| (*s).to_string()).collect(),
                    got: names.to_vec(),
                });
            }
        }
        None => {
            tracing::warn!(
                artifact,
                "Artifact does not record its column names; only the dimension was checked"
            );
        }
    }
    Ok(())
}

static GLOBAL_STORE: OnceLock<JsonArtifactStore> = OnceLock::new();
static GLOBAL_INIT: Mutex<()> = Mutex::new(());

/// Process-wide store, loaded on first use.
///
/// Concurrent first callers load the artifacts once; every caller observes
/// the same fully built store. A failed load is returned to the caller that
/// attempted it and leaves the global unset.
///
/// Prefer loading at startup and passing the store explicitly; this exists
/// for front ends that cannot.
///
/// # Errors
/// Returns [`LoadError`] if loading fails.
pub fn global_store(paths: &ArtifactPaths) -> Result<&'static JsonArtifactStore, LoadError> {
    if let Some(store) = GLOBAL_STORE.get() {
        return Ok(store);
    }

    // A panic while loading leaves nothing half-initialized behind the guard.
    let _guard = GLOBAL_INIT.lock().unwrap_or_else(|p| p.into_inner());
    if let Some(store) = GLOBAL_STORE.get() {
        return Ok(store);
    }

    tracing::info!("Loading artifacts on first use");
    let store = JsonArtifactStore::load_paths(paths)?;
    Ok(GLOBAL_STORE.get_or_init(|| store))
}
