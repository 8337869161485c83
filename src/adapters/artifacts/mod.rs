//! Artifact adapters: JSON exports of the trained scaler and classifier.
//!
//! The training pipeline exports both artifacts as JSON. Each file carries
//! the feature schema version it was fitted against and, optionally, the
//! column names seen at fit time.
//!
//! # Integrity
//!
//! A `manifest.json` next to the artifacts may bind each file to its SHA-256
//! digest. When a manifest is in use, a file that is not listed or whose
//! digest differs is refused.

mod logistic;
mod scaler;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub use logistic::LogisticRegression;
pub use scaler::StandardScaler;

/// Manifest format version understood by this crate.
pub const MANIFEST_VERSION: u32 = 1;

/// Errors raised while loading the trained artifacts.
///
/// Any of these makes the process unable to serve predictions.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Cannot read artifact {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt artifact {path:?}: {message}")]
    Corrupt { path: PathBuf, message: String },

    #[error("Unsupported schema version in {path:?}: expected {expected}, got {got}")]
    SchemaVersion {
        path: PathBuf,
        expected: u32,
        got: u32,
    },

    #[error("{artifact} expects {got} input features, pipeline provides {expected}")]
    Shape {
        artifact: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("{artifact} was fitted with columns {got:?}, pipeline order is {expected:?}")]
    ColumnOrder {
        artifact: &'static str,
        expected: Vec<String>,
        got: Vec<String>,
    },

    #[error("Invalid {artifact} parameters: {message}")]
    InvalidParameter {
        artifact: &'static str,
        message: String,
    },

    #[error("Digest check failed for {path:?}: {message}")]
    Digest { path: PathBuf, message: String },
}

/// SHA-256 digests of the artifact files, keyed by file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestManifest {
    pub version: u32,
    pub files: BTreeMap<String, String>,
}

impl DigestManifest {
    /// Build a manifest binding the given `(file name, contents)` pairs.
    #[must_use]
    pub fn from_contents(files: &[(&str, &[u8])]) -> Self {
        Self {
            version: MANIFEST_VERSION,
            files: files
                .iter()
                .map(|(name, bytes)| ((*name).to_string(), sha256_hex(bytes)))
                .collect(),
        }
    }

    /// Read a manifest file.
    ///
    /// # Errors
    /// Returns [`LoadError`] if the file is unreadable, malformed or of an
    /// unsupported version.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let manifest: Self = serde_json::from_slice(&bytes).map_err(|e| LoadError::Corrupt {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        if manifest.version != MANIFEST_VERSION {
            return Err(LoadError::SchemaVersion {
                path: path.to_path_buf(),
                expected: MANIFEST_VERSION,
                got: manifest.version,
            });
        }
        Ok(manifest)
    }

    /// Check `bytes` (read from `path`) against the digest bound to its file name.
    ///
    /// # Errors
    /// Returns [`LoadError::Digest`] if the file is not listed or the digest differs.
    pub fn verify(&self, path: &Path, bytes: &[u8]) -> Result<(), LoadError> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| LoadError::Digest {
                path: path.to_path_buf(),
                message: "path has no file name".into(),
            })?;

        let expected = self.files.get(name).ok_or_else(|| LoadError::Digest {
            path: path.to_path_buf(),
            message: format!("{name} is not listed in the manifest"),
        })?;

        let actual = sha256_hex(bytes);
        if !constant_time_eq_str(&actual, &expected.to_ascii_lowercase()) {
            return Err(LoadError::Digest {
                path: path.to_path_buf(),
                message: "sha256 mismatch".into(),
            });
        }
        Ok(())
    }
}

/// Lowercase hex SHA-256 of `bytes`.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

// Constant-time compare for ASCII strings (used for SHA-256 hex digests).
fn constant_time_eq_str(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes().iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Read and decode one JSON artifact, checking it against `manifest` first.
pub(crate) fn read_json_artifact<T: DeserializeOwned>(
    path: &Path,
    manifest: Option<&DigestManifest>,
) -> Result<T, LoadError> {
    let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    if let Some(manifest) = manifest {
        manifest.verify(path, &bytes)?;
    }

    serde_json::from_slice(&bytes).map_err(|e| LoadError::Corrupt {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

pub(crate) fn default_schema_version() -> u32 {
    crate::domain::FEATURE_SCHEMA_VERSION
}

pub(crate) fn check_schema_version(path: &Path, got: u32) -> Result<(), LoadError> {
    let expected = crate::domain::FEATURE_SCHEMA_VERSION;
    if got != expected {
        return Err(LoadError::SchemaVersion {
            path: path.to_path_buf(),
            expected,
            got,
        });
    }
    Ok(())
}

pub(crate) fn check_finite(artifact: &'static str, what: &str, values: &[f64]) -> Result<(), LoadError> {
    if let Some(i) = values.iter().position(|v| !v.is_finite()) {
        return Err(LoadError::InvalidParameter {
            artifact,
            message: format!("{what}[{i}] is not finite"),
        });
    }
    Ok(())
}
