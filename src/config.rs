//! Configuration for the lung risk pipeline.
//!
//! Defaults point at the bundled asset layout. An optional JSON file
//! (`LUNGRISK_CONFIG`) replaces any subset of them, then individual
//! environment variables override the result.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::application::ArtifactPaths;
use crate::domain::ValidationMode;

pub const CONFIG_ENV: &str = "LUNGRISK_CONFIG";
pub const MODEL_PATH_ENV: &str = "LUNGRISK_MODEL_PATH";
pub const SCALER_PATH_ENV: &str = "LUNGRISK_SCALER_PATH";
pub const MANIFEST_PATH_ENV: &str = "LUNGRISK_MANIFEST_PATH";
pub const REQUIRE_MANIFEST_ENV: &str = "LUNGRISK_REQUIRE_MANIFEST";
pub const DATASET_PATH_ENV: &str = "LUNGRISK_DATASET_PATH";
pub const STRICT_VALIDATION_ENV: &str = "LUNGRISK_STRICT_VALIDATION";

/// Manifest file name used when one is required but no path is given.
pub const DEFAULT_MANIFEST_NAME: &str = "manifest.json";

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Logistic-regression export
    pub model_path: PathBuf,
    /// Standard-scaler export
    pub scaler_path: PathBuf,
    /// Digest manifest for the two exports
    pub manifest_path: Option<PathBuf>,
    /// Refuse to start without a verified manifest
    pub require_manifest: bool,
    /// Training CSV for the `summary` command
    pub dataset_path: PathBuf,
    pub validation_mode: ValidationMode,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("Assets/Models/logistic_regression.json"),
            scaler_path: PathBuf::from("Assets/Models/scaler.json"),
            manifest_path: None,
            require_manifest: false,
            dataset_path: PathBuf::from("Assets/Data/Modified Lung Cancer Dataset.csv"),
            validation_mode: ValidationMode::Lenient,
        }
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value, "1" | "true" | "TRUE" | "yes" | "YES")
}

impl AppConfig {
    /// Load from the process environment.
    ///
    /// # Errors
    /// Returns [`ConfigError`] if `LUNGRISK_CONFIG` names an unreadable or
    /// invalid file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load using an arbitrary variable lookup.
    ///
    /// # Errors
    /// See [`AppConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };

        if let Some(v) = lookup(MODEL_PATH_ENV) {
            config.model_path = PathBuf::from(v);
        }
        if let Some(v) = lookup(SCALER_PATH_ENV) {
            config.scaler_path = PathBuf::from(v);
        }
        if let Some(v) = lookup(MANIFEST_PATH_ENV) {
            config.manifest_path = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup(REQUIRE_MANIFEST_ENV) {
            config.require_manifest = parse_bool(&v);
        }
        if let Some(v) = lookup(DATASET_PATH_ENV) {
            config.dataset_path = PathBuf::from(v);
        }
        if let Some(v) = lookup(STRICT_VALIDATION_ENV) {
            config.validation_mode = if parse_bool(&v) {
                ValidationMode::Strict
            } else {
                ValidationMode::Lenient
            };
        }

        Ok(config)
    }

    /// Read a JSON config file. Missing keys keep their defaults.
    ///
    /// # Errors
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let bytes = std::fs::read(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_json::from_slice(&bytes).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    /// Manifest to verify against, if any.
    ///
    /// When a manifest is required but none is configured, `manifest.json`
    /// next to the model export is used.
    #[must_use]
    pub fn effective_manifest_path(&self) -> Option<PathBuf> {
        match (&self.manifest_path, self.require_manifest) {
            (Some(path), _) => Some(path.clone()),
            (None, true) => Some(
                self.model_path
                    .parent()
                    .unwrap_or_else(|| Path::new(""))
                    .join(DEFAULT_MANIFEST_NAME),
            ),
            (None, false) => None,
        }
    }

    #[must_use]
    pub fn artifact_paths(&self) -> ArtifactPaths {
        let paths = ArtifactPaths::new(&self.model_path, &self.scaler_path);
        match self.effective_manifest_path() {
            Some(manifest) => paths.with_manifest(manifest),
            None => paths,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(&[])).expect("config");
        assert_eq!(config, AppConfig::default());
        assert_eq!(
            config.model_path,
            PathBuf::from("Assets/Models/logistic_regression.json")
        );
        assert_eq!(config.validation_mode, ValidationMode::Lenient);
        assert!(config.artifact_paths().manifest.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            (MODEL_PATH_ENV, "/srv/model.json"),
            (SCALER_PATH_ENV, "/srv/scaler.json"),
            (DATASET_PATH_ENV, "/srv/data.csv"),
            (STRICT_VALIDATION_ENV, "1"),
        ]))
        .expect("config");

        assert_eq!(config.model_path, PathBuf::from("/srv/model.json"));
        assert_eq!(config.scaler_path, PathBuf::from("/srv/scaler.json"));
        assert_eq!(config.dataset_path, PathBuf::from("/srv/data.csv"));
        assert_eq!(config.validation_mode, ValidationMode::Strict);
    }

    #[test]
    fn test_required_manifest_defaults_next_to_model() {
        let config = AppConfig::from_lookup(lookup(&[
            (MODEL_PATH_ENV, "/srv/models/model.json"),
            (REQUIRE_MANIFEST_ENV, "true"),
        ]))
        .expect("config");

        assert_eq!(
            config.artifact_paths().manifest,
            Some(PathBuf::from("/srv/models/manifest.json"))
        );
    }

    #[test]
    fn test_config_file_then_env() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("lungrisk.json");
        std::fs::write(
            &path,
            r#"{"scaler_path": "custom/scaler.json", "validation_mode": "strict",
                "manifest_path": "custom/manifest.json"}"#,
        )
        .expect("write");
        let path_str = path.to_string_lossy().into_owned();

        let config = AppConfig::from_lookup(lookup(&[
            (CONFIG_ENV, path_str.as_str()),
            (STRICT_VALIDATION_ENV, "no"),
        ]))
        .expect("config");

        assert_eq!(config.scaler_path, PathBuf::from("custom/scaler.json"));
        assert_eq!(config.model_path, AppConfig::default().model_path);
        assert_eq!(config.validation_mode, ValidationMode::Lenient);
        assert_eq!(
            config.artifact_paths().manifest,
            Some(PathBuf::from("custom/manifest.json"))
        );
    }

    #[test]
    fn test_bad_config_file() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("lungrisk.json");
        std::fs::write(&path, r#"{"model": "typo.json"}"#).expect("write");

        let err = AppConfig::from_file(&path).expect_err("must fail");
        assert!(matches!(err, ConfigError::Parse { .. }));

        let err = AppConfig::from_file(&temp.path().join("missing.json")).expect_err("must fail");
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
