//! Config loading behind a reload-on-demand trait.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::model::{RawRecorderConfig, RecorderConfig};

/// Why a configuration load failed.
///
/// Both variants are recoverable: the engine keeps the previously applied
/// configuration and the caller may retry after fixing the source.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The source could not be read at all (missing file, permissions).
    #[error("config unavailable at {path}: {source}")]
    Unavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The source was read but is not valid JSON for the expected shape.
    #[error("config malformed at {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A reloadable source of recorder configuration.
///
/// `load` is called once at startup and again on every reconfigure command;
/// implementations must re-read their backing source each time rather than
/// caching.
pub trait ConfigProvider {
    /// Load, parse, and clamp the current configuration.
    fn load(&self) -> Result<RecorderConfig, ConfigError>;

    /// Human-readable description of the source, for logs and diagnostics.
    fn describe(&self) -> String;
}

/// Reads a flat JSON document from a fixed path on every call.
#[derive(Debug, Clone)]
pub struct FileConfigProvider {
    path: PathBuf,
}

impl FileConfigProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileConfigProvider { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigProvider for FileConfigProvider {
    fn load(&self) -> Result<RecorderConfig, ConfigError> {
        let text = std::fs::read_to_string(&self.path).map_err(|source| {
            ConfigError::Unavailable {
                path: self.path.clone(),
                source,
            }
        })?;
        let raw: RawRecorderConfig =
            serde_json::from_str(&text).map_err(|source| ConfigError::Malformed {
                path: self.path.clone(),
                source,
            })?;
        Ok(raw.clamped())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Always yields the built-in defaults. Used when no config file was found
/// anywhere in the search path.
#[derive(Debug, Clone, Default)]
pub struct DefaultConfigProvider;

impl ConfigProvider for DefaultConfigProvider {
    fn load(&self) -> Result<RecorderConfig, ConfigError> {
        Ok(RecorderConfig::default())
    }

    fn describe(&self) -> String {
        "builtin defaults".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn file_provider_loads_and_clamps() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("recorder.json");
        fs::write(&path, r#"{"interval_millis": 500, "batch_size": 5000}"#).unwrap();

        let config = FileConfigProvider::new(&path).load().unwrap();
        assert_eq!(config.interval_millis, 500);
        assert_eq!(config.batch_size, 1000);
    }

    #[test]
    fn missing_file_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let provider = FileConfigProvider::new(dir.path().join("nope.json"));
        assert!(matches!(
            provider.load(),
            Err(ConfigError::Unavailable { .. })
        ));
    }

    #[test]
    fn invalid_json_is_malformed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("recorder.json");
        fs::write(&path, "{not json").unwrap();

        let provider = FileConfigProvider::new(&path);
        assert!(matches!(provider.load(), Err(ConfigError::Malformed { .. })));
    }

    #[test]
    fn wrong_value_type_is_malformed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("recorder.json");
        fs::write(&path, r#"{"interval_millis": "fast"}"#).unwrap();

        let provider = FileConfigProvider::new(&path);
        assert!(matches!(provider.load(), Err(ConfigError::Malformed { .. })));
    }

    #[test]
    fn default_provider_always_succeeds() {
        let config = DefaultConfigProvider.load().unwrap();
        assert_eq!(config, RecorderConfig::default());
    }

    #[test]
    fn file_provider_reflects_edits_between_loads() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("recorder.json");
        fs::write(&path, r#"{"batch_size": 3}"#).unwrap();
        let provider = FileConfigProvider::new(&path);
        assert_eq!(provider.load().unwrap().batch_size, 3);

        fs::write(&path, r#"{"batch_size": 9}"#).unwrap();
        assert_eq!(provider.load().unwrap().batch_size, 9);
    }
}
