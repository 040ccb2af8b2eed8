//! Configuration management.
//!
//! Settings come from a TOML file, then environment overrides. The file is
//! looked up at an explicit path, `SNAPVAULT_CONFIG_PATH`, or the platform
//! config directory, in that order.

use crate::io::{DEFAULT_MAX_BATCH_SIZE, DEFAULT_MAX_SNAPSHOT_BYTES};
use crate::registry::{CollectionEntry, CollectionRegistry};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "SNAPVAULT_CONFIG_PATH";

/// Main configuration for snapvault.
#[derive(Debug, Clone, Serialize)]
pub struct SnapvaultConfig {
    /// Path to the `SQLite` document database.
    pub database_path: PathBuf,
    /// Directory exported snapshots are written to.
    pub output_dir: PathBuf,
    /// Maximum operations per restore batch.
    pub max_batch_size: usize,
    /// Largest snapshot file accepted for restore.
    pub max_snapshot_bytes: u64,
    /// Logging and metrics settings.
    #[serde(flatten)]
    pub observability: ObservabilitySettings,
    /// Collection registry override; `None` uses the built-in registry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collections: Option<Vec<CollectionEntry>>,
    /// Config file this configuration was loaded from.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

/// Observability section of the config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservabilitySettings {
    /// Logging settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingSettings>,
    /// Metrics settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetricsSettings>,
}

/// `[logging]` settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// `json` or `pretty`.
    pub format: Option<String>,
    /// Default filter directive, e.g. `info` or `snapvault=debug`.
    pub level: Option<String>,
    /// Append logs to this file instead of stderr.
    pub file: Option<String>,
}

/// `[metrics]` settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsSettings {
    /// Install the Prometheus recorder.
    pub enabled: Option<bool>,
    /// Serve `/metrics` on this port when set.
    pub port: Option<u16>,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Database path.
    pub database_path: Option<String>,
    /// Output directory.
    pub output_dir: Option<String>,
    /// Restore batch cap.
    pub max_batch_size: Option<usize>,
    /// Snapshot size limit.
    pub max_snapshot_bytes: Option<u64>,
    /// Logging section.
    pub logging: Option<LoggingSettings>,
    /// Metrics section.
    pub metrics: Option<MetricsSettings>,
    /// `[[collections]]` tables.
    pub collections: Option<Vec<CollectionEntry>>,
}

impl Default for SnapvaultConfig {
    fn default() -> Self {
        let data_dir = directories::ProjectDirs::from("", "", "snapvault").map_or_else(
            || PathBuf::from(".snapvault"),
            |dirs| dirs.data_dir().to_path_buf(),
        );
        Self {
            database_path: data_dir.join("documents.db"),
            output_dir: PathBuf::from("."),
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            max_snapshot_bytes: DEFAULT_MAX_SNAPSHOT_BYTES,
            observability: ObservabilitySettings::default(),
            collections: None,
            source: None,
        }
    }
}

impl SnapvaultConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::OperationFailed {
            operation: "read_config_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;

        let mut config = Self::from_toml(&contents)?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid config file.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(contents).map_err(|e| Error::OperationFailed {
            operation: "parse_config_file".to_string(),
            cause: e.to_string(),
        })?;
        Ok(Self::from_config_file(file))
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the following paths in order:
    /// 1. `SNAPVAULT_CONFIG_PATH`
    /// 2. Platform-specific config dir (`~/.config/snapvault/config.toml` on Linux)
    ///
    /// Returns default configuration if no config file is found.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be parsed.
    pub fn load_default() -> Result<Self> {
        for path in Self::config_sources() {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }
        Ok(Self::default())
    }

    /// Returns the candidate config file paths, highest priority first.
    #[must_use]
    pub fn config_sources() -> Vec<PathBuf> {
        let mut sources = Vec::new();
        if let Some(path) = parse_string_env(CONFIG_PATH_ENV) {
            sources.push(PathBuf::from(path));
        }
        if let Some(base_dirs) = directories::BaseDirs::new() {
            sources.push(base_dirs.config_dir().join("snapvault").join("config.toml"));
        }
        sources
    }

    /// Converts a `ConfigFile` to `SnapvaultConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(path) = file.database_path {
            config.database_path = PathBuf::from(path);
        }
        if let Some(dir) = file.output_dir {
            config.output_dir = PathBuf::from(dir);
        }
        if let Some(size) = file.max_batch_size {
            config.max_batch_size = size;
        }
        if let Some(bytes) = file.max_snapshot_bytes {
            config.max_snapshot_bytes = bytes;
        }
        config.observability = ObservabilitySettings {
            logging: file.logging,
            metrics: file.metrics,
        };
        config.collections = file.collections;

        config
    }

    /// Applies `SNAPVAULT_*` environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `SNAPVAULT_MAX_BATCH_SIZE` is not a
    /// number.
    pub fn apply_env_overrides(mut self) -> Result<Self> {
        if let Some(path) = parse_string_env("SNAPVAULT_DATABASE") {
            self.database_path = PathBuf::from(path);
        }
        if let Some(dir) = parse_string_env("SNAPVAULT_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(size) = parse_string_env("SNAPVAULT_MAX_BATCH_SIZE") {
            self.max_batch_size = size.parse().map_err(|_| {
                Error::InvalidInput(format!("SNAPVAULT_MAX_BATCH_SIZE must be a number, got '{size}'"))
            })?;
        }
        Ok(self)
    }

    /// Builds the collection registry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the configured collections are
    /// invalid.
    pub fn registry(&self) -> Result<CollectionRegistry> {
        self.collections.as_ref().map_or_else(
            || Ok(CollectionRegistry::default()),
            |entries| CollectionRegistry::from_entries(entries.clone()),
        )
    }

    /// Renders the effective configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::OperationFailed {
            operation: "render_config".to_string(),
            cause: e.to_string(),
        })
    }

    /// Sets the database path.
    #[must_use]
    pub fn with_database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = path.into();
        self
    }

    /// Sets the output directory.
    #[must_use]
    pub fn with_output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = path.into();
        self
    }
}

pub(crate) fn parse_string_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SnapvaultConfig::default();
        assert_eq!(config.max_batch_size, 450);
        assert_eq!(config.max_snapshot_bytes, 256 * 1024 * 1024);
        assert!(config.database_path.ends_with("documents.db"));
        assert_eq!(config.registry().unwrap(), CollectionRegistry::default());
    }

    #[test]
    fn test_from_toml() {
        let config = SnapvaultConfig::from_toml(
            r#"
            database_path = "/var/lib/snapvault/docs.db"
            max_batch_size = 200

            [logging]
            format = "json"

            [metrics]
            enabled = true

            [[collections]]
            name = "courses"
            label = "Courses"
            child = "lessons"

            [[collections]]
            name = "users"
            label = "Users"
            "#,
        )
        .unwrap();

        assert_eq!(config.database_path, PathBuf::from("/var/lib/snapvault/docs.db"));
        assert_eq!(config.max_batch_size, 200);
        let logging = config.observability.logging.as_ref().unwrap();
        assert_eq!(logging.format.as_deref(), Some("json"));

        let registry = config.registry().unwrap();
        let names: Vec<_> = registry.list_exportable().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["courses", "users"]);
        assert_eq!(registry.child_relation_of("courses"), Some("lessons"));
    }

    #[test]
    fn test_duplicate_collections_rejected() {
        let config = SnapvaultConfig::from_toml(
            r#"
            [[collections]]
            name = "users"
            label = "Users"

            [[collections]]
            name = "users"
            label = "Again"
            "#,
        )
        .unwrap();
        assert!(matches!(config.registry(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(SnapvaultConfig::from_toml("max_batch = 3").is_err());
    }

    #[test]
    fn test_load_from_file_records_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "output_dir = \"/tmp/out\"\n").unwrap();

        let config = SnapvaultConfig::load_from_file(&path).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.source.as_deref(), Some(path.as_path()));
        assert!(config.to_toml().unwrap().contains("output_dir"));
    }
}
