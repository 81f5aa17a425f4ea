//! Engine configuration
//!
//! Loaded from TOML. Resolution order for [`EngineConfig::from_env`]:
//! 1. File named by `ENTRUST_CONFIG`
//! 2. Built-in defaults

use crate::error::EngineError;
use entrust_catalog::Catalog;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "ENTRUST_CONFIG";

/// Default autosave period in seconds
pub const DEFAULT_AUTOSAVE_SECS: u64 = 15;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Autosave period; 0 disables autosave
    pub autosave_period_secs: u64,
    /// TOML catalog replacing the built-in one
    pub catalog_path: Option<PathBuf>,
    /// Column labels matched on significant words
    pub fuzzy_specialties: Vec<String>,
    /// Prefix of every persistence key
    pub persistence_namespace: String,
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With autosave period in seconds
    #[inline]
    #[must_use]
    pub fn with_autosave_period_secs(mut self, secs: u64) -> Self {
        self.autosave_period_secs = secs;
        self
    }

    /// With catalog file
    #[inline]
    #[must_use]
    pub fn with_catalog_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.catalog_path = Some(path.into());
        self
    }

    /// With fuzzy-matched specialty columns
    #[inline]
    #[must_use]
    pub fn with_fuzzy_specialties(mut self, labels: Vec<String>) -> Self {
        self.fuzzy_specialties = labels;
        self
    }

    /// With persistence key prefix
    #[inline]
    #[must_use]
    pub fn with_persistence_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.persistence_namespace = namespace.into();
        self
    }

    /// With logging settings
    #[inline]
    #[must_use]
    pub fn with_logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = logging;
        self
    }

    /// Autosave period, `None` when disabled
    #[must_use]
    pub fn autosave_period(&self) -> Option<Duration> {
        (self.autosave_period_secs > 0).then(|| Duration::from_secs(self.autosave_period_secs))
    }

    /// Parse configuration from TOML text
    ///
    /// # Errors
    /// Returns [`EngineError::Config`] on invalid TOML
    pub fn from_toml_str(content: &str) -> Result<Self, EngineError> {
        toml::from_str(content).map_err(|e| EngineError::Config(e.to_string()))
    }

    /// Load configuration file
    ///
    /// # Errors
    /// Returns [`EngineError::Io`] if the file cannot be read and
    /// [`EngineError::Config`] if it is not valid
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| EngineError::io_error(path, e))?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load from `ENTRUST_CONFIG`, falling back to defaults
    ///
    /// A variable pointing at a missing file falls back to defaults.
    ///
    /// # Errors
    /// Returns [`EngineError::Config`] if the file exists but is invalid
    pub fn from_env() -> Result<Self, EngineError> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load_optional(PathBuf::from(path)),
            None => Ok(Self::default()),
        }
    }

    /// Load a file if it exists, defaults otherwise
    ///
    /// # Errors
    /// Returns [`EngineError`] if the file exists but cannot be loaded
    pub fn load_optional(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            tracing::warn!("Config file {} not found, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Catalog named by the configuration
    ///
    /// # Errors
    /// Returns [`EngineError::Catalog`] if the catalog cannot be loaded
    pub fn load_catalog(&self) -> Result<Arc<Catalog>, EngineError> {
        let catalog = match &self.catalog_path {
            Some(path) => Catalog::load(path)?,
            None => Catalog::builtin()?.clone(),
        };
        Ok(Arc::new(catalog))
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            autosave_period_secs: DEFAULT_AUTOSAVE_SECS,
            catalog_path: None,
            fuzzy_specialties: vec![
                "Cornea & Ocular Surface Disease".to_string(),
                "Paediatric Ophthalmology & Strabismus".to_string(),
            ],
            persistence_namespace: "entrust".to_string(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    pub filter: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.autosave_period(), Some(Duration::from_secs(15)));
        assert_eq!(config.persistence_namespace, "entrust");
        assert_eq!(config.fuzzy_specialties.len(), 2);
        assert!(!config.logging.json);
    }

    #[test]
    fn zero_disables_autosave() {
        let config = EngineConfig::new().with_autosave_period_secs(0);
        assert_eq!(config.autosave_period(), None);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            autosave_period_secs = 30

            [logging]
            json = true
            "#,
        )
        .unwrap();
        assert_eq!(config.autosave_period_secs, 30);
        assert!(config.logging.json);
        assert_eq!(config.logging.filter, "info");
        assert_eq!(config.persistence_namespace, "entrust");
    }

    #[test]
    fn invalid_toml_is_config_error() {
        let err = EngineConfig::from_toml_str("autosave_period_secs = \"soon\"").unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "persistence_namespace = \"trainee-42\"").unwrap();
        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.persistence_namespace, "trainee-42");
    }

    #[test]
    fn missing_optional_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::load_optional(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn builtin_catalog_by_default() {
        let catalog = EngineConfig::default().load_catalog().unwrap();
        assert!(catalog.domains().count() >= 2);
    }

    proptest! {
        #[test]
        fn config_survives_toml(secs in 0u64..100_000, namespace in "[a-z][a-z0-9-]{0,15}") {
            let config = EngineConfig::new()
                .with_autosave_period_secs(secs)
                .with_persistence_namespace(namespace);
            let text = toml::to_string(&config).unwrap();
            let parsed = EngineConfig::from_toml_str(&text).unwrap();
            prop_assert_eq!(parsed.autosave_period().is_none(), secs == 0);
            prop_assert_eq!(parsed, config);
        }
    }
}
