//! # Configuration Management for DocQuery
//!
//! This crate provides the configuration structures shared by the query engine
//! and the `docquery` facade.
//!
//! ## Quick Start
//!
//! ### Programmatic Configuration
//! ```rust
//! use config::{AppConfig, ProcessorConfig};
//!
//! let processor = ProcessorConfig::new(
//!     vec!["_id".to_string(), "_acl".to_string(), "_kmd".to_string()],
//!     16,
//! );
//! let config = AppConfig { processor };
//! assert_eq!(config.processor.max_filter_depth, 16);
//! ```
//!
//! ### TOML File Configuration
//! ```toml
//! [processor]
//! protected_fields = ["_id", "_acl"]
//! max_filter_depth = 32
//! ```
//!
//! Load configuration:
//! ```rust,no_run
//! use config::AppConfig;
//!
//! // Load from docquery.toml (or the path in DOCQUERY_CONFIG)
//! let config = AppConfig::load()?;
//!
//! // Or load from custom path
//! let config = AppConfig::from_file("config/production.toml")?;
//! # Ok::<(), config::ConfigError>(())
//! ```

use serde::{Deserialize, Serialize};
use std::{env, path::Path};
use thiserror::Error;

const DEFAULT_CONFIG_PATH: &str = "./docquery.toml";
const CONFIG_PATH_VAR: &str = "DOCQUERY_CONFIG";

/// Fields that survive projection unless configured otherwise
pub const DEFAULT_PROTECTED_FIELDS: [&str; 2] = ["_id", "_acl"];

/// Nesting limit for filter trees evaluated locally
pub const DEFAULT_MAX_FILTER_DEPTH: usize = 32;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Environment variable error: {0}")]
    Env(#[from] env::VarError),
    #[error("Dotenvy error: {0}")]
    Dotenvy(#[from] dotenvy::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub processor: ProcessorConfig,
}

/// Local query processing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Fields kept by projection regardless of the allow-list
    pub protected_fields: Vec<String>,
    /// Deepest combinator nesting the processor will evaluate
    pub max_filter_depth: usize,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            protected_fields: DEFAULT_PROTECTED_FIELDS
                .iter()
                .map(|field| field.to_string())
                .collect(),
            max_filter_depth: DEFAULT_MAX_FILTER_DEPTH,
        }
    }
}

impl AppConfig {
    /// Load configuration from the path named by `DOCQUERY_CONFIG`
    /// (optionally set through a `.env` file) or from `./docquery.toml`
    pub fn load() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(_) => {}
            Err(err) if err.not_found() => {}
            Err(err) => return Err(err.into()),
        }

        if let Ok(config_path) = env::var(CONFIG_PATH_VAR) {
            Self::from_file(&config_path)
        } else if Path::new(DEFAULT_CONFIG_PATH).exists() {
            Self::from_file(DEFAULT_CONFIG_PATH)
        } else {
            Err(ConfigError::Invalid(format!(
                "Config path must be specified in .env file as {} or in {} file",
                CONFIG_PATH_VAR, DEFAULT_CONFIG_PATH
            )))
        }
    }

    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.processor.validate()
    }
}

impl ProcessorConfig {
    /// Create a new processor configuration
    pub fn new(protected_fields: Vec<String>, max_filter_depth: usize) -> Self {
        Self {
            protected_fields,
            max_filter_depth,
        }
    }

    /// Validate processor settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_filter_depth == 0 {
            return Err(ConfigError::Invalid(
                "Processor max_filter_depth must be greater than 0".to_string(),
            ));
        }
        if self.protected_fields.iter().any(|field| field.is_empty()) {
            return Err(ConfigError::Invalid(
                "Processor protected_fields cannot contain empty names".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether projection must keep this field
    pub fn is_protected(&self, field: &str) -> bool {
        self.protected_fields.iter().any(|protected| protected == field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_protect_id_and_acl() {
        let config = ProcessorConfig::default();
        assert!(config.is_protected("_id"));
        assert!(config.is_protected("_acl"));
        assert!(!config.is_protected("name"));
        assert_eq!(config.max_filter_depth, DEFAULT_MAX_FILTER_DEPTH);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml_str("[processor]\nmax_filter_depth = 4\n").unwrap();
        assert_eq!(config.processor.max_filter_depth, 4);
        assert_eq!(config.processor.protected_fields, vec!["_id", "_acl"]);

        let empty = AppConfig::from_toml_str("").unwrap();
        assert_eq!(empty, AppConfig::default());
    }

    #[test]
    fn test_validation_rejects_zero_depth() {
        let result = AppConfig::from_toml_str("[processor]\nmax_filter_depth = 0\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validation_rejects_empty_protected_field() {
        let result = AppConfig::from_toml_str("[processor]\nprotected_fields = [\"_id\", \"\"]\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_malformed_toml() {
        let result = AppConfig::from_toml_str("[processor\n");
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }
}
