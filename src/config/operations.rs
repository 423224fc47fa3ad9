//! Config loading, validation, and utility operations.

use super::model::Config;
use super::types::CONFIG_FILE_NAME;
use crate::error::{Result, TokenError};
use crate::locks::{CompareMask, RetryPolicy};
use std::path::Path;
use std::time::Duration;

impl Config {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            TokenError::Config(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Load `path` if given, else `tokenlock.yaml` in `dir` if it exists,
    /// else the defaults.
    ///
    /// An explicit path that does not exist is an error.
    pub fn load_or_default(path: Option<&Path>, dir: &Path) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }

        let implicit = dir.join(CONFIG_FILE_NAME);
        if implicit.is_file() {
            Self::load(implicit)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty document parses as null; treat it as "all defaults".
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(yaml)
            .map_err(|e| TokenError::Config(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| TokenError::Config(format!("failed to serialize config to YAML: {}", e)))
    }

    /// Validate config values and return error on invalid values.
    ///
    /// Validation rules:
    /// - `extension` must be non-empty and have no leading dot
    /// - `compare` must name at least one identity field
    /// - `token_folder` must be non-empty
    pub fn validate(&self) -> Result<()> {
        if self.token_folder.trim().is_empty() {
            return Err(TokenError::Config(
                "config validation failed: token_folder must be non-empty".to_string(),
            ));
        }

        if self.extension.is_empty() {
            return Err(TokenError::Config(
                "config validation failed: extension must be non-empty".to_string(),
            ));
        }
        if self.extension.starts_with('.') {
            return Err(TokenError::Config(format!(
                "config validation failed: extension must not have a leading dot (found '{}'). Use '{}' instead.",
                self.extension,
                self.extension.trim_start_matches('.')
            )));
        }

        if self.compare.is_empty() {
            return Err(TokenError::Config(
                "config validation failed: compare must list at least one of timestamp, host, ticket"
                    .to_string(),
            ));
        }

        Ok(())
    }

    /// Comparison mask built from `compare`.
    pub fn mask(&self) -> CompareMask {
        CompareMask::from_fields(&self.compare).unwrap_or_default()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_count, Duration::from_millis(self.retry_sleep_ms))
    }
}
