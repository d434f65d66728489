use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;
use validator::Validate;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("Parse error for {field}: {value} - {source}")]
    Parse {
        field: String,
        value: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Compiler configuration with validation
#[derive(Clone, Debug, PartialEq, Validate, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// `LIMIT n` appended to every full statement
    #[validate(range(
        min = 1,
        max = 10000,
        message = "Result limit must be between 1 and 10000"
    ))]
    pub result_limit: u32,

    /// Whether compiled descriptors are cached
    pub cache_enabled: bool,

    /// Maximum number of cached descriptors (LRU eviction)
    #[validate(range(
        min = 1,
        max = 1_000_000,
        message = "Cache size must be between 1 and 1000000"
    ))]
    pub cache_max_entries: usize,

    /// Number of example phrasings generated per scope
    #[validate(range(
        min = 1,
        max = 8,
        message = "Example phrase count must be between 1 and 8"
    ))]
    pub example_phrase_count: usize,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            result_limit: 100,
            cache_enabled: true,
            cache_max_entries: 1000,
            example_phrase_count: 4,
        }
    }
}

impl CompilerConfig {
    /// Create configuration from environment variables with validation
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            result_limit: parse_env_var("SCOPEGRAPH_RESULT_LIMIT", "100")?,
            cache_enabled: parse_env_var("SCOPEGRAPH_CACHE_ENABLED", "true")?,
            cache_max_entries: parse_env_var("SCOPEGRAPH_CACHE_MAX_ENTRIES", "1000")?,
            example_phrase_count: parse_env_var("SCOPEGRAPH_EXAMPLE_PHRASES", "4")?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from YAML text; missing keys take their defaults
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content).map_err(|e| ConfigError::Parse {
            field: "yaml_content".to_string(),
            value: content.to_string(),
            source: Box::new(e),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from YAML file
    pub fn from_yaml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            field: "yaml_file".to_string(),
            value: "file read failed".to_string(),
            source: Box::new(e),
        })?;
        Self::from_yaml_str(&content)
    }
}

/// Parse an environment variable with a default value
fn parse_env_var<T: std::str::FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = env::var(key).unwrap_or_else(|_| default.to_string());
    value.parse().map_err(|e| ConfigError::Parse {
        field: key.to_string(),
        value,
        source: Box::new(e),
    })
}
