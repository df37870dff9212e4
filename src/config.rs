//! Engine configuration
//!
//! ```toml
//! subject_separator = ","
//! pattern_cache_capacity = 1000
//!
//! [delimiters]
//! start = "<"
//! end = ">"
//! ```

use crate::error::ConfigError;
use crate::iam::Delimiters;
use serde::{Deserialize, Serialize};
use std::path::Path;
use validator::Validate;

/// Decision engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct EngineConfig {
    /// Separator between identities in a request subject
    pub subject_separator: char,

    /// Compiled templates kept in the LRU cache (0 disables caching, at most 1,000,000)
    #[validate(range(max = 1_000_000))]
    pub pattern_cache_capacity: usize,

    /// Delimiters for policy documents that do not declare their own
    pub delimiters: Delimiters,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            subject_separator: ',',
            pattern_cache_capacity: 1000,
            delimiters: Delimiters::default(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document; missing keys take defaults
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(toml)?;
        config.check()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Validate field ranges and delimiter consistency
    pub fn check(&self) -> Result<(), ConfigError> {
        self.validate()?;
        if self.delimiters.start == self.delimiters.end {
            return Err(ConfigError::InvalidDelimiters(self.delimiters.start));
        }
        Ok(())
    }
}
