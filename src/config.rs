//! # Resolver Configuration
//!
//! [`ResolverConfig`] holds the few knobs of the resolution engine. Every field has a default,
//! so an empty TOML document (or [`ResolverConfig::default`]) is a valid configuration:
//!
//! ```toml
//! meta_key = "meta"
//! reference_meta_key = "meta"
//! unmatched_union = "drop"   # or "reject"
//! ```

use serde::Deserialize;
use std::path::Path;

/// What to do with an array element whose union discriminator matches no subtype.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmatchedUnionPolicy {
    /// Leave the element untouched and skip it.
    #[default]
    Drop,
    /// Fail the pass with [`ResolverError::UnionResolution`](crate::ResolverError::UnionResolution).
    Reject,
}

/// Configuration of a [`ResolutionService`](crate::ResolutionService).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolverConfig {
    /// Key under which a reference's metadata is written when its payload is spliced.
    pub meta_key: String,
    /// Key read from a reference stub to obtain its metadata.
    pub reference_meta_key: String,
    pub unmatched_union: UnmatchedUnionPolicy,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            meta_key: "meta".to_string(),
            reference_meta_key: "meta".to_string(),
            unmatched_union: UnmatchedUnionPolicy::Drop,
        }
    }
}

/// Errors raised while loading a [`ResolverConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config value: {0}")]
    Invalid(String),
}

impl ResolverConfig {
    /// Parses a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.meta_key.is_empty() {
            return Err(ConfigError::Invalid("meta_key must not be empty".to_string()));
        }
        if self.reference_meta_key.is_empty() {
            return Err(ConfigError::Invalid(
                "reference_meta_key must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
