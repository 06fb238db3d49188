//! Tree configuration
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! `SLABTREE_*` environment variables (nested keys separated by `__`, e.g.
//! `SLABTREE_DUMP__BASE_PATH`).

use crate::dump::DumpConfig;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tree configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Typical node count; blocks per allocator pool
    pub pool_capacity: usize,
    /// Upper bound on allocator pools (unbounded if unset)
    pub max_pools: Option<usize>,
    /// Verify the tree before every mutating operation
    pub self_check: bool,
    /// Diagnostic dump settings
    pub dump: DumpConfig,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            pool_capacity: 64,
            max_pools: None,
            self_check: true,
            dump: DumpConfig::default(),
        }
    }
}

impl TreeConfig {
    /// Load configuration from defaults, an optional file and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = config::Config::try_from(&Self::default())
            .map_err(|e| Error::Config(format!("Failed to encode defaults: {}", e)))?;

        let mut builder = config::Config::builder().add_source(defaults);
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("SLABTREE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder
            .build()
            .and_then(|c| c.try_deserialize::<Self>())
            .map_err(|e| Error::Config(format!("Failed to load configuration: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)
            .map_err(|e| Error::Config(format!("Invalid TOML configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the allocator cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.pool_capacity == 0 {
            return Err(Error::InvalidCapacity);
        }
        if self.max_pools == Some(0) {
            return Err(Error::Config("max_pools must be at least 1".to_string()));
        }
        if self.dump.renderer.trim().is_empty() {
            return Err(Error::Config("dump.renderer must not be empty".to_string()));
        }
        Ok(())
    }
}
