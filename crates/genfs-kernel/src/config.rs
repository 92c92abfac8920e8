//! GenFS configuration.
//!
//! ```toml
//! cache = true
//! evict_on_trigger = true
//! bus_capacity = 128
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GenFsError, GenResult};
use crate::flows::DEFAULT_TOPIC_CAPACITY;

/// Tunables for a [`GenFs`](crate::GenFs).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenFsConfig {
    /// Keep resolved content between opens.
    pub cache: bool,
    /// Drop cached content for triggered paths and their dependents.
    pub evict_on_trigger: bool,
    /// Per-topic notification buffer; slower subscribers lag.
    pub bus_capacity: usize,
}

impl Default for GenFsConfig {
    fn default() -> Self {
        Self {
            cache: false,
            evict_on_trigger: true,
            bus_capacity: DEFAULT_TOPIC_CAPACITY,
        }
    }
}

impl GenFsConfig {
    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> GenResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| GenFsError::Config(e.to_string()))?;
        config.validate()
    }

    /// Load a TOML file.
    pub fn load(path: impl AsRef<Path>) -> GenResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| GenFsError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    /// Enable or disable the content cache.
    pub fn with_cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }

    /// Enable or disable eviction on trigger.
    pub fn with_evict_on_trigger(mut self, evict: bool) -> Self {
        self.evict_on_trigger = evict;
        self
    }

    /// Set the per-topic notification buffer.
    pub fn with_bus_capacity(mut self, capacity: usize) -> Self {
        self.bus_capacity = capacity;
        self
    }

    fn validate(self) -> GenResult<Self> {
        if self.bus_capacity == 0 {
            return Err(GenFsError::Config("bus_capacity must be at least 1".into()));
        }
        Ok(self)
    }
}
