use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Default number of pending events a watcher may buffer.
pub const DEFAULT_WATCH_CAPACITY: usize = 100;

/// Tunables for a [`crate::MemoryStore`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Per-watcher buffer size. Events beyond it are dropped.
    pub watch_capacity: usize,
    /// Whether Update on a missing key creates it.
    pub allow_create_on_update: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            watch_capacity: DEFAULT_WATCH_CAPACITY,
            allow_create_on_update: false,
        }
    }
}

impl StoreConfig {
    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> StoreResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| StoreError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and parse a TOML file.
    pub fn load(path: &Path) -> StoreResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> StoreResult<String> {
        toml::to_string(self).map_err(|e| StoreError::Config(e.to_string()))
    }

    pub fn validate(&self) -> StoreResult<()> {
        if self.watch_capacity == 0 {
            return Err(StoreError::Config("watch_capacity must be at least 1".into()));
        }
        Ok(())
    }
}
