//! Bridge configuration.
//!
//! Configuration is read from TOML and can be overridden from the
//! environment:
//!
//! ```toml
//! [adapter]
//! max_elements = 10000000
//!
//! [reclaim]
//! mode = "deferred"
//! pool_capacity = 512
//! ```
//!
//! | Variable                 | Field                  |
//! |--------------------------|------------------------|
//! | `ND_BRIDGE_MAX_ELEMENTS` | `adapter.max_elements` |
//! | `ND_BRIDGE_RECLAIM`      | `reclaim.mode`         |

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, BridgeResult};
use crate::reclaim::{init_reclaim, HandlePool, ReclaimMode, DEFAULT_POOL_CAPACITY};

/// Environment variable overriding `adapter.max_elements`
pub const ENV_MAX_ELEMENTS: &str = "ND_BRIDGE_MAX_ELEMENTS";
/// Environment variable overriding `reclaim.mode`
pub const ENV_RECLAIM: &str = "ND_BRIDGE_RECLAIM";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Adapter limits
    pub adapter: AdapterConfig,
    /// Reclamation policy for handle pools
    pub reclaim: ReclaimConfig,
}

/// Adapter settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Largest element count `create` accepts; unlimited when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_elements: Option<usize>,
}

/// Reclamation settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReclaimConfig {
    /// Mode installed by `init_reclaim`
    pub mode: ReclaimMode,
    /// Deferred handles held before a pool collects
    pub pool_capacity: usize,
}

impl Default for ReclaimConfig {
    fn default() -> Self {
        Self {
            mode: ReclaimMode::Automatic,
            pool_capacity: DEFAULT_POOL_CAPACITY,
        }
    }
}

impl ReclaimConfig {
    /// Install this mode as the process-wide policy
    pub fn init(&self) {
        init_reclaim(self.mode);
    }

    /// Create a pool with this mode and capacity
    pub fn pool(&self) -> HandlePool {
        HandlePool::with_mode(self.mode, self.pool_capacity)
    }
}

impl BridgeConfig {
    /// Parse a TOML document
    pub fn from_toml_str(source: &str) -> BridgeResult<Self> {
        toml::from_str(source).map_err(|err| BridgeError::config(err.to_string()))
    }

    /// Read and parse a TOML file
    pub fn load(path: impl AsRef<Path>) -> BridgeResult<Self> {
        let path = path.as_ref();
        let source =
            fs::read_to_string(path).map_err(|err| BridgeError::io(path.display().to_string(), &err))?;
        Self::from_toml_str(&source)
    }

    /// Render as TOML
    pub fn to_toml_string(&self) -> BridgeResult<String> {
        toml::to_string(self).map_err(|err| BridgeError::config(err.to_string()))
    }

    /// Apply overrides from the process environment
    pub fn apply_env(self) -> BridgeResult<Self> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn apply_overrides<F>(mut self, lookup: F) -> BridgeResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_MAX_ELEMENTS) {
            let limit = raw.trim().parse::<usize>().map_err(|_| {
                BridgeError::config(format!("{ENV_MAX_ELEMENTS} must be a non-negative integer, got '{raw}'"))
            })?;
            self.adapter.max_elements = Some(limit);
        }

        if let Some(raw) = lookup(ENV_RECLAIM) {
            self.reclaim.mode = raw.parse()?;
        }

        Ok(self)
    }
}
