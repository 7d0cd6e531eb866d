//! Query cache configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Tuning knobs for [`QueryCache`](crate::cache::QueryCache).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Entries kept per scope before the oldest is evicted (0 = unbounded).
    pub max_entries_per_scope: usize,

    /// Lifetime of an entry in seconds. `None` keeps entries until the scope
    /// is invalidated.
    pub entry_ttl_secs: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries_per_scope: 64,
            entry_ttl_secs: None,
        }
    }
}

impl CacheConfig {
    pub fn entry_ttl(&self) -> Option<Duration> {
        self.entry_ttl_secs.map(Duration::from_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.entry_ttl_secs == Some(0) {
            return Err(ConfigError::Invalid(
                "entry_ttl_secs must be positive; omit it to disable expiry".into(),
            ));
        }
        Ok(())
    }
}

/// Parse and validate a cache config from a JSON string. Missing fields take
/// their defaults.
pub fn parse_cache_config(json: &str) -> Result<CacheConfig, ConfigError> {
    let config: CacheConfig = serde_json::from_str(json)?;
    config.validate()?;
    Ok(config)
}
