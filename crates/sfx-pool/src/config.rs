//! Pool configuration

use serde::{Deserialize, Serialize};

use crate::device::VoiceTemplate;
use crate::error::{PoolError, PoolResult};

/// Default capacity of the auto-return ticket queue
const DEFAULT_RETURN_QUEUE_CAPACITY: usize = 1024;

/// Effect pool configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Template used for voices when a definition has no override.
    /// Also used for every transient (pooled) voice.
    pub default_template: Option<VoiceTemplate>,
    /// Report releasing an already-free voice as an error
    pub collection_checks: bool,
    /// Initial capacity of the transient free list
    pub default_capacity: usize,
    /// Maximum idle voices kept by the transient pool; the oldest released
    /// voice is destroyed beyond this
    pub max_size: usize,
    /// Hard limit on transient voices alive at once (`None` = unbounded).
    /// At the limit the oldest leased voice is reclaimed.
    pub max_voices: Option<usize>,
    /// Capacity of the auto-return ticket queue
    pub return_queue_capacity: usize,
    /// Seed for clip/pitch randomisation (`None` = from OS entropy)
    pub rng_seed: Option<u64>,
    /// Log lookup misses as warnings (debug otherwise)
    pub warn_on_miss: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            default_template: Some(VoiceTemplate::new("default")),
            collection_checks: true,
            default_capacity: 10,
            max_size: 10_000,
            max_voices: None,
            return_queue_capacity: DEFAULT_RETURN_QUEUE_CAPACITY,
            rng_seed: None,
            warn_on_miss: true,
        }
    }
}

impl PoolConfig {
    /// Reproducible randomisation, for tests and replays
    pub fn deterministic(seed: u64) -> Self {
        Self {
            rng_seed: Some(seed),
            ..Default::default()
        }
    }

    /// Small transient pool with a hard voice limit
    pub fn compact(max_voices: usize) -> Self {
        Self {
            default_capacity: max_voices.min(10),
            max_size: max_voices.max(1),
            max_voices: Some(max_voices.max(1)),
            return_queue_capacity: 256,
            ..Default::default()
        }
    }

    /// Parse from JSON, normalising out-of-range values
    pub fn from_json(json: &str) -> PoolResult<Self> {
        let mut config: Self =
            serde_json::from_str(json).map_err(|e| PoolError::Config(e.to_string()))?;
        config.validate();
        Ok(config)
    }

    pub fn to_json(&self) -> PoolResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| PoolError::Config(e.to_string()))
    }

    /// Clamp values into their usable ranges
    pub fn validate(&mut self) {
        if self.max_size == 0 {
            log::warn!("PoolConfig.max_size must be at least 1, using 1");
            self.max_size = 1;
        }
        if self.default_capacity > self.max_size {
            self.default_capacity = self.max_size;
        }
        if self.max_voices == Some(0) {
            log::warn!("PoolConfig.max_voices must be at least 1, using 1");
            self.max_voices = Some(1);
        }
        if self.return_queue_capacity == 0 {
            self.return_queue_capacity = DEFAULT_RETURN_QUEUE_CAPACITY;
        }
    }
}
