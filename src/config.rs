//! # World Configuration
//!
//! Tunables for the streaming world. A configuration is plain data: it can be
//! built in code, deserialized from JSON, and must pass [`WorldConfig::validate`]
//! before a [`World`](crate::engine_state::World) is constructed from it.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Configuration of a streaming world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Seed for every noise field. Same seed, same world.
    pub seed: u32,
    /// Radius, in chunks, of the region that is meshed and rendered.
    pub view_radius: u32,
    /// Extra chunks of voxel data kept beyond the view radius so that
    /// neighbour data exists before a chunk is meshed. Values below
    /// [`MIN_DATA_LOOKAHEAD`](crate::engine_state::streaming::bounds::MIN_DATA_LOOKAHEAD)
    /// are raised to it.
    pub data_lookahead: u32,
    /// How far, in chunks, a chunk must travel past its add radius before it
    /// is evicted. Must be at least 1.
    pub removal_hysteresis: u32,
    /// Number of worker threads running light and mesh tasks.
    pub worker_count: usize,
    /// Upper bound on render pipelines started per tick.
    pub max_renders_per_tick: usize,
    /// Blend each vertex light with the two edge and one corner neighbour.
    pub smooth_lighting: bool,
}

impl Default for WorldConfig {
    fn default() -> Self {
        let workers = std::thread::available_parallelism()
            .map(|n| n.get().saturating_sub(1))
            .unwrap_or(1)
            .max(1);

        Self {
            seed: 1337,
            view_radius: 5,
            data_lookahead: 2,
            removal_hysteresis: 2,
            worker_count: workers,
            max_renders_per_tick: 8,
            smooth_lighting: true,
        }
    }
}

impl WorldConfig {
    /// Parses and validates a configuration from JSON. Missing fields take
    /// their default values.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: WorldConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the configuration for values the streaming world cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.view_radius == 0 {
            return Err(ConfigError::InvalidWorld(
                "view_radius must be at least 1".to_string(),
            ));
        }
        if self.removal_hysteresis == 0 {
            return Err(ConfigError::InvalidWorld(
                "removal_hysteresis must be at least 1".to_string(),
            ));
        }
        if self.worker_count == 0 {
            return Err(ConfigError::InvalidWorld(
                "worker_count must be at least 1".to_string(),
            ));
        }
        if self.max_renders_per_tick == 0 {
            return Err(ConfigError::InvalidWorld(
                "max_renders_per_tick must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
