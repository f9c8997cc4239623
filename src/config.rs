use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::storage::DEFAULT_CAPACITY;

pub const DEFAULT_MAX_NESTING_DEPTH: usize = 32;
pub const DEFAULT_SIMULATION_TICKS_PER_SECOND: u32 = 20;
pub const DEFAULT_FRAMES_PER_SECOND: u32 = 60;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("Invalid configuration: {0}")]
    Parse(String),
}

/// Engine settings shared by every workspace.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct SimulatorConfig {
    /// Slots in the signal store of one compiled circuit, nested circuits included.
    pub signal_capacity: usize,
    /// How many composite gates may be nested inside one another.
    pub max_nesting_depth: usize,
    pub simulation_ticks_per_second: u32,
    pub frames_per_second: u32,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            signal_capacity: DEFAULT_CAPACITY,
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
            simulation_ticks_per_second: DEFAULT_SIMULATION_TICKS_PER_SECOND,
            frames_per_second: DEFAULT_FRAMES_PER_SECOND,
        }
    }
}

impl SimulatorConfig {
    /// Parses a JSON document; missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(text).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.signal_capacity == 0 {
            return Err(ConfigError::Zero("signalCapacity"));
        }
        if self.max_nesting_depth == 0 {
            return Err(ConfigError::Zero("maxNestingDepth"));
        }
        if self.simulation_ticks_per_second == 0 {
            return Err(ConfigError::Zero("simulationTicksPerSecond"));
        }
        if self.frames_per_second == 0 {
            return Err(ConfigError::Zero("framesPerSecond"));
        }
        Ok(())
    }

    pub fn with_signal_capacity(mut self, capacity: usize) -> Self {
        self.signal_capacity = capacity;
        self
    }

    pub fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }

    /// Period of the simulation tick.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(1) / self.simulation_ticks_per_second.max(1)
    }

    /// Period of the render/update tick.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs(1) / self.frames_per_second.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SimulatorConfig::default();
        assert_eq!(config.signal_capacity, 1024);
        assert_eq!(config.tick_interval(), Duration::from_millis(50));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = SimulatorConfig::from_json(r#"{"signalCapacity": 64}"#).unwrap();
        assert_eq!(config.signal_capacity, 64);
        assert_eq!(config.max_nesting_depth, DEFAULT_MAX_NESTING_DEPTH);
    }

    #[test]
    fn zero_values_are_rejected() {
        assert_eq!(
            SimulatorConfig::from_json(r#"{"maxNestingDepth": 0}"#),
            Err(ConfigError::Zero("maxNestingDepth"))
        );
    }

    #[test]
    fn malformed_json_is_rejected() {
        for text in ["{", "true", r#"{"signalCapcity": 64}"#] {
            assert!(
                matches!(SimulatorConfig::from_json(text), Err(ConfigError::Parse(_))),
                "{text}"
            );
        }
    }
}
