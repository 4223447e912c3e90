//! Tuning parameters for the per-tick evaluation.
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Search step must be a positive finite number, got {0}")]
    InvalidStep(f64),
    #[error("Iterations per tick must be at least 1")]
    ZeroIterations,
    #[error("Malformed configuration: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Probe distance `ε` of the relaxation solver, per axis.
    pub search_step: f64,
    /// Evaluations each operator runs per tick, forward or reversed.
    pub iterations_per_tick: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            search_step: 0.01,
            iterations_per_tick: 25,
        }
    }
}

impl EngineConfig {
    /// Parses and validates a JSON object. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.search_step.is_finite() && self.search_step > 0.0) {
            return Err(ConfigError::InvalidStep(self.search_step));
        }
        if self.iterations_per_tick == 0 {
            return Err(ConfigError::ZeroIterations);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.search_step, 0.01);
        assert_eq!(config.iterations_per_tick, 25);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EngineConfig::from_json(r#"{ "iterations_per_tick": 5 }"#).unwrap();
        assert_eq!(config.iterations_per_tick, 5);
        assert_eq!(config.search_step, 0.01);
    }

    #[rstest]
    #[case(r#"{ "search_step": 0.0 }"#, ConfigError::InvalidStep(0.0))]
    #[case(r#"{ "search_step": -0.5 }"#, ConfigError::InvalidStep(-0.5))]
    #[case(r#"{ "iterations_per_tick": 0 }"#, ConfigError::ZeroIterations)]
    fn test_rejects_invalid_values(#[case] json: &str, #[case] expected: ConfigError) {
        assert_eq!(EngineConfig::from_json(json), Err(expected));
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(EngineConfig::from_json("{ search_step"), Err(ConfigError::Parse(_))));
    }
}
