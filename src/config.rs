//! Engine configuration.
//!
//! Every field has a default, so a config file only needs the values it
//! changes: `{"sampleRate": 44100, "seed": 7}` is a complete config.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Sample rate of offline contexts, in Hz. Live devices use their own rate.
    pub sample_rate: f64,
    /// Length of the looping noise buffer.
    pub noise_seconds: f64,
    /// Lowest gain (and frequency) an exponential ramp may target.
    pub gain_floor: f64,
    pub speed_ramp_seconds: f64,
    pub volume_ramp_seconds: f64,
    pub master_gain: f64,
    /// Frames rendered per block when pulling offline.
    pub block_size: usize,
    /// Noise RNG seed. `None` seeds from OS entropy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            sample_rate: 48000.0,
            noise_seconds: 3.0,
            gain_floor: 0.001,
            speed_ramp_seconds: 0.5,
            volume_ramp_seconds: 0.1,
            master_gain: 0.8,
            block_size: 128,
            seed: None,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        let positive = [
            ("sampleRate", self.sample_rate),
            ("noiseSeconds", self.noise_seconds),
            ("gainFloor", self.gain_floor),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(EngineError::InvalidConfig(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }

        let non_negative = [
            ("speedRampSeconds", self.speed_ramp_seconds),
            ("volumeRampSeconds", self.volume_ramp_seconds),
            ("masterGain", self.master_gain),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(EngineError::InvalidConfig(format!(
                    "{name} must be non-negative, got {value}"
                )));
            }
        }

        if self.block_size == 0 {
            return Err(EngineError::InvalidConfig("blockSize must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.noise_seconds, 3.0);
        assert_eq!(config.gain_floor, 0.001);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config = EngineConfig::from_json(r#"{"sampleRate": 44100, "seed": 7}"#).unwrap();
        assert_eq!(config.sample_rate, 44100.0);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.speed_ramp_seconds, 0.5);
        assert_eq!(config.block_size, 128);
    }

    #[test]
    fn rejects_bad_values() {
        let err = EngineConfig::from_json(r#"{"gainFloor": 0}"#).unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(_)));

        let err = EngineConfig::from_json(r#"{"blockSize": 0}"#).unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_malformed_json() {
        let err = EngineConfig::from_json("{sampleRate").unwrap_err();
        assert!(matches!(err, EngineError::ConfigParse(_)));
    }
}
