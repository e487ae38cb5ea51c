//! Spectral analyser configuration.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Analyser configuration (browser analyser-node model)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyserConfig {
    /// FFT window size in samples (power of 2, at least 32)
    /// Produces `fft_size / 2` frequency bins
    pub fft_size: usize,

    /// Temporal smoothing between successive spectra, in [0, 1)
    /// 0.0 = no smoothing, values near 1 = slow decay
    pub smoothing_time_constant: f32,

    /// Magnitude (dB) mapped to byte value 0
    pub min_decibels: f32,

    /// Magnitude (dB) mapped to byte value 255
    pub max_decibels: f32,
}

impl Default for AnalyserConfig {
    fn default() -> Self {
        Self {
            fft_size: 32,
            smoothing_time_constant: 0.8,
            min_decibels: -100.0,
            max_decibels: -30.0,
        }
    }
}

impl AnalyserConfig {
    /// Number of frequency bins produced per update
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Validate configuration (FFT size must be power of 2, dB range ordered)
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.fft_size.is_power_of_two() || self.fft_size < 32 {
            return Err(ConfigError::Invalid(format!(
                "analyser fft_size must be a power of 2 >= 32, got {}",
                self.fft_size
            )));
        }
        if !(0.0..1.0).contains(&self.smoothing_time_constant) {
            return Err(ConfigError::Invalid(format!(
                "analyser smoothing must be in [0, 1), got {}",
                self.smoothing_time_constant
            )));
        }
        if self.min_decibels >= self.max_decibels {
            return Err(ConfigError::Invalid(format!(
                "analyser min_decibels ({}) must be below max_decibels ({})",
                self.min_decibels, self.max_decibels
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bin_count() {
        assert_eq!(AnalyserConfig::default().bin_count(), 16);
    }

    #[test]
    fn test_validate_rejects_bad_fft_size() {
        let config = AnalyserConfig {
            fft_size: 48,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(AnalyserConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_inverted_db_range() {
        let config = AnalyserConfig {
            min_decibels: -20.0,
            max_decibels: -30.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
