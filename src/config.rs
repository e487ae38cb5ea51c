//! Engine configuration: compiled defaults, optional TOML file, CLI overrides.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;
use crate::palette::Theme;
use crate::params::{
    AnalyserConfig, BloomParams, CameraParams, OrbParams, ParticleParams, RenderConfig,
};

/// Complete engine configuration (every section optional in the file)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Starting theme key; `None` keeps the default theme
    pub theme: Option<String>,
    pub analyser: AnalyserConfig,
    pub particles: ParticleParams,
    pub orb: OrbParams,
    pub camera: CameraParams,
    pub bloom: BloomParams,
    pub render: RenderConfig,
}

impl EngineConfig {
    /// Load and validate a TOML config file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml_str(&text, &path.display().to_string())?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse and validate TOML text; `origin` names the source in errors
    pub fn from_toml_str(text: &str, origin: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// The configured theme, or the default one
    pub fn theme(&self) -> Result<Theme, ConfigError> {
        match &self.theme {
            Some(key) => Ok(Theme::by_key(key)?),
            None => Ok(Theme::default_theme()),
        }
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.analyser.validate()?;
        self.particles.validate()?;
        self.bloom.validate()?;
        self.theme()?;

        let orb = &self.orb;
        if !(orb.min_scale > 0.0 && orb.min_scale <= orb.max_scale) {
            return Err(ConfigError::Invalid(format!(
                "orb scale range [{}, {}] is empty",
                orb.min_scale, orb.max_scale
            )));
        }
        if !(0.0..=1.0).contains(&orb.smoothing) {
            return Err(ConfigError::Invalid(format!(
                "orb smoothing must be in [0, 1], got {}",
                orb.smoothing
            )));
        }

        let camera = &self.camera;
        if !(camera.near_plane > 0.0 && camera.near_plane < camera.far_plane) {
            return Err(ConfigError::Invalid(format!(
                "camera planes must satisfy 0 < near ({}) < far ({})",
                camera.near_plane, camera.far_plane
            )));
        }
        if !(camera.fov_degrees > 0.0 && camera.fov_degrees < 180.0) {
            return Err(ConfigError::Invalid(format!(
                "camera fov must be in (0, 180), got {}",
                camera.fov_degrees
            )));
        }

        let render = &self.render;
        if render.window_width == 0 || render.window_height == 0 {
            return Err(ConfigError::Invalid(format!(
                "window size must be non-zero, got {}x{}",
                render.window_width, render.window_height
            )));
        }
        if render.target_fps == 0 {
            return Err(ConfigError::Invalid("target_fps must be > 0".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let text = r#"
            theme = "halcyon"

            [particles]
            count = 1200
            seed = 42

            [bloom]
            strength = 1.25
        "#;
        let config = EngineConfig::from_toml_str(text, "inline").unwrap();
        assert_eq!(config.particles.count, 1200);
        assert_eq!(config.particles.seed, Some(42));
        assert_eq!(config.particles.damping, 0.99);
        assert_eq!(config.bloom.strength, 1.25);
        assert_eq!(config.bloom.radius, 0.5);
        assert_eq!(config.camera.fov_degrees, 75.0);
        assert_eq!(config.theme().unwrap().key, "halcyon");
    }

    #[test]
    fn test_unknown_theme_rejected() {
        let err = EngineConfig::from_toml_str("theme = \"vaporwave\"", "inline").unwrap_err();
        assert!(matches!(err, ConfigError::Palette(_)));
    }

    #[test]
    fn test_bad_analyser_rejected() {
        let err = EngineConfig::from_toml_str("[analyser]\nfft_size = 48", "inline").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_bloom_levels_bounded() {
        let config = EngineConfig::from_toml_str("[bloom]\nmip_levels = 3", "inline").unwrap();
        assert_eq!(config.bloom.mip_levels, 3);
        for bad in ["[bloom]\nmip_levels = 0", "[bloom]\nmip_levels = 9"] {
            let err = EngineConfig::from_toml_str(bad, "inline").unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)));
        }
    }

    #[test]
    fn test_parse_error_names_origin() {
        let err = EngineConfig::from_toml_str("[particles\ncount = 3", "my.toml").unwrap_err();
        assert!(err.to_string().contains("my.toml"));
    }

    #[test]
    fn test_round_trip_through_toml() {
        let config = EngineConfig::default();
        let text = config.to_toml_string().unwrap();
        let parsed = EngineConfig::from_toml_str(&text, "inline").unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = EngineConfig::load("/nonexistent/vibeorb.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
