//! Rendering and composition configuration.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Upper bound on bloom mip levels
pub const MAX_BLOOM_LEVELS: usize = 8;

/// Rendering configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Window width (pixels)
    pub window_width: u32,

    /// Window height (pixels)
    pub window_height: u32,

    /// Device pixel ratio applied to pass buffers
    pub pixel_ratio: f32,

    /// Frame rate the headless driver paces to (FPS)
    pub target_fps: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            window_width: 1280,
            window_height: 720,
            pixel_ratio: 1.0,
            target_fps: 60,
        }
    }
}

/// Bloom pass settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BloomParams {
    /// Additive bloom strength
    pub strength: f32,

    /// Blur radius (0 = tight, 1 = wide)
    pub radius: f32,

    /// Luminance threshold for the bright pass
    pub threshold: f32,

    /// Number of blur mip levels, each half the size of the previous
    pub mip_levels: usize,
}

impl Default for BloomParams {
    fn default() -> Self {
        Self {
            strength: 2.0,
            radius: 0.5,
            threshold: 0.0,
            mip_levels: 5,
        }
    }
}

impl BloomParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_BLOOM_LEVELS).contains(&self.mip_levels) {
            return Err(ConfigError::Invalid(format!(
                "bloom mip_levels must be in [1, {}], got {}",
                MAX_BLOOM_LEVELS, self.mip_levels
            )));
        }
        if !(self.strength >= 0.0 && self.radius >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "bloom strength and radius must be >= 0, got {} and {}",
                self.strength, self.radius
            )));
        }
        Ok(())
    }
}
