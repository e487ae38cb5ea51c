//! Ambient particle field parameters.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Particle field physics and appearance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleParams {
    /// Number of particles (fixed for the lifetime of the engine)
    pub count: usize,

    /// Spawn cube half-extent (world units); positions start in [-e, e]^3
    pub spawn_extent: f32,

    /// Total width of the initial per-axis velocity distribution
    /// (world units per frame); components start in [-w/2, w/2]
    pub initial_velocity_spread: f32,

    /// Reflection boundary per axis (world units)
    pub bounds: f32,

    /// Per-frame velocity damping factor
    pub damping: f32,

    /// Pointer influence radius (world units)
    pub pointer_radius: f32,

    /// Repulsion numerator: impulse = strength / (distance + softening)
    pub repel_strength: f32,

    /// Repulsion softening term, keeps the impulse finite at distance 0
    pub repel_softening: f32,

    /// NDC to world scale for the pointer plane (z = 0)
    pub pointer_world_scale: f32,

    /// Probability that a particle blinks, in [0, 1]
    pub blink_probability: f32,

    /// Minimum blink rate (radians per second)
    pub blink_rate_min: f32,

    /// Random extra blink rate added on top of the minimum
    pub blink_rate_range: f32,

    /// Point sprite size (world units)
    pub point_size: f32,

    /// Base sprite opacity
    pub opacity: f32,

    /// RNG seed for spawning; `None` draws from OS entropy
    pub seed: Option<u64>,
}

impl Default for ParticleParams {
    fn default() -> Self {
        Self {
            count: 5000,
            spawn_extent: 7.5,
            initial_velocity_spread: 0.0005,
            bounds: 8.0,
            damping: 0.99,
            pointer_radius: 2.0,
            repel_strength: 0.005,
            repel_softening: 0.1,
            pointer_world_scale: 4.0,
            blink_probability: 0.25,
            blink_rate_min: 0.5,
            blink_rate_range: 0.5,
            point_size: 0.06,
            opacity: 0.5,
            seed: None,
        }
    }
}

impl ParticleParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.blink_probability) {
            return Err(ConfigError::Invalid(format!(
                "blink_probability must be in [0, 1], got {}",
                self.blink_probability
            )));
        }
        if self.spawn_extent > self.bounds {
            return Err(ConfigError::Invalid(format!(
                "spawn_extent ({}) must not exceed bounds ({})",
                self.spawn_extent, self.bounds
            )));
        }
        if self.repel_softening <= 0.0 {
            return Err(ConfigError::Invalid(
                "repel_softening must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}
