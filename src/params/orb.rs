//! Orb animation parameters.

use serde::{Deserialize, Serialize};

/// Orb scale, material and smoothing parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbParams {
    /// Mesh radius before scaling (world units)
    pub radius: f32,

    /// Scale clamp range
    pub min_scale: f32,
    pub max_scale: f32,

    /// Starting scale
    pub initial_scale: f32,

    /// Idle breathing: scale = base + amplitude * sin(t * rate)
    pub idle_scale_base: f32,
    pub idle_scale_amplitude: f32,

    /// Idle breathing angular rate (radians per second)
    pub idle_angular_rate: f32,

    /// Active scale gain on output bin 1 (normalized to [0, 1])
    pub active_output_gain: f32,

    /// Active scale gain on average input volume
    pub active_volume_gain: f32,

    /// Emissive intensity targets per regime
    pub idle_emissive: f32,
    pub active_emissive: f32,

    /// Exponential smoothing factor per frame (0 = frozen, 1 = snap)
    pub smoothing: f32,

    /// Roughness target = clamp(min + gain * volume, min, max)
    pub roughness_min: f32,
    pub roughness_max: f32,
    pub roughness_gain: f32,

    /// Metalness target = clamp(min + gain * volume, min, max)
    pub metalness_min: f32,
    pub metalness_max: f32,
    pub metalness_gain: f32,

    /// Initial material values
    pub initial_roughness: f32,
    pub initial_metalness: f32,
    pub initial_emissive: f32,
}

impl Default for OrbParams {
    fn default() -> Self {
        Self {
            radius: 1.5,
            min_scale: 0.1,
            max_scale: 1.5,
            initial_scale: 0.1,
            idle_scale_base: 0.1,
            idle_scale_amplitude: 0.05,
            idle_angular_rate: 1.0,
            active_output_gain: 0.2,
            active_volume_gain: 0.3,
            idle_emissive: 0.5,
            active_emissive: 1.5,
            smoothing: 0.1,
            roughness_min: 0.1,
            roughness_max: 0.7,
            roughness_gain: 0.6,
            metalness_min: 0.3,
            metalness_max: 0.7,
            metalness_gain: 0.4,
            initial_roughness: 0.1,
            initial_metalness: 0.5,
            initial_emissive: 1.5,
        }
    }
}
