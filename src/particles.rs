//! Ambient particle field drifting around the orb.

mod field;

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

pub use field::ParticleField;

/// One particle's kinematic and colour state
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Particle {
    pub position: Vec3,
    pub velocity: Vec3,
    /// Derived from position and palette; physics never writes it
    pub color: Vec3,
    /// Radians per second; 0 means the particle never blinks
    pub blink_rate: f32,
    pub blink_phase: f32,
}

impl Particle {
    /// Brightness multiplier at `time_s`, in [0, 1]
    pub fn blink_factor(&self, time_s: f32) -> f32 {
        if self.blink_rate > 0.0 {
            0.5 + 0.5 * (self.blink_phase + self.blink_rate * time_s).sin()
        } else {
            1.0
        }
    }
}

/// Per-instance data uploaded for each particle sprite
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ParticleInstance {
    pub position: [f32; 3],
    pub blink_rate: f32,
    pub color: [f32; 3],
    pub blink_phase: f32,
}

impl From<&Particle> for ParticleInstance {
    fn from(p: &Particle) -> Self {
        Self {
            position: p.position.to_array(),
            blink_rate: p.blink_rate,
            color: p.color.to_array(),
            blink_phase: p.blink_phase,
        }
    }
}
