//! Uniform buffer layouts shared with the WGSL shaders.
//!
//! Field order and padding follow WGSL uniform alignment: a `vec3` is
//! packed together with a trailing scalar into one 16-byte slot.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec3};

use crate::orb::OrbState;
use crate::params::{BloomParams, ParticleParams};

/// Uniform buffer for the orb shader (deformation, material, pointer)
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct OrbUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub camera_position: [f32; 3],
    pub time: f32,
    pub orb_color: [f32; 3],
    pub volume: f32,
    pub pointer_hit: [f32; 3],
    pub brightness: f32,
    pub pulse_intensity: f32,
    pub amplitude: f32,
    pub frequency: f32,
    pub speed: f32,
    pub scale: f32,
    pub roughness: f32,
    pub metalness: f32,
    pub emissive_intensity: f32,
    pub temperature: f32,
    pub top_k: f32,
    pub top_p: f32,
    pub _padding: f32,
}

impl OrbUniforms {
    pub fn new(state: &OrbState, view_proj: Mat4, camera_position: Vec3, time_s: f32) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            camera_position: camera_position.to_array(),
            time: time_s,
            orb_color: state.base_color.to_array(),
            volume: state.volume,
            pointer_hit: state.pointer_hit.to_array(),
            brightness: state.brightness,
            pulse_intensity: state.pulse_intensity,
            amplitude: state.amplitude,
            frequency: state.frequency,
            speed: state.speed,
            scale: state.scale,
            roughness: state.roughness,
            metalness: state.metalness,
            emissive_intensity: state.emissive_intensity,
            temperature: state.sampling.temperature,
            top_k: state.sampling.top_k as f32,
            top_p: state.sampling.top_p,
            _padding: 0.0,
        }
    }
}

/// Uniform buffer for the particle sprites
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct ParticleUniforms {
    pub view_proj: [[f32; 4]; 4],
    /// Drawing-buffer size in device pixels
    pub resolution: [f32; 2],
    pub time: f32,
    pub size: f32,
    pub opacity: f32,
    pub _padding: [f32; 3],
}

impl ParticleUniforms {
    pub fn new(params: &ParticleParams, view_proj: Mat4, resolution: Vec2, time_s: f32) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            resolution: resolution.to_array(),
            time: time_s,
            size: params.point_size,
            opacity: params.opacity,
            _padding: [0.0; 3],
        }
    }
}

/// Uniform buffer for the full-screen backdrop
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct BackdropUniforms {
    pub resolution: [f32; 2],
    /// Fresh random value each tick, in [0, 10000)
    pub rand: f32,
    pub _padding: f32,
}

/// Uniform buffer for the bloom threshold, blur and composite passes
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct BloomUniforms {
    pub texel_size: [f32; 2],
    /// Blur axis; zero for the threshold and composite passes
    pub direction: [f32; 2],
    pub strength: f32,
    pub radius: f32,
    pub threshold: f32,
    /// Contribution of one mip level when the chain is summed
    pub weight: f32,
}

impl BloomUniforms {
    pub fn new(params: &BloomParams, target_size: (u32, u32)) -> Self {
        Self {
            texel_size: [
                1.0 / target_size.0.max(1) as f32,
                1.0 / target_size.1.max(1) as f32,
            ],
            direction: [0.0, 0.0],
            strength: params.strength,
            radius: params.radius,
            threshold: params.threshold,
            weight: 1.0,
        }
    }

    /// Same settings, blurring along `direction`
    pub fn with_direction(self, direction: Vec2) -> Self {
        Self {
            direction: direction.to_array(),
            ..self
        }
    }

    /// Same settings, sampling a target of `size`
    pub fn with_target_size(self, size: (u32, u32)) -> Self {
        Self {
            texel_size: [1.0 / size.0.max(1) as f32, 1.0 / size.1.max(1) as f32],
            ..self
        }
    }

    pub fn with_weight(self, weight: f32) -> Self {
        Self { weight, ..self }
    }
}

/// Uniform buffer for the FXAA pass
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct FxaaUniforms {
    pub inverse_resolution: [f32; 2],
    pub _padding: [f32; 2],
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::ParameterBus;
    use crate::params::OrbParams;

    #[test]
    fn test_uniform_sizes_are_16_byte_multiples() {
        assert_eq!(std::mem::size_of::<OrbUniforms>(), 160);
        assert_eq!(std::mem::size_of::<ParticleUniforms>(), 96);
        assert_eq!(std::mem::size_of::<BackdropUniforms>(), 16);
        assert_eq!(std::mem::size_of::<BloomUniforms>(), 32);
        assert_eq!(std::mem::size_of::<FxaaUniforms>(), 16);
    }

    #[test]
    fn test_orb_uniforms_from_state() {
        let bus = ParameterBus::new().snapshot();
        let state = OrbState::new(&OrbParams::default(), &bus);
        let u = OrbUniforms::new(&state, Mat4::IDENTITY, Vec3::new(0.0, 0.0, 5.0), 1.5);
        assert_eq!(u.pointer_hit, [-99.0, -99.0, -99.0]);
        assert_eq!(u.time, 1.5);
        assert_eq!(u.top_k, 20.0);
        assert_eq!(u.amplitude, 0.5);
        assert_eq!(u.camera_position, [0.0, 0.0, 5.0]);
    }

    #[test]
    fn test_particle_uniform_defaults() {
        let u = ParticleUniforms::new(
            &ParticleParams::default(),
            Mat4::IDENTITY,
            Vec2::new(800.0, 600.0),
            0.0,
        );
        assert_eq!(u.size, 0.06);
        assert_eq!(u.opacity, 0.5);
    }

    #[test]
    fn test_bloom_direction() {
        let u = BloomUniforms::new(&BloomParams::default(), (400, 200)).with_direction(Vec2::X);
        assert_eq!(u.direction, [1.0, 0.0]);
        assert_eq!(u.texel_size, [1.0 / 400.0, 1.0 / 200.0]);
        assert_eq!(u.strength, 2.0);
    }
}
