//! Orb animation: scale, material and shader inputs driven by audio energy
//! and the parameter bus.

use glam::Vec3;

use crate::audio::AudioEnergy;
use crate::bus::{BusSnapshot, SamplingParams};
use crate::params::OrbParams;

/// Pointer hit value meaning "the pointer is not over the orb"
pub const NO_HIT: Vec3 = Vec3::new(-99.0, -99.0, -99.0);

/// Animation regime, selected by the bus `is_processing` flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrbRegime {
    /// Slow breathing at a small scale
    Idle,
    /// Scale follows live audio energy
    Active,
}

impl OrbRegime {
    pub fn from_processing(is_processing: bool) -> Self {
        if is_processing {
            Self::Active
        } else {
            Self::Idle
        }
    }
}

/// Everything the renderer needs to draw the orb
#[derive(Debug, Clone, PartialEq)]
pub struct OrbState {
    pub scale: f32,
    pub roughness: f32,
    pub metalness: f32,
    pub emissive_intensity: f32,
    /// Accumulated Euler angles (radians, XYZ); grows without bound
    pub rotation: Vec3,
    pub base_color: Vec3,
    /// Engine-held pulse, eased toward the bus target
    pub pulse_intensity: f32,
    pub amplitude: f32,
    pub frequency: f32,
    pub speed: f32,
    /// World-space pointer hit on the orb, or [`NO_HIT`]
    pub pointer_hit: Vec3,
    pub volume: f32,
    pub brightness: f32,
    pub sampling: SamplingParams,
}

impl OrbState {
    pub fn new(params: &OrbParams, bus: &BusSnapshot) -> Self {
        Self {
            scale: params.initial_scale,
            roughness: params.initial_roughness,
            metalness: params.initial_metalness,
            emissive_intensity: params.initial_emissive,
            rotation: Vec3::ZERO,
            base_color: bus.base_color,
            pulse_intensity: 0.0,
            amplitude: bus.amplitude,
            frequency: bus.frequency,
            speed: bus.speed,
            pointer_hit: NO_HIT,
            volume: 0.0,
            brightness: bus.ambient_brightness,
            sampling: bus.sampling,
        }
    }

    /// Whether the pointer currently touches the orb
    pub fn has_pointer_hit(&self) -> bool {
        self.pointer_hit != NO_HIT
    }
}

/// Per-tick orb driver
pub struct OrbAnimator {
    pub state: OrbState,
    params: OrbParams,
}

impl OrbAnimator {
    pub fn new(params: OrbParams, bus: &BusSnapshot) -> Self {
        Self {
            state: OrbState::new(&params, bus),
            params,
        }
    }

    /// Scale the orb eases toward in `regime`
    pub fn target_scale(&self, regime: OrbRegime, time_s: f32, energy: &AudioEnergy) -> f32 {
        let p = &self.params;
        let raw = match regime {
            OrbRegime::Idle => {
                p.idle_scale_base + p.idle_scale_amplitude * (time_s * p.idle_angular_rate).sin()
            }
            OrbRegime::Active => {
                1.0 + p.active_output_gain * energy.output_bins[1] as f32 / 255.0
                    + p.active_volume_gain * energy.input_volume
            }
        };
        raw.clamp(p.min_scale, p.max_scale)
    }

    pub fn target_emissive(&self, regime: OrbRegime) -> f32 {
        match regime {
            OrbRegime::Idle => self.params.idle_emissive,
            OrbRegime::Active => self.params.active_emissive,
        }
    }

    /// Advance one tick
    pub fn update(&mut self, time_s: f32, energy: &AudioEnergy, bus: &BusSnapshot) {
        let p = &self.params;
        let k = p.smoothing;
        let volume = energy.input_volume;
        let regime = OrbRegime::from_processing(bus.is_processing);

        let target_roughness = (p.roughness_min + p.roughness_gain * volume)
            .clamp(p.roughness_min, p.roughness_max);
        let target_metalness = (p.metalness_min + p.metalness_gain * volume)
            .clamp(p.metalness_min, p.metalness_max);
        let target_scale = self.target_scale(regime, time_s, energy);
        let target_emissive = self.target_emissive(regime);

        let s = &mut self.state;
        s.roughness = lerp(s.roughness, target_roughness, k);
        s.metalness = lerp(s.metalness, target_metalness, k);
        s.scale = lerp(s.scale, target_scale, k);
        s.emissive_intensity = lerp(s.emissive_intensity, target_emissive, k);
        s.pulse_intensity = lerp(s.pulse_intensity, bus.pulse_intensity, k);

        // Applied as-is
        s.base_color = bus.base_color;
        s.amplitude = bus.amplitude;
        s.frequency = bus.frequency;
        s.speed = bus.speed;
        s.brightness = bus.ambient_brightness;
        s.sampling = bus.sampling;
        s.volume = volume;
    }

    /// World-space radius of the orb at its current scale
    pub fn world_radius(&self) -> f32 {
        self.params.radius * self.state.scale
    }

    pub fn params(&self) -> &OrbParams {
        &self.params
    }
}

fn lerp(from: f32, to: f32, factor: f32) -> f32 {
    from + (to - from) * factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::ParameterBus;

    fn animator() -> (OrbAnimator, BusSnapshot) {
        let bus = ParameterBus::new().snapshot();
        (OrbAnimator::new(OrbParams::default(), &bus), bus)
    }

    fn loud() -> AudioEnergy {
        AudioEnergy {
            input_bins: [255, 255, 255],
            output_bins: [255, 255, 255],
            input_volume: 1.0,
            output_volume: 1.0,
        }
    }

    #[test]
    fn test_idle_at_time_zero_holds_scale() {
        let (mut orb, bus) = animator();
        assert!((orb.target_scale(OrbRegime::Idle, 0.0, &AudioEnergy::default()) - 0.1).abs() < 1e-7);
        orb.update(0.0, &AudioEnergy::default(), &bus);
        assert!((orb.state.scale - 0.1).abs() < 1e-7);
    }

    #[test]
    fn test_active_target_clamped() {
        let (orb, _) = animator();
        // 1 + 0.2 + 0.3 = 1.5 exactly at full energy
        let target = orb.target_scale(OrbRegime::Active, 0.0, &loud());
        assert!(target <= 1.5);
        assert!((target - 1.5).abs() < 1e-6);
        let quiet = orb.target_scale(OrbRegime::Active, 0.0, &AudioEnergy::default());
        assert!((quiet - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_scale_approaches_without_overshoot() {
        let (mut orb, mut bus) = animator();
        bus.is_processing = true;
        let energy = loud();
        let target = orb.target_scale(OrbRegime::Active, 0.0, &energy);

        let mut previous = orb.state.scale;
        for tick in 0..300 {
            orb.update(tick as f32 / 60.0, &energy, &bus);
            let scale = orb.state.scale;
            assert!((0.1..=1.5).contains(&scale));
            assert!(scale >= previous);
            assert!(scale <= target);
            previous = scale;
        }
        assert!((orb.state.scale - target).abs() < 1e-3);
        assert!((orb.state.emissive_intensity - 1.5).abs() < 1e-3);
    }

    #[test]
    fn test_idle_scale_stays_in_range() {
        let (mut orb, bus) = animator();
        for tick in 0..2000 {
            orb.update(tick as f32 * 0.05, &loud(), &bus);
            assert!((0.1..=1.5).contains(&orb.state.scale));
        }
        assert!((orb.state.emissive_intensity - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_pulse_decays_geometrically() {
        let (mut orb, mut bus) = animator();
        orb.state.pulse_intensity = 1.0;
        bus.pulse_intensity = 0.0;
        for n in 1..=20 {
            orb.update(0.0, &AudioEnergy::default(), &bus);
            let expected = 0.9f32.powi(n);
            assert!((orb.state.pulse_intensity - expected).abs() < 1e-5);
        }
    }

    #[test]
    fn test_material_targets() {
        let (mut orb, bus) = animator();
        for _ in 0..200 {
            orb.update(0.0, &loud(), &bus);
        }
        assert!((orb.state.roughness - 0.7).abs() < 1e-3);
        assert!((orb.state.metalness - 0.7).abs() < 1e-3);
        assert_eq!(orb.state.volume, 1.0);
    }

    #[test]
    fn test_deformation_applied_directly() {
        let (mut orb, mut bus) = animator();
        bus.amplitude = 2.0;
        bus.frequency = 9.0;
        bus.speed = 0.1;
        bus.base_color = Vec3::new(1.0, 0.0, 0.0);
        orb.update(0.0, &AudioEnergy::default(), &bus);
        assert_eq!(orb.state.amplitude, 2.0);
        assert_eq!(orb.state.frequency, 9.0);
        assert_eq!(orb.state.speed, 0.1);
        assert_eq!(orb.state.base_color, Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_initial_state() {
        let (orb, _) = animator();
        assert_eq!(orb.state.pointer_hit, NO_HIT);
        assert!(!orb.state.has_pointer_hit());
        assert_eq!(orb.state.roughness, 0.1);
        assert_eq!(orb.state.metalness, 0.5);
        assert_eq!(orb.state.emissive_intensity, 1.5);
        assert!((orb.world_radius() - 0.15).abs() < 1e-6);
    }
}
