//! Particle field physics: pointer repulsion, integration, damping and
//! per-axis reflection at the bounds.

use glam::Vec3;
use rand::Rng;
use std::f32::consts::TAU;

use super::{Particle, ParticleInstance};
use crate::palette::ThemePalette;
use crate::params::ParticleParams;

/// Fixed-size set of particles, created once and stepped every tick
pub struct ParticleField {
    particles: Vec<Particle>,
    /// GPU-ready mirror of `particles`, refreshed by `step` and `recolor`
    instances: Vec<ParticleInstance>,
    params: ParticleParams,
}

impl ParticleField {
    /// Spawn `params.count` particles coloured from `palette`
    pub fn new<R: Rng>(params: ParticleParams, palette: &ThemePalette, rng: &mut R) -> Self {
        let extent = params.spawn_extent;
        let spread = params.initial_velocity_spread;

        let particles: Vec<Particle> = (0..params.count)
            .map(|_| {
                let position = Vec3::new(
                    (rng.gen::<f32>() - 0.5) * 2.0 * extent,
                    (rng.gen::<f32>() - 0.5) * 2.0 * extent,
                    (rng.gen::<f32>() - 0.5) * 2.0 * extent,
                );
                let velocity = Vec3::new(
                    (rng.gen::<f32>() - 0.5) * spread,
                    (rng.gen::<f32>() - 0.5) * spread,
                    (rng.gen::<f32>() - 0.5) * spread,
                );
                let blinks = rng.gen::<f32>() < params.blink_probability;
                let (blink_rate, blink_phase) = if blinks {
                    (
                        params.blink_rate_min + rng.gen::<f32>() * params.blink_rate_range,
                        rng.gen::<f32>() * TAU,
                    )
                } else {
                    (0.0, 0.0)
                };

                Particle {
                    position,
                    velocity,
                    color: palette.color_at(position),
                    blink_rate,
                    blink_phase,
                }
            })
            .collect();

        let instances = particles.iter().map(ParticleInstance::from).collect();
        log::debug!("Spawned {} particles", particles.len());

        Self {
            particles,
            instances,
            params,
        }
    }

    /// World-space point the pointer pushes particles away from
    pub fn pointer_world(&self, pointer_ndc: glam::Vec2, aspect: f32) -> Vec3 {
        let scale = self.params.pointer_world_scale;
        Vec3::new(pointer_ndc.x * aspect * scale, pointer_ndc.y * scale, 0.0)
    }

    /// Advance one tick
    pub fn step(&mut self, pointer_world: Vec3) {
        let radius = self.params.pointer_radius;
        let strength = self.params.repel_strength;
        let softening = self.params.repel_softening;
        let damping = self.params.damping;
        let bounds = self.params.bounds;

        for (particle, instance) in self.particles.iter_mut().zip(&mut self.instances) {
            let offset = particle.position - pointer_world;
            let distance = offset.length();
            if distance < radius {
                // Zero offset normalizes to zero: no push, no NaN
                let direction = offset.normalize_or_zero();
                particle.velocity += direction * (strength / (distance + softening));
            }

            particle.position += particle.velocity;
            particle.velocity *= damping;

            for axis in 0..3 {
                if particle.position[axis].abs() > bounds {
                    particle.velocity[axis] = -particle.velocity[axis];
                }
            }

            instance.position = particle.position.to_array();
        }
    }

    /// Recompute every particle's colour for a new palette; positions are untouched
    pub fn recolor(&mut self, palette: &ThemePalette) {
        for (particle, instance) in self.particles.iter_mut().zip(&mut self.instances) {
            particle.color = palette.color_at(particle.position);
            instance.color = particle.color.to_array();
        }
        log::debug!("Recoloured {} particles", self.particles.len());
    }

    /// Drop all particle storage (engine teardown)
    pub fn release(&mut self) {
        self.particles = Vec::new();
        self.instances = Vec::new();
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn instances(&self) -> &[ParticleInstance] {
        &self.instances
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn params(&self) -> &ParticleParams {
        &self.params
    }

    #[cfg(test)]
    pub(crate) fn particles_mut(&mut self) -> &mut [Particle] {
        &mut self.particles
    }
}
