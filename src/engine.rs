//! The per-frame visualization engine.
//!
//! One [`Engine::tick`] reads pending input and the parameter bus, pulls
//! fresh analyser data, advances the orb, particles and camera, and emits a
//! [`Frame`] of uniforms for the render surface. Ticks never fail; after
//! [`Engine::teardown`] they produce nothing.

use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::audio::{AnalyserSlot, AudioEnergy, AudioSource, SpectralAnalyser};
use crate::bus::ParameterBus;
use crate::camera::CameraController;
use crate::composition::Composer;
use crate::config::EngineConfig;
use crate::error::RenderError;
use crate::input::{lock_input, InputSender, PendingInput, PointerState, SharedInput};
use crate::orb::{OrbAnimator, OrbState};
use crate::particles::ParticleField;
use crate::rendering::{
    BackdropUniforms, BloomUniforms, Frame, FxaaUniforms, OrbUniforms, ParticleUniforms,
    RenderSurface,
};

/// Milliseconds in one reference frame (60 Hz)
const REFERENCE_FRAME_MS: f32 = 1000.0 / 60.0;

/// Upper bound for the backdrop's per-tick random value
const BACKDROP_RAND_MAX: f32 = 10000.0;

/// Timing for one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTiming {
    /// Seconds since the clock started
    pub time_s: f32,
    /// Elapsed time since the previous tick, in 60 Hz frames
    pub dt: f32,
}

impl FrameTiming {
    /// Timing of tick `index` on a fixed-rate clock
    pub fn fixed(index: u64, fps: u32) -> Self {
        let fps = fps.max(1) as f32;
        Self {
            time_s: index as f32 / fps,
            dt: 60.0 / fps,
        }
    }
}

/// Wall-clock source of [`FrameTiming`]
#[derive(Debug, Clone)]
pub struct FrameClock {
    start: Instant,
    previous: Instant,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(start: Instant) -> Self {
        Self {
            start,
            previous: start,
        }
    }

    pub fn tick(&mut self) -> FrameTiming {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&mut self, now: Instant) -> FrameTiming {
        let elapsed = now.saturating_duration_since(self.previous);
        self.previous = now;
        FrameTiming {
            time_s: now.saturating_duration_since(self.start).as_secs_f32(),
            dt: elapsed.as_secs_f32() * 1000.0 / REFERENCE_FRAME_MS,
        }
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Interval between ticks at `fps`
pub fn frame_interval(fps: u32) -> Duration {
    Duration::from_secs_f64(1.0 / fps.max(1) as f64)
}

/// Audio-reactive orb and particle engine
pub struct Engine {
    bus: ParameterBus,
    /// Dropped on teardown, which disconnects every `InputSender`
    input: Option<SharedInput>,
    pointer: PointerState,
    input_analyser: AnalyserSlot,
    output_analyser: AnalyserSlot,
    particles: ParticleField,
    orb: OrbAnimator,
    camera: CameraController,
    composer: Composer,
    config: EngineConfig,
    rng: StdRng,
    palette_revision: u64,
    frame_index: u64,
    running: bool,
}

impl Engine {
    /// Build the engine. The bus palette colours the particles; when the
    /// config names a theme, it is written to the bus first.
    pub fn new(config: EngineConfig, bus: ParameterBus) -> Self {
        if let Some(key) = &config.theme {
            match crate::palette::Theme::by_key(key) {
                Ok(theme) => bus.set_theme(&theme),
                Err(e) => log::warn!("{}; keeping the current palette", e),
            }
        }

        let mut rng = match config.particles.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let snapshot = bus.snapshot();
        let render = &config.render;
        let composer = Composer::new(
            config.bloom.clone(),
            render.window_width,
            render.window_height,
            render.pixel_ratio,
        );
        let particles = ParticleField::new(config.particles.clone(), &snapshot.palette, &mut rng);
        let orb = OrbAnimator::new(config.orb.clone(), &snapshot);
        let camera = CameraController::new(config.camera.clone(), composer.aspect());
        let pointer = PointerState::new(
            Vec2::from_array(config.camera.initial_pointer),
            config.camera.pointer_lag,
        );

        log::info!(
            "Engine started: {} particles, {}x{} viewport",
            particles.len(),
            render.window_width,
            render.window_height
        );

        Self {
            input: Some(Arc::new(Mutex::new(PendingInput::default()))),
            pointer,
            input_analyser: AnalyserSlot::new(config.analyser.clone()),
            output_analyser: AnalyserSlot::new(config.analyser.clone()),
            particles,
            orb,
            camera,
            composer,
            palette_revision: snapshot.palette_revision,
            rng,
            frame_index: 0,
            running: true,
            bus,
            config,
        }
    }

    /// Handle for pointer and resize events. After teardown the handle
    /// is already disconnected.
    pub fn input_sender(&self) -> InputSender {
        match &self.input {
            Some(pending) => InputSender::new(pending),
            None => InputSender::disconnected(),
        }
    }

    /// Bind the input (microphone side) stream; returns the replaced analyser
    pub fn attach_input_source(&mut self, source: Arc<dyn AudioSource>) -> Option<SpectralAnalyser> {
        self.input_analyser.attach_source(source)
    }

    /// Bind the output (playback side) stream; returns the replaced analyser
    pub fn attach_output_source(
        &mut self,
        source: Arc<dyn AudioSource>,
    ) -> Option<SpectralAnalyser> {
        self.output_analyser.attach_source(source)
    }

    /// Run one tick. Returns `None` once the engine has been torn down.
    pub fn tick(&mut self, timing: FrameTiming) -> Option<Frame<'_>> {
        if !self.running {
            return None;
        }

        self.apply_pending_input();

        let bus = self.bus.snapshot();
        if bus.palette_revision != self.palette_revision {
            self.palette_revision = bus.palette_revision;
            self.particles.recolor(&bus.palette);
        }

        self.input_analyser.update();
        self.output_analyser.update();
        let energy = AudioEnergy::read(&self.input_analyser, &self.output_analyser);

        let pointer = self.pointer.step();

        let rand = self.rng.gen_range(0.0..BACKDROP_RAND_MAX);

        self.orb.update(timing.time_s, &energy, &bus);

        let pointer_world = self.particles.pointer_world(pointer, self.camera.aspect());
        self.particles.step(pointer_world);

        self.camera
            .accumulate_rotation(&mut self.orb.state.rotation, timing.dt, &energy);
        let camera_position = self.camera.update_pose(self.orb.state.rotation, pointer);
        self.orb.state.pointer_hit = self
            .camera
            .cast_pointer_ray(pointer, self.orb.world_radius());

        let view_proj = self.camera.view_proj();
        let buffer_size = self.composer.drawing_buffer_size();
        let bloom_mips = self.composer.bloom_mip_sizes();
        let bloom_size = bloom_mips.first().copied().unwrap_or(buffer_size);

        let index = self.frame_index;
        self.frame_index += 1;

        Some(Frame {
            index,
            orb: OrbUniforms::new(&self.orb.state, view_proj, camera_position, timing.time_s),
            particles: ParticleUniforms::new(
                &self.config.particles,
                view_proj,
                self.composer.backdrop_resolution(),
                timing.time_s,
            ),
            instances: self.particles.instances(),
            backdrop: BackdropUniforms {
                resolution: self.composer.backdrop_resolution().to_array(),
                rand,
                _padding: 0.0,
            },
            bloom: BloomUniforms::new(self.composer.bloom(), bloom_size),
            bloom_mips,
            fxaa: FxaaUniforms {
                inverse_resolution: self.composer.fxaa_inverse_resolution().to_array(),
                _padding: [0.0; 2],
            },
            buffer_size,
            passes: self.composer.passes(),
        })
    }

    /// Tick and hand the frame to `surface`, resizing it first if the
    /// viewport changed. Returns `Ok(false)` once torn down.
    pub fn render_frame<S: RenderSurface + ?Sized>(
        &mut self,
        timing: FrameTiming,
        surface: &mut S,
    ) -> Result<bool, RenderError> {
        let Some(frame) = self.tick(timing) else {
            return Ok(false);
        };
        let (width, height) = frame.buffer_size;
        if surface.size() != (width, height) {
            surface.resize(width, height);
        }
        surface.render(&frame)?;
        Ok(true)
    }

    /// Stop ticking, release particle buffers and disconnect input
    /// handles. Safe to call more than once.
    pub fn teardown(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        self.input = None;
        self.particles.release();
        self.input_analyser.detach();
        self.output_analyser.detach();
        log::info!("Engine stopped after {} frames", self.frame_index);
    }

    fn apply_pending_input(&mut self) {
        let Some(input) = &self.input else {
            return;
        };
        let (pointer, resize) = {
            let mut pending = lock_input(input);
            (pending.take_pointer(), pending.take_resize())
        };

        if let Some(target) = pointer {
            self.pointer.set_target(target);
        }
        if let Some(size) = resize {
            if self
                .composer
                .resize(size.width, size.height, size.pixel_ratio)
            {
                self.camera.set_aspect(self.composer.aspect());
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn bus(&self) -> &ParameterBus {
        &self.bus
    }

    pub fn orb_state(&self) -> &OrbState {
        &self.orb.state
    }

    pub fn particles(&self) -> &ParticleField {
        &self.particles
    }

    pub fn camera(&self) -> &CameraController {
        &self.camera
    }

    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    pub fn pointer(&self) -> &PointerState {
        &self.pointer
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SampleRing;
    use crate::orb::NO_HIT;
    use crate::palette::ThemePalette;
    use crate::rendering::HeadlessSurface;
    use glam::Vec3;

    fn config(count: usize) -> EngineConfig {
        let mut config = EngineConfig::default();
        config.particles.count = count;
        config.particles.seed = Some(3);
        config.render.window_width = 800;
        config.render.window_height = 600;
        config
    }

    fn engine(count: usize) -> Engine {
        Engine::new(config(count), ParameterBus::new())
    }

    fn loud_source() -> Arc<dyn AudioSource> {
        let ring = SampleRing::new(256, 16000);
        let samples: Vec<f32> = (0..256)
            .map(|i| (2.0 * std::f32::consts::PI * i as f32 / 32.0).sin())
            .collect();
        ring.push_samples(&samples);
        Arc::new(ring)
    }

    #[test]
    fn test_fixed_timing() {
        let t = FrameTiming::fixed(120, 60);
        assert_eq!(t.time_s, 2.0);
        assert_eq!(t.dt, 1.0);
        assert_eq!(FrameTiming::fixed(1, 30).dt, 2.0);
    }

    #[test]
    fn test_clock_dt_in_frames() {
        let start = Instant::now();
        let mut clock = FrameClock::starting_at(start);
        let t = clock.tick_at(start + Duration::from_micros(33_333));
        assert!((t.dt - 2.0).abs() < 1e-3);
        assert!((t.time_s - 0.033333).abs() < 1e-4);
        let t = clock.tick_at(start + Duration::from_micros(50_000));
        assert!((t.dt - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_tick_without_sources_is_idle_breathing() {
        let mut engine = engine(100);
        let frame = engine.tick(FrameTiming::fixed(0, 60)).unwrap();
        assert_eq!(frame.index, 0);
        assert_eq!(frame.instances.len(), 100);
        assert!((frame.orb.scale - 0.1).abs() < 1e-7);
        assert_eq!(frame.orb.volume, 0.0);
        assert!(frame.backdrop.rand >= 0.0 && frame.backdrop.rand < 10000.0);
        assert_eq!(frame.particles.opacity, 0.5);
        assert_eq!(frame.particles.size, 0.06);
    }

    #[test]
    fn test_initial_pointer_misses_orb() {
        let mut engine = engine(10);
        engine.tick(FrameTiming::fixed(0, 60));
        assert_eq!(engine.orb_state().pointer_hit, NO_HIT);
    }

    #[test]
    fn test_pointer_over_orb_hits_after_lag() {
        let mut engine = engine(10);
        engine.bus().set_processing(true);
        let sender = engine.input_sender();
        assert!(sender.pointer_moved(0.0, 0.0));
        for i in 0..400 {
            engine.tick(FrameTiming::fixed(i, 60));
        }
        assert!(engine.pointer().current().length() < 1e-3);
        assert!(engine.orb_state().has_pointer_hit());
        let hit = engine.orb_state().pointer_hit;
        assert!((hit.length() - engine.orb.world_radius()).abs() < 1e-2);
    }

    #[test]
    fn test_processing_with_audio_grows_orb() {
        let mut engine = engine(10);
        assert!(engine.attach_input_source(loud_source()).is_none());
        assert!(engine.attach_output_source(loud_source()).is_none());
        engine.bus().set_processing(true);
        for i in 0..200 {
            let frame = engine.tick(FrameTiming::fixed(i, 60)).unwrap();
            assert!(frame.orb.scale >= 0.1 && frame.orb.scale <= 1.5);
        }
        let state = engine.orb_state();
        assert!(state.scale > 1.0);
        assert!(state.volume > 0.0);
        assert!(state.rotation.x > 0.0);
        assert!((state.emissive_intensity - 1.5).abs() < 1e-2);
    }

    #[test]
    fn test_pulse_decays_after_reset() {
        let mut engine = engine(10);
        engine.bus().set_pulse_target(1.0);
        for i in 0..300 {
            engine.tick(FrameTiming::fixed(i, 60));
        }
        let held = engine.orb_state().pulse_intensity;
        assert!((held - 1.0).abs() < 1e-4);

        engine.bus().set_pulse_target(0.0);
        for n in 1..=10 {
            engine.tick(FrameTiming::fixed(300 + n, 60));
            let expected = held * 0.9f32.powi(n as i32);
            assert!((engine.orb_state().pulse_intensity - expected).abs() < 1e-5);
        }
    }

    #[test]
    fn test_palette_change_recolors_particles() {
        let mut engine = engine(200);
        engine.tick(FrameTiming::fixed(0, 60));
        let positions: Vec<Vec3> = engine.particles().particles().iter().map(|p| p.position).collect();

        let green = ThemePalette::from_hex(&["#00ff00"]).unwrap();
        engine.bus().set_palette(green);
        engine.tick(FrameTiming::fixed(1, 60));

        for (p, before) in engine.particles().particles().iter().zip(positions) {
            assert!((p.color - Vec3::new(0.0, 1.0, 0.0)).length() < 1e-6);
            // Only physics moved it, by at most one step
            assert!((p.position - before).length() < 0.01);
        }
    }

    #[test]
    fn test_resize_scales_resolution_uniforms() {
        let mut engine = engine(10);
        let before = engine.tick(FrameTiming::fixed(0, 60)).unwrap().fxaa;
        let aspect_before = engine.camera().aspect();

        engine.input_sender().resized(1600, 1200, 1.0);
        let after = engine.tick(FrameTiming::fixed(1, 60)).unwrap().fxaa;

        assert!((engine.camera().aspect() - aspect_before).abs() < 1e-6);
        assert!((before.inverse_resolution[0] / after.inverse_resolution[0] - 2.0).abs() < 1e-5);
        assert!((before.inverse_resolution[1] / after.inverse_resolution[1] - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_zero_resize_ignored() {
        let mut engine = engine(10);
        engine.input_sender().resized(0, 0, 1.0);
        let frame = engine.tick(FrameTiming::fixed(0, 60)).unwrap();
        assert_eq!(frame.buffer_size, (800, 600));
        assert!(frame.fxaa.inverse_resolution[0].is_finite());
    }

    #[test]
    fn test_teardown_stops_everything() {
        let mut engine = engine(50);
        let sender = engine.input_sender();
        engine.attach_input_source(loud_source());
        assert!(engine.tick(FrameTiming::fixed(0, 60)).is_some());

        engine.teardown();
        assert!(!engine.is_running());
        assert!(engine.tick(FrameTiming::fixed(1, 60)).is_none());
        assert!(engine.particles().is_empty());
        assert!(!sender.pointer_moved(0.5, 0.5));
        assert!(!sender.is_connected());
        assert!(!engine.input_sender().is_connected());

        engine.teardown();
        assert_eq!(engine.frame_index(), 1);
    }

    #[test]
    fn test_render_frame_resizes_surface() {
        let mut engine = engine(25);
        let mut surface = HeadlessSurface::new(1, 1);

        assert!(engine.render_frame(FrameTiming::fixed(0, 60), &mut surface).unwrap());
        assert_eq!(surface.size(), (800, 600));
        assert_eq!(surface.resizes(), 1);
        assert_eq!(surface.last_instance_count(), 25);

        engine.input_sender().resized(640, 480, 2.0);
        engine.render_frame(FrameTiming::fixed(1, 60), &mut surface).unwrap();
        assert_eq!(surface.size(), (1280, 960));
        assert_eq!(surface.frames_rendered(), 2);
        assert_eq!(
            surface.last_backdrop().map(|b| b.resolution),
            Some([1280.0, 960.0])
        );

        engine.teardown();
        assert!(!engine.render_frame(FrameTiming::fixed(2, 60), &mut surface).unwrap());
        assert_eq!(surface.frames_rendered(), 2);
    }

    #[test]
    fn test_bus_writes_land_in_one_snapshot() {
        let mut engine = engine(20);
        engine.tick(FrameTiming::fixed(0, 60));

        let red = ThemePalette::from_hex(&["#ff0000"]).unwrap();
        engine.bus().set_palette(red);
        engine.bus().set_deformation(0.7, 2.0, 0.5);
        let frame = engine.tick(FrameTiming::fixed(1, 60)).unwrap();

        assert!((frame.orb.amplitude - 0.7).abs() < 1e-6);
        assert!((frame.orb.frequency - 2.0).abs() < 1e-6);
        for p in engine.particles().particles() {
            assert!((p.color - Vec3::new(1.0, 0.0, 0.0)).length() < 1e-6);
        }
    }

    #[test]
    fn test_surface_bloom_levels_follow_composer() {
        let mut config = config(10);
        config.bloom.mip_levels = 3;
        let mut engine = Engine::new(config, ParameterBus::new());
        let mut surface = HeadlessSurface::new(800, 600);

        engine.render_frame(FrameTiming::fixed(0, 60), &mut surface).unwrap();
        assert_eq!(surface.bloom_level_sizes(), engine.composer().bloom_mip_sizes());
        assert_eq!(
            surface.bloom_level_sizes(),
            vec![(400, 300), (200, 150), (100, 75)]
        );

        engine.input_sender().resized(640, 480, 2.0);
        engine.render_frame(FrameTiming::fixed(1, 60), &mut surface).unwrap();
        assert_eq!(surface.bloom_level_sizes(), engine.composer().bloom_mip_sizes());
        assert_eq!(surface.bloom_levels()[0].size, (640, 480));
        assert_eq!(surface.bloom_levels()[2].size, (160, 120));
    }

    #[test]
    fn test_default_bloom_has_five_levels() {
        let mut engine = engine(10);
        let mut surface = HeadlessSurface::new(800, 600);
        engine.render_frame(FrameTiming::fixed(0, 60), &mut surface).unwrap();

        let levels = surface.bloom_levels();
        assert_eq!(levels.len(), 5);
        assert_eq!(levels[0].size, (400, 300));
        assert_eq!(levels[4].size, (25, 19));
        // Default radius 0.5 weights every level equally
        for level in levels {
            assert!((level.accumulate.weight - 0.6).abs() < 1e-6);
        }
    }

    #[test]
    fn test_config_theme_written_to_bus() {
        let mut config = config(10);
        config.theme = Some("poimandres".to_string());
        let engine = Engine::new(config, ParameterBus::new());
        assert_eq!(engine.bus().base_color_hex(), "#add7ff");
        assert_eq!(engine.bus().snapshot().palette.len(), 4);
    }
}
