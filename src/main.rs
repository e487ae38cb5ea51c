//! Vibeorb - an audio-reactive orb floating in a field of particles
//!
//! The orb breathes while idle and swells with the sound once audio is
//! playing; particles drift, blink and scatter away from the pointer.

use clap::Parser;
use std::sync::Arc;
use std::time::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use vibeorb::audio::WavPlayback;
use vibeorb::bus::ParameterBus;
use vibeorb::cli::Args;
use vibeorb::config::EngineConfig;
use vibeorb::engine::{frame_interval, Engine, FrameClock, FrameTiming};
use vibeorb::input::InputSender;
use vibeorb::rendering::{GpuSurface, HeadlessSurface};

/// Open WAV streams and when they started
struct AudioStreams {
    _input: Option<WavPlayback>,
    _output: Option<WavPlayback>,
    started: Instant,
    duration: Duration,
}

impl AudioStreams {
    /// Open the requested WAV files and bind them to the engine's analysers.
    /// A stream that fails to open is skipped with a warning.
    fn open(args: &Args, engine: &mut Engine) -> Self {
        let open = |path: &Option<std::path::PathBuf>, muted: bool| {
            let path = path.as_ref()?;
            match WavPlayback::open(path, muted) {
                Ok(playback) => Some(playback),
                Err(e) => {
                    log::warn!("Skipping {}: {}", path.display(), e);
                    None
                }
            }
        };

        let input = open(&args.input_wav, true);
        let output = open(&args.output_wav, false);

        let mut duration_secs: f32 = 0.0;
        if let Some(playback) = &input {
            engine.attach_input_source(playback.source());
            duration_secs = duration_secs.max(playback.duration_secs());
        }
        if let Some(playback) = &output {
            engine.attach_output_source(playback.source());
            duration_secs = duration_secs.max(playback.duration_secs());
        }

        Self {
            _input: input,
            _output: output,
            started: Instant::now(),
            duration: Duration::from_secs_f32(duration_secs),
        }
    }

    /// Whether any clip is still playing
    fn is_playing(&self) -> bool {
        self.started.elapsed() < self.duration
    }
}

/// Main application state
struct App {
    window: Option<Arc<Window>>,
    surface: Option<GpuSurface>,
    engine: Engine,
    config: EngineConfig,
    input: InputSender,
    audio: AudioStreams,
    clock: FrameClock,
    was_playing: bool,
    error: Option<String>,
}

impl App {
    fn new(config: EngineConfig, engine: Engine, audio: AudioStreams) -> Self {
        let input = engine.input_sender();
        Self {
            window: None,
            surface: None,
            engine,
            config,
            input,
            audio,
            clock: FrameClock::new(),
            was_playing: false,
            error: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, message: String) {
        log::error!("{}", message);
        self.error = Some(message);
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return; // Already initialized
        }

        let render = &self.config.render;
        let window_attributes = Window::default_attributes()
            .with_title("vibeorb")
            .with_inner_size(winit::dpi::LogicalSize::new(
                render.window_width,
                render.window_height,
            ));

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => return self.fail(event_loop, format!("Failed to create window: {}", e)),
        };

        let orb_radius = self.config.orb.radius;
        let capacity = self.engine.particles().len();
        let bloom_levels = self.config.bloom.mip_levels;
        let surface = match pollster::block_on(GpuSurface::new(
            Arc::clone(&window),
            orb_radius,
            capacity,
            bloom_levels,
        )) {
            Ok(surface) => surface,
            Err(e) => return self.fail(event_loop, format!("GPU setup failed: {}", e)),
        };

        let size = window.inner_size();
        let scale = window.scale_factor();
        let logical = size.to_logical::<f64>(scale);
        self.input
            .resized(logical.width as u32, logical.height as u32, scale as f32);

        log::info!("vibeorb is running, press ESC to quit");

        self.window = Some(window);
        self.surface = Some(surface);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        ..
                    },
                ..
            } => event_loop.exit(),
            WindowEvent::Resized(size) => {
                if let Some(window) = &self.window {
                    let scale = window.scale_factor();
                    let logical = size.to_logical::<f64>(scale);
                    self.input
                        .resized(logical.width as u32, logical.height as u32, scale as f32);
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                if let Some(window) = &self.window {
                    let size = window.inner_size();
                    self.input
                        .pointer_moved_px(position.x, position.y, size.width, size.height);
                }
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.render_frame() {
                    self.fail(event_loop, format!("Render error: {}", e));
                }
            }
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.engine.teardown();
    }
}

impl App {
    /// Tick the engine and draw the frame
    fn render_frame(&mut self) -> Result<(), vibeorb::error::RenderError> {
        let Some(surface) = self.surface.as_mut() else {
            return Ok(());
        };

        let playing = self.audio.is_playing();
        if playing != self.was_playing {
            self.engine.bus().set_processing(playing);
            self.was_playing = playing;
        }

        let timing = self.clock.tick();
        self.engine.render_frame(timing, surface)?;
        Ok(())
    }
}

/// Fixed-rate loop without a window
fn run_headless(config: &EngineConfig, mut engine: Engine, audio: AudioStreams, frames: u64) {
    let (width, height) = engine.composer().drawing_buffer_size();
    let mut surface = HeadlessSurface::new(width, height);
    let fps = config.render.target_fps;
    let interval = frame_interval(fps);
    let mut was_playing = false;

    log::info!("Headless: {} frames at {} fps", frames, fps);
    for index in 0..frames {
        let started = Instant::now();

        let playing = audio.is_playing();
        if playing != was_playing {
            engine.bus().set_processing(playing);
            was_playing = playing;
        }

        match engine.render_frame(FrameTiming::fixed(index, fps), &mut surface) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => {
                log::error!("Render error: {}", e);
                break;
            }
        }

        if let Some(remaining) = interval.checked_sub(started.elapsed()) {
            std::thread::sleep(remaining);
        }
    }

    if let Some(orb) = surface.last_orb() {
        log::info!(
            "Rendered {} frames; final orb scale {:.3}, volume {:.3}",
            surface.frames_rendered(),
            orb.scale,
            orb.volume
        );
    }
    engine.teardown();
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = match args.load_config() {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };

    let mut engine = Engine::new(config.clone(), ParameterBus::new());
    let audio = AudioStreams::open(&args, &mut engine);

    if let Some(frames) = args.headless {
        run_headless(&config, engine, audio, frames);
        return;
    }

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            log::error!("Failed to create event loop: {}", e);
            std::process::exit(1);
        }
    };

    let mut app = App::new(config, engine, audio);
    if let Err(e) = event_loop.run_app(&mut app) {
        log::error!("Event loop error: {}", e);
        std::process::exit(1);
    }
    if app.error.is_some() {
        std::process::exit(1);
    }
}
