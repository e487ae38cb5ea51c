//! Render surfaces and the fixed-schema data they consume.
//!
//! The engine produces one [`Frame`] per tick: plain `Pod` uniform structs
//! plus the particle instance slice. A [`RenderSurface`] turns that into
//! pixels; [`GpuSurface`] does it with wgpu, [`HeadlessSurface`] only
//! records what it was given.

mod bloom;
mod gpu;
mod mesh;
mod uniforms;

pub use bloom::{BloomChain, BloomLevel};
pub use gpu::GpuSurface;
pub use mesh::{OrbMesh, OrbVertex};
pub use uniforms::{
    BackdropUniforms, BloomUniforms, FxaaUniforms, OrbUniforms, ParticleUniforms,
};

use crate::composition::PassKind;
use crate::error::RenderError;
use crate::particles::ParticleInstance;

/// Everything a surface needs to draw one tick
#[derive(Debug, Clone)]
pub struct Frame<'a> {
    /// Monotonic tick counter, starting at 0
    pub index: u64,
    pub orb: OrbUniforms,
    pub particles: ParticleUniforms,
    pub instances: &'a [ParticleInstance],
    pub backdrop: BackdropUniforms,
    pub bloom: BloomUniforms,
    /// Bloom mip sizes, largest first
    pub bloom_mips: &'a [(u32, u32)],
    pub fxaa: FxaaUniforms,
    /// Device-pixel size the frame was composed for
    pub buffer_size: (u32, u32),
    pub passes: &'static [PassKind],
}

/// A drawable target the composition chain writes frames into
pub trait RenderSurface {
    /// Current drawing-buffer size in device pixels
    fn size(&self) -> (u32, u32);

    /// Resize to a new drawing-buffer size in device pixels
    fn resize(&mut self, width: u32, height: u32);

    /// Draw and present one frame
    fn render(&mut self, frame: &Frame<'_>) -> Result<(), RenderError>;
}

/// Surface that draws nothing and remembers the last frame's data
#[derive(Debug, Default)]
pub struct HeadlessSurface {
    size: (u32, u32),
    frames_rendered: u64,
    resizes: u32,
    last_orb: Option<OrbUniforms>,
    last_particles: Option<ParticleUniforms>,
    last_backdrop: Option<BackdropUniforms>,
    last_fxaa: Option<FxaaUniforms>,
    last_instance_count: usize,
    bloom_levels: Vec<BloomLevel>,
}

impl HeadlessSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: (width, height),
            ..Default::default()
        }
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    pub fn resizes(&self) -> u32 {
        self.resizes
    }

    pub fn last_orb(&self) -> Option<&OrbUniforms> {
        self.last_orb.as_ref()
    }

    pub fn last_particles(&self) -> Option<&ParticleUniforms> {
        self.last_particles.as_ref()
    }

    pub fn last_backdrop(&self) -> Option<&BackdropUniforms> {
        self.last_backdrop.as_ref()
    }

    pub fn last_fxaa(&self) -> Option<&FxaaUniforms> {
        self.last_fxaa.as_ref()
    }

    pub fn last_instance_count(&self) -> usize {
        self.last_instance_count
    }

    /// Bloom levels laid out for the last frame
    pub fn bloom_levels(&self) -> &[BloomLevel] {
        &self.bloom_levels
    }

    pub fn bloom_level_sizes(&self) -> Vec<(u32, u32)> {
        self.bloom_levels.iter().map(|level| level.size).collect()
    }
}

impl RenderSurface for HeadlessSurface {
    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
        self.resizes += 1;
    }

    fn render(&mut self, frame: &Frame<'_>) -> Result<(), RenderError> {
        self.frames_rendered += 1;
        self.last_orb = Some(frame.orb);
        self.last_particles = Some(frame.particles);
        self.last_backdrop = Some(frame.backdrop);
        self.last_fxaa = Some(frame.fxaa);
        self.last_instance_count = frame.instances.len();
        self.bloom_levels = BloomChain::new(&frame.bloom, frame.bloom_mips)
            .levels()
            .to_vec();
        log::trace!("headless frame {}", frame.index);
        Ok(())
    }
}
