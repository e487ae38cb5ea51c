//! Parameter definitions with documented units and semantics.
//!
//! Every magic number the engine uses lives here with:
//! - Units (seconds, frames, world units, pixels)
//! - Documented ranges and meanings
//! - A `Default` matching the tuned values

mod audio;
mod camera;
mod orb;
mod particles;
mod render;

// Re-export all types
pub use audio::AnalyserConfig;
pub use camera::CameraParams;
pub use orb::OrbParams;
pub use particles::ParticleParams;
pub use render::{BloomParams, RenderConfig, MAX_BLOOM_LEVELS};
