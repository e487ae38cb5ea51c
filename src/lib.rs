//! Vibeorb library - audio-reactive orb and particle visuals

pub mod audio;
pub mod bus;
pub mod camera;
pub mod cli;
pub mod composition;
pub mod config;
pub mod engine;
pub mod error;
pub mod input;
pub mod orb;
pub mod palette;
pub mod params;
pub mod particles;
pub mod rendering;
