//! Command-line argument parsing.

use clap::Parser;
use std::path::PathBuf;

use crate::config::EngineConfig;
use crate::error::ConfigError;

/// Command line arguments
#[derive(Parser, Debug, Default)]
#[command(name = "vibeorb")]
#[command(about = "Audio-reactive orb and particle visualizer", long_about = None)]
pub struct Args {
    /// TOML config file (missing sections keep their defaults)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Colour theme: default, catppuccin, tokyonight, poimandres, eldritch, halcyon
    #[arg(long, value_name = "NAME")]
    pub theme: Option<String>,

    /// Number of particles
    #[arg(long, value_name = "N")]
    pub particles: Option<usize>,

    /// Seed for particle placement and the backdrop noise
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// WAV file feeding the input (listening) analyser; analysed, not played
    #[arg(long, value_name = "PATH")]
    pub input_wav: Option<PathBuf>,

    /// WAV file played through the speakers and fed to the output analyser
    #[arg(long, value_name = "PATH")]
    pub output_wav: Option<PathBuf>,

    /// Run without a window for this many frames
    #[arg(long, value_name = "FRAMES")]
    pub headless: Option<u64>,

    /// Window width in logical pixels
    #[arg(long, value_name = "PIXELS")]
    pub width: Option<u32>,

    /// Window height in logical pixels
    #[arg(long, value_name = "PIXELS")]
    pub height: Option<u32>,
}

impl Args {
    /// Defaults, then the config file, then explicit flags
    pub fn load_config(&self) -> Result<EngineConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::load(path)?,
            None => EngineConfig::default(),
        };
        self.apply_to(&mut config);
        config.validate()?;
        Ok(config)
    }

    /// Overlay the flags that were given onto `config`
    pub fn apply_to(&self, config: &mut EngineConfig) {
        if let Some(theme) = &self.theme {
            config.theme = Some(theme.clone());
        }
        if let Some(count) = self.particles {
            config.particles.count = count;
        }
        if let Some(seed) = self.seed {
            config.particles.seed = Some(seed);
        }
        if let Some(width) = self.width {
            config.render.window_width = width;
        }
        if let Some(height) = self.height {
            config.render.window_height = height;
        }
    }
}
