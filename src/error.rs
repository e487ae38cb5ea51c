//! Error types for construction-time failures.
//!
//! The per-frame tick never fails: every numeric path substitutes a safe
//! default instead. Errors only surface while loading configuration,
//! opening audio devices, or bringing up the GPU.

use thiserror::Error;

/// Colour and palette parsing failures.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PaletteError {
    #[error("invalid hex colour '{0}' (expected #rrggbb or #rgb)")]
    InvalidHex(String),

    #[error("palette must contain at least one colour")]
    Empty,

    #[error("unknown theme '{0}'")]
    UnknownTheme(String),
}

/// Configuration loading and validation failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error(transparent)]
    Palette(#[from] PaletteError),
}

/// Audio device and decoding failures.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no audio output device found")]
    NoOutputDevice,

    #[error("failed to query audio config: {0}")]
    DeviceConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to build audio stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("failed to decode WAV file: {0}")]
    Wav(#[from] hound::Error),
}

/// GPU bring-up and presentation failures.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error("failed to find a suitable GPU adapter")]
    NoAdapter,

    #[error("surface reports no supported texture formats")]
    UnsupportedSurface,

    #[error("failed to request device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("failed to acquire surface texture: {0}")]
    Surface(#[from] wgpu::SurfaceError),
}
