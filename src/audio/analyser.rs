//! Per-stream spectral analyser producing byte-scaled frequency bins.
//!
//! Windowed FFT over the most recent `fft_size` samples, temporally
//! smoothed magnitudes, then a linear dB-to-byte mapping. Bins are 0-255.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

use super::source::AudioSource;
use crate::params::AnalyserConfig;

/// Frequency-bin analyser bound to one audio source
pub struct SpectralAnalyser {
    config: AnalyserConfig,
    source: Arc<dyn AudioSource>,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    samples: Vec<f32>,
    buffer: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
    data: Vec<u8>,
}

impl SpectralAnalyser {
    pub fn new(source: Arc<dyn AudioSource>, config: AnalyserConfig) -> Self {
        let n = config.fft_size;
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(n);

        Self {
            window: (0..n).map(|i| blackman_window(i, n)).collect(),
            samples: vec![0.0; n],
            buffer: vec![Complex::new(0.0, 0.0); n],
            smoothed: vec![0.0; config.bin_count()],
            data: vec![0; config.bin_count()],
            fft,
            source,
            config,
        }
    }

    /// Pull the latest samples and refresh the bins. Call once per frame.
    pub fn update(&mut self) {
        let n = self.config.fft_size;
        self.source.latest_samples(&mut self.samples);

        for (slot, (sample, w)) in self
            .buffer
            .iter_mut()
            .zip(self.samples.iter().zip(&self.window))
        {
            *slot = Complex::new(sample * w, 0.0);
        }
        self.fft.process(&mut self.buffer);

        let tau = self.config.smoothing_time_constant;
        let db_range = self.config.max_decibels - self.config.min_decibels;
        let scale = 255.0 / db_range;

        for (k, byte) in self.data.iter_mut().enumerate() {
            let magnitude = self.buffer[k].norm() / n as f32;
            let value = tau * self.smoothed[k] + (1.0 - tau) * magnitude;
            // Keep denormals and NaN out of the smoothing state
            self.smoothed[k] = if value.is_finite() { value } else { 0.0 };

            let db = 20.0 * self.smoothed[k].log10();
            let scaled = (scale * (db - self.config.min_decibels)).floor();
            *byte = if scaled.is_finite() {
                scaled.clamp(0.0, 255.0) as u8
            } else {
                0
            };
        }
    }

    /// All bins, 0-255
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// One bin; out-of-range indices read as 0
    pub fn bin(&self, index: usize) -> u8 {
        self.data.get(index).copied().unwrap_or(0)
    }

    /// Mean of all bins divided by 255, in [0, 1]
    pub fn average(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        let sum: u32 = self.data.iter().map(|&b| b as u32).sum();
        sum as f32 / self.data.len() as f32 / 255.0
    }

    pub fn source(&self) -> &Arc<dyn AudioSource> {
        &self.source
    }
}

/// Holder for a stream's analyser; empty until a source is attached
pub struct AnalyserSlot {
    config: AnalyserConfig,
    analyser: Option<SpectralAnalyser>,
}

impl AnalyserSlot {
    pub fn new(config: AnalyserConfig) -> Self {
        Self {
            config,
            analyser: None,
        }
    }

    /// Bind a new source; builds a fresh analyser and returns the old one
    pub fn attach_source(&mut self, source: Arc<dyn AudioSource>) -> Option<SpectralAnalyser> {
        let analyser = SpectralAnalyser::new(source, self.config.clone());
        self.analyser.replace(analyser)
    }

    /// Drop the current analyser, returning it
    pub fn detach(&mut self) -> Option<SpectralAnalyser> {
        self.analyser.take()
    }

    pub fn is_attached(&self) -> bool {
        self.analyser.is_some()
    }

    pub fn update(&mut self) {
        if let Some(analyser) = self.analyser.as_mut() {
            analyser.update();
        }
    }

    /// Bin value; an empty slot reads as zero energy
    pub fn bin(&self, index: usize) -> u8 {
        self.analyser.as_ref().map_or(0, |a| a.bin(index))
    }

    /// Average energy; an empty slot reads as zero energy
    pub fn average(&self) -> f32 {
        self.analyser.as_ref().map_or(0.0, SpectralAnalyser::average)
    }

    pub fn analyser(&self) -> Option<&SpectralAnalyser> {
        self.analyser.as_ref()
    }
}

/// The bins and averages the visuals read each tick
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AudioEnergy {
    /// Input stream bins 0..3
    pub input_bins: [u8; 3],
    /// Output stream bins 0..3
    pub output_bins: [u8; 3],
    /// Input stream average, in [0, 1]
    pub input_volume: f32,
    /// Output stream average, in [0, 1]
    pub output_volume: f32,
}

impl AudioEnergy {
    pub fn read(input: &AnalyserSlot, output: &AnalyserSlot) -> Self {
        Self {
            input_bins: [input.bin(0), input.bin(1), input.bin(2)],
            output_bins: [output.bin(0), output.bin(1), output.bin(2)],
            input_volume: input.average(),
            output_volume: output.average(),
        }
    }
}

/// Blackman window function
fn blackman_window(index: usize, size: usize) -> f32 {
    let x = index as f32 / size as f32;
    0.42 - 0.5 * (2.0 * PI * x).cos() + 0.08 * (4.0 * PI * x).cos()
}
