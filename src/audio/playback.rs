//! WAV file playback on the default output device.
//!
//! The played mono mix is pushed into a [`SampleRing`] from the audio
//! callback, so analysers see exactly what is being heard.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::path::Path;
use std::sync::Arc;

use super::source::{AudioSource, SampleRing};
use crate::error::AudioError;

/// Samples kept for analysers (well above any sane FFT size)
const RING_CAPACITY: usize = 8192;

/// Decoded mono clip
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedClip {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl DecodedClip {
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// Decode a WAV file into a mono mix in [-1, 1]
pub fn decode_wav<P: AsRef<Path>>(path: P) -> Result<DecodedClip, AudioError> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let full_scale = (1i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / full_scale))
                .collect::<Result<_, _>>()?
        }
    };

    Ok(DecodedClip {
        samples: mixdown(&interleaved, spec.channels as usize),
        sample_rate: spec.sample_rate,
    })
}

/// Average interleaved frames down to one channel
fn mixdown(interleaved: &[f32], channels: usize) -> Vec<f32> {
    let channels = channels.max(1);
    interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// Nearest-sample cursor stepping through a clip at the device rate
#[derive(Debug, Clone)]
struct PlaybackCursor {
    position: f64,
    step: f64,
}

impl PlaybackCursor {
    fn new(clip_rate: u32, device_rate: u32) -> Self {
        Self {
            position: 0.0,
            step: clip_rate as f64 / device_rate.max(1) as f64,
        }
    }

    /// Next sample, or silence once the clip is exhausted
    fn next(&mut self, clip: &[f32]) -> f32 {
        let sample = clip.get(self.position as usize).copied().unwrap_or(0.0);
        self.position += self.step;
        sample
    }
}

/// A WAV clip playing on the default output device
pub struct WavPlayback {
    ring: SampleRing,
    duration_secs: f32,
    /// Audio output stream (kept alive)
    _stream: cpal::Stream,
}

impl WavPlayback {
    /// Decode `path` and start playing it.
    ///
    /// A muted playback still runs on the device clock and feeds its ring,
    /// which lets a file stand in for a live input stream.
    pub fn open<P: AsRef<Path>>(path: P, muted: bool) -> Result<Self, AudioError> {
        let path = path.as_ref();
        let clip = decode_wav(path)?;
        let duration_secs = clip.duration_secs();

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(AudioError::NoOutputDevice)?;
        let config = device.default_output_config()?;
        let device_rate = config.sample_rate().0;
        let channels = config.channels() as usize;

        log::info!(
            "Audio: {} on {} @ {}Hz ({:.1}s{})",
            path.display(),
            device.name().unwrap_or_else(|_| "Unknown".to_string()),
            device_rate,
            duration_secs,
            if muted { ", muted" } else { "" }
        );

        let ring = SampleRing::new(RING_CAPACITY, device_rate);
        let ring_writer = ring.clone();
        let mut cursor = PlaybackCursor::new(clip.sample_rate, device_rate);
        let mut scratch: Vec<f32> = Vec::with_capacity(4096);
        let samples = clip.samples;

        let stream = device.build_output_stream(
            &config.into(),
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                scratch.clear();
                for frame in data.chunks_mut(channels.max(1)) {
                    let sample = cursor.next(&samples);
                    let out = if muted { 0.0 } else { sample };
                    frame.fill(out);
                    scratch.push(sample);
                }
                ring_writer.push_samples(&scratch);
            },
            |err| log::error!("Audio stream error: {}", err),
            None,
        )?;

        stream.play()?;

        Ok(Self {
            ring,
            duration_secs,
            _stream: stream,
        })
    }

    /// Handle analysers read from
    pub fn source(&self) -> Arc<dyn AudioSource> {
        Arc::new(self.ring.clone())
    }

    pub fn duration_secs(&self) -> f32 {
        self.duration_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixdown_averages_frames() {
        let stereo = [1.0, 0.0, 0.5, 0.5, -1.0, 1.0];
        assert_eq!(mixdown(&stereo, 2), vec![0.5, 0.5, 0.0]);
        assert_eq!(mixdown(&stereo, 0), stereo.to_vec());
    }

    #[test]
    fn test_cursor_resamples_and_falls_silent() {
        let clip = [1.0, 2.0, 3.0, 4.0];
        // 2:1 downsample
        let mut cursor = PlaybackCursor::new(32000, 16000);
        assert_eq!(cursor.next(&clip), 1.0);
        assert_eq!(cursor.next(&clip), 3.0);
        assert_eq!(cursor.next(&clip), 0.0);
    }

    #[test]
    fn test_decode_int_wav_to_mono() {
        let path = std::env::temp_dir().join(format!("vibeorb-test-{}.wav", std::process::id()));
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for _ in 0..10 {
            writer.write_sample(i16::MAX).unwrap();
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();

        let clip = decode_wav(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(clip.sample_rate, 8000);
        assert_eq!(clip.samples.len(), 10);
        for s in &clip.samples {
            assert!((s - 0.5).abs() < 1e-3);
        }
        assert!((clip.duration_secs() - 10.0 / 8000.0).abs() < 1e-6);
    }

    #[test]
    fn test_decode_missing_file_is_error() {
        assert!(decode_wav("/nonexistent/vibeorb.wav").is_err());
    }
}
