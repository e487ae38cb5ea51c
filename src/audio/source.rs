//! Audio source handles shared between audio callbacks and the frame loop.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// A stream of mono samples the analyser can pull from
pub trait AudioSource: Send + Sync {
    /// Copy the most recent `out.len()` samples into `out` in chronological
    /// order. When fewer are available, the front of `out` is zero-filled.
    /// Returns the number of real samples written.
    fn latest_samples(&self, out: &mut [f32]) -> usize;

    /// Sample rate of the stream (Hz)
    fn sample_rate(&self) -> u32;
}

/// Bounded ring of the most recent mono samples (thread-safe)
#[derive(Debug, Clone)]
pub struct SampleRing {
    samples: Arc<Mutex<VecDeque<f32>>>,
    capacity: usize,
    sample_rate: u32,
}

impl SampleRing {
    pub fn new(capacity: usize, sample_rate: u32) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
            sample_rate,
        }
    }

    /// Append samples, discarding the oldest beyond capacity
    pub fn push_samples(&self, input: &[f32]) {
        let mut ring = self
            .samples
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let input = if input.len() > self.capacity {
            &input[input.len() - self.capacity..]
        } else {
            input
        };
        let overflow = (ring.len() + input.len()).saturating_sub(self.capacity);
        ring.drain(..overflow);
        ring.extend(input.iter().copied());
    }

    pub fn len(&self) -> usize {
        self.samples
            .lock()
            .map(|ring| ring.len())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AudioSource for SampleRing {
    fn latest_samples(&self, out: &mut [f32]) -> usize {
        let ring = self
            .samples
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let available = ring.len().min(out.len());
        let pad = out.len() - available;

        out[..pad].fill(0.0);
        let start = ring.len() - available;
        for (dst, src) in out[pad..].iter_mut().zip(ring.range(start..)) {
            *dst = *src;
        }
        available
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_samples_zero_pads_front() {
        let ring = SampleRing::new(8, 16000);
        ring.push_samples(&[1.0, 2.0, 3.0]);

        let mut out = [9.0; 5];
        let written = ring.latest_samples(&mut out);
        assert_eq!(written, 3);
        assert_eq!(out, [0.0, 0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_ring_keeps_most_recent() {
        let ring = SampleRing::new(4, 16000);
        ring.push_samples(&[1.0, 2.0, 3.0]);
        ring.push_samples(&[4.0, 5.0, 6.0]);
        assert_eq!(ring.len(), 4);

        let mut out = [0.0; 2];
        ring.latest_samples(&mut out);
        assert_eq!(out, [5.0, 6.0]);
    }

    #[test]
    fn test_oversized_push_truncates() {
        let ring = SampleRing::new(3, 16000);
        ring.push_samples(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let mut out = [0.0; 3];
        assert_eq!(ring.latest_samples(&mut out), 3);
        assert_eq!(out, [3.0, 4.0, 5.0]);
    }
}
