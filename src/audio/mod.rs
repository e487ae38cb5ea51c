//! Audio sources and spectral analysis.
//!
//! Audio arrives through [`AudioSource`] handles (a shared sample ring fed
//! by a playback or capture callback); each stream the visuals react to
//! gets its own [`SpectralAnalyser`], held in an [`AnalyserSlot`].

mod analyser;
mod playback;
mod source;

// Re-export public types
pub use analyser::{AnalyserSlot, AudioEnergy, SpectralAnalyser};
pub use playback::{decode_wav, DecodedClip, WavPlayback};
pub use source::{AudioSource, SampleRing};
