//! Dramatic-change detection for WAV audio.
//!
//! Decodes a RIFF/WAVE file to mono, runs an RMS-energy spike detector and a
//! banded-energy flux detector over it, and merges both into one ordered list
//! of moments where the audio changes sharply.

pub mod audio;
pub mod error;

use std::path::Path;

pub use audio::analysis::{
    analyze, detect_amplitude_changes, detect_spectral_changes, AnalysisMode,
};
pub use audio::decode::{decode_wav, decode_wav_bytes, SampleBuffer};
pub use audio::features::{AudioFormat, BeatDetection, DetectionKind};
pub use audio::merge::{merge_and_filter, MERGE_WINDOW_SECS, MIN_INTENSITY};
pub use error::{Error, Result};

/// Decode `path` and return its detections in timestamp order.
///
/// An empty list means the audio had no qualifying change; decode failures
/// are returned before any analysis runs.
pub fn detect_beats(path: &Path) -> Result<Vec<BeatDetection>> {
    detect_beats_with(path, AnalysisMode::default())
}

pub fn detect_beats_with(path: &Path, mode: AnalysisMode) -> Result<Vec<BeatDetection>> {
    let buffer = decode_wav(path)?;
    Ok(analyze(&buffer, mode))
}
