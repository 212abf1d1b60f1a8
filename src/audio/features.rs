use serde::Serialize;

/// Which detector produced a detection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionKind {
    /// Sudden RMS energy spike.
    Amplitude,
    /// Positive banded-energy flux peak.
    Spectral,
    /// Reserved for same-moment detections of different kinds. The merge
    /// step keeps the stronger detection's own kind, so nothing emits this yet.
    Combined,
}

impl DetectionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Amplitude => "amplitude",
            Self::Spectral => "spectral",
            Self::Combined => "combined",
        }
    }
}

/// A single moment of dramatic change in the audio.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct BeatDetection {
    /// Seconds from the start of the file
    pub timestamp: f64,
    /// Relative strength of the change (0.0-1.0)
    pub intensity: f32,
    pub kind: DetectionKind,
}

impl BeatDetection {
    pub fn new(timestamp: f64, intensity: f32, kind: DetectionKind) -> Self {
        Self {
            timestamp,
            intensity: intensity.clamp(0.0, 1.0),
            kind,
        }
    }
}

/// Sample encoding declared in the `fmt ` chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AudioFormat {
    /// Integer PCM (format code 1)
    Pcm,
    /// IEEE 754 float (format code 3)
    IeeeFloat,
}

impl AudioFormat {
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            1 => Some(Self::Pcm),
            3 => Some(Self::IeeeFloat),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Pcm => "PCM",
            Self::IeeeFloat => "IEEE float",
        }
    }
}
