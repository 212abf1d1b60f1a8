//! Error types for beatcut.

use std::path::PathBuf;

/// Result type alias for beatcut operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while decoding a WAV file.
///
/// Every variant is fatal: no partial sample buffer is produced and no
/// analysis runs once one of these is returned.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The input file could not be opened or read.
    #[error("failed to read audio file '{path}'")]
    Io {
        /// Path to the audio file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Not a well-formed RIFF/WAVE container.
    #[error("invalid WAV container: {reason}")]
    InvalidContainer {
        /// What was wrong with the container.
        reason: String,
    },

    /// Format code other than PCM (1) or IEEE float (3).
    #[error("unsupported audio format code {code}")]
    UnsupportedAudioFormat {
        /// Format code found in the `fmt ` chunk.
        code: u16,
    },

    /// Bit depth the decoder cannot handle for the given format.
    #[error("unsupported bit depth {bits} for {format} audio")]
    UnsupportedBitDepth {
        /// Bits per sample found in the `fmt ` chunk.
        bits: u16,
        /// Human readable format name.
        format: &'static str,
    },

    /// A chunk header or body ended before its declared size.
    #[error("file truncated while reading {chunk}")]
    TruncatedFile {
        /// Which chunk (or header) was being read.
        chunk: String,
    },
}

impl Error {
    pub(crate) fn truncated(chunk: impl Into<String>) -> Self {
        Self::TruncatedFile {
            chunk: chunk.into(),
        }
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidContainer {
            reason: reason.into(),
        }
    }
}
