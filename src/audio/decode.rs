//! RIFF/WAVE decoding into a normalized mono sample buffer.

use std::path::Path;

use super::features::AudioFormat;
use crate::error::{Error, Result};

const WAVE_FORMAT_EXTENSIBLE: u16 = 0xFFFE;

/// Decoded mono audio plus the format it came from.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    /// Mono samples in [-1.0, 1.0]
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    /// Channel count declared by the file (before downmix)
    pub channels: u16,
    pub bits_per_sample: u16,
    pub format: AudioFormat,
}

impl SampleBuffer {
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

struct FmtChunk {
    format: AudioFormat,
    channels: u16,
    sample_rate: u32,
    bits_per_sample: u16,
}

/// Read and decode a WAV file from disk.
pub fn decode_wav(path: &Path) -> Result<SampleBuffer> {
    let bytes = std::fs::read(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let buffer = decode_wav_bytes(&bytes)?;

    log::debug!(
        "Decoded {}: {} samples, {}Hz, {} channel(s), {}-bit {}, {:.2}s",
        path.display(),
        buffer.samples.len(),
        buffer.sample_rate,
        buffer.channels,
        buffer.bits_per_sample,
        buffer.format.name(),
        buffer.duration_secs()
    );

    Ok(buffer)
}

/// Decode an in-memory RIFF/WAVE container.
///
/// Chunks may appear in any order; anything other than `fmt ` and `data` is
/// skipped by its declared size. Stereo is downmixed by averaging each frame,
/// wider layouts keep only the first channel.
pub fn decode_wav_bytes(bytes: &[u8]) -> Result<SampleBuffer> {
    let mut cursor = ByteCursor::new(bytes);

    let header = cursor
        .take(12)
        .ok_or_else(|| Error::truncated("RIFF header"))?;
    if &header[0..4] != b"RIFF" || &header[8..12] != b"WAVE" {
        return Err(Error::invalid("missing RIFF/WAVE magic"));
    }

    let mut fmt: Option<FmtChunk> = None;
    let mut data: Option<&[u8]> = None;

    while fmt.is_none() || data.is_none() {
        let chunk_header = cursor.take(8).ok_or_else(|| {
            let missing = if fmt.is_none() { "fmt " } else { "data" };
            Error::truncated(format!("chunk header (no {missing:?} chunk found)"))
        })?;
        let id = [chunk_header[0], chunk_header[1], chunk_header[2], chunk_header[3]];
        let size = read_u32(chunk_header, 4) as usize;

        let body = cursor
            .take(size)
            .ok_or_else(|| Error::truncated(chunk_name(&id)))?;

        match &id {
            b"fmt " if fmt.is_none() => fmt = Some(parse_fmt(body)?),
            b"data" if data.is_none() => data = Some(body),
            _ => log::trace!("Skipping {:?} chunk ({} bytes)", chunk_name(&id), size),
        }

        // RIFF chunks are word aligned
        if size % 2 == 1 && cursor.remaining() > 0 {
            cursor.skip(1);
        }
    }

    let (Some(fmt), Some(data)) = (fmt, data) else {
        return Err(Error::invalid("missing fmt or data chunk"));
    };

    Ok(SampleBuffer {
        samples: decode_samples(data, &fmt),
        sample_rate: fmt.sample_rate,
        channels: fmt.channels,
        bits_per_sample: fmt.bits_per_sample,
        format: fmt.format,
    })
}

fn parse_fmt(body: &[u8]) -> Result<FmtChunk> {
    if body.len() < 16 {
        return Err(Error::truncated("fmt "));
    }

    let mut code = read_u16(body, 0);
    // Extensible headers carry the real format code at the start of the sub-format GUID
    if code == WAVE_FORMAT_EXTENSIBLE && body.len() >= 26 {
        code = read_u16(body, 24);
    }
    let channels = read_u16(body, 2);
    let sample_rate = read_u32(body, 4);
    let bits_per_sample = read_u16(body, 14);

    let format = AudioFormat::from_code(code).ok_or(Error::UnsupportedAudioFormat { code })?;
    match (format, bits_per_sample) {
        (AudioFormat::Pcm, 16 | 32) | (AudioFormat::IeeeFloat, 32) => {}
        _ => {
            return Err(Error::UnsupportedBitDepth {
                bits: bits_per_sample,
                format: format.name(),
            })
        }
    }

    if channels == 0 {
        return Err(Error::invalid("fmt chunk declares zero channels"));
    }
    if sample_rate == 0 {
        return Err(Error::invalid("fmt chunk declares a zero sample rate"));
    }

    Ok(FmtChunk {
        format,
        channels,
        sample_rate,
        bits_per_sample,
    })
}

fn decode_samples(data: &[u8], fmt: &FmtChunk) -> Vec<f32> {
    let convert: fn(&[u8]) -> f32 = match (fmt.format, fmt.bits_per_sample) {
        (AudioFormat::Pcm, 16) => pcm16_to_f32,
        (AudioFormat::Pcm, _) => pcm32_to_f32,
        (AudioFormat::IeeeFloat, _) => float32_to_f32,
    };

    let sample_bytes = fmt.bits_per_sample as usize / 8;
    let frame_bytes = sample_bytes * fmt.channels as usize;
    // Drop a trailing partial frame
    let whole = &data[..data.len() - data.len() % frame_bytes];

    match fmt.channels {
        1 => whole.chunks_exact(sample_bytes).map(convert).collect(),
        2 => whole
            .chunks_exact(frame_bytes)
            .map(|frame| {
                (convert(&frame[..sample_bytes]) + convert(&frame[sample_bytes..])) / 2.0
            })
            .collect(),
        _ => whole
            .chunks_exact(frame_bytes)
            .map(|frame| convert(&frame[..sample_bytes]))
            .collect(),
    }
}

fn pcm16_to_f32(b: &[u8]) -> f32 {
    i16::from_le_bytes([b[0], b[1]]) as f32 / 32768.0
}

fn pcm32_to_f32(b: &[u8]) -> f32 {
    i32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f32 / 2_147_483_648.0
}

fn float32_to_f32(b: &[u8]) -> f32 {
    f32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

fn read_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

fn chunk_name(id: &[u8; 4]) -> String {
    String::from_utf8_lossy(id).into_owned()
}

struct ByteCursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(len)?;
        let slice = self.bytes.get(self.pos..end)?;
        self.pos = end;
        Some(slice)
    }

    fn skip(&mut self, len: usize) {
        self.pos = (self.pos + len).min(self.bytes.len());
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }
}
