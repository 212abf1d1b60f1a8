use rayon::prelude::*;

use super::decode::SampleBuffer;
use super::features::{BeatDetection, DetectionKind};
use super::merge::merge_and_filter;

const AMPLITUDE_WINDOW_SECS: f64 = 0.1;
const AMPLITUDE_HOPS_PER_WINDOW: usize = 4;
/// Energy must more than double from one window to the next
const AMPLITUDE_RATIO: f32 = 2.0;
const AMPLITUDE_FLOOR: f32 = 0.05;
/// RMS that maps to full intensity
const AMPLITUDE_FULL_SCALE: f32 = 0.5;

const SPECTRAL_WINDOW_SECS: f64 = 0.2;
const SPECTRAL_HOPS_PER_WINDOW: usize = 2;
const NUM_BANDS: usize = 20;
const FLUX_THRESHOLD_MULTIPLIER: f32 = 1.5;

/// How the two detectors are scheduled. Both modes produce identical output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AnalysisMode {
    #[default]
    Parallel,
    Sequential,
}

/// Run both detectors over the buffer and merge their results.
///
/// Returns detections sorted by timestamp, at least 0.1s apart and with
/// intensity in [0.2, 1.0]. Quiet or very short audio gives an empty list.
pub fn analyze(buffer: &SampleBuffer, mode: AnalysisMode) -> Vec<BeatDetection> {
    let (amplitude, spectral) = match mode {
        AnalysisMode::Parallel => rayon::join(
            || detect_amplitude_changes(buffer),
            || detect_spectral_changes(buffer),
        ),
        AnalysisMode::Sequential => (
            detect_amplitude_changes(buffer),
            detect_spectral_changes(buffer),
        ),
    };

    log::debug!(
        "Raw detections: {} amplitude, {} spectral",
        amplitude.len(),
        spectral.len()
    );

    let mut all = amplitude;
    all.extend(spectral);
    let merged = merge_and_filter(all);

    log::debug!("{} detection(s) after merge/filter", merged.len());
    merged
}

/// Find sudden RMS energy spikes.
///
/// Scans 100ms windows at a 25ms hop and emits a detection wherever a
/// window's energy is more than double the previous window's and above the
/// noise floor. The timestamp is the end of the spiking window, which puts it
/// within one hop of the onset.
pub fn detect_amplitude_changes(buffer: &SampleBuffer) -> Vec<BeatDetection> {
    let sample_rate = buffer.sample_rate;
    let window = window_len(sample_rate, AMPLITUDE_WINDOW_SECS);
    let hop = window / AMPLITUDE_HOPS_PER_WINDOW;
    if hop == 0 {
        return Vec::new();
    }

    let samples = &buffer.samples;
    let starts = window_starts(samples.len(), window, hop);
    let energies: Vec<f32> = starts
        .par_iter()
        .map(|&start| rms(&samples[start..start + window]))
        .collect();

    log::trace!(
        "Amplitude: window={} hop={} windows={}",
        window,
        hop,
        energies.len()
    );

    energies
        .windows(2)
        .zip(starts.iter().skip(1))
        .filter(|(pair, _)| pair[1] > pair[0] * AMPLITUDE_RATIO && pair[1] > AMPLITUDE_FLOOR)
        .map(|(pair, &start)| {
            BeatDetection::new(
                (start + window) as f64 / sample_rate as f64,
                (pair[1] / AMPLITUDE_FULL_SCALE).min(1.0),
                DetectionKind::Amplitude,
            )
        })
        .collect()
}

/// Find peaks in banded-energy flux.
///
/// Each 200ms window (100ms hop) is cut into 20 equal time slices whose
/// energies stand in for a magnitude spectrum. This is a time-domain proxy,
/// not an FFT; the thresholds below are tuned for it. Only increases in band
/// energy count towards the flux. A flux value is an onset when it is a strict
/// local maximum above 1.5x the mean flux of the whole file.
pub fn detect_spectral_changes(buffer: &SampleBuffer) -> Vec<BeatDetection> {
    let sample_rate = buffer.sample_rate;
    let window = window_len(sample_rate, SPECTRAL_WINDOW_SECS);
    let hop = window / SPECTRAL_HOPS_PER_WINDOW;
    let band_len = window / NUM_BANDS;
    if hop == 0 || band_len == 0 {
        return Vec::new();
    }

    let samples = &buffer.samples;
    let starts = window_starts(samples.len(), window, hop);
    let bands: Vec<[f32; NUM_BANDS]> = starts
        .par_iter()
        .map(|&start| band_energies(&samples[start..start + window], band_len))
        .collect();

    let flux: Vec<f32> = bands
        .windows(2)
        .map(|pair| spectral_flux(&pair[0], &pair[1]))
        .collect();
    if flux.len() < 3 {
        return Vec::new();
    }

    let mean = flux.iter().sum::<f32>() / flux.len() as f32;
    let threshold = mean * FLUX_THRESHOLD_MULTIPLIER;
    log::trace!(
        "Spectral: window={} hop={} flux values={} threshold={:.4}",
        window,
        hop,
        flux.len(),
        threshold
    );
    if threshold <= 0.0 {
        return Vec::new();
    }

    (1..flux.len() - 1)
        .filter(|&i| flux[i] > threshold && flux[i] > flux[i - 1] && flux[i] > flux[i + 1])
        .map(|i| {
            BeatDetection::new(
                ((i + 1) * hop) as f64 / sample_rate as f64,
                (flux[i] / threshold).min(1.0),
                DetectionKind::Spectral,
            )
        })
        .collect()
}

fn window_len(sample_rate: u32, secs: f64) -> usize {
    (sample_rate as f64 * secs).round() as usize
}

/// Start offsets of every full window that ends strictly before the buffer end.
fn window_starts(len: usize, window: usize, hop: usize) -> Vec<usize> {
    (0..)
        .step_by(hop)
        .take_while(|&start| start + window < len)
        .collect()
}

fn rms(window: &[f32]) -> f32 {
    (window.iter().map(|s| s * s).sum::<f32>() / window.len() as f32).sqrt()
}

/// Unnormalized energy of each equal slice; any remainder past the last
/// full slice is ignored.
fn band_energies(window: &[f32], band_len: usize) -> [f32; NUM_BANDS] {
    let mut bands = [0.0f32; NUM_BANDS];
    for (band, slice) in bands.iter_mut().zip(window.chunks_exact(band_len)) {
        *band = slice.iter().map(|s| s * s).sum::<f32>().sqrt();
    }
    bands
}

fn spectral_flux(prev: &[f32; NUM_BANDS], curr: &[f32; NUM_BANDS]) -> f32 {
    curr.iter()
        .zip(prev.iter())
        .map(|(c, p)| {
            let rise = (c - p).max(0.0);
            rise * rise
        })
        .sum::<f32>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::features::AudioFormat;

    const SR: u32 = 44100;

    fn buffer(samples: Vec<f32>, sample_rate: u32) -> SampleBuffer {
        SampleBuffer {
            samples,
            sample_rate,
            channels: 1,
            bits_per_sample: 16,
            format: AudioFormat::Pcm,
        }
    }

    /// Silence with a 200Hz tone between `start` and `end` seconds.
    fn tone_burst(total_secs: f64, start: f64, end: f64, amplitude: f32) -> SampleBuffer {
        let n = (total_secs * SR as f64) as usize;
        let from = (start * SR as f64) as usize;
        let to = (end * SR as f64) as usize;
        let samples = (0..n)
            .map(|i| {
                if i >= from && i < to {
                    let t = i as f32 / SR as f32;
                    amplitude * (2.0 * std::f32::consts::PI * 200.0 * t).sin()
                } else {
                    0.0
                }
            })
            .collect();
        buffer(samples, SR)
    }

    #[test]
    fn test_silence_yields_nothing() {
        for secs in [0.05, 1.0, 4.0] {
            let buf = buffer(vec![0.0; (secs * SR as f64) as usize], SR);
            assert!(detect_amplitude_changes(&buf).is_empty());
            assert!(detect_spectral_changes(&buf).is_empty());
            assert!(analyze(&buf, AnalysisMode::Parallel).is_empty());
        }
    }

    #[test]
    fn test_shorter_than_window_is_empty() {
        let buf = buffer(vec![0.9; 4000], SR);
        assert!(detect_amplitude_changes(&buf).is_empty());
        assert!(detect_spectral_changes(&buf).is_empty());
    }

    #[test]
    fn test_two_flux_values_is_empty() {
        // Three 200ms windows give only two flux values, too few to pick a peak
        let buf = tone_burst(0.5, 0.25, 0.5, 0.9);
        assert_eq!(buf.samples.len(), 22050);
        assert_eq!(window_starts(buf.samples.len(), 8820, 4410).len(), 3);
        assert!(detect_spectral_changes(&buf).is_empty());
    }

    #[test]
    fn test_degenerate_sample_rate_is_empty() {
        let buf = buffer(vec![0.5; 100], 10);
        assert!(detect_amplitude_changes(&buf).is_empty());
        assert!(detect_spectral_changes(&buf).is_empty());
    }

    #[test]
    fn test_amplitude_step_onset() {
        let buf = tone_burst(3.0, 1.0, 1.3, 0.8);
        let detections = detect_amplitude_changes(&buf);

        assert_eq!(detections.len(), 1, "{detections:?}");
        let d = detections[0];
        assert_eq!(d.kind, DetectionKind::Amplitude);
        assert!(d.timestamp >= 0.95 && d.timestamp <= 1.10, "{}", d.timestamp);
        assert!(d.intensity > 0.5, "{}", d.intensity);

        let merged = merge_and_filter(detections.clone());
        assert_eq!(merged, detections);
    }

    #[test]
    fn test_amplitude_ignores_quiet_rise() {
        // Doubling below the 0.05 floor is not an event
        let buf = tone_burst(2.0, 1.0, 1.5, 0.04);
        assert!(detect_amplitude_changes(&buf).is_empty());
    }

    #[test]
    fn test_amplitude_intensity_saturates() {
        let buf = tone_burst(2.0, 0.5, 1.5, 1.0);
        let detections = detect_amplitude_changes(&buf);
        assert!(!detections.is_empty());
        assert!(detections.iter().all(|d| d.intensity <= 1.0));
    }

    #[test]
    fn test_spectral_onset_peak() {
        // Onset halfway between hops so one flux value clearly dominates
        let buf = tone_burst(3.0, 1.05, 1.35, 0.8);
        let detections = detect_spectral_changes(&buf);

        assert_eq!(detections.len(), 1, "{detections:?}");
        let d = detections[0];
        assert_eq!(d.kind, DetectionKind::Spectral);
        assert!((d.timestamp - 1.0).abs() < 1e-9, "{}", d.timestamp);
        assert_eq!(d.intensity, 1.0);
    }

    #[test]
    fn test_band_energies_are_unnormalized() {
        let window = vec![0.5f32; 40];
        let bands = band_energies(&window, 2);
        // sqrt(0.25 + 0.25)
        assert!(bands.iter().all(|b| (b - 0.5f32.sqrt()).abs() < 1e-6));
    }

    #[test]
    fn test_flux_counts_only_increases() {
        let mut prev = [1.0f32; NUM_BANDS];
        let mut curr = [1.0f32; NUM_BANDS];
        curr[0] = 4.0;
        curr[1] = 5.0;
        prev[2] = 10.0;
        assert!((spectral_flux(&prev, &curr) - 5.0).abs() < 1e-6);
        assert_eq!(spectral_flux(&curr, &curr), 0.0);
    }

    #[test]
    fn test_window_starts_stop_before_end() {
        assert_eq!(window_starts(10, 4, 2), vec![0, 2, 4]);
        assert!(window_starts(4, 4, 1).is_empty());
    }

    #[test]
    fn test_modes_agree() {
        let mut samples = tone_burst(4.0, 0.7, 1.0, 0.6).samples;
        let burst = tone_burst(4.0, 2.25, 2.6, 0.9).samples;
        for (s, b) in samples.iter_mut().zip(burst) {
            *s += b;
        }
        let buf = buffer(samples, SR);

        let parallel = analyze(&buf, AnalysisMode::Parallel);
        let sequential = analyze(&buf, AnalysisMode::Sequential);
        assert!(!parallel.is_empty());
        assert_eq!(parallel, sequential);
    }
}
