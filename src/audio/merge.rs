//! Combining detector output into the final ordered list.

use super::features::BeatDetection;

/// Detections closer than this collapse into one.
pub const MERGE_WINDOW_SECS: f64 = 0.1;
/// Merged detections weaker than this are dropped.
pub const MIN_INTENSITY: f32 = 0.2;

/// Sort, merge, then filter.
pub fn merge_and_filter(detections: Vec<BeatDetection>) -> Vec<BeatDetection> {
    filter_detections(merge_detections(sort_detections(detections)))
}

/// Stable sort by timestamp; exact ties keep their input order.
pub fn sort_detections(mut detections: Vec<BeatDetection>) -> Vec<BeatDetection> {
    detections.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
    detections
}

/// Collapse detections within [`MERGE_WINDOW_SECS`] of the running one,
/// keeping whichever is stronger as-is (timestamp and kind included).
/// On equal intensity the earlier detection wins.
///
/// Input must already be sorted.
pub fn merge_detections(sorted: Vec<BeatDetection>) -> Vec<BeatDetection> {
    let mut iter = sorted.into_iter();
    let Some(mut current) = iter.next() else {
        return Vec::new();
    };

    let mut merged = Vec::new();
    for detection in iter {
        if detection.timestamp - current.timestamp < MERGE_WINDOW_SECS {
            if detection.intensity > current.intensity {
                current = detection;
            }
        } else {
            merged.push(current);
            current = detection;
        }
    }
    merged.push(current);

    merged
}

pub fn filter_detections(detections: Vec<BeatDetection>) -> Vec<BeatDetection> {
    detections
        .into_iter()
        .filter(|d| d.intensity >= MIN_INTENSITY)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::features::DetectionKind::{Amplitude, Spectral};

    fn det(timestamp: f64, intensity: f32, kind: crate::DetectionKind) -> BeatDetection {
        BeatDetection::new(timestamp, intensity, kind)
    }

    #[test]
    fn test_empty_input() {
        assert!(merge_and_filter(Vec::new()).is_empty());
    }

    #[test]
    fn test_merge_collapse_keeps_stronger() {
        let out = merge_and_filter(vec![det(5.05, 0.9, Spectral), det(5.00, 0.3, Amplitude)]);
        assert_eq!(out, vec![det(5.05, 0.9, Spectral)]);
    }

    #[test]
    fn test_earlier_wins_when_stronger() {
        let out = merge_and_filter(vec![det(2.0, 0.8, Amplitude), det(2.06, 0.5, Spectral)]);
        assert_eq!(out, vec![det(2.0, 0.8, Amplitude)]);
    }

    #[test]
    fn test_equal_intensity_keeps_first() {
        let out = merge_detections(vec![det(1.0, 0.5, Amplitude), det(1.05, 0.5, Spectral)]);
        assert_eq!(out, vec![det(1.0, 0.5, Amplitude)]);
    }

    #[test]
    fn test_sort_is_stable_on_ties() {
        let sorted = sort_detections(vec![
            det(3.0, 0.4, Spectral),
            det(1.0, 0.6, Amplitude),
            det(1.0, 0.7, Spectral),
        ]);
        assert_eq!(
            sorted,
            vec![det(1.0, 0.6, Amplitude), det(1.0, 0.7, Spectral), det(3.0, 0.4, Spectral)]
        );
    }

    #[test]
    fn test_far_apart_detections_survive() {
        let input = vec![
            det(0.5, 0.5, Amplitude),
            det(0.7, 0.6, Spectral),
            det(1.5, 1.0, Spectral),
        ];
        assert_eq!(merge_and_filter(input.clone()), input);
    }

    #[test]
    fn test_weak_detections_filtered_after_merge() {
        // The weak one is still used as a merge anchor before filtering
        let out = merge_and_filter(vec![
            det(1.0, 0.1, Amplitude),
            det(1.05, 0.15, Amplitude),
            det(2.0, 0.2, Spectral),
        ]);
        assert_eq!(out, vec![det(2.0, 0.2, Spectral)]);
    }

    #[test]
    fn test_output_invariants() {
        // Deterministic pseudo-random cloud of detections
        let mut state: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next = || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state % 10_000) as f64 / 10_000.0
        };
        let input: Vec<BeatDetection> = (0..500)
            .map(|i| {
                let kind = if i % 2 == 0 { Amplitude } else { Spectral };
                det(next() * 30.0, next() as f32, kind)
            })
            .collect();

        let out = merge_and_filter(input);
        assert!(!out.is_empty());
        for pair in out.windows(2) {
            assert!(pair[1].timestamp - pair[0].timestamp >= MERGE_WINDOW_SECS);
        }
        for d in &out {
            assert!(d.intensity >= MIN_INTENSITY && d.intensity <= 1.0);
        }
    }
}
