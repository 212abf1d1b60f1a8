use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use beatcut::{BeatDetection, DetectionKind, SampleBuffer};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Csv,
}

#[derive(Debug, Serialize)]
pub struct Summary {
    pub duration_secs: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub detections: usize,
    pub amplitude: usize,
    pub spectral: usize,
    pub peak_intensity: f32,
}

impl Summary {
    pub fn new(buffer: &SampleBuffer, detections: &[BeatDetection]) -> Self {
        let count = |kind: DetectionKind| detections.iter().filter(|d| d.kind == kind).count();
        Self {
            duration_secs: buffer.duration_secs(),
            sample_rate: buffer.sample_rate,
            channels: buffer.channels,
            detections: detections.len(),
            amplitude: count(DetectionKind::Amplitude),
            spectral: count(DetectionKind::Spectral),
            peak_intensity: detections.iter().map(|d| d.intensity).fold(0.0f32, f32::max),
        }
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<&'a Summary>,
    detections: &'a [BeatDetection],
}

pub fn render(
    detections: &[BeatDetection],
    summary: Option<&Summary>,
    format: OutputFormat,
    precision: usize,
) -> Result<String> {
    match format {
        OutputFormat::Json => {
            let report = JsonReport { summary, detections };
            let mut json =
                serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
            json.push('\n');
            Ok(json)
        }
        OutputFormat::Csv => Ok(render_csv(detections, precision)),
        OutputFormat::Text => Ok(render_text(detections, summary, precision)),
    }
}

fn render_csv(detections: &[BeatDetection], precision: usize) -> String {
    let mut out = String::from("timestamp,intensity,kind\n");
    for d in detections {
        out.push_str(&format!(
            "{:.*},{:.3},{}\n",
            precision,
            d.timestamp,
            d.intensity,
            d.kind.as_str()
        ));
    }
    out
}

fn render_text(
    detections: &[BeatDetection],
    summary: Option<&Summary>,
    precision: usize,
) -> String {
    let mut out = String::new();
    if let Some(s) = summary {
        out.push_str(&format!(
            "# {} detection(s) ({} amplitude, {} spectral) over {}, peak intensity {:.2}\n",
            s.detections,
            s.amplitude,
            s.spectral,
            format_timecode(s.duration_secs),
            s.peak_intensity
        ));
    }
    for (i, d) in detections.iter().enumerate() {
        out.push_str(&format!(
            "{:>4}  {:>12}  {:>10.*}s  {:.3}  {}\n",
            i + 1,
            format_timecode(d.timestamp),
            precision,
            d.timestamp,
            d.intensity,
            d.kind.as_str()
        ));
    }
    out
}

fn format_timecode(secs: f64) -> String {
    let total_secs = secs as u64;
    let centis = ((secs - total_secs as f64) * 100.0) as u64;
    if total_secs >= 3600 {
        format!(
            "{:02}:{:02}:{:02}.{:02}",
            total_secs / 3600,
            (total_secs % 3600) / 60,
            total_secs % 60,
            centis
        )
    } else {
        format!("{:02}:{:02}.{:02}", total_secs / 60, total_secs % 60, centis)
    }
}
