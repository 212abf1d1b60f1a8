mod cli;
mod config;
mod report;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::ProgressBar;
use std::time::Duration;

use beatcut::AnalysisMode;
use cli::Cli;
use report::{OutputFormat, Summary};

fn main() -> Result<()> {
    let mut cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .init();

    if let Some(path) = config::find_config(cli.config.clone()) {
        if let Some(cfg) = config::load_config(&path) {
            log::info!("Loaded config from {}", path.display());
            // Config values apply only when CLI is at its default
            if cli.format == OutputFormat::Text { cli.format = cfg.output.format; }
            if cli.precision == 3 { cli.precision = cfg.output.precision; }
            if !cli.summary { cli.summary = cfg.output.summary; }
            if !cli.sequential { cli.sequential = !cfg.analysis.parallel; }
        } else {
            log::warn!("Failed to load config from {}", path.display());
        }
    }

    if !cli.input.exists() {
        anyhow::bail!("Input file not found: {}", cli.input.display());
    }
    log::info!("Input: {}", cli.input.display());

    let spinner = if cli.quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new_spinner()
    };
    spinner.enable_steady_tick(Duration::from_millis(100));

    spinner.set_message("Decoding audio...");
    let buffer = beatcut::decode_wav(&cli.input)
        .with_context(|| format!("Failed to decode {}", cli.input.display()))?;
    log::info!(
        "Decoded audio: {} samples, {}Hz, {} channel(s), {}-bit {}, {:.1}s",
        buffer.samples.len(),
        buffer.sample_rate,
        buffer.channels,
        buffer.bits_per_sample,
        buffer.format.name(),
        buffer.duration_secs()
    );
    if buffer.channels > 2 {
        log::warn!(
            "{} channels found; only the first channel is analyzed",
            buffer.channels
        );
    }

    spinner.set_message("Analyzing...");
    let mode = if cli.sequential {
        AnalysisMode::Sequential
    } else {
        AnalysisMode::Parallel
    };
    let detections = beatcut::analyze(&buffer, mode);
    spinner.finish_and_clear();

    if detections.is_empty() {
        log::info!("No dramatic changes found");
    } else {
        log::info!("Found {} dramatic change(s)", detections.len());
    }

    let summary = cli.summary.then(|| Summary::new(&buffer, &detections));
    let rendered = report::render(&detections, summary.as_ref(), cli.format, cli.precision)?;

    match &cli.output {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("Failed to write report: {}", path.display()))?;
            log::info!("Done! Output: {}", path.display());
        }
        None => print!("{rendered}"),
    }

    Ok(())
}
