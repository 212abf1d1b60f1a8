use clap::Parser;
use std::path::PathBuf;

use crate::report::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "beatcut", about = "Find dramatic changes (attacks, dynamic shifts) in WAV audio")]
pub struct Cli {
    /// Input WAV file (16/32-bit PCM or 32-bit float)
    pub input: PathBuf,

    /// Write the report here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Report format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Decimal places for timestamps
    #[arg(long, default_value_t = 3)]
    pub precision: usize,

    /// Include a summary (duration, counts per kind, peak intensity)
    #[arg(long)]
    pub summary: bool,

    /// Run the two detectors one after the other instead of in parallel
    #[arg(long)]
    pub sequential: bool,

    /// Config file (defaults to beatcut.toml or the user config dir)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Hide the progress spinner
    #[arg(short, long)]
    pub quiet: bool,

    /// Debug logging
    #[arg(short, long)]
    pub verbose: bool,
}
