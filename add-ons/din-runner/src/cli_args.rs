//! Command-line arguments for `din`.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Digit-in-noise hearing test
#[derive(Parser)]
#[command(name = "din")]
#[command(author, version, about, long_about = None)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Run an adaptive hearing test and print the SRT estimate
    Run {
        /// Path to the TOML configuration
        #[arg(short, long, default_value = "config/din.toml")]
        config: PathBuf,

        /// Write a JSON-lines trial log here (overrides [log] trial_log)
        #[arg(long)]
        trial_log: Option<PathBuf>,

        /// Print the final report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Play (or save) a reference signal for level calibration
    Calibrate {
        #[arg(long, value_enum, default_value_t = CalibrationSignal::Tone)]
        signal: CalibrationSignal,

        /// Tone frequency in Hz
        #[arg(long, default_value_t = 1000.0)]
        frequency: f64,

        /// Peak amplitude for the tone, RMS for noise (full scale = 1.0)
        #[arg(long, default_value_t = 0.1)]
        amplitude: f32,

        #[arg(long, default_value_t = 5.0)]
        seconds: f64,

        #[arg(long, default_value_t = 22050)]
        sample_rate: u32,

        /// Write a WAV file instead of playing
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List audio input and output devices
    Devices,

    /// Load and validate a configuration without running
    Check {
        #[arg(short, long, default_value = "config/din.toml")]
        config: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum CalibrationSignal {
    Tone,
    Noise,
}
