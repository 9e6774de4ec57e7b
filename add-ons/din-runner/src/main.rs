//! `din`: run a digit-in-noise hearing test from the command line.
//!
//! Loads `.env`, sets up tracing from `RUST_LOG`, then dispatches to a
//! subcommand.

mod cli_args;

use anyhow::Context;
use clap::Parser;
use cli_args::{CalibrationSignal, Cli, Commands};
use din_core::waveform::calibration_tone;
use din_core::{DinConfig, HearingTest, Playback, TestReport, TrialLog, WhiteNoise};
use din_voice::{build_parts, write_wav, AudioCapture, SpeakerPlayback};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    // Load .env file if present (API keys for TTS/STT backends)
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[din] .env not loaded: {} (using system environment)", e);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            config,
            trial_log,
            json,
        } => run(config, trial_log, json),
        Commands::Calibrate {
            signal,
            frequency,
            amplitude,
            seconds,
            sample_rate,
            output,
        } => calibrate(signal, frequency, amplitude, seconds, sample_rate, output),
        Commands::Devices => devices(),
        Commands::Check { config } => {
            let config = DinConfig::load(&config)
                .with_context(|| format!("invalid configuration {}", config.display()))?;
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}

fn run(config_path: PathBuf, trial_log: Option<PathBuf>, json: bool) -> anyhow::Result<()> {
    let mut config = DinConfig::load(&config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    if trial_log.is_some() {
        config.log.trial_log = trial_log;
    }

    let parts = build_parts(&config)?;
    let mut test = HearingTest::new(&config, parts)?;
    if let Some(path) = &config.log.trial_log {
        test = test.with_trial_log(TrialLog::open(path)?);
        tracing::info!(path = %path.display(), "Trial log enabled");
    }

    let report = test.run()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &TestReport) {
    println!("Speech reception threshold: {:.2} dB SNR", report.srt_db);
    println!("Trials: {}", report.trials);
    let reversals: Vec<String> = report.reversals.iter().map(|r| format!("{:.1}", r)).collect();
    println!("Reversals: [{}]", reversals.join(", "));
    if report.stopped_early {
        println!("Note: trial cap reached before the stop rule; estimate uses fewer reversals.");
    }
}

fn calibrate(
    signal: CalibrationSignal,
    frequency: f64,
    amplitude: f32,
    seconds: f64,
    sample_rate: u32,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    anyhow::ensure!(seconds > 0.0, "seconds must be positive");
    anyhow::ensure!(sample_rate > 0, "sample rate must be positive");
    let wave = match signal {
        CalibrationSignal::Tone => calibration_tone(frequency, amplitude, seconds, sample_rate),
        CalibrationSignal::Noise => {
            let len = (seconds * sample_rate as f64).round() as usize;
            WhiteNoise::new(None).raw(len, amplitude as f64, sample_rate)
        }
    };
    tracing::info!(
        signal = ?signal,
        rms = wave.rms(),
        peak = wave.peak(),
        seconds,
        "Calibration signal"
    );

    match output {
        Some(path) => {
            write_wav(&path, &wave)?;
            println!("Wrote {}", path.display());
        }
        None => SpeakerPlayback::new()?.play(&wave)?,
    }
    Ok(())
}

fn devices() -> anyhow::Result<()> {
    println!("Input devices:");
    for name in AudioCapture::list_input_devices()? {
        println!("  {}", name);
    }
    println!("Output devices:");
    for name in AudioCapture::list_output_devices()? {
        println!("  {}", name);
    }
    Ok(())
}
