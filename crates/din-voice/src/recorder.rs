//! Threshold-gated microphone recorder.
//!
//! Listening waits up to `timeout_secs` for the chunk level to cross
//! `rms_threshold`, then keeps recording until the level has stayed below
//! the threshold for another `timeout_secs`. Levels are RMS scaled by 1000,
//! so the default threshold of 10 corresponds to an RMS of 0.01.

use crate::audio::{AudioCapture, AudioChunk};
use crate::error::{VoiceError, VoiceResult};
use din_core::{CaptureConfig, Waveform};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const RMS_SCALE: f32 = 1000.0;
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Level of one chunk on the recorder's threshold scale.
pub fn chunk_level(samples: &[f32]) -> f32 {
    (din_core::waveform::rms_amplitude(samples) as f32) * RMS_SCALE
}

/// What to do with a chunk after observing its level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Still waiting for speech; discard the chunk.
    Idle,
    /// Speech in progress (or trailing silence); keep the chunk.
    Keep,
    /// Listening is over; keep nothing more.
    Done,
}

/// Onset and silence timing for one listening window.
#[derive(Debug, Clone)]
pub struct ListenGate {
    threshold: f32,
    timeout: Duration,
    started: Instant,
    last_loud: Option<Instant>,
}

impl ListenGate {
    pub fn new(threshold: f32, timeout: Duration, started: Instant) -> Self {
        Self {
            threshold,
            timeout,
            started,
            last_loud: None,
        }
    }

    pub fn heard_speech(&self) -> bool {
        self.last_loud.is_some()
    }

    pub fn observe(&mut self, level: f32, now: Instant) -> GateDecision {
        if level >= self.threshold {
            self.last_loud = Some(now);
            return GateDecision::Keep;
        }
        if self.expired(now) {
            return GateDecision::Done;
        }
        if self.heard_speech() {
            GateDecision::Keep
        } else {
            GateDecision::Idle
        }
    }

    /// True once the onset wait or the trailing silence has run out.
    pub fn expired(&self, now: Instant) -> bool {
        let since = self.last_loud.unwrap_or(self.started);
        now.saturating_duration_since(since) >= self.timeout
    }
}

/// Records one response per call from the default input device.
pub struct Recorder {
    config: CaptureConfig,
    rt: Runtime,
}

impl Recorder {
    pub fn new(config: CaptureConfig) -> VoiceResult<Self> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?;
        if config.store {
            fs::create_dir_all(&config.save_dir)?;
        }
        Ok(Self { config, rt })
    }

    /// Listen for a single response. Returns an empty waveform when no one
    /// spoke before the timeout.
    pub fn listen(&self) -> VoiceResult<Waveform> {
        let (tx, mut rx) = mpsc::unbounded_channel::<AudioChunk>();
        let stream = AudioCapture::new(&self.config)?.start_capture(tx)?;
        info!("Listening...");

        let timeout = Duration::from_secs(self.config.timeout_secs);
        let mut gate = ListenGate::new(self.config.rms_threshold, timeout, Instant::now());
        let mut recorded: Vec<f32> = Vec::new();

        loop {
            match self
                .rt
                .block_on(tokio::time::timeout(POLL_INTERVAL, rx.recv()))
            {
                Ok(Some(chunk)) => {
                    let level = chunk_level(&chunk.samples);
                    match gate.observe(level, chunk.timestamp) {
                        GateDecision::Idle => {}
                        GateDecision::Keep => recorded.extend_from_slice(&chunk.samples),
                        GateDecision::Done => break,
                    }
                }
                Ok(None) => {
                    return Err(VoiceError::ChannelReceive(
                        "capture stream closed".to_string(),
                    ))
                }
                // Device stalled: fall back to wall-clock timing.
                Err(_) => {
                    if gate.expired(Instant::now()) {
                        break;
                    }
                }
            }
        }
        drop(stream);

        let wave = Waveform::new(recorded, self.config.sample_rate);
        if !gate.heard_speech() {
            warn!("no speech detected within {}s", self.config.timeout_secs);
            return Ok(wave);
        }
        debug!(secs = wave.duration_secs(), "recording finished");
        if self.config.store {
            let path = next_record_path(&self.config.save_dir)?;
            write_wav(&path, &wave)?;
            info!("Written to file: {}", path.display());
        }
        Ok(wave)
    }
}

/// Next free `<n>.wav` in `dir`, numbering from 1.
pub fn next_record_path(dir: &Path) -> VoiceResult<PathBuf> {
    let mut highest = 0u64;
    if dir.exists() {
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("wav") {
                continue;
            }
            if let Some(n) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<u64>().ok())
            {
                highest = highest.max(n);
            }
        }
    }
    Ok(dir.join(format!("{}.wav", highest + 1)))
}

fn wav_spec(sample_rate: u32) -> hound::WavSpec {
    hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    }
}

fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16
}

/// Write a mono 16-bit WAV file.
pub fn write_wav(path: &Path, wave: &Waveform) -> VoiceResult<()> {
    let mut writer = hound::WavWriter::create(path, wav_spec(wave.sample_rate))?;
    for &s in &wave.samples {
        writer.write_sample(to_i16(s))?;
    }
    writer.finalize()?;
    Ok(())
}

/// Encode mono f32 PCM to 16-bit WAV bytes in memory.
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> VoiceResult<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, wav_spec(sample_rate))?;
        for &s in samples {
            writer.write_sample(to_i16(s))?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

/// Read a WAV file as mono f32, averaging channels.
pub fn read_wav(path: &Path) -> VoiceResult<Waveform> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()?
        }
    };
    let samples = crate::playback::downmix(&interleaved, spec.channels as usize);
    Ok(Waveform::new(samples, spec.sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(base: Instant, ms: u64) -> Instant {
        base + Duration::from_millis(ms)
    }

    #[test]
    fn level_uses_scaled_rms() {
        assert!((chunk_level(&[0.01; 64]) - 10.0).abs() < 1e-3);
        assert_eq!(chunk_level(&[]), 0.0);
    }

    #[test]
    fn gate_gives_up_without_onset() {
        let t0 = Instant::now();
        let mut gate = ListenGate::new(10.0, Duration::from_secs(3), t0);
        assert_eq!(gate.observe(1.0, at(t0, 1000)), GateDecision::Idle);
        assert_eq!(gate.observe(1.0, at(t0, 3000)), GateDecision::Done);
        assert!(!gate.heard_speech());
    }

    #[test]
    fn gate_keeps_trailing_silence_until_timeout() {
        let t0 = Instant::now();
        let mut gate = ListenGate::new(10.0, Duration::from_secs(3), t0);
        assert_eq!(gate.observe(50.0, at(t0, 2500)), GateDecision::Keep);
        // past the onset deadline, but speech was heard
        assert_eq!(gate.observe(1.0, at(t0, 4000)), GateDecision::Keep);
        assert_eq!(gate.observe(20.0, at(t0, 5000)), GateDecision::Keep);
        assert_eq!(gate.observe(1.0, at(t0, 7900)), GateDecision::Keep);
        assert_eq!(gate.observe(1.0, at(t0, 8000)), GateDecision::Done);
    }

    #[test]
    fn record_paths_number_after_the_highest() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(next_record_path(dir.path()).unwrap(), dir.path().join("1.wav"));
        for name in ["1.wav", "7.wav", "notes.txt", "x.wav"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        assert_eq!(next_record_path(dir.path()).unwrap(), dir.path().join("8.wav"));
    }

    #[test]
    fn wav_file_keeps_rate_and_samples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("1.wav");
        write_wav(&path, &Waveform::new(vec![0.0, 0.5, -0.5], 16000)).unwrap();
        let back = read_wav(&path).unwrap();
        assert_eq!(back.sample_rate, 16000);
        assert_eq!(back.len(), 3);
        assert!((back.samples[2] + 0.5).abs() < 1e-3);
    }

    #[test]
    #[ignore] // needs a microphone
    fn records_from_default_device() {
        let dir = tempfile::tempdir().unwrap();
        let config = CaptureConfig {
            save_dir: dir.path().to_path_buf(),
            timeout_secs: 1,
            ..CaptureConfig::default()
        };
        let recorder = Recorder::new(config).unwrap();
        let wave = recorder.listen().unwrap();
        println!("captured {} samples", wave.len());
    }
}
