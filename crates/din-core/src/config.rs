//! Run configuration.
//!
//! Loaded once before the first trial and read-only afterwards. Precedence:
//! serde defaults < TOML file < `DIN__SECTION__KEY` environment overrides.

use crate::error::{DinError, DinResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment prefix for overrides (`DIN__TEST__START_SNR=0`).
pub const ENV_PREFIX: &str = "DIN";

/// Boundary used by `SnrController::should_stop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StopRule {
    /// Stop once `reversal_count > reversal_limit`.
    #[default]
    Exceeds,
    /// Stop once `reversal_count >= reversal_limit`.
    Reaches,
}

/// Staircase parameters (the `[test]` table).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaircaseConfig {
    /// Trials answered correctly at one level before the SNR is lowered.
    pub correct_threshold: u32,
    /// Trials answered incorrectly at one level before the SNR is raised.
    pub incorrect_threshold: u32,
    /// Coarse-to-fine step magnitudes in dB, indexed by reversal band.
    pub step_size: Vec<f64>,
    /// Reversal count the stop rule is evaluated against.
    pub reversal_limit: u32,
    /// Initial SNR in dB.
    pub start_snr: f64,
    #[serde(default)]
    pub stop_rule: StopRule,
    /// How many trailing reversals are averaged into the SRT.
    #[serde(default = "default_threshold_reversals")]
    pub threshold_reversals: usize,
    /// Upper bound on trials in one run.
    #[serde(default = "default_max_trials")]
    pub max_trials: usize,
}

fn default_threshold_reversals() -> usize {
    4
}

fn default_max_trials() -> usize {
    200
}

impl StaircaseConfig {
    pub fn validate(&self) -> DinResult<()> {
        if self.correct_threshold == 0 {
            return Err(DinError::Config(
                "test.correct_threshold must be at least 1".to_string(),
            ));
        }
        if self.incorrect_threshold == 0 {
            return Err(DinError::Config(
                "test.incorrect_threshold must be at least 1".to_string(),
            ));
        }
        if self.step_size.len() < 3 {
            return Err(DinError::Config(format!(
                "test.step_size needs 3 entries (coarse, medium, fine), got {}",
                self.step_size.len()
            )));
        }
        if let Some(bad) = self.step_size.iter().find(|s| !s.is_finite() || **s <= 0.0) {
            return Err(DinError::Config(format!(
                "test.step_size entries must be positive, got {}",
                bad
            )));
        }
        if self.step_size.len() > 3 {
            warn!(
                "test.step_size has {} entries; only the first 3 are used",
                self.step_size.len()
            );
        }
        if !self.start_snr.is_finite() {
            return Err(DinError::Config("test.start_snr must be finite".to_string()));
        }
        if self.threshold_reversals == 0 {
            return Err(DinError::Config(
                "test.threshold_reversals must be at least 1".to_string(),
            ));
        }
        if self.max_trials == 0 {
            return Err(DinError::Config("test.max_trials must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Which stimulus source feeds the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StimulusKind {
    #[default]
    Digits,
    Statements,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StimulusConfig {
    pub kind: StimulusKind,
    /// Digits per triplet.
    pub digits: usize,
    /// Digits that must be recognised for the trial to count as correct.
    pub min_matches: usize,
    /// Fixed seed for reproducible runs.
    pub seed: Option<u64>,
}

impl Default for StimulusConfig {
    fn default() -> Self {
        Self {
            kind: StimulusKind::Digits,
            digits: 3,
            min_matches: 2,
            seed: None,
        }
    }
}

/// Playback-side audio settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Rate of every waveform the session mixes and plays.
    pub sample_rate: u32,
    /// Zero samples added before and after each stimulus.
    pub pad_samples: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 22050,
            pad_samples: 500,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NoiseKind {
    #[default]
    White,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct NoiseConfig {
    pub kind: NoiseKind,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VocalizerKind {
    /// Pre-recorded `<word>.wav` clips.
    #[default]
    Clips,
    /// OpenAI-compatible speech synthesis endpoint.
    Api,
    /// Silence of fixed length; for dry runs without audio assets.
    Silent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VocalizerConfig {
    pub kind: VocalizerKind,
    pub clips_dir: PathBuf,
    /// Silence inserted between concatenated clips.
    pub gap_ms: u64,
}

impl Default for VocalizerConfig {
    fn default() -> Self {
        Self {
            kind: VocalizerKind::Clips,
            clips_dir: PathBuf::from("stimuli"),
            gap_ms: 150,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    /// Typed answer on stdin.
    #[default]
    Cli,
    /// Microphone capture + speech-to-text.
    Speech,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ResponseConfig {
    pub kind: ResponseKind,
}

/// Microphone recorder settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// RMS (x1000 of full scale) a chunk must reach to count as sound.
    pub rms_threshold: f32,
    /// Seconds of silence that end a recording, or abandon waiting for one.
    pub timeout_secs: u64,
    /// Samples per chunk read from the input stream.
    pub chunk: usize,
    pub sample_rate: u32,
    /// Persist each capture as a numbered WAV file.
    pub store: bool,
    pub save_dir: PathBuf,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            rms_threshold: 10.0,
            timeout_secs: 3,
            chunk: 1024,
            sample_rate: 16000,
            store: true,
            save_dir: PathBuf::from("records"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LogConfig {
    /// JSON-lines trial log. Disabled when unset.
    pub trial_log: Option<PathBuf>,
}

/// Complete configuration for one hearing test run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DinConfig {
    pub test: StaircaseConfig,
    #[serde(default)]
    pub stimulus: StimulusConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub noise: NoiseConfig,
    #[serde(default)]
    pub vocalizer: VocalizerConfig,
    #[serde(default)]
    pub response: ResponseConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl DinConfig {
    /// Load from a TOML file plus `DIN__*` environment overrides. The file must exist.
    pub fn load(path: impl AsRef<Path>) -> DinResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DinError::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        let built = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        let conf: DinConfig = built.try_deserialize()?;
        conf.validate()?;
        info!(path = %path.display(), "Loaded hearing test configuration");
        Ok(conf)
    }

    /// Parse an in-memory TOML document (no environment overrides).
    pub fn from_toml_str(content: &str) -> DinResult<Self> {
        let built = config::Config::builder()
            .add_source(config::File::from_str(content, config::FileFormat::Toml))
            .build()?;
        let conf: DinConfig = built.try_deserialize()?;
        conf.validate()?;
        Ok(conf)
    }

    pub fn to_toml_string(&self) -> DinResult<String> {
        toml::to_string_pretty(self).map_err(|e| DinError::Config(e.to_string()))
    }

    pub fn validate(&self) -> DinResult<()> {
        self.test.validate()?;
        if self.stimulus.digits == 0 {
            return Err(DinError::Config(
                "stimulus.digits must be at least 1".to_string(),
            ));
        }
        if self.stimulus.min_matches == 0 {
            return Err(DinError::Config(
                "stimulus.min_matches must be at least 1".to_string(),
            ));
        }
        if self.stimulus.min_matches > self.stimulus.digits {
            return Err(DinError::Config(format!(
                "stimulus.min_matches ({}) exceeds stimulus.digits ({})",
                self.stimulus.min_matches, self.stimulus.digits
            )));
        }
        if self.audio.sample_rate == 0 {
            return Err(DinError::Config(
                "audio.sample_rate must be positive".to_string(),
            ));
        }
        if self.capture.sample_rate == 0 || self.capture.chunk == 0 {
            return Err(DinError::Config(
                "capture.sample_rate and capture.chunk must be positive".to_string(),
            ));
        }
        if self.capture.timeout_secs == 0 {
            return Err(DinError::Config(
                "capture.timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [test]
        correct_threshold = 2
        incorrect_threshold = 1
        step_size = [5.0, 3.0, 1.0]
        reversal_limit = 3
        start_snr = 5.0
    "#;

    #[test]
    fn minimal_config_fills_defaults() {
        let conf = DinConfig::from_toml_str(MINIMAL).unwrap();
        assert_eq!(conf.test.stop_rule, StopRule::Exceeds);
        assert_eq!(conf.test.threshold_reversals, 4);
        assert_eq!(conf.stimulus.digits, 3);
        assert_eq!(conf.stimulus.min_matches, 2);
        assert_eq!(conf.audio.sample_rate, 22050);
        assert_eq!(conf.capture.timeout_secs, 3);
        assert_eq!(conf.response.kind, ResponseKind::Cli);
        assert!(conf.log.trial_log.is_none());
    }

    #[test]
    fn rejects_short_step_schedule() {
        let doc = MINIMAL.replace("[5.0, 3.0, 1.0]", "[5.0, 3.0]");
        let err = DinConfig::from_toml_str(&doc).unwrap_err();
        assert!(matches!(err, DinError::Config(_)));
    }

    #[test]
    fn rejects_empty_step_schedule() {
        let doc = MINIMAL.replace("[5.0, 3.0, 1.0]", "[]");
        assert!(DinConfig::from_toml_str(&doc).is_err());
    }

    #[test]
    fn rejects_non_positive_step() {
        let doc = MINIMAL.replace("[5.0, 3.0, 1.0]", "[5.0, 0.0, 1.0]");
        assert!(DinConfig::from_toml_str(&doc).is_err());
    }

    #[test]
    fn rejects_zero_threshold() {
        let doc = MINIMAL.replace("incorrect_threshold = 1", "incorrect_threshold = 0");
        assert!(DinConfig::from_toml_str(&doc).is_err());
    }

    #[test]
    fn missing_test_table_is_a_load_error() {
        let err = DinConfig::from_toml_str("[audio]\nsample_rate = 16000\n").unwrap_err();
        assert!(matches!(err, DinError::ConfigLoad(_)));
    }

    #[test]
    fn stop_rule_parses_snake_case() {
        let doc = format!("{}\nstop_rule = \"reaches\"\n", MINIMAL);
        let conf = DinConfig::from_toml_str(&doc).unwrap();
        assert_eq!(conf.test.stop_rule, StopRule::Reaches);
    }

    #[test]
    fn round_trips_through_toml() {
        let conf = DinConfig::from_toml_str(MINIMAL).unwrap();
        let text = conf.to_toml_string().unwrap();
        let again = DinConfig::from_toml_str(&text).unwrap();
        assert_eq!(again.test.step_size, vec![5.0, 3.0, 1.0]);
    }
}
