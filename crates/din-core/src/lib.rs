//! # DIN Core - Digit-in-Noise Hearing Test
//!
//! Adaptive speech-in-noise testing: digit stimuli are played in noise at a
//! controlled SNR and a staircase moves the SNR toward the participant's
//! speech-reception threshold (SRT).
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         HearingTest                          │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐        │
//! │  │   Stimulus   │→ │  Vocalizer   │→ │    Noise     │→ play  │
//! │  │    Source    │  │  (text→wav)  │  │ (wav, SNR)   │        │
//! │  └──────────────┘  └──────────────┘  └──────────────┘        │
//! │         ↑                                    ↓               │
//! │  ┌──────────────┐                    ┌──────────────┐        │
//! │  │SnrController │←──── correct? ─────│  Responder   │        │
//! │  │ (staircase)  │                    │ (cli / STT)  │        │
//! │  └──────────────┘                    └──────────────┘        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! This crate has no audio-device dependencies; see `din-voice` for
//! microphone, speaker, STT and TTS backends.

pub mod capability;
pub mod config;
pub mod error;
pub mod noise;
pub mod session;
pub mod staircase;
pub mod stimulus;
pub mod trial_log;
pub mod waveform;

pub use capability::{Playback, ResponseCapturer, SilentVocalizer, Vocalizer};
pub use config::{
    AudioConfig, CaptureConfig, DinConfig, NoiseConfig, ResponseKind, StaircaseConfig,
    StimulusConfig, StimulusKind, StopRule, VocalizerConfig, VocalizerKind,
};
pub use error::{DinError, DinResult};
pub use noise::{build_noise_generator, NoiseGenerator, WhiteNoise};
pub use session::{HearingTest, TestParts, TestReport, TrialRecord};
pub use staircase::{Direction, SnrController};
pub use stimulus::{
    build_stimulus_source, DigitQuestions, StatementQuestions, Stimulus, StimulusSource,
};
pub use trial_log::{TrialEvent, TrialLog};
pub use waveform::Waveform;
