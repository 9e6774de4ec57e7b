//! Builds the collaborators for a hearing test from configuration.

use crate::playback::SpeakerPlayback;
use crate::recorder::Recorder;
use crate::respond::{CliResponder, SpeechResponder};
use crate::stt::create_best_stt;
use crate::vocalizer::{ApiTts, ApiVocalizer, ClipVocalizer};
use din_core::stimulus::DIGIT_WORDS;
use din_core::{
    build_noise_generator, build_stimulus_source, DinConfig, DinError, DinResult,
    ResponseCapturer, ResponseKind, SilentVocalizer, StimulusKind, TestParts, Vocalizer,
    VocalizerKind,
};
use std::time::Duration;
use tracing::info;

/// Vocalizer selected by `[vocalizer] kind`.
pub fn build_vocalizer(config: &DinConfig) -> DinResult<Box<dyn Vocalizer>> {
    let rate = config.audio.sample_rate;
    let v: Box<dyn Vocalizer> = match config.vocalizer.kind {
        VocalizerKind::Clips => Box::new(load_clips(config)?),
        VocalizerKind::Api => Box::new(ApiVocalizer::new(Box::new(ApiTts::from_env()?), rate)),
        VocalizerKind::Silent => Box::new(SilentVocalizer {
            sample_rate: rate,
            ..SilentVocalizer::default()
        }),
    };
    Ok(v)
}

/// Clip vocalizer that can speak every stimulus the configured source draws.
fn load_clips(config: &DinConfig) -> DinResult<ClipVocalizer> {
    if config.stimulus.kind != StimulusKind::Digits {
        return Err(DinError::Config(format!(
            "vocalizer.kind = \"clips\" only covers digit stimuli, not {:?}",
            config.stimulus.kind
        )));
    }
    let clips = ClipVocalizer::load(
        &config.vocalizer.clips_dir,
        Duration::from_millis(config.vocalizer.gap_ms),
        config.audio.sample_rate,
    )?;
    let missing: Vec<&str> = DIGIT_WORDS
        .iter()
        .copied()
        .filter(|w| !clips.has_word(w))
        .collect();
    if !missing.is_empty() {
        return Err(DinError::Config(format!(
            "missing stimulus clips in {}: {}",
            config.vocalizer.clips_dir.display(),
            missing.join(", ")
        )));
    }
    Ok(clips)
}

/// Responder selected by `[response] kind`. Spoken responses need a real
/// speech recognizer.
pub fn build_responder(config: &DinConfig) -> DinResult<Box<dyn ResponseCapturer>> {
    let r: Box<dyn ResponseCapturer> = match config.response.kind {
        ResponseKind::Cli => Box::new(CliResponder::stdin()),
        ResponseKind::Speech => {
            let stt = create_best_stt()?;
            Box::new(SpeechResponder::new(Recorder::new(config.capture.clone())?, stt))
        }
    };
    Ok(r)
}

/// All device-backed parts for `HearingTest::new`.
pub fn build_parts(config: &DinConfig) -> DinResult<TestParts> {
    info!(
        vocalizer = ?config.vocalizer.kind,
        response = ?config.response.kind,
        "building test backends"
    );
    Ok(TestParts {
        stimuli: build_stimulus_source(&config.stimulus),
        vocalizer: build_vocalizer(config)?,
        noise: build_noise_generator(&config.noise),
        playback: Box::new(SpeakerPlayback::new()?),
        responder: build_responder(config)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn speech_config() -> DinConfig {
        let mut config = DinConfig::from_toml_str(
            r#"
            [test]
            correct_threshold = 2
            incorrect_threshold = 1
            step_size = [4.0, 2.0, 1.0]
            reversal_limit = 8
            start_snr = 0.0

            [response]
            kind = "speech"
            "#,
        )
        .unwrap();
        config.capture.store = false;
        config
    }

    #[test]
    fn speech_responses_without_a_recognizer_fail_at_startup() {
        if create_best_stt().is_ok() {
            // a recognizer is configured in this environment
            return;
        }
        let err = build_responder(&speech_config()).err().unwrap();
        assert!(matches!(err, DinError::Config(_)));
    }
}
