//! Error types for the audio and speech backends

use din_core::DinError;
use thiserror::Error;

/// Result type alias for device and speech operations
pub type VoiceResult<T> = Result<T, VoiceError>;

/// Errors raised by capture, playback, STT and vocalizer backends
#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("Audio device error: {0}")]
    AudioDevice(String),

    #[error("Audio stream error: {0}")]
    AudioStream(String),

    #[error("Channel receive error: {0}")]
    ChannelReceive(String),

    #[error("Audio playback error: {0}")]
    Playback(String),

    #[error("Audio decode error: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("STT error: {0}")]
    Stt(String),

    #[error("TTS error: {0}")]
    Tts(String),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<cpal::DevicesError> for VoiceError {
    fn from(err: cpal::DevicesError) -> Self {
        VoiceError::AudioDevice(err.to_string())
    }
}

impl From<cpal::DefaultStreamConfigError> for VoiceError {
    fn from(err: cpal::DefaultStreamConfigError) -> Self {
        VoiceError::AudioDevice(err.to_string())
    }
}

impl From<cpal::BuildStreamError> for VoiceError {
    fn from(err: cpal::BuildStreamError) -> Self {
        VoiceError::AudioStream(err.to_string())
    }
}

impl From<cpal::PlayStreamError> for VoiceError {
    fn from(err: cpal::PlayStreamError) -> Self {
        VoiceError::AudioStream(err.to_string())
    }
}

/// Classify backend failures for the session: anything on the listening side
/// becomes a (non-fatal) capture or transcription error.
impl From<VoiceError> for DinError {
    fn from(err: VoiceError) -> Self {
        match err {
            VoiceError::AudioDevice(m)
            | VoiceError::AudioStream(m)
            | VoiceError::ChannelReceive(m) => DinError::Capture(m),
            VoiceError::Wav(e) => DinError::Capture(e.to_string()),
            VoiceError::Playback(m) => DinError::Playback(m),
            VoiceError::Decode(m) | VoiceError::Tts(m) => DinError::Vocalizer(m),
            VoiceError::Stt(m) => DinError::Transcription(m),
            VoiceError::Config(m) => DinError::Config(m),
            VoiceError::Io(e) => DinError::Io(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listening_failures_map_to_non_fatal() {
        let e: DinError = VoiceError::AudioStream("overrun".into()).into();
        assert!(matches!(e, DinError::Capture(_)));
        assert!(!e.is_fatal());
        let e: DinError = VoiceError::Stt("503".into()).into();
        assert!(matches!(e, DinError::Transcription(_)));
    }

    #[test]
    fn output_failures_stay_fatal() {
        let e: DinError = VoiceError::Playback("no sink".into()).into();
        assert!(e.is_fatal());
        let e: DinError = VoiceError::Tts("401".into()).into();
        assert!(matches!(e, DinError::Vocalizer(_)));
    }
}
