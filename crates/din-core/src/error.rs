//! Error types for the digit-in-noise test

use thiserror::Error;

/// Result type alias for hearing test operations
pub type DinResult<T> = Result<T, DinError>;

/// Errors that can occur while configuring or running a hearing test
#[derive(Error, Debug)]
pub enum DinError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration load error: {0}")]
    ConfigLoad(#[from] config::ConfigError),

    #[error("Waveform error: {0}")]
    Waveform(String),

    #[error("Vocalizer error: {0}")]
    Vocalizer(String),

    #[error("Noise generation error: {0}")]
    Noise(String),

    #[error("Audio playback error: {0}")]
    Playback(String),

    #[error("Response capture error: {0}")]
    Capture(String),

    #[error("Transcription error: {0}")]
    Transcription(String),

    /// `threshold_estimate` was queried before any reversal was recorded.
    #[error("No reversals recorded; threshold estimate is undefined")]
    NoReversals,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DinError {
    /// Whether this error should end the run. Capture and transcription
    /// failures only cost the current trial.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, DinError::Capture(_) | DinError::Transcription(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_failures_are_not_fatal() {
        assert!(!DinError::Capture("mic unplugged".into()).is_fatal());
        assert!(!DinError::Transcription("timeout".into()).is_fatal());
        assert!(DinError::Playback("no sink".into()).is_fatal());
        assert!(DinError::NoReversals.is_fatal());
    }

    #[test]
    fn display_includes_context() {
        let e = DinError::Config("step_size is empty".into());
        assert_eq!(e.to_string(), "Configuration error: step_size is empty");
    }
}
