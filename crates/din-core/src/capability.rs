//! Collaborator interfaces the session drives each trial.
//!
//! Concrete device and network backends live in `din-voice`; tests plug in
//! scripted fakes.

use crate::error::DinResult;
use crate::waveform::Waveform;
use std::time::Duration;

/// Turns stimulus text into a mono waveform.
pub trait Vocalizer {
    fn vocalize(&self, text: &str) -> DinResult<Waveform>;
}

/// Plays a waveform and returns once playback has finished.
pub trait Playback {
    fn play(&self, wave: &Waveform) -> DinResult<()>;
}

/// Obtains the participant's answer as text.
///
/// A timeout is not an error: return whatever was heard, possibly nothing.
/// `Capture` and `Transcription` errors cost only the current trial; any
/// other error ends the run.
pub trait ResponseCapturer {
    fn respond(&mut self) -> DinResult<String>;
}

/// Fixed-length silence in place of speech. For dry runs without audio assets.
#[derive(Debug, Clone)]
pub struct SilentVocalizer {
    pub duration: Duration,
    pub sample_rate: u32,
}

impl Default for SilentVocalizer {
    fn default() -> Self {
        Self {
            duration: Duration::from_millis(1500),
            sample_rate: 22050,
        }
    }
}

impl Vocalizer for SilentVocalizer {
    fn vocalize(&self, _text: &str) -> DinResult<Waveform> {
        let len = (self.duration.as_secs_f64() * self.sample_rate as f64) as usize;
        Ok(Waveform::silence(len, self.sample_rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_vocalizer_length() {
        let v = SilentVocalizer {
            duration: Duration::from_millis(500),
            sample_rate: 16000,
        };
        let w = v.vocalize("one two three").unwrap();
        assert_eq!(w.len(), 8000);
        assert_eq!(w.rms(), 0.0);
    }
}
