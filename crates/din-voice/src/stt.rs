//! Speech-to-text backends for spoken responses.
//!
//! `create_best_stt` picks local Whisper when a model is configured, then an
//! OpenAI-compatible transcription API. Having neither is a configuration
//! error: spoken answers must never be scored from stand-in text.

use crate::error::{VoiceError, VoiceResult};
use crate::recorder::encode_wav;
use din_core::Waveform;
use tracing::debug;

/// Converts a recorded response into text.
pub trait SttBackend: Send + Sync {
    /// Transcribe a mono clip; return an empty string if nothing was said.
    fn transcribe(&self, clip: &Waveform) -> VoiceResult<String>;

    fn name(&self) -> &'static str;
}

/// Returns a fixed transcript, or nothing. Useful for exercising the speech
/// path offline; without a scripted response every answer is empty.
#[derive(Debug, Default)]
pub struct PlaceholderStt {
    pub response: Option<String>,
}

impl PlaceholderStt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(s: impl Into<String>) -> Self {
        Self {
            response: Some(s.into()),
        }
    }
}

impl SttBackend for PlaceholderStt {
    fn transcribe(&self, clip: &Waveform) -> VoiceResult<String> {
        debug!(samples = clip.len(), "placeholder transcription");
        Ok(self.response.clone().unwrap_or_default())
    }

    fn name(&self) -> &'static str {
        "placeholder"
    }
}

/// OpenAI-compatible transcription API (OpenAI Whisper, OpenRouter, etc.).
/// Reads `STT_API_URL`, `STT_API_KEY` (or `OPENAI_API_KEY`) and `STT_MODEL`.
#[derive(Debug, Clone)]
pub struct ApiStt {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    client: reqwest::blocking::Client,
}

impl ApiStt {
    pub fn from_env() -> VoiceResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key/value source with the same names as the environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> VoiceResult<Self> {
        let base_url = lookup("STT_API_URL")
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string());
        let api_key = lookup("STT_API_KEY")
            .or_else(|| lookup("OPENAI_API_KEY"))
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                VoiceError::Config("STT requires STT_API_KEY or OPENAI_API_KEY".to_string())
            })?;
        let model = lookup("STT_MODEL").unwrap_or_else(|| "whisper-1".to_string());
        Self::new(base_url, api_key, model)
    }

    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> VoiceResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| VoiceError::Stt(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            client,
        })
    }
}

impl SttBackend for ApiStt {
    fn transcribe(&self, clip: &Waveform) -> VoiceResult<String> {
        if clip.is_empty() {
            return Ok(String::new());
        }
        let wav = encode_wav(&clip.samples, clip.sample_rate)?;
        let url = format!("{}/audio/transcriptions", self.base_url.trim_end_matches('/'));
        let part = reqwest::blocking::multipart::Part::bytes(wav)
            .file_name("response.wav")
            .mime_str("audio/wav")
            .map_err(|e| VoiceError::Stt(e.to_string()))?;
        let form = reqwest::blocking::multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone())
            .text("language", "en");
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .map_err(|e| VoiceError::Stt(e.to_string()))?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().unwrap_or_default();
            return Err(VoiceError::Stt(format!("STT API error {}: {}", status, body)));
        }
        let json: serde_json::Value = res.json().map_err(|e| VoiceError::Stt(e.to_string()))?;
        Ok(json
            .get("text")
            .and_then(|t| t.as_str())
            .unwrap_or("")
            .trim()
            .to_string())
    }

    fn name(&self) -> &'static str {
        "api"
    }
}

#[cfg(feature = "whisper")]
mod whisper_stt {
    use super::*;
    use std::sync::Mutex;
    use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

    const WHISPER_RATE: u32 = 16000;

    /// On-device Whisper over a ggml model file (e.g. ggml-base.en.bin).
    pub struct WhisperStt {
        #[allow(dead_code)]
        context: WhisperContext,
        state: Mutex<whisper_rs::WhisperState>,
    }

    impl WhisperStt {
        pub fn new(model_path: &str) -> VoiceResult<Self> {
            let context =
                WhisperContext::new_with_params(model_path, WhisperContextParameters::default())
                    .map_err(|e| VoiceError::Stt(format!("Whisper load failed: {}", e)))?;
            let state = context
                .create_state()
                .map_err(|e| VoiceError::Stt(format!("Whisper state init failed: {}", e)))?;
            Ok(Self {
                context,
                state: Mutex::new(state),
            })
        }

        /// `WHISPER_MODEL_PATH` must point to a model file.
        pub fn from_env() -> VoiceResult<Self> {
            Self::from_lookup(|key| std::env::var(key).ok())
        }

        pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> VoiceResult<Self> {
            let path = lookup("WHISPER_MODEL_PATH")
                .ok_or_else(|| VoiceError::Config("WHISPER_MODEL_PATH not set".to_string()))?;
            let path = path.trim();
            if path.is_empty() {
                return Err(VoiceError::Config("WHISPER_MODEL_PATH is empty".to_string()));
            }
            Self::new(path)
        }
    }

    impl SttBackend for WhisperStt {
        fn transcribe(&self, clip: &Waveform) -> VoiceResult<String> {
            if clip.is_empty() {
                return Ok(String::new());
            }
            let clip = clip.resampled(WHISPER_RATE);
            let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
            params.set_print_progress(false);
            params.set_print_realtime(false);
            params.set_no_timestamps(true);
            params.set_language(Some("en"));

            let mut state = self
                .state
                .lock()
                .map_err(|e| VoiceError::Stt(format!("Whisper lock poisoned: {}", e)))?;
            state
                .full(params, &clip.samples)
                .map_err(|e| VoiceError::Stt(format!("Whisper inference failed: {}", e)))?;
            let text = state
                .as_iter()
                .filter_map(|seg| seg.to_str().ok())
                .collect::<Vec<_>>()
                .join(" ")
                .trim()
                .to_string();
            Ok(text)
        }

        fn name(&self) -> &'static str {
            "whisper"
        }
    }
}

#[cfg(feature = "whisper")]
pub use whisper_stt::WhisperStt;

/// Best available backend from the environment: Whisper (feature +
/// `WHISPER_MODEL_PATH`), then the transcription API. Errors when neither is
/// usable.
pub fn create_best_stt() -> VoiceResult<Box<dyn SttBackend>> {
    best_stt_from(|key| std::env::var(key).ok())
}

/// `create_best_stt` over an explicit key/value source.
pub fn best_stt_from(
    lookup: impl Fn(&str) -> Option<String>,
) -> VoiceResult<Box<dyn SttBackend>> {
    #[cfg(feature = "whisper")]
    {
        match WhisperStt::from_lookup(&lookup) {
            Ok(w) => return Ok(Box::new(w)),
            Err(e) => debug!("Whisper unavailable: {}", e),
        }
    }
    match ApiStt::from_lookup(&lookup) {
        Ok(api) => Ok(Box::new(api)),
        Err(e) => Err(VoiceError::Config(format!(
            "no speech recognizer available for spoken responses ({})",
            e
        ))),
    }
}
