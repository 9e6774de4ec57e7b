//! Vocalizers: stimulus text to speech waveforms.
//!
//! `ClipVocalizer` concatenates prerecorded per-word WAV files; `ApiVocalizer`
//! synthesizes through an OpenAI-compatible `/audio/speech` endpoint.

use crate::error::{VoiceError, VoiceResult};
use crate::playback::decode_audio;
use crate::recorder::read_wav;
use din_core::{DinError, DinResult, Vocalizer, Waveform};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Backend that turns text into encoded audio bytes (WAV/MP3).
pub trait TtsBackend: Send + Sync {
    fn synthesize(&self, text: &str) -> VoiceResult<Vec<u8>>;
}

/// OpenAI-compatible speech synthesis.
/// Reads `TTS_API_URL`, `TTS_API_KEY` (or `OPENAI_API_KEY`), `TTS_MODEL` and `TTS_VOICE`.
#[derive(Debug, Clone)]
pub struct ApiTts {
    pub base_url: String,
    pub api_key: String,
    /// tts-1 (fast) or tts-1-hd.
    pub model: String,
    pub voice: String,
    client: reqwest::blocking::Client,
}

impl ApiTts {
    pub fn from_env() -> VoiceResult<Self> {
        let base_url = std::env::var("TTS_API_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
        let api_key = std::env::var("TTS_API_KEY")
            .or_else(|_| std::env::var("OPENAI_API_KEY"))
            .map_err(|_| {
                VoiceError::Config("TTS requires TTS_API_KEY or OPENAI_API_KEY".to_string())
            })?;
        let model = std::env::var("TTS_MODEL").unwrap_or_else(|_| "tts-1".to_string());
        let voice = std::env::var("TTS_VOICE").unwrap_or_else(|_| "alloy".to_string());
        Self::new(base_url, api_key, model, voice)
    }

    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        voice: impl Into<String>,
    ) -> VoiceResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| VoiceError::Tts(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            voice: voice.into(),
            client,
        })
    }
}

impl TtsBackend for ApiTts {
    fn synthesize(&self, text: &str) -> VoiceResult<Vec<u8>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!("{}/audio/speech", self.base_url.trim_end_matches('/'));
        let body = serde_json::json!({
            "model": self.model,
            "input": text,
            "voice": self.voice,
            "response_format": "wav",
        });
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| VoiceError::Tts(e.to_string()))?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().unwrap_or_default();
            return Err(VoiceError::Tts(format!("TTS API error {}: {}", status, body)));
        }
        let bytes = res.bytes().map_err(|e| VoiceError::Tts(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

/// Speaks stimuli through a `TtsBackend`, resampled to the playback rate.
pub struct ApiVocalizer {
    tts: Box<dyn TtsBackend>,
    sample_rate: u32,
}

impl ApiVocalizer {
    pub fn new(tts: Box<dyn TtsBackend>, sample_rate: u32) -> Self {
        Self { tts, sample_rate }
    }
}

impl Vocalizer for ApiVocalizer {
    fn vocalize(&self, text: &str) -> DinResult<Waveform> {
        let bytes = self.tts.synthesize(text)?;
        if bytes.is_empty() {
            return Ok(Waveform::silence(0, self.sample_rate));
        }
        let wave = decode_audio(&bytes)?;
        debug!(text, secs = wave.duration_secs(), "synthesized stimulus");
        Ok(wave.resampled(self.sample_rate))
    }
}

/// Concatenates `<word>.wav` clips from a directory with a short gap between words.
#[derive(Debug)]
pub struct ClipVocalizer {
    clips: HashMap<String, Waveform>,
    gap: Duration,
    sample_rate: u32,
}

impl ClipVocalizer {
    /// Load every `*.wav` in `dir`, keyed by lowercase file stem.
    pub fn load(dir: &Path, gap: Duration, sample_rate: u32) -> VoiceResult<Self> {
        if !dir.is_dir() {
            return Err(VoiceError::Config(format!(
                "clip directory not found: {}",
                dir.display()
            )));
        }
        let mut clips = HashMap::new();
        for entry in std::fs::read_dir(dir)? {
            let path: PathBuf = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("wav") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let wave = read_wav(&path)?.resampled(sample_rate);
            clips.insert(stem.to_lowercase(), wave);
        }
        info!("Loaded {} stimulus clips from {}", clips.len(), dir.display());
        Ok(Self {
            clips,
            gap,
            sample_rate,
        })
    }

    pub fn has_word(&self, word: &str) -> bool {
        self.clips.contains_key(&word.to_lowercase())
    }

    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.clips.keys().map(String::as_str)
    }
}

impl Vocalizer for ClipVocalizer {
    fn vocalize(&self, text: &str) -> DinResult<Waveform> {
        let gap_len = (self.gap.as_secs_f64() * self.sample_rate as f64).round() as usize;
        let gap = Waveform::silence(gap_len, self.sample_rate);
        let mut out = Waveform::silence(0, self.sample_rate);
        for (i, word) in text.split_whitespace().enumerate() {
            let key = word
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase();
            let clip = self
                .clips
                .get(&key)
                .ok_or_else(|| DinError::Vocalizer(format!("no clip for word '{}'", word)))?;
            if i > 0 {
                out.append(&gap)?;
            }
            out.append(clip)?;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::write_wav;

    fn clip_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        write_wav(&dir.path().join("one.wav"), &Waveform::new(vec![0.5; 100], 1000)).unwrap();
        write_wav(&dir.path().join("two.wav"), &Waveform::new(vec![-0.5; 50], 1000)).unwrap();
        std::fs::write(dir.path().join("README"), b"clips").unwrap();
        dir
    }

    #[test]
    fn clips_concatenate_with_gaps() {
        let dir = clip_dir();
        let v = ClipVocalizer::load(dir.path(), Duration::from_millis(10), 1000).unwrap();
        let w = v.vocalize("One two one").unwrap();
        // 100 + 10 + 50 + 10 + 100
        assert_eq!(w.len(), 270);
        assert_eq!(w.sample_rate, 1000);
        assert_eq!(w.samples[105], 0.0);
    }

    #[test]
    fn clips_resample_to_output_rate() {
        let dir = clip_dir();
        let v = ClipVocalizer::load(dir.path(), Duration::ZERO, 2000).unwrap();
        let w = v.vocalize("two").unwrap();
        assert_eq!(w.sample_rate, 2000);
        assert!((w.len() as i64 - 100).abs() <= 1);
    }

    #[test]
    fn unknown_word_is_a_vocalizer_error() {
        let dir = clip_dir();
        let v = ClipVocalizer::load(dir.path(), Duration::ZERO, 1000).unwrap();
        assert!(matches!(v.vocalize("one seven"), Err(DinError::Vocalizer(_))));
    }

    #[test]
    fn missing_directory_fails_to_load() {
        let err = ClipVocalizer::load(Path::new("/nonexistent/clips"), Duration::ZERO, 1000);
        assert!(matches!(err, Err(VoiceError::Config(_))));
    }

    struct WavTts;

    impl TtsBackend for WavTts {
        fn synthesize(&self, _text: &str) -> VoiceResult<Vec<u8>> {
            crate::recorder::encode_wav(&[0.25; 160], 16000)
        }
    }

    #[test]
    fn api_vocalizer_decodes_and_resamples() {
        let v = ApiVocalizer::new(Box::new(WavTts), 8000);
        let w = v.vocalize("three").unwrap();
        assert_eq!(w.sample_rate, 8000);
        assert!((w.len() as i64 - 80).abs() <= 1);
    }
}
