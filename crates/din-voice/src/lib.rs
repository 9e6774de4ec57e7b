//! # DIN Voice - audio devices, speech synthesis and recognition
//!
//! Concrete backends for the `din-core` capability traits.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                     din-voice backends                    │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐     │
//! │  │ClipVocalizer │  │ApiVocalizer  │→ │SpeakerPlaybck│     │
//! │  │ (hound wav)  │  │ (TTS + rodio)│  │   (rodio)    │     │
//! │  └──────────────┘  └──────────────┘  └──────────────┘     │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐     │
//! │  │ AudioCapture │→ │   Recorder   │→ │ SttBackend   │     │
//! │  │    (cpal)    │  │ (RMS gate)   │  │(whisper/api) │     │
//! │  └──────────────┘  └──────────────┘  └──────────────┘     │
//! └───────────────────────────────────────────────────────────┘
//! ```

pub mod audio;
pub mod backends;
pub mod error;
pub mod playback;
pub mod recorder;
pub mod respond;
pub mod stt;
pub mod vocalizer;

pub use audio::{AudioCapture, AudioChunk};
pub use backends::{build_parts, build_responder, build_vocalizer};
pub use error::{VoiceError, VoiceResult};
pub use playback::{decode_audio, SpeakerPlayback};
pub use recorder::{read_wav, write_wav, ListenGate, Recorder};
pub use respond::{CliResponder, SpeechResponder};
#[cfg(feature = "whisper")]
pub use stt::WhisperStt;
pub use stt::{create_best_stt, ApiStt, PlaceholderStt, SttBackend};
pub use vocalizer::{ApiTts, ApiVocalizer, ClipVocalizer, TtsBackend};
