//! Speaker output through a `rodio::Sink`.

use crate::error::{VoiceError, VoiceResult};
use din_core::{DinResult, Playback, Waveform};
use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, OutputStreamHandle, Sink, Source};
use std::io::Cursor;
use tracing::{debug, info};

/// Plays mixed stimuli on the default output device and blocks until done.
pub struct SpeakerPlayback {
    _stream: OutputStream,
    _stream_handle: OutputStreamHandle,
    sink: Sink,
}

impl SpeakerPlayback {
    /// Open the default output device.
    pub fn new() -> VoiceResult<Self> {
        let (stream, stream_handle) =
            OutputStream::try_default().map_err(|e| VoiceError::Playback(e.to_string()))?;
        let sink =
            Sink::try_new(&stream_handle).map_err(|e| VoiceError::Playback(e.to_string()))?;
        info!("SpeakerPlayback: sink ready");
        Ok(Self {
            _stream: stream,
            _stream_handle: stream_handle,
            sink,
        })
    }

    /// Queue a waveform without waiting for it to finish.
    pub fn enqueue(&self, wave: &Waveform) {
        if wave.is_empty() {
            return;
        }
        // The sink does not clip; samples past full scale would wrap on some backends.
        let samples: Vec<f32> = wave.samples.iter().map(|s| s.clamp(-1.0, 1.0)).collect();
        self.sink
            .append(SamplesBuffer::new(1, wave.sample_rate, samples));
    }

    /// Stop playback immediately and clear the queue.
    pub fn stop(&self) {
        self.sink.stop();
    }

    pub fn sleep_until_end(&self) {
        self.sink.sleep_until_end();
    }
}

impl Playback for SpeakerPlayback {
    fn play(&self, wave: &Waveform) -> DinResult<()> {
        debug!(
            samples = wave.len(),
            secs = wave.duration_secs(),
            "playing stimulus"
        );
        self.enqueue(wave);
        self.sleep_until_end();
        Ok(())
    }
}

/// Decode WAV/MP3 bytes into a mono waveform at the file's own rate.
pub fn decode_audio(bytes: &[u8]) -> VoiceResult<Waveform> {
    if bytes.is_empty() {
        return Err(VoiceError::Decode("empty audio payload".to_string()));
    }
    let source = rodio::Decoder::new(Cursor::new(bytes.to_vec()))
        .map_err(|e| VoiceError::Decode(format!("Decode failed: {}", e)))?;
    let channels = source.channels().max(1) as usize;
    let sample_rate = source.sample_rate();
    let interleaved: Vec<f32> = source.convert_samples::<f32>().collect();
    Ok(Waveform::new(downmix(&interleaved, channels), sample_rate))
}

/// Average interleaved frames down to one channel.
pub(crate) fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downmix_averages_frames() {
        let stereo = [1.0, 0.0, 0.5, 0.5, -1.0, 1.0];
        assert_eq!(downmix(&stereo, 2), vec![0.5, 0.5, 0.0]);
        assert_eq!(downmix(&stereo, 1), stereo.to_vec());
    }

    #[test]
    fn decode_rejects_empty_payload() {
        assert!(matches!(decode_audio(&[]), Err(VoiceError::Decode(_))));
    }

    #[test]
    fn decode_reads_wav_bytes() {
        let bytes = crate::recorder::encode_wav(&[0.0, 0.5, -0.5, 0.25], 16000).unwrap();
        let wave = decode_audio(&bytes).unwrap();
        assert_eq!(wave.sample_rate, 16000);
        assert_eq!(wave.len(), 4);
        assert!((wave.samples[1] - 0.5).abs() < 1e-3);
    }

    #[test]
    #[ignore] // needs an output device
    fn plays_a_short_tone() {
        let playback = SpeakerPlayback::new().unwrap();
        let tone = din_core::waveform::calibration_tone(1000.0, 0.1, 0.2, 22050);
        playback.play(&tone).unwrap();
    }
}
