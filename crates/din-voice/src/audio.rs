//! Microphone capture using CPAL.
//!
//! The input stream pushes fixed-size chunks into a tokio channel from the
//! audio callback thread; the recorder drains that channel on the test thread.

use crate::error::{VoiceError, VoiceResult};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use din_core::CaptureConfig;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Audio chunk sent from the capture thread
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Audio samples (f32, normalized to -1.0 to 1.0)
    pub samples: Vec<f32>,

    /// Timestamp when captured
    pub timestamp: std::time::Instant,
}

/// Audio capture from the default input device
pub struct AudioCapture {
    chunk: usize,
    device: Device,
    stream_config: StreamConfig,
}

impl AudioCapture {
    /// Open the default input device, mono at the configured rate
    pub fn new(config: &CaptureConfig) -> VoiceResult<Self> {
        let device = cpal::default_host()
            .default_input_device()
            .ok_or_else(|| VoiceError::AudioDevice("No input device available".to_string()))?;

        info!(
            "Using input device: {} ({}Hz mono)",
            device.name().unwrap_or_else(|_| "Unknown".to_string()),
            config.sample_rate
        );

        // Fails early when no input config can be negotiated at all
        let _ = device.default_input_config()?;

        let stream_config = StreamConfig {
            channels: 1,
            sample_rate: cpal::SampleRate(config.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        Ok(Self {
            chunk: config.chunk,
            device,
            stream_config,
        })
    }

    /// Start capturing and send `chunk`-sized blocks to the channel.
    /// Capture stops when the returned stream is dropped.
    pub fn start_capture(
        self,
        chunk_tx: mpsc::UnboundedSender<AudioChunk>,
    ) -> VoiceResult<Stream> {
        let chunk = self.chunk;
        let mut sample_buffer = Vec::with_capacity(chunk);

        let stream = self.device.build_input_stream(
            &self.stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                for &sample in data {
                    sample_buffer.push(sample);
                    if sample_buffer.len() >= chunk {
                        let samples =
                            std::mem::replace(&mut sample_buffer, Vec::with_capacity(chunk));
                        let block = AudioChunk {
                            samples,
                            timestamp: std::time::Instant::now(),
                        };
                        // Receiver gone means listening finished; drop the rest.
                        let _ = chunk_tx.send(block);
                    }
                }
            },
            move |err| {
                warn!("Audio stream error: {}", err);
            },
            None,
        )?;

        stream.play()?;
        Ok(stream)
    }

    /// List available input devices
    pub fn list_input_devices() -> VoiceResult<Vec<String>> {
        let host = cpal::default_host();
        let devices = host.input_devices()?;
        Ok(devices.filter_map(|d| d.name().ok()).collect())
    }

    /// List available output devices
    pub fn list_output_devices() -> VoiceResult<Vec<String>> {
        let host = cpal::default_host();
        let devices = host.output_devices()?;
        Ok(devices.filter_map(|d| d.name().ok()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_devices() {
        // This might fail in CI environments without audio devices
        if let Ok(devices) = AudioCapture::list_input_devices() {
            println!("Available input devices: {:?}", devices);
        }
    }
}
