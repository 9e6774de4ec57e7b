//! Mono PCM buffers and the level arithmetic the session needs.

use crate::error::{DinError, DinResult};

/// Mono f32 samples (-1.0..1.0) at a fixed rate.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl Waveform {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self { samples, sample_rate }
    }

    pub fn silence(len: usize, sample_rate: u32) -> Self {
        Self::new(vec![0.0; len], sample_rate)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Root-mean-square amplitude; 0.0 for an empty buffer.
    pub fn rms(&self) -> f64 {
        rms_amplitude(&self.samples)
    }

    /// Zero-pad `pad` samples on both ends.
    pub fn padded(&self, pad: usize) -> Self {
        let mut samples = Vec::with_capacity(self.samples.len() + 2 * pad);
        samples.resize(pad, 0.0);
        samples.extend_from_slice(&self.samples);
        samples.resize(samples.len() + pad, 0.0);
        Self::new(samples, self.sample_rate)
    }

    /// Sample-aligned sum. Both buffers must share length and rate.
    pub fn mix(&self, other: &Waveform) -> DinResult<Waveform> {
        if self.sample_rate != other.sample_rate {
            return Err(DinError::Waveform(format!(
                "sample rate mismatch: {} Hz vs {} Hz",
                self.sample_rate, other.sample_rate
            )));
        }
        if self.samples.len() != other.samples.len() {
            return Err(DinError::Waveform(format!(
                "length mismatch: {} vs {} samples",
                self.samples.len(),
                other.samples.len()
            )));
        }
        let samples = self
            .samples
            .iter()
            .zip(&other.samples)
            .map(|(a, b)| a + b)
            .collect();
        Ok(Waveform::new(samples, self.sample_rate))
    }

    /// Append another buffer at the same rate.
    pub fn append(&mut self, other: &Waveform) -> DinResult<()> {
        if self.sample_rate != other.sample_rate {
            return Err(DinError::Waveform(format!(
                "cannot append {} Hz audio to {} Hz buffer",
                other.sample_rate, self.sample_rate
            )));
        }
        self.samples.extend_from_slice(&other.samples);
        Ok(())
    }

    /// Linear-interpolation resample. Returns a clone when the rate already matches.
    pub fn resampled(&self, target_rate: u32) -> Waveform {
        if target_rate == 0 || self.sample_rate == 0 {
            return self.clone();
        }
        if target_rate == self.sample_rate || self.samples.is_empty() {
            return Waveform::new(self.samples.clone(), target_rate);
        }
        let ratio = self.sample_rate as f64 / target_rate as f64;
        let out_len = ((self.samples.len() as f64) / ratio).round().max(1.0) as usize;
        let last = self.samples.len() - 1;
        let samples = (0..out_len)
            .map(|i| {
                let pos = i as f64 * ratio;
                let idx = (pos.floor() as usize).min(last);
                let next = (idx + 1).min(last);
                let frac = (pos - idx as f64) as f32;
                self.samples[idx] * (1.0 - frac) + self.samples[next] * frac
            })
            .collect();
        Waveform::new(samples, target_rate)
    }

    /// Largest absolute sample value.
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |m, s| m.max(s.abs()))
    }
}

/// Root-mean-square amplitude of a sample slice.
pub fn rms_amplitude(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum_sq / samples.len() as f64).sqrt()
}

/// SNR in dB of `signal` relative to `noise`, from mean power.
pub fn calculate_snr_db(signal: &[f32], noise: &[f32]) -> f64 {
    let power = |x: &[f32]| {
        if x.is_empty() {
            0.0
        } else {
            x.iter().map(|&s| (s as f64) * (s as f64)).sum::<f64>() / x.len() as f64
        }
    };
    10.0 * (power(signal) / power(noise)).log10()
}

/// Sine reference tone for level calibration.
pub fn calibration_tone(
    frequency_hz: f64,
    amplitude: f32,
    secs: f64,
    sample_rate: u32,
) -> Waveform {
    let n = (secs * sample_rate as f64).round() as usize;
    let samples = (0..n)
        .map(|i| {
            let t = i as f64 / sample_rate as f64;
            amplitude * (2.0 * std::f64::consts::PI * frequency_hz * t).sin() as f32
        })
        .collect();
    Waveform::new(samples, sample_rate)
}
