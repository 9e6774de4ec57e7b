//! Masking noise generation.

use crate::config::{NoiseConfig, NoiseKind};
use crate::error::{DinError, DinResult};
use crate::waveform::Waveform;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use tracing::debug;

/// Produces a noise buffer for a signal at a target SNR.
pub trait NoiseGenerator {
    /// Noise with the same length and rate as `signal`, scaled so that
    /// signal RMS over noise RMS equals `snr_db`.
    fn generate_noise(&mut self, signal: &Waveform, snr_db: f64) -> DinResult<Waveform>;
}

/// Noise RMS that puts a signal of RMS `signal_rms` at `snr_db`.
pub fn noise_rms_for(signal_rms: f64, snr_db: f64) -> f64 {
    signal_rms / 10f64.powf(snr_db / 20.0)
}

/// Gaussian white noise.
pub struct WhiteNoise {
    rng: Pcg32,
}

impl WhiteNoise {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => Pcg32::seed_from_u64(s),
            None => Pcg32::from_entropy(),
        };
        Self { rng }
    }

    /// Standard normal sample (Box-Muller).
    fn gaussian(&mut self) -> f64 {
        let u1: f64 = self.rng.gen_range(f64::EPSILON..1.0);
        let u2: f64 = self.rng.gen();
        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }

    /// Unscaled noise of a fixed length; used for calibration playback.
    pub fn raw(&mut self, len: usize, scale: f64, sample_rate: u32) -> Waveform {
        let samples = (0..len).map(|_| (self.gaussian() * scale) as f32).collect();
        Waveform::new(samples, sample_rate)
    }
}

impl NoiseGenerator for WhiteNoise {
    fn generate_noise(&mut self, signal: &Waveform, snr_db: f64) -> DinResult<Waveform> {
        if !snr_db.is_finite() {
            return Err(DinError::Noise(format!("SNR must be finite, got {}", snr_db)));
        }
        let signal_rms = signal.rms();
        if signal_rms == 0.0 {
            // Zero signal power scales the noise to zero as well.
            debug!("silent stimulus; generating silent noise");
            return Ok(Waveform::silence(signal.len(), signal.sample_rate));
        }
        let mut noise = self.raw(signal.len(), 1.0, signal.sample_rate);
        // Normalise to the exact RMS rather than trusting the sample variance.
        let gain = noise_rms_for(signal_rms, snr_db) / noise.rms().max(f64::MIN_POSITIVE);
        for s in noise.samples.iter_mut() {
            *s = (*s as f64 * gain) as f32;
        }
        Ok(noise)
    }
}

pub fn build_noise_generator(config: &NoiseConfig) -> Box<dyn NoiseGenerator> {
    match config.kind {
        NoiseKind::White => Box::new(WhiteNoise::new(config.seed)),
    }
}
