//! The trial loop.
//!
//! A `HearingTest` owns the staircase, the per-level tallies and every
//! collaborator for one run. Each trial is strictly sequential: stimulus,
//! vocalize, mix with noise at the current SNR, play (blocking), capture the
//! answer (blocking), score, update the SNR.

use crate::capability::{Playback, ResponseCapturer, Vocalizer};
use crate::config::DinConfig;
use crate::error::DinResult;
use crate::noise::NoiseGenerator;
use crate::staircase::SnrController;
use crate::stimulus::StimulusSource;
use crate::trial_log::{TrialEvent, TrialLog};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Collaborators a session is built from. Each is owned for the run's lifetime.
pub struct TestParts {
    pub stimuli: Box<dyn StimulusSource>,
    pub vocalizer: Box<dyn Vocalizer>,
    pub noise: Box<dyn NoiseGenerator>,
    pub playback: Box<dyn Playback>,
    pub responder: Box<dyn ResponseCapturer>,
}

/// Outcome of a single trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    /// 1-based trial number.
    pub index: usize,
    pub prompt: String,
    pub response: String,
    pub correct: bool,
    /// SNR the stimulus was played at.
    pub snr_db: f64,
    /// SNR for the next trial.
    pub next_snr_db: f64,
    pub reversal_count: u32,
    pub capture_error: Option<String>,
}

/// Final result of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestReport {
    /// Speech-reception threshold estimate in dB SNR.
    pub srt_db: f64,
    pub reversals: Vec<f64>,
    pub trials: usize,
    pub final_snr_db: f64,
    /// The trial cap ended the run before the stop rule did.
    pub stopped_early: bool,
}

pub struct HearingTest {
    controller: SnrController,
    parts: TestParts,
    log: TrialLog,
    pad_samples: usize,
    max_trials: usize,

    snr_db: f64,
    correct_count: u32,
    incorrect_count: u32,
    trials: usize,
}

impl HearingTest {
    pub fn new(config: &DinConfig, parts: TestParts) -> DinResult<Self> {
        let controller = SnrController::new(&config.test)?;
        Ok(Self {
            controller,
            parts,
            log: TrialLog::disabled(),
            pad_samples: config.audio.pad_samples,
            max_trials: config.test.max_trials,
            snr_db: config.test.start_snr,
            correct_count: 0,
            incorrect_count: 0,
            trials: 0,
        })
    }

    pub fn with_trial_log(mut self, log: TrialLog) -> Self {
        self.log = log;
        self
    }

    pub fn snr_db(&self) -> f64 {
        self.snr_db
    }

    /// (correct, incorrect) tallies at the current level.
    pub fn counts(&self) -> (u32, u32) {
        (self.correct_count, self.incorrect_count)
    }

    pub fn trials(&self) -> usize {
        self.trials
    }

    pub fn controller(&self) -> &SnrController {
        &self.controller
    }

    /// Run trials until the staircase stops (or the trial cap is hit) and
    /// report the threshold estimate.
    pub fn run(&mut self) -> DinResult<TestReport> {
        info!(
            start_snr_db = self.snr_db,
            max_trials = self.max_trials,
            "Starting digit-in-noise test"
        );

        let mut stopped_early = false;
        while !self.controller.should_stop() {
            if self.trials >= self.max_trials {
                warn!(
                    trials = self.trials,
                    reversal_count = self.controller.reversal_count(),
                    "Trial cap reached before the stop rule; estimating from available reversals"
                );
                stopped_early = true;
                break;
            }
            self.run_trial()?;
        }

        let srt_db = self.controller.threshold_estimate()?;
        let reversals = self.controller.reversals().to_vec();
        self.log.record(TrialEvent::TestFinished {
            trials: self.trials,
            srt_db,
            reversals: reversals.clone(),
        })?;
        info!(srt_db, trials = self.trials, "Test finished");

        Ok(TestReport {
            srt_db,
            reversals,
            trials: self.trials,
            final_snr_db: self.snr_db,
            stopped_early,
        })
    }

    /// Present one stimulus, score the answer and update the SNR.
    pub fn run_trial(&mut self) -> DinResult<TrialRecord> {
        self.trials += 1;
        let trial = self.trials;
        let snr_db = self.snr_db;

        let stimulus = self.parts.stimuli.get_stimuli();
        info!(trial, snr_db, prompt = %stimulus.prompt, "Presenting stimulus");
        self.log.record(TrialEvent::StimulusPresented {
            trial,
            prompt: stimulus.prompt.clone(),
            snr_db,
        })?;
        self.present(&stimulus.prompt)?;

        let (response, capture_error) = match self.parts.responder.respond() {
            Ok(text) => (text, None),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(trial, error = %e, "Response capture failed; scoring as incorrect");
                (String::new(), Some(e.to_string()))
            }
        };
        debug!(trial, response = %response, "Response received");
        self.log.record(TrialEvent::ResponseReceived {
            trial,
            response: response.clone(),
            error: capture_error.clone(),
        })?;

        let correct = capture_error.is_none() && self.parts.stimuli.check_answer(&response);
        if correct {
            self.correct_count += 1;
        } else {
            self.incorrect_count += 1;
        }
        info!(
            trial,
            correct,
            correct_count = self.correct_count,
            incorrect_count = self.incorrect_count,
            "Answer scored"
        );
        self.log.record(TrialEvent::AnswerScored {
            trial,
            correct,
            correct_count: self.correct_count,
            incorrect_count: self.incorrect_count,
        })?;

        let next_snr_db = self
            .controller
            .next_snr(self.correct_count, self.incorrect_count, snr_db);
        if next_snr_db != snr_db {
            self.snr_db = next_snr_db;
            self.correct_count = 0;
            self.incorrect_count = 0;
            info!(
                from_db = snr_db,
                to_db = next_snr_db,
                reversal_count = self.controller.reversal_count(),
                "SNR changed"
            );
            self.log.record(TrialEvent::SnrChanged {
                trial,
                from_db: snr_db,
                to_db: next_snr_db,
                reversal_count: self.controller.reversal_count(),
            })?;
        }

        Ok(TrialRecord {
            index: trial,
            prompt: stimulus.prompt,
            response,
            correct,
            snr_db,
            next_snr_db,
            reversal_count: self.controller.reversal_count(),
            capture_error,
        })
    }

    /// Vocalize, pad, add noise at the current SNR and play to completion.
    fn present(&mut self, prompt: &str) -> DinResult<()> {
        let speech = self.parts.vocalizer.vocalize(prompt)?.padded(self.pad_samples);
        let noise = self.parts.noise.generate_noise(&speech, self.snr_db)?;
        let mixed = speech.mix(&noise)?;
        let peak = mixed.peak();
        if peak > 1.0 {
            debug!(peak, snr_db = self.snr_db, "Mixed stimulus will clip");
        }
        self.parts.playback.play(&mixed)
    }
}
