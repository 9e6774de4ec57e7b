//! Adaptive SNR staircase.
//!
//! Pure decision logic: the session feeds in its per-level tallies and the
//! current SNR, the controller answers with the next SNR and keeps track of
//! direction changes (reversals). Step sizes shrink as reversals accumulate so
//! early trials move quickly and later trials settle near threshold.

use crate::config::{StaircaseConfig, StopRule};
use crate::error::{DinError, DinResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Last direction the staircase moved in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// No level change yet.
    None,
    /// SNR went up after incorrect answers.
    Increasing,
    /// SNR went down after correct answers.
    Decreasing,
}

/// Staircase state machine for one test run.
#[derive(Debug, Clone)]
pub struct SnrController {
    correct_threshold: u32,
    incorrect_threshold: u32,
    steps: [f64; 3],
    reversal_limit: u32,
    stop_rule: StopRule,
    threshold_reversals: usize,

    reversal_count: u32,
    previous_direction: Direction,
    recorded_snr_values: Vec<f64>,
}

impl SnrController {
    /// Build a controller. Invalid thresholds or step schedules are rejected here.
    pub fn new(config: &StaircaseConfig) -> DinResult<Self> {
        config.validate()?;
        let steps = [config.step_size[0], config.step_size[1], config.step_size[2]];
        Ok(Self {
            correct_threshold: config.correct_threshold,
            incorrect_threshold: config.incorrect_threshold,
            steps,
            reversal_limit: config.reversal_limit,
            stop_rule: config.stop_rule,
            threshold_reversals: config.threshold_reversals,
            reversal_count: 0,
            previous_direction: Direction::None,
            recorded_snr_values: Vec::new(),
        })
    }

    /// Decide the next SNR from the tallies at the current level.
    ///
    /// Returns `current_snr` unchanged while neither threshold is met; the
    /// caller must keep its tallies in that case. When both thresholds are met
    /// the correct branch wins.
    pub fn next_snr(
        &mut self,
        correct_count: u32,
        incorrect_count: u32,
        current_snr: f64,
    ) -> f64 {
        let direction = if correct_count >= self.correct_threshold {
            Direction::Decreasing
        } else if incorrect_count >= self.incorrect_threshold {
            Direction::Increasing
        } else {
            return current_snr;
        };

        if self.previous_direction != Direction::None && self.previous_direction != direction {
            self.reversal_count += 1;
            self.recorded_snr_values.push(current_snr);
            debug!(
                reversal_count = self.reversal_count,
                snr_db = current_snr,
                "Staircase reversal"
            );
        }
        self.previous_direction = direction;

        let step = self.step_for(self.reversal_count);
        match direction {
            Direction::Decreasing => current_snr - step,
            _ => current_snr + step,
        }
    }

    /// Step magnitude for a reversal count: coarse up to 2, medium for 3-4, fine beyond.
    pub fn step_for(&self, reversal_count: u32) -> f64 {
        match reversal_count {
            0..=2 => self.steps[0],
            3..=4 => self.steps[1],
            _ => self.steps[2],
        }
    }

    /// Whether enough reversals have been seen to end the run.
    pub fn should_stop(&self) -> bool {
        match self.stop_rule {
            StopRule::Exceeds => self.reversal_count > self.reversal_limit,
            StopRule::Reaches => self.reversal_count >= self.reversal_limit,
        }
    }

    /// Speech-reception threshold: mean of the trailing reversal SNRs.
    ///
    /// Averages every recorded reversal when fewer than the configured number
    /// exist. Errors when nothing has been recorded.
    pub fn threshold_estimate(&self) -> DinResult<f64> {
        let recorded = &self.recorded_snr_values;
        if recorded.is_empty() {
            return Err(DinError::NoReversals);
        }
        if recorded.len() < self.threshold_reversals {
            warn!(
                recorded = recorded.len(),
                wanted = self.threshold_reversals,
                "Fewer reversals than requested; averaging all of them"
            );
        }
        let tail = &recorded[recorded.len().saturating_sub(self.threshold_reversals)..];
        Ok(tail.iter().sum::<f64>() / tail.len() as f64)
    }

    pub fn reversal_count(&self) -> u32 {
        self.reversal_count
    }

    pub fn direction(&self) -> Direction {
        self.previous_direction
    }

    /// SNR values recorded at each reversal, oldest first.
    pub fn reversals(&self) -> &[f64] {
        &self.recorded_snr_values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(stop_rule: StopRule) -> StaircaseConfig {
        StaircaseConfig {
            correct_threshold: 2,
            incorrect_threshold: 1,
            step_size: vec![5.0, 3.0, 1.0],
            reversal_limit: 3,
            start_snr: 5.0,
            stop_rule,
            threshold_reversals: 4,
            max_trials: 200,
        }
    }

    fn controller() -> SnrController {
        SnrController::new(&config(StopRule::Exceeds)).unwrap()
    }

    /// Alternate one decrease and one increase per call pair.
    fn flip(c: &mut SnrController, snr: f64, down: bool) -> f64 {
        if down {
            c.next_snr(2, 0, snr)
        } else {
            c.next_snr(0, 1, snr)
        }
    }

    #[test]
    fn rejects_short_schedule_at_construction() {
        let mut cfg = config(StopRule::Exceeds);
        cfg.step_size = vec![4.0, 2.0];
        assert!(matches!(SnrController::new(&cfg), Err(DinError::Config(_))));
        cfg.step_size.clear();
        assert!(SnrController::new(&cfg).is_err());
    }

    #[test]
    fn step_bands_follow_reversal_count() {
        let c = controller();
        for r in 0..=2 {
            assert_eq!(c.step_for(r), 5.0);
        }
        for r in 3..=4 {
            assert_eq!(c.step_for(r), 3.0);
        }
        for r in [5, 6, 20] {
            assert_eq!(c.step_for(r), 1.0);
        }
    }

    #[test]
    fn below_thresholds_keeps_snr_and_state() {
        let mut c = controller();
        assert_eq!(c.next_snr(1, 0, 5.0), 5.0);
        assert_eq!(c.direction(), Direction::None);
        assert_eq!(c.reversal_count(), 0);
    }

    #[test]
    fn first_move_is_never_a_reversal() {
        let mut c = controller();
        assert_eq!(c.next_snr(0, 1, 5.0), 10.0);
        assert_eq!(c.direction(), Direction::Increasing);
        assert_eq!(c.reversal_count(), 0);
        assert!(c.reversals().is_empty());
    }

    #[test]
    fn same_direction_twice_is_not_a_reversal() {
        let mut c = controller();
        let snr = c.next_snr(2, 0, 5.0);
        let snr = c.next_snr(2, 0, snr);
        assert_eq!(snr, -5.0);
        assert_eq!(c.reversal_count(), 0);
    }

    #[test]
    fn tie_prefers_decrease() {
        let mut c = controller();
        assert_eq!(c.next_snr(2, 1, 5.0), 0.0);
        assert_eq!(c.direction(), Direction::Decreasing);
    }

    #[test]
    fn reversal_records_pre_step_snr() {
        let mut c = controller();
        let snr = c.next_snr(2, 0, 5.0);
        assert_eq!(snr, 0.0);
        let snr = c.next_snr(0, 1, snr);
        assert_eq!(c.reversal_count(), 1);
        assert_eq!(c.reversals(), &[0.0]);
        assert_eq!(snr, 5.0);
    }

    #[test]
    fn reversal_count_matches_recorded_values() {
        let mut c = controller();
        let mut snr = 5.0;
        for i in 0..9 {
            snr = flip(&mut c, snr, i % 2 == 0);
            assert_eq!(c.reversal_count() as usize, c.reversals().len());
        }
        assert_eq!(c.reversal_count(), 8);
    }

    #[test]
    fn identical_inputs_give_identical_transitions() {
        let mut a = controller();
        let mut b = controller();
        for (cc, ic, snr) in [(2, 0, 5.0), (0, 1, 0.0), (1, 0, 5.0), (2, 0, 5.0)] {
            assert_eq!(a.next_snr(cc, ic, snr), b.next_snr(cc, ic, snr));
            assert_eq!(a.reversal_count(), b.reversal_count());
            assert_eq!(a.direction(), b.direction());
        }
    }

    #[test]
    fn exceeds_rule_stops_strictly_above_limit() {
        let mut c = controller();
        let mut snr = 5.0;
        let mut down = true;
        // first move sets direction; each later flip is one reversal
        snr = flip(&mut c, snr, down);
        while c.reversal_count() < 3 {
            down = !down;
            snr = flip(&mut c, snr, down);
            assert!(!c.should_stop());
        }
        assert_eq!(c.reversal_count(), 3);
        assert!(!c.should_stop());
        down = !down;
        snr = flip(&mut c, snr, down);
        assert_eq!(c.reversal_count(), 4);
        assert!(c.should_stop());
        // monotonic
        c.next_snr(2, 0, snr);
        c.next_snr(2, 0, snr);
        assert!(c.should_stop());
    }

    #[test]
    fn reaches_rule_stops_at_limit() {
        let mut c = SnrController::new(&config(StopRule::Reaches)).unwrap();
        let mut snr = flip(&mut c, 5.0, true);
        let mut down = true;
        while c.reversal_count() < 2 {
            down = !down;
            snr = flip(&mut c, snr, down);
        }
        assert!(!c.should_stop());
        down = !down;
        flip(&mut c, snr, down);
        assert_eq!(c.reversal_count(), 3);
        assert!(c.should_stop());
    }

    #[test]
    fn threshold_without_reversals_is_an_error() {
        let c = controller();
        assert!(matches!(c.threshold_estimate(), Err(DinError::NoReversals)));
    }

    #[test]
    fn threshold_averages_trailing_reversals() {
        let mut cfg = config(StopRule::Exceeds);
        cfg.threshold_reversals = 2;
        let mut c = SnrController::new(&cfg).unwrap();
        let mut snr = flip(&mut c, 5.0, true); // 0
        snr = flip(&mut c, snr, false); // rev @0 -> 5
        snr = flip(&mut c, snr, true); // rev @5 -> 0
        flip(&mut c, snr, false); // rev @0 -> 3
        assert_eq!(c.reversals(), &[0.0, 5.0, 0.0]);
        assert!((c.threshold_estimate().unwrap() - 2.5).abs() < 1e-9);
    }

    #[test]
    fn threshold_with_few_reversals_averages_all() {
        let mut c = controller();
        let snr = flip(&mut c, 5.0, true);
        let snr = flip(&mut c, snr, false);
        flip(&mut c, snr, true);
        assert_eq!(c.reversals(), &[0.0, 5.0]);
        assert!((c.threshold_estimate().unwrap() - 2.5).abs() < 1e-9);
    }
}
