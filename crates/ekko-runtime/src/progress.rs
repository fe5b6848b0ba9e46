//! Progress aggregation.
//!
//! None of the provisioning commands report numeric progress, so the bar is
//! synthesized from events: every output line nudges the running step
//! forward by a fixed increment, capped below completion, and finishing a
//! step snaps it to done. The overall fraction is
//! `(completed_steps + current_step_fraction) / total_steps`.
//!
//! Because the in-step fraction is capped strictly below 1, the overall
//! fraction never decreases and reaches 1.0 only once every step has
//! finished.

use crate::error::TuningError;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CHUNK_INCREMENT: f64 = 0.05;
pub const DEFAULT_STEP_CEILING: f64 = 0.9;

/// Constants of the progress heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressTuning {
    /// Fraction of a step added per output chunk.
    pub chunk_increment: f64,
    /// Highest in-step fraction reachable before the step finishes.
    pub step_ceiling: f64,
}

impl Default for ProgressTuning {
    fn default() -> Self {
        Self {
            chunk_increment: DEFAULT_CHUNK_INCREMENT,
            step_ceiling: DEFAULT_STEP_CEILING,
        }
    }
}

impl ProgressTuning {
    pub fn validate(self) -> Result<Self, TuningError> {
        if !(self.chunk_increment > 0.0) {
            return Err(TuningError::NonPositiveIncrement(self.chunk_increment));
        }
        if !(0.0..1.0).contains(&self.step_ceiling) {
            return Err(TuningError::CeilingOutOfRange(self.step_ceiling));
        }
        Ok(self)
    }
}

/// Snapshot of run progress.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProgressState {
    pub completed_steps: usize,
    pub total_steps: usize,
    /// In `[0, 1]`.
    pub current_step_fraction: f64,
}

impl ProgressState {
    pub fn overall_fraction(&self) -> f64 {
        if self.total_steps == 0 {
            return 1.0;
        }
        let fraction =
            (self.completed_steps as f64 + self.current_step_fraction) / self.total_steps as f64;
        fraction.clamp(0.0, 1.0)
    }

    pub fn is_complete(&self) -> bool {
        self.completed_steps >= self.total_steps
    }
}

/// Turns chunk and step-finished events into a monotonic completion fraction.
#[derive(Debug, Clone)]
pub struct ProgressAggregator {
    state: ProgressState,
    tuning: ProgressTuning,
}

impl ProgressAggregator {
    pub fn new(total_steps: usize, tuning: ProgressTuning) -> Self {
        Self {
            state: ProgressState {
                completed_steps: 0,
                total_steps,
                current_step_fraction: 0.0,
            },
            tuning,
        }
    }

    pub fn state(&self) -> ProgressState {
        self.state
    }

    pub fn overall_fraction(&self) -> f64 {
        self.state.overall_fraction()
    }

    /// A new step began; its fraction starts from zero.
    pub fn step_started(&mut self) {
        self.state.current_step_fraction = 0.0;
    }

    /// One chunk of output arrived for the running step.
    pub fn on_chunk(&mut self) {
        if self.state.is_complete() {
            return;
        }
        let ceiling = self.tuning.step_ceiling;
        if self.state.current_step_fraction >= ceiling {
            return;
        }
        self.state.current_step_fraction =
            (self.state.current_step_fraction + self.tuning.chunk_increment).min(ceiling);
    }

    /// The running step reached a terminal outcome of any kind.
    ///
    /// Its fraction snaps to 1.0, which is folded into `completed_steps`;
    /// the next step's fraction then starts at zero.
    pub fn on_step_finished(&mut self) {
        if self.state.is_complete() {
            return;
        }
        self.state.completed_steps += 1;
        self.state.current_step_fraction = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aggregator(total: usize) -> ProgressAggregator {
        ProgressAggregator::new(total, ProgressTuning::default())
    }

    #[test]
    fn test_chunks_advance_but_cap_below_completion() {
        let mut progress = aggregator(1);
        progress.step_started();
        for _ in 0..100 {
            progress.on_chunk();
        }
        assert!((progress.state().current_step_fraction - 0.9).abs() < 1e-9);
        assert!(progress.overall_fraction() < 1.0);
    }

    #[test]
    fn test_finishing_every_step_reaches_exactly_one() {
        let mut progress = aggregator(3);
        for _ in 0..3 {
            progress.step_started();
            progress.on_chunk();
            progress.on_chunk();
            progress.on_step_finished();
        }
        assert_eq!(progress.overall_fraction(), 1.0);
        assert_eq!(progress.state().completed_steps, 3);
    }

    #[test]
    fn test_fraction_is_monotonic_across_steps() {
        let mut progress = aggregator(4);
        let mut last = progress.overall_fraction();
        for chunks in [0usize, 3, 40, 7] {
            progress.step_started();
            assert!(progress.overall_fraction() >= last);
            last = progress.overall_fraction();
            for _ in 0..chunks {
                progress.on_chunk();
                assert!(progress.overall_fraction() >= last);
                last = progress.overall_fraction();
            }
            progress.on_step_finished();
            assert!(progress.overall_fraction() >= last);
            last = progress.overall_fraction();
        }
        assert_eq!(last, 1.0);
    }

    #[test]
    fn test_extra_events_after_completion_are_ignored() {
        let mut progress = aggregator(1);
        progress.step_started();
        progress.on_step_finished();
        progress.on_chunk();
        progress.on_step_finished();
        assert_eq!(progress.state().completed_steps, 1);
        assert_eq!(progress.overall_fraction(), 1.0);
    }

    #[test]
    fn test_empty_plan_is_complete() {
        assert_eq!(aggregator(0).overall_fraction(), 1.0);
    }

    #[test]
    fn test_custom_tuning() {
        let tuning = ProgressTuning {
            chunk_increment: 0.5,
            step_ceiling: 0.75,
        };
        let mut progress = ProgressAggregator::new(2, tuning);
        progress.step_started();
        progress.on_chunk();
        progress.on_chunk();
        assert_eq!(progress.state().current_step_fraction, 0.75);
        assert_eq!(progress.overall_fraction(), 0.375);
    }

    #[test]
    fn test_tuning_validation() {
        assert!(ProgressTuning::default().validate().is_ok());
        assert_eq!(
            ProgressTuning {
                chunk_increment: 0.0,
                step_ceiling: 0.5
            }
            .validate(),
            Err(TuningError::NonPositiveIncrement(0.0))
        );
        assert_eq!(
            ProgressTuning {
                chunk_increment: 0.1,
                step_ceiling: 1.0
            }
            .validate(),
            Err(TuningError::CeilingOutOfRange(1.0))
        );
    }
}
