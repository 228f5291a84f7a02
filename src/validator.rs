//! Gesture validation: turns noisy per-frame observations into confirmed intents.
//!
//! A direction is confirmed once it has been observed on `required_frames`
//! consecutive qualifying frames. A qualifying frame carries a directional
//! label with at least `min_confidence`. The confirmation fires exactly once
//! per run; holding the same gesture afterwards does nothing until the run
//! breaks (a different direction, an idle frame under [`IdlePolicy::Reset`],
//! or an explicit [`GestureValidator::reset`]).

use crate::{
    config::GestureConfig,
    gesture::{ConfirmedGesture, Direction, Observation},
};
use log::debug;
use serde::{Deserialize, Serialize};

/// How `free`, `none` and low-confidence frames affect a run in progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdlePolicy {
    /// Idle frames are skipped; the run in progress is preserved
    #[default]
    Ignore,
    /// Idle frames count as contradicting evidence and break the run
    Reset,
}

/// Mutable validator state, exposed for UI feedback and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValidatorState {
    /// Direction of the run in progress
    pub candidate_label: Option<Direction>,
    /// Length of the run in progress
    pub candidate_run_length: u32,
    /// Direction confirmed by the current run, if it already fired
    pub last_confirmed: Option<Direction>,
}

/// Debounce/voting filter over classifier observations
#[derive(Debug, Clone)]
pub struct GestureValidator {
    required_frames: u32,
    min_confidence: f32,
    upper_region_cutoff: Option<f32>,
    idle_policy: IdlePolicy,
    state: ValidatorState,
}

impl GestureValidator {
    /// Create a validator with the default idle policy and no upper-region filter
    #[must_use]
    pub fn new(required_frames: u32, min_confidence: f32) -> Self {
        assert!(required_frames > 0, "Required frames must be greater than 0");
        Self {
            required_frames,
            min_confidence,
            upper_region_cutoff: None,
            idle_policy: IdlePolicy::default(),
            state: ValidatorState::default(),
        }
    }

    /// Build a validator from the `gesture` configuration section
    #[must_use]
    pub fn from_config(config: &GestureConfig) -> Self {
        Self::new(config.gesture_confirm_frames, config.min_detection_confidence)
            .with_idle_policy(config.idle_policy)
            .with_upper_region_cutoff(config.upper_region_cutoff)
    }

    /// Set the idle policy
    #[must_use]
    pub fn with_idle_policy(mut self, policy: IdlePolicy) -> Self {
        self.idle_policy = policy;
        self
    }

    /// Discard observations whose pointer lies above this normalized y coordinate
    #[must_use]
    pub fn with_upper_region_cutoff(mut self, cutoff: f32) -> Self {
        self.upper_region_cutoff = Some(cutoff);
        self
    }

    /// Feed one observation; returns a confirmation at most once per run
    pub fn observe(&mut self, observation: &Observation) -> Option<ConfirmedGesture> {
        if let (Some(cutoff), Some(pointer)) = (self.upper_region_cutoff, observation.pointer) {
            if pointer.y < cutoff {
                debug!(
                    "Discarding frame {}: pointer y {:.3} above cutoff {:.3}",
                    observation.frame_index, pointer.y, cutoff
                );
                return None;
            }
        }

        let direction = match observation.label.direction() {
            Some(direction) if observation.confidence >= self.min_confidence => direction,
            _ => {
                if self.idle_policy == IdlePolicy::Reset {
                    self.break_run();
                }
                return None;
            }
        };

        if self.state.candidate_label == Some(direction) {
            self.state.candidate_run_length = self.state.candidate_run_length.saturating_add(1);
        } else {
            self.state.candidate_label = Some(direction);
            self.state.candidate_run_length = 1;
            self.state.last_confirmed = None;
        }

        if self.state.candidate_run_length == self.required_frames
            && self.state.last_confirmed != Some(direction)
        {
            self.state.last_confirmed = Some(direction);
            debug!("Gesture confirmed: {} at frame {}", direction, observation.frame_index);
            return Some(ConfirmedGesture {
                direction,
                frame_index: observation.frame_index,
            });
        }

        None
    }

    /// Forget the run in progress and the last confirmation
    pub fn reset(&mut self) {
        self.state = ValidatorState::default();
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> ValidatorState {
        self.state
    }

    /// UI progress of the current run towards confirmation, `0.0..=1.0`
    #[must_use]
    pub fn progress(&self) -> f32 {
        if self.state.candidate_label.is_none() {
            return 0.0;
        }
        (self.state.candidate_run_length as f32 / self.required_frames as f32).min(1.0)
    }

    /// Direction currently being recognised, for progress display
    #[must_use]
    pub fn current_direction(&self) -> Option<Direction> {
        self.state.candidate_label
    }

    /// Number of consecutive frames needed for a confirmation
    #[must_use]
    pub fn required_frames(&self) -> u32 {
        self.required_frames
    }

    /// Active idle policy
    #[must_use]
    pub fn idle_policy(&self) -> IdlePolicy {
        self.idle_policy
    }

    fn break_run(&mut self) {
        self.state = ValidatorState::default();
    }
}
