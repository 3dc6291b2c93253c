//! Restore ramp shapes
//!
//! Restoring a lowered source in one jump is audible as a pop, so the
//! engine walks the volume back to baseline over a configured number of
//! ticks. `RestoreCurve` is the cursor for one such walk: created when a
//! source enters restoration, advanced one step per tick, discarded when
//! the source is back at baseline or the restore is aborted.

use crate::config::RestoreMode;
use crate::{EXP_RAMP_FLOOR, VOLUME_EPSILON};

/// Cursor for one in-progress restore ramp
///
/// Guarantees: every `advance` moves monotonically toward the target,
/// never overshoots, and the final step lands exactly on the target.
/// Works in either direction (a baseline below the attenuated level walks
/// downward).
#[derive(Debug, Clone)]
pub struct RestoreCurve {
    /// Ramp shape
    mode: RestoreMode,
    /// Level the ramp started from
    start: f64,
    /// Baseline level the ramp ends at
    target: f64,
    /// Total steps the ramp spreads over
    total_steps: u32,
    /// Steps taken so far
    steps_taken: u32,
    /// Level after the most recent step
    current: f64,
}

impl RestoreCurve {
    /// Create a new ramp from `start` toward `target`
    ///
    /// # Arguments
    /// * `total_steps` - Number of ticks the ramp spreads over (>= 1,
    ///   enforced by config validation); ignored for `Instant`
    pub fn new(mode: RestoreMode, start: f64, target: f64, total_steps: u32) -> Self {
        let start = start.clamp(0.0, 1.0);
        let target = target.clamp(0.0, 1.0);

        Self {
            mode,
            start,
            target,
            total_steps: total_steps.max(1),
            steps_taken: 0,
            current: start,
        }
    }

    /// Advance one step and return the new level
    ///
    /// Calling after completion is a no-op that keeps returning the target.
    pub fn advance(&mut self) -> f64 {
        if self.is_complete() {
            self.current = self.target;
            return self.current;
        }

        self.steps_taken += 1;

        if self.steps_taken >= self.total_steps || self.mode == RestoreMode::Instant {
            self.steps_taken = self.total_steps;
            self.current = self.target;
            return self.current;
        }

        let fraction = f64::from(self.steps_taken) / f64::from(self.total_steps);
        self.current = match self.mode {
            RestoreMode::Instant => self.target,
            RestoreMode::Linear => self.start + (self.target - self.start) * fraction,
            RestoreMode::Exponential => {
                // A geometric ratio is undefined from zero, so lift both
                // ends onto the floor before interpolating
                let base = self.start.max(EXP_RAMP_FLOOR);
                let goal = self.target.max(EXP_RAMP_FLOOR);
                base * (goal / base).powf(fraction)
            }
        };

        self.current
    }

    /// Level after the most recent step
    pub fn current(&self) -> f64 {
        self.current
    }

    /// Baseline level the ramp ends at
    pub fn target(&self) -> f64 {
        self.target
    }

    /// Ramp shape
    pub fn mode(&self) -> RestoreMode {
        self.mode
    }

    /// Steps taken so far
    pub fn steps_taken(&self) -> u32 {
        self.steps_taken
    }

    /// Whether the ramp has reached its target
    pub fn is_complete(&self) -> bool {
        self.steps_taken >= self.total_steps
            || (self.current - self.target).abs() <= VOLUME_EPSILON
    }
}
