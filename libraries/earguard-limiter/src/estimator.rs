//! True-loudness estimation
//!
//! A raw peak meter value says how loud a source *wants* to be; what
//! reaches the listener is that peak scaled by the volume faders between
//! the source and the speaker. The estimator combines the two according to
//! the configured `LoudnessMode`, and can also answer the counterfactual
//! question the restore logic depends on: how loud would this source be
//! right now if its attenuation were undone?

use crate::config::LoudnessMode;

/// Combines peak readings with volume scalars into audible loudness
///
/// Both entry points are pure functions of their inputs; calling them never
/// touches the audio backend. Inputs are clamped to `[0, 1]` so a backend
/// glitch cannot produce an out-of-range estimate.
///
/// # Example
///
/// ```rust
/// use earguard_limiter::{LoudnessEstimator, LoudnessMode};
///
/// let estimator = LoudnessEstimator::new(LoudnessMode::Combined);
///
/// // Full-scale peak, half session volume, 80% master
/// let loudness = estimator.estimate(1.0, 0.5, 0.8);
/// assert!((loudness - 0.4).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct LoudnessEstimator {
    mode: LoudnessMode,
}

impl LoudnessEstimator {
    /// Create an estimator for the given mode
    pub fn new(mode: LoudnessMode) -> Self {
        Self { mode }
    }

    /// Get the configured mode
    pub fn mode(&self) -> LoudnessMode {
        self.mode
    }

    /// Estimate the current audible loudness of a source
    ///
    /// # Arguments
    /// * `raw_peak` - Instantaneous peak amplitude in `[0, 1]`
    /// * `source_volume` - The source's live volume scalar
    /// * `master_volume` - The device master volume scalar
    pub fn estimate(&self, raw_peak: f64, source_volume: f64, master_volume: f64) -> f64 {
        let peak = raw_peak.clamp(0.0, 1.0);
        let source = source_volume.clamp(0.0, 1.0);
        let master = master_volume.clamp(0.0, 1.0);

        match self.mode {
            LoudnessMode::DeviceOnly => peak * master,
            LoudnessMode::SessionOnly => peak * source,
            LoudnessMode::Combined => peak * source * master,
        }
    }

    /// Predict the loudness a source would have at its baseline volume
    ///
    /// Substitutes `baseline_volume` for the live (possibly attenuated)
    /// scalar, answering "how loud would this be if we restored it" without
    /// performing a real, audible restore. In `DeviceOnly` mode the
    /// attenuated scalar is the master itself, so the baseline replaces the
    /// master term.
    pub fn predict(&self, raw_peak: f64, baseline_volume: f64, master_volume: f64) -> f64 {
        let peak = raw_peak.clamp(0.0, 1.0);
        let baseline = baseline_volume.clamp(0.0, 1.0);
        let master = master_volume.clamp(0.0, 1.0);

        match self.mode {
            LoudnessMode::DeviceOnly | LoudnessMode::SessionOnly => peak * baseline,
            LoudnessMode::Combined => peak * baseline * master,
        }
    }
}
