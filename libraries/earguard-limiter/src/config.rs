//! Protection configuration
//!
//! Immutable per engine run. Loaded from persisted settings by the front
//! end, validated once before the first tick; invalid values are rejected
//! with a typed error, never silently corrected.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{LimiterError, Result};
use crate::{
    DEFAULT_HOLD_SECS, DEFAULT_LOWER_PERCENT, DEFAULT_POLL_MS, DEFAULT_SAFE_LEVEL,
    DEFAULT_THRESHOLD,
};

/// How a source is attenuated while protection is active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtectAction {
    /// Hard-mute the source
    Mute,

    /// Set the source volume to a fixed low target (`lower_percent`)
    #[default]
    Lower,
}

impl ProtectAction {
    /// Parse from string (for settings persistence)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "mute" => Some(Self::Mute),
            "lower" | "duck" => Some(Self::Lower),
            _ => None,
        }
    }

    /// Convert to string for settings persistence
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mute => "mute",
            Self::Lower => "lower",
        }
    }
}

/// How volume returns to baseline once a source is confirmed quiet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestoreMode {
    /// Single jump back to baseline
    Instant,

    /// Fixed-size steps toward baseline
    #[default]
    Linear,

    /// Geometric ramp toward baseline (perceptually even)
    Exponential,
}

impl RestoreMode {
    /// Parse from string (for settings persistence)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "instant" | "jump" => Some(Self::Instant),
            "linear" | "steps" => Some(Self::Linear),
            "exponential" | "fade" => Some(Self::Exponential),
            _ => None,
        }
    }

    /// Convert to string for settings persistence
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Instant => "instant",
            Self::Linear => "linear",
            Self::Exponential => "exponential",
        }
    }
}

/// Which volume scalars participate in the loudness estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoudnessMode {
    /// `raw_peak * master_volume` (the probe already reflects mixer state)
    DeviceOnly,

    /// `raw_peak * source_volume`
    SessionOnly,

    /// `raw_peak * source_volume * master_volume`, the closest estimate of
    /// what actually reaches the listener
    #[default]
    Combined,
}

impl LoudnessMode {
    /// Parse from string (for settings persistence)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "device" | "device_only" => Some(Self::DeviceOnly),
            "session" | "session_only" => Some(Self::SessionOnly),
            "combined" | "true" => Some(Self::Combined),
            _ => None,
        }
    }

    /// Convert to string for settings persistence
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DeviceOnly => "device_only",
            Self::SessionOnly => "session_only",
            Self::Combined => "combined",
        }
    }
}

/// Configuration for the protection engine
///
/// All level fields are fractions of full scale in `(0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimiterConfig {
    /// Loudness above which protection triggers (default: 0.25)
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    /// Predicted loudness below which a protected source may restore
    /// (default: 0.20, must not exceed `threshold`)
    #[serde(default = "default_safe_level")]
    pub safe_level: f64,

    /// Minimum seconds a source stays attenuated before restore checks
    /// begin (default: 2.0)
    #[serde(default = "default_hold_secs")]
    pub hold_secs: f64,

    /// Consecutive predicted-safe ticks required before restoring
    /// (default: 3)
    #[serde(default = "default_stability_ticks")]
    pub stability_ticks: u32,

    /// Mute or lower while protected (default: lower)
    #[serde(default)]
    pub action: ProtectAction,

    /// Volume target while lowered, used only with `action = lower`
    /// (default: 0.20)
    #[serde(default = "default_lower_percent")]
    pub lower_percent: f64,

    /// Which volume scalars feed the loudness estimate (default: combined)
    #[serde(default)]
    pub loudness_mode: LoudnessMode,

    /// Shape of the restore ramp (default: linear)
    #[serde(default)]
    pub restore_mode: RestoreMode,

    /// Number of ticks a linear or exponential restore spreads over
    /// (default: 10)
    #[serde(default = "default_restore_steps")]
    pub restore_steps: u32,

    /// Polling interval in milliseconds (default: 10)
    #[serde(default = "default_poll_ms")]
    pub poll_ms: u64,
}

impl LimiterConfig {
    /// Validate the configuration
    ///
    /// Called by `LimiterEngine::new` before the first tick; front ends can
    /// also call it directly to report problems at load time.
    ///
    /// # Errors
    /// Returns the first violated rule as a `LimiterError`
    pub fn validate(&self) -> Result<()> {
        if !(self.threshold > 0.0 && self.threshold <= 1.0) {
            return Err(LimiterError::ThresholdOutOfRange(self.threshold));
        }

        if !(self.safe_level > 0.0 && self.safe_level <= 1.0) {
            return Err(LimiterError::SafeLevelOutOfRange(self.safe_level));
        }

        if self.safe_level > self.threshold {
            return Err(LimiterError::SafeLevelAboveThreshold {
                safe_level: self.safe_level,
                threshold: self.threshold,
            });
        }

        if Duration::try_from_secs_f64(self.hold_secs).is_err() {
            return Err(LimiterError::InvalidHoldDuration(self.hold_secs));
        }

        if !(self.lower_percent > 0.0 && self.lower_percent <= 1.0) {
            return Err(LimiterError::LowerTargetOutOfRange(self.lower_percent));
        }

        if self.stability_ticks == 0 {
            return Err(LimiterError::ZeroStabilityWindow);
        }

        if self.restore_steps == 0 {
            return Err(LimiterError::ZeroRestoreSteps);
        }

        if self.poll_ms == 0 {
            return Err(LimiterError::ZeroPollInterval);
        }

        Ok(())
    }

    /// Minimum attenuated dwell as a `Duration`
    ///
    /// Saturates at `Duration::MAX` when `hold_secs` cannot be represented;
    /// `validate` rejects such configurations up front.
    pub fn hold_duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.hold_secs).unwrap_or(Duration::MAX)
    }

    /// Polling interval as a `Duration`
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_ms)
    }
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            safe_level: default_safe_level(),
            hold_secs: default_hold_secs(),
            stability_ticks: default_stability_ticks(),
            action: ProtectAction::default(),
            lower_percent: default_lower_percent(),
            loudness_mode: LoudnessMode::default(),
            restore_mode: RestoreMode::default(),
            restore_steps: default_restore_steps(),
            poll_ms: default_poll_ms(),
        }
    }
}

// Default values

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

fn default_safe_level() -> f64 {
    DEFAULT_SAFE_LEVEL
}

fn default_hold_secs() -> f64 {
    DEFAULT_HOLD_SECS
}

fn default_stability_ticks() -> u32 {
    3
}

fn default_lower_percent() -> f64 {
    DEFAULT_LOWER_PERCENT
}

fn default_restore_steps() -> u32 {
    10
}

fn default_poll_ms() -> u64 {
    DEFAULT_POLL_MS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = LimiterConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.threshold, 0.25);
        assert_eq!(config.safe_level, 0.20);
        assert_eq!(config.hold_secs, 2.0);
        assert_eq!(config.action, ProtectAction::Lower);
        assert_eq!(config.loudness_mode, LoudnessMode::Combined);
    }

    #[test]
    fn test_safe_level_above_threshold_rejected() {
        let config = LimiterConfig {
            threshold: 0.3,
            safe_level: 0.5,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(LimiterError::SafeLevelAboveThreshold { .. })
        ));
    }

    #[test]
    fn test_threshold_range_enforced() {
        for bad in [0.0, -0.1, 1.5, f64::NAN] {
            let config = LimiterConfig {
                threshold: bad,
                safe_level: 0.1,
                ..Default::default()
            };
            assert!(
                matches!(config.validate(), Err(LimiterError::ThresholdOutOfRange(_))),
                "threshold {} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_negative_hold_rejected() {
        let config = LimiterConfig {
            hold_secs: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(LimiterError::InvalidHoldDuration(_))
        ));
    }

    #[test]
    fn test_unrepresentable_hold_rejected() {
        // Finite and non-negative is not enough; the value must also fit
        // in a Duration or the dwell check could never compute it
        for bad in [1e20, f64::INFINITY, f64::NAN] {
            let config = LimiterConfig {
                hold_secs: bad,
                ..Default::default()
            };
            assert!(
                matches!(
                    config.validate(),
                    Err(LimiterError::InvalidHoldDuration(_))
                ),
                "hold_secs {} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_zero_counters_rejected() {
        let config = LimiterConfig {
            stability_ticks: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(LimiterError::ZeroStabilityWindow)
        ));

        let config = LimiterConfig {
            restore_steps: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(LimiterError::ZeroRestoreSteps)
        ));

        let config = LimiterConfig {
            poll_ms: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(LimiterError::ZeroPollInterval)
        ));
    }

    #[test]
    fn test_mode_string_round_trips() {
        for action in [ProtectAction::Mute, ProtectAction::Lower] {
            assert_eq!(ProtectAction::from_str(action.as_str()), Some(action));
        }
        for mode in [
            RestoreMode::Instant,
            RestoreMode::Linear,
            RestoreMode::Exponential,
        ] {
            assert_eq!(RestoreMode::from_str(mode.as_str()), Some(mode));
        }
        for mode in [
            LoudnessMode::DeviceOnly,
            LoudnessMode::SessionOnly,
            LoudnessMode::Combined,
        ] {
            assert_eq!(LoudnessMode::from_str(mode.as_str()), Some(mode));
        }
        assert_eq!(ProtectAction::from_str("silence"), None);
    }

    #[test]
    fn test_partial_document_fills_defaults() {
        let config: LimiterConfig = serde_json::from_str(r#"{"threshold": 0.5}"#)
            .expect("partial config should deserialize");
        assert_eq!(config.threshold, 0.5);
        assert_eq!(config.safe_level, 0.20);
        assert_eq!(config.restore_mode, RestoreMode::Linear);
        assert_eq!(config.poll_ms, 10);
    }

    #[test]
    fn test_duration_helpers() {
        let config = LimiterConfig::default();
        assert_eq!(config.hold_duration(), Duration::from_secs(2));
        assert_eq!(config.poll_interval(), Duration::from_millis(10));

        // An out-of-range hold saturates rather than failing mid-tick
        let config = LimiterConfig {
            hold_secs: 1e20,
            ..Default::default()
        };
        assert_eq!(config.hold_duration(), Duration::MAX);
    }
}
