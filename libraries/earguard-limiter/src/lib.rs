//! Adaptive loudness protection for earguard
//!
//! This crate provides:
//! - True-loudness estimation from raw peak and volume scalars
//! - A per-source protection state machine (trigger, hold, check, restore)
//! - Predictive restore checks that never produce an audible probe
//! - Stepped and exponential restore curves
//! - The `LimiterEngine` polling core that drives it all
//!
//! # Architecture
//!
//! ```text
//! ┌────────────┐     ┌───────────────────┐     ┌──────────────────┐
//! │ LevelProbe │ ──► │ LoudnessEstimator │ ──► │ SourceState FSM  │
//! └────────────┘     └───────────────────┘     └──────────────────┘
//!                                                       │ commands
//!                                                       ▼
//!                    ┌───────────────────┐     ┌──────────────────┐
//!                    │    FrameReport    │ ◄── │  VolumeActuator  │
//!                    └───────────────────┘     └──────────────────┘
//! ```
//!
//! One `LimiterEngine::tick` reads every enumerable source, runs each
//! source's state machine exactly once, applies the emitted commands, and
//! returns a `FrameReport` describing what happened. The caller owns the
//! schedule (typically a 10 ms interval) and must call `stop` before exit
//! so no source is left attenuated.
//!
//! # Example
//!
//! ```ignore
//! use earguard_limiter::{LimiterConfig, LimiterEngine};
//!
//! let config = LimiterConfig::default();
//! let mut engine = LimiterEngine::new(config, probe, actuator)?;
//!
//! loop {
//!     let report = engine.tick();
//!     if let Some(loudest) = report.loudest() {
//!         println!("loudest: {} at {:.0}%", loudest.id, loudest.loudness * 100.0);
//!     }
//! }
//! ```

#![deny(unsafe_code)]

mod config;
mod curve;
mod engine;
mod error;
mod estimator;
mod machine;
mod report;

pub use config::{LimiterConfig, LoudnessMode, ProtectAction, RestoreMode};
pub use curve::RestoreCurve;
pub use engine::LimiterEngine;
pub use error::{LimiterError, Result};
pub use estimator::LoudnessEstimator;
pub use machine::{ProtectionPhase, SourceState, TickInput};
pub use report::{FrameReport, SourceReport};

/// Tolerance when comparing volume scalars
///
/// Backends quantize volume internally, so a written value rarely reads
/// back bit-identical. Two levels closer than this are the same level.
pub const VOLUME_EPSILON: f64 = 1e-3;

/// Floor substituted for a zero start when building an exponential ramp
/// (a geometric ratio from exactly zero is undefined)
pub const EXP_RAMP_FLOOR: f64 = 1e-3;

/// Consecutive ticks a command may fail to take effect before a warning
pub const RETRY_WARN_TICKS: u32 = 10;

/// Default trigger threshold (fraction of full scale)
pub const DEFAULT_THRESHOLD: f64 = 0.25;

/// Default safe level for restore eligibility (fraction of full scale)
pub const DEFAULT_SAFE_LEVEL: f64 = 0.20;

/// Default minimum attenuated dwell in seconds
pub const DEFAULT_HOLD_SECS: f64 = 2.0;

/// Default volume target while lowered (fraction of full scale)
pub const DEFAULT_LOWER_PERCENT: f64 = 0.20;

/// Default polling interval in milliseconds
pub const DEFAULT_POLL_MS: u64 = 10;
