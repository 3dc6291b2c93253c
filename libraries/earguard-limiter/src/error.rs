//! Error types for the protection engine

use earguard_core::SourceId;
use thiserror::Error;

/// Result type for protection operations
pub type Result<T> = std::result::Result<T, LimiterError>;

/// Errors that can occur when configuring or stopping the engine
///
/// Per-source faults during a tick are recovered internally and never
/// surface here. Configuration problems are fatal before the loop starts;
/// a failed shutdown restore is fatal after it ends.
#[derive(Error, Debug)]
pub enum LimiterError {
    /// Trigger threshold outside the valid range
    #[error("Invalid threshold: {0} (must be within (0, 1])")]
    ThresholdOutOfRange(f64),

    /// Safe level outside the valid range
    #[error("Invalid safe level: {0} (must be within (0, 1])")]
    SafeLevelOutOfRange(f64),

    /// Safe level must not exceed the trigger threshold
    #[error("Safe level {safe_level} exceeds threshold {threshold}")]
    SafeLevelAboveThreshold {
        /// Configured safe level
        safe_level: f64,
        /// Configured threshold
        threshold: f64,
    },

    /// Hold seconds outside the representable `Duration` range
    #[error("Invalid hold duration: {0} s (negative, not finite, or too large)")]
    InvalidHoldDuration(f64),

    /// Lowered-volume target outside the valid range
    #[error("Invalid lower target: {0} (must be within (0, 1])")]
    LowerTargetOutOfRange(f64),

    /// The stability window cannot be empty
    #[error("Stability window must be at least one tick")]
    ZeroStabilityWindow,

    /// Restore curves need at least one step
    #[error("Restore curve needs at least one step")]
    ZeroRestoreSteps,

    /// The polling interval cannot be zero
    #[error("Poll interval must be at least 1 ms")]
    ZeroPollInterval,

    /// One or more sources could not be restored during shutdown
    ///
    /// Leaving a source muted or lowered after exit is the one outcome the
    /// engine is not allowed to shrug off, so this error is surfaced to the
    /// caller instead of being logged and dropped.
    #[error("Failed to restore {} source(s) to baseline on shutdown", .sources.len())]
    ShutdownRestoreFailed {
        /// The sources whose restore commands failed
        sources: Vec<SourceId>,
    },
}
