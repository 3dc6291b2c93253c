//! Tick reports
//!
//! A `FrameReport` is the engine's only output channel: everything a front
//! end displays (meters, phases, hold countdowns) comes from here, so the
//! loop itself never needs to know about consoles or UIs.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use earguard_core::{Command, SourceId, SourceKind};

use crate::machine::ProtectionPhase;

/// Snapshot of one source after a tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceReport {
    /// Stable identifier
    pub id: SourceId,

    /// Human-readable name
    pub name: String,

    /// Device endpoint or application stream
    pub kind: SourceKind,

    /// Protection phase after this tick
    pub phase: ProtectionPhase,

    /// Estimated audible loudness this tick (zero while muted)
    pub loudness: f64,

    /// Loudness this source would have at its baseline volume
    pub predicted: f64,

    /// Volume the source restores to
    pub baseline_volume: f64,

    /// The loudness that tripped the current protection cycle, if any
    pub trigger_loudness: Option<f64>,

    /// Seconds since protection was entered or last re-armed, if any
    pub held_secs: Option<f64>,
}

/// Everything one engine tick observed and did
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameReport {
    /// Monotonic tick counter
    pub tick: u64,

    /// Device master volume used for this tick's estimates
    pub master_volume: f64,

    /// Per-source snapshots, in enumeration order
    pub sources: Vec<SourceReport>,

    /// Commands emitted this tick
    pub commands: Vec<Command>,

    /// Sources evicted this tick because they no longer exist
    pub dropped: Vec<SourceId>,
}

impl FrameReport {
    /// The loudest source this tick, if any were observed
    pub fn loudest(&self) -> Option<&SourceReport> {
        self.sources.iter().max_by(|a, b| {
            a.loudness
                .partial_cmp(&b.loudness)
                .unwrap_or(Ordering::Equal)
        })
    }

    /// Whether any source is currently in a protection cycle
    pub fn any_protected(&self) -> bool {
        self.sources.iter().any(|s| s.phase.is_protected())
    }
}
