//! Per-source protection state machine
//!
//! Each monitored source owns one `SourceState`, advanced exactly once per
//! engine tick:
//!
//! ```text
//!         L > threshold
//! Idle ──────────────────► Triggered ──► Holding ──► Checking ──► Restoring
//!  ▲                           ▲        (dwell)     (debounce)        │
//!  │                           │                        │             │
//!  │                           └───── re-trigger ◄──────┴─────────────┤
//!  └──────────────────────────────────────────────────────────────────┘
//!                        curve complete / unmuted
//! ```
//!
//! The machine never talks to the audio backend. It consumes one tick's
//! observations and returns the commands it wants executed; the engine
//! applies them. Because every decision is re-derived from observed state,
//! a command that failed to take effect is simply issued again on the next
//! tick, and external interference (someone un-muting a protected source)
//! is converged away the same way.

use std::fmt;
use std::time::{Duration, Instant};

use earguard_core::{Command, LevelReading, SourceId};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{LimiterConfig, ProtectAction};
use crate::curve::RestoreCurve;
use crate::{RETRY_WARN_TICKS, VOLUME_EPSILON};

/// Phase of the protection cycle a source is in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtectionPhase {
    /// Quiet; baseline volume tracks the live volume
    Idle,
    /// Attenuation commanded, awaiting confirmation from the probe
    Triggered,
    /// Attenuated, waiting out the minimum dwell
    Holding,
    /// Attenuated, counting predicted-safe ticks
    Checking,
    /// Walking the volume back toward baseline
    Restoring,
}

impl ProtectionPhase {
    /// Convert to string for display and persistence
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Triggered => "triggered",
            Self::Holding => "holding",
            Self::Checking => "checking",
            Self::Restoring => "restoring",
        }
    }

    /// Whether the source is currently attenuated (or being restored)
    pub fn is_protected(&self) -> bool {
        !matches!(self, Self::Idle)
    }
}

impl fmt::Display for ProtectionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One tick's view of a source, as handed to the state machine
///
/// Loudness values are computed by the engine from the same reading, so a
/// single tick always sees a consistent snapshot.
#[derive(Debug, Clone, Copy)]
pub struct TickInput<'a> {
    /// Engine configuration
    pub config: &'a LimiterConfig,
    /// Timestamp of this tick
    pub now: Instant,
    /// Raw observation from the probe
    pub reading: LevelReading,
    /// Estimated audible loudness right now (zero while muted)
    pub live_loudness: f64,
    /// Loudness this source would have at its baseline volume
    pub predicted_loudness: f64,
}

/// Protection state for one monitored source
///
/// Created lazily when a source is first observed, seeded with that
/// source's current volume as the baseline, and dropped when the source
/// vanishes. All fields are owned exclusively by the engine.
#[derive(Debug, Clone)]
pub struct SourceState {
    /// Volume to restore to; tracks the live volume while idle and is
    /// frozen from trigger until the cycle completes
    baseline_volume: f64,
    /// Current phase
    phase: ProtectionPhase,
    /// When protection was entered (or last re-armed)
    trigger_time: Option<Instant>,
    /// The loudness that tripped protection, kept for display
    trigger_loudness: Option<f64>,
    /// Consecutive ticks the predicted loudness stayed below safe level
    consecutive_safe_ticks: u32,
    /// Active restore ramp, present only while restoring a lowered source
    restore: Option<RestoreCurve>,
    /// Consecutive ticks the observed state disagreed with the intent
    failed_ticks: u32,
    /// Whether the current disagreement streak has been logged
    retry_warned: bool,
}

impl SourceState {
    /// Create state for a newly observed source
    pub fn new(initial_volume: f64) -> Self {
        Self {
            baseline_volume: initial_volume.clamp(0.0, 1.0),
            phase: ProtectionPhase::Idle,
            trigger_time: None,
            trigger_loudness: None,
            consecutive_safe_ticks: 0,
            restore: None,
            failed_ticks: 0,
            retry_warned: false,
        }
    }

    /// Current phase
    pub fn phase(&self) -> ProtectionPhase {
        self.phase
    }

    /// Volume this source restores to
    pub fn baseline_volume(&self) -> f64 {
        self.baseline_volume
    }

    /// The loudness that tripped the current protection cycle
    pub fn trigger_loudness(&self) -> Option<f64> {
        self.trigger_loudness
    }

    /// Consecutive predicted-safe ticks counted so far
    pub fn consecutive_safe_ticks(&self) -> u32 {
        self.consecutive_safe_ticks
    }

    /// How long this source has been in its protection cycle
    pub fn held_for(&self, now: Instant) -> Option<Duration> {
        self.trigger_time.map(|t| now.duration_since(t))
    }

    /// Advance the state machine by one tick
    ///
    /// Returns the commands the engine should execute for this source.
    pub fn advance(&mut self, id: &SourceId, input: &TickInput<'_>) -> Vec<Command> {
        match self.phase {
            ProtectionPhase::Idle => self.idle_tick(id, input),
            ProtectionPhase::Triggered => self.triggered_tick(id, input),
            ProtectionPhase::Holding => self.holding_tick(id, input),
            ProtectionPhase::Checking => self.checking_tick(id, input),
            ProtectionPhase::Restoring => self.restoring_tick(id, input),
        }
    }

    /// Unconditionally return this source to baseline, whatever the phase
    ///
    /// Used for the shutdown restore. Returns the commands to execute;
    /// sources already idle need none.
    pub fn force_restore(&mut self, id: &SourceId) -> Vec<Command> {
        if self.phase == ProtectionPhase::Idle {
            return Vec::new();
        }

        info!(
            "Forcing {} back to baseline {:.0}%",
            id,
            self.baseline_volume * 100.0
        );
        let commands = vec![
            Command::set_volume(id.clone(), self.baseline_volume),
            Command::set_mute(id.clone(), false),
        ];
        self.reset_cycle();
        commands
    }

    fn idle_tick(&mut self, id: &SourceId, input: &TickInput<'_>) -> Vec<Command> {
        // While idle the live volume is the restore point
        self.baseline_volume = input.reading.session_volume;

        if input.live_loudness > input.config.threshold {
            return self.trigger(id, input, input.live_loudness);
        }

        Vec::new()
    }

    fn triggered_tick(&mut self, id: &SourceId, input: &TickInput<'_>) -> Vec<Command> {
        if !self.attenuation_observed(&input.reading, input.config) {
            self.note_unconverged(id, "protected");
            return vec![self.attenuation_command(id, input.config)];
        }

        self.failed_ticks = 0;
        self.retry_warned = false;

        // Confirmation time counts toward the dwell, which runs from the
        // trigger instant
        if self.hold_elapsed(input) {
            debug!("Hold already elapsed for {}; starting restore checks", id);
            self.phase = ProtectionPhase::Checking;
        } else {
            self.phase = ProtectionPhase::Holding;
        }

        Vec::new()
    }

    fn holding_tick(&mut self, id: &SourceId, input: &TickInput<'_>) -> Vec<Command> {
        if !self.attenuation_observed(&input.reading, input.config) {
            self.note_unconverged(id, "protected");
            return vec![self.attenuation_command(id, input.config)];
        }

        self.failed_ticks = 0;
        self.retry_warned = false;

        if self.hold_elapsed(input) {
            debug!("Hold complete for {}; starting restore checks", id);
            self.phase = ProtectionPhase::Checking;
            self.consecutive_safe_ticks = 0;
        }

        Vec::new()
    }

    fn checking_tick(&mut self, id: &SourceId, input: &TickInput<'_>) -> Vec<Command> {
        if !self.attenuation_observed(&input.reading, input.config) {
            self.note_unconverged(id, "protected");
            return vec![self.attenuation_command(id, input.config)];
        }

        self.failed_ticks = 0;
        self.retry_warned = false;

        let predicted = input.predicted_loudness;
        let config = input.config;

        if predicted > config.threshold {
            // Still effectively loud, just measured predictively; re-arm
            // the hold instead of ever letting this restore
            debug!(
                "Predicted loudness {:.0}% re-triggered {} during checking",
                predicted * 100.0,
                id
            );
            return self.trigger(id, input, predicted);
        }

        if predicted > config.safe_level {
            self.consecutive_safe_ticks = 0;
        } else if predicted < config.safe_level {
            self.consecutive_safe_ticks += 1;
            if self.consecutive_safe_ticks >= config.stability_ticks {
                return self.begin_restore(id, input);
            }
        }

        Vec::new()
    }

    fn restoring_tick(&mut self, id: &SourceId, input: &TickInput<'_>) -> Vec<Command> {
        let config = input.config;

        // A real spike takes priority over finishing a cosmetic fade
        if input.live_loudness > config.threshold {
            debug!("Live loudness spiked while restoring {}; re-triggering", id);
            return self.trigger(id, input, input.live_loudness);
        }

        match config.action {
            ProtectAction::Mute => {
                if input.reading.muted {
                    // Unmute has not taken effect yet
                    self.note_unconverged(id, "restored");
                    return vec![Command::set_mute(id.clone(), false)];
                }
                self.complete_restore(id);
                Vec::new()
            }
            ProtectAction::Lower => {
                if self.restore.is_none() {
                    self.restore = Some(RestoreCurve::new(
                        config.restore_mode,
                        input.reading.session_volume,
                        self.baseline_volume,
                        config.restore_steps,
                    ));
                }

                let ramp_done = self
                    .restore
                    .as_ref()
                    .is_some_and(|curve| curve.is_complete());

                if ramp_done {
                    if (input.reading.session_volume - self.baseline_volume).abs()
                        <= VOLUME_EPSILON
                    {
                        self.complete_restore(id);
                        return Vec::new();
                    }
                    // Final write has not landed yet; keep asserting it
                    self.note_unconverged(id, "restored");
                    return vec![Command::set_volume(id.clone(), self.baseline_volume)];
                }

                let next = match self.restore.as_mut() {
                    Some(curve) => curve.advance(),
                    None => self.baseline_volume,
                };
                vec![Command::set_volume(id.clone(), next)]
            }
        }
    }

    /// Enter (or re-enter) protection
    ///
    /// The baseline is deliberately not touched: on a fresh trigger it was
    /// captured by the idle tracking one line earlier, and on a re-trigger
    /// the attenuated level must never be adopted as the restore point.
    fn trigger(&mut self, id: &SourceId, input: &TickInput<'_>, loudness: f64) -> Vec<Command> {
        info!(
            "Protection triggered for {}: loudness {:.0}% exceeds threshold {:.0}%",
            id,
            loudness * 100.0,
            input.config.threshold * 100.0
        );

        self.phase = ProtectionPhase::Triggered;
        self.trigger_time = Some(input.now);
        self.trigger_loudness = Some(loudness);
        self.consecutive_safe_ticks = 0;
        self.restore = None;
        self.failed_ticks = 0;
        self.retry_warned = false;

        vec![self.attenuation_command(id, input.config)]
    }

    fn begin_restore(&mut self, id: &SourceId, input: &TickInput<'_>) -> Vec<Command> {
        info!(
            "Restoring {} toward baseline {:.0}%",
            id,
            self.baseline_volume * 100.0
        );
        self.phase = ProtectionPhase::Restoring;

        match input.config.action {
            ProtectAction::Mute => {
                // Volume never moved for a muted source; restoration is
                // just the unmute
                vec![Command::set_mute(id.clone(), false)]
            }
            ProtectAction::Lower => {
                let mut curve = RestoreCurve::new(
                    input.config.restore_mode,
                    input.reading.session_volume,
                    self.baseline_volume,
                    input.config.restore_steps,
                );
                let next = curve.advance();
                self.restore = Some(curve);
                vec![Command::set_volume(id.clone(), next)]
            }
        }
    }

    fn complete_restore(&mut self, id: &SourceId) {
        info!(
            "Source {} restored to baseline {:.0}%",
            id,
            self.baseline_volume * 100.0
        );
        self.reset_cycle();
    }

    fn reset_cycle(&mut self) {
        self.phase = ProtectionPhase::Idle;
        self.trigger_time = None;
        self.trigger_loudness = None;
        self.consecutive_safe_ticks = 0;
        self.restore = None;
        self.failed_ticks = 0;
        self.retry_warned = false;
    }

    fn attenuation_command(&self, id: &SourceId, config: &LimiterConfig) -> Command {
        match config.action {
            ProtectAction::Mute => Command::set_mute(id.clone(), true),
            ProtectAction::Lower => Command::set_volume(id.clone(), config.lower_percent),
        }
    }

    fn attenuation_observed(&self, reading: &LevelReading, config: &LimiterConfig) -> bool {
        match config.action {
            ProtectAction::Mute => reading.muted,
            ProtectAction::Lower => {
                (reading.session_volume - config.lower_percent).abs() <= VOLUME_EPSILON
            }
        }
    }

    fn hold_elapsed(&self, input: &TickInput<'_>) -> bool {
        match self.trigger_time {
            Some(t) => input.now.duration_since(t) >= input.config.hold_duration(),
            None => true,
        }
    }

    fn note_unconverged(&mut self, id: &SourceId, toward: &str) {
        self.failed_ticks += 1;
        if self.failed_ticks >= RETRY_WARN_TICKS && !self.retry_warned {
            warn!(
                "Source {} has not converged to its {} state after {} ticks; still retrying",
                id, toward, self.failed_ticks
            );
            self.retry_warned = true;
        }
    }
}
