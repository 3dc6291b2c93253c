//! The protection engine
//!
//! `LimiterEngine` owns the two collaborators and the per-source state
//! registry, and advances the whole system one tick at a time. The caller
//! owns the schedule: typically a timer loop calling `tick` every
//! `config.poll_interval()`, and `stop` once before exit.
//!
//! Fault policy, in one place:
//! - enumeration failure: keep existing state, return an empty report
//! - master volume read failure: reuse the last known value
//! - source gone during a read: evict that source, continue the tick
//! - any other per-source read failure: keep its state, skip it this
//!   tick; eviction would discard the baseline a restore still needs
//! - actuator command failure: log it; the state machine re-issues the
//!   command next tick because the observed state still disagrees
//!
//! None of these abort the loop. The only errors the engine ever returns
//! are invalid configuration (from `new`) and a failed shutdown restore
//! (from `stop`).

use std::collections::HashMap;
use std::time::Instant;

use earguard_core::{Command, CommandOp, LevelProbe, LevelReading, SourceId, VolumeActuator};
use tracing::{debug, error, info, warn};

use crate::config::LimiterConfig;
use crate::error::{LimiterError, Result};
use crate::estimator::LoudnessEstimator;
use crate::machine::{ProtectionPhase, SourceState, TickInput};
use crate::report::{FrameReport, SourceReport};

/// The adaptive loudness-protection control loop
///
/// Generic over its collaborators so backends and tests plug in without
/// touching the loop. Constructed once at startup; there are no ambient
/// globals anywhere in the protection path.
pub struct LimiterEngine<P, A> {
    config: LimiterConfig,
    estimator: LoudnessEstimator,
    probe: P,
    actuator: A,
    states: HashMap<SourceId, SourceState>,
    tick_count: u64,
    last_master: f64,
}

impl<P: LevelProbe, A: VolumeActuator> LimiterEngine<P, A> {
    /// Create an engine from a validated configuration
    ///
    /// # Errors
    /// Returns a configuration error before anything else runs; an engine
    /// that constructs successfully will never fail validation later.
    pub fn new(config: LimiterConfig, probe: P, actuator: A) -> Result<Self> {
        config.validate()?;
        let estimator = LoudnessEstimator::new(config.loudness_mode);

        Ok(Self {
            config,
            estimator,
            probe,
            actuator,
            states: HashMap::new(),
            tick_count: 0,
            last_master: 1.0,
        })
    }

    /// The configuration this engine runs with
    pub fn config(&self) -> &LimiterConfig {
        &self.config
    }

    /// Number of sources currently tracked
    pub fn tracked_sources(&self) -> usize {
        self.states.len()
    }

    /// Protection phase of a tracked source
    pub fn phase_of(&self, id: &SourceId) -> Option<ProtectionPhase> {
        self.states.get(id).map(|state| state.phase())
    }

    /// Run one tick at the current time
    pub fn tick(&mut self) -> FrameReport {
        self.tick_at(Instant::now())
    }

    /// Run one tick at an explicit timestamp
    ///
    /// Reads every enumerable source, advances each source's state machine
    /// exactly once, applies the emitted commands, and reports what
    /// happened. Sources are independent; evaluation order never affects
    /// the outcome.
    pub fn tick_at(&mut self, now: Instant) -> FrameReport {
        self.tick_count += 1;
        let tick = self.tick_count;

        let infos = match self.probe.enumerate_sources() {
            Ok(infos) => infos,
            Err(e) => {
                warn!("Source enumeration failed: {}; keeping existing state", e);
                return FrameReport {
                    tick,
                    master_volume: self.last_master,
                    sources: Vec::new(),
                    commands: Vec::new(),
                    dropped: Vec::new(),
                };
            }
        };

        // Evict state for sources no longer enumerable; a vanished source
        // cannot be left attenuated because it no longer exists
        let mut dropped: Vec<SourceId> = Vec::new();
        self.states.retain(|id, state| {
            let present = infos.iter().any(|info| &info.id == id);
            if !present {
                if state.phase().is_protected() {
                    warn!("Source {} vanished while {}", id, state.phase());
                } else {
                    debug!("Source {} vanished", id);
                }
                dropped.push(id.clone());
            }
            present
        });

        let master = match self.probe.read_master_volume() {
            Ok(v) => {
                let v = v.clamp(0.0, 1.0);
                self.last_master = v;
                v
            }
            Err(e) => {
                warn!(
                    "Master volume read failed: {}; using last known {:.2}",
                    e, self.last_master
                );
                self.last_master
            }
        };

        let estimator = self.estimator;
        let mut sources = Vec::with_capacity(infos.len());
        let mut commands: Vec<Command> = Vec::new();

        for info in &infos {
            let reading = match self.read_source(&info.id, master) {
                Ok(reading) => reading,
                Err(e) if e.is_source_gone() => {
                    if self.states.remove(&info.id).is_some() {
                        warn!("Dropping {} after it went away mid-read", info.id);
                    } else {
                        debug!("Source {} went away before first read", info.id);
                    }
                    dropped.push(info.id.clone());
                    continue;
                }
                Err(e) => {
                    if self.states.contains_key(&info.id) {
                        warn!("Read for {} failed: {}; keeping its state", info.id, e);
                    } else {
                        debug!("Skipping unreadable source {}: {}", info.id, e);
                    }
                    continue;
                }
            };

            let state = self.states.entry(info.id.clone()).or_insert_with(|| {
                debug!("Tracking new source {} ({})", info.id, info.name);
                SourceState::new(reading.session_volume)
            });

            // A muted source is audibly silent whatever its meter says
            let live = if reading.muted {
                0.0
            } else {
                estimator.estimate(
                    reading.raw_peak,
                    reading.session_volume,
                    reading.master_volume,
                )
            };
            let predicted = estimator.predict(
                reading.raw_peak,
                state.baseline_volume(),
                reading.master_volume,
            );

            let tick_input = TickInput {
                config: &self.config,
                now,
                reading,
                live_loudness: live,
                predicted_loudness: predicted,
            };
            let source_commands = state.advance(&info.id, &tick_input);

            sources.push(SourceReport {
                id: info.id.clone(),
                name: info.name.clone(),
                kind: info.kind,
                phase: state.phase(),
                loudness: live,
                predicted,
                baseline_volume: state.baseline_volume(),
                trigger_loudness: state.trigger_loudness(),
                held_secs: state.held_for(now).map(|d| d.as_secs_f64()),
            });

            for command in &source_commands {
                Self::execute(&mut self.actuator, command);
            }
            commands.extend(source_commands);
        }

        FrameReport {
            tick,
            master_volume: master,
            sources,
            commands,
            dropped,
        }
    }

    /// Restore every protected source to baseline and reset all state
    ///
    /// This is the clean-shutdown guarantee: whatever phase a source is
    /// in, it leaves unmuted and at its baseline volume. Must be called
    /// before the engine is dropped.
    ///
    /// # Errors
    /// Returns `ShutdownRestoreFailed` naming every source whose restore
    /// command failed; sources that disappeared are not failures.
    pub fn stop(&mut self) -> Result<()> {
        let protected = self
            .states
            .values()
            .filter(|state| state.phase().is_protected())
            .count();
        info!(
            "Stopping engine: restoring {} protected source(s)",
            protected
        );

        let mut failed: Vec<SourceId> = Vec::new();

        for (id, state) in &mut self.states {
            for command in state.force_restore(id) {
                let result = match command.op {
                    CommandOp::SetVolume { level } => {
                        self.actuator.set_volume(&command.source, level)
                    }
                    CommandOp::SetMute { muted } => {
                        self.actuator.set_mute(&command.source, muted)
                    }
                };

                match result {
                    Ok(()) => {}
                    Err(e) if e.is_source_gone() => {
                        debug!("Source {} already gone at shutdown", id);
                    }
                    Err(e) => {
                        error!("Shutdown restore for {} failed: {}", id, e);
                        if !failed.contains(id) {
                            failed.push(id.clone());
                        }
                    }
                }
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            Err(LimiterError::ShutdownRestoreFailed { sources: failed })
        }
    }

    fn read_source(&mut self, id: &SourceId, master: f64) -> earguard_core::Result<LevelReading> {
        let raw_peak = self.probe.read_peak(id)?;
        let session_volume = self.probe.read_volume(id)?;
        let muted = self.probe.read_mute(id)?;

        Ok(LevelReading::new(raw_peak, session_volume, master, muted).clamped())
    }

    fn execute(actuator: &mut A, command: &Command) {
        let result = match command.op {
            CommandOp::SetVolume { level } => actuator.set_volume(&command.source, level),
            CommandOp::SetMute { muted } => actuator.set_mute(&command.source, muted),
        };

        if let Err(e) = result {
            // The state machine sees the unchanged observation next tick
            // and re-issues the command
            warn!("Actuator command for {} failed: {}", command.source, e);
        }
    }
}
