/// Collaborator traits for earguard
use crate::error::Result;
use crate::types::{SourceId, SourceInfo};

/// Read access to the audio backend
///
/// Implementers expose which sources exist and what they currently sound
/// like. All methods are synchronous and are only ever called from the
/// engine's tick loop, so implementations may hold backend handles without
/// internal locking.
pub trait LevelProbe: Send {
    /// Enumerate the sources currently worth monitoring
    ///
    /// The engine calls this every tick; sources absent from the returned
    /// list are considered gone and their protection state is dropped.
    ///
    /// # Errors
    /// Returns an error if the backend cannot be queried at all
    fn enumerate_sources(&mut self) -> Result<Vec<SourceInfo>>;

    /// Read a source's instantaneous peak amplitude in `[0.0, 1.0]`
    ///
    /// Where the backend supports it, the peak is reported pre-fader so it
    /// stays meaningful while the source is attenuated.
    ///
    /// # Errors
    /// Returns `SourceGone` if the source vanished, or a backend error
    fn read_peak(&mut self, id: &SourceId) -> Result<f64>;

    /// Read a source's own volume scalar in `[0.0, 1.0]`
    ///
    /// # Errors
    /// Returns `SourceGone` if the source vanished, or a backend error
    fn read_volume(&mut self, id: &SourceId) -> Result<f64>;

    /// Read the device master volume scalar in `[0.0, 1.0]`
    ///
    /// # Errors
    /// Returns an error if the device endpoint cannot be queried
    fn read_master_volume(&mut self) -> Result<f64>;

    /// Read whether a source is currently muted
    ///
    /// # Errors
    /// Returns `SourceGone` if the source vanished, or a backend error
    fn read_mute(&mut self, id: &SourceId) -> Result<bool>;
}

/// Write access to the audio backend
///
/// Implementers apply the engine's protection commands. Calls must be
/// idempotent: setting an already-muted source to muted is a no-op, not an
/// error.
pub trait VolumeActuator: Send {
    /// Set a source's volume scalar
    ///
    /// # Arguments
    /// * `level` - Target volume in `[0.0, 1.0]`
    ///
    /// # Errors
    /// Returns `SourceGone` if the source vanished, or a backend error
    fn set_volume(&mut self, id: &SourceId, level: f64) -> Result<()>;

    /// Mute or unmute a source
    ///
    /// # Errors
    /// Returns `SourceGone` if the source vanished, or a backend error
    fn set_mute(&mut self, id: &SourceId, muted: bool) -> Result<()>;
}
