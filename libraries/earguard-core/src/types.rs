/// Shared types for earguard
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier for a monitored source
///
/// For application streams this is typically the process or session name,
/// for device endpoints the backend's device identifier. The engine only
/// requires it to be stable for the lifetime of the source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(String);

impl SourceId {
    /// Create a new source ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What kind of audio producer a source is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// A whole output device (endpoint volume and mute)
    DeviceEndpoint,
    /// A single application's audio session
    ApplicationStream,
}

impl SourceKind {
    /// Convert to string for display and persistence
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DeviceEndpoint => "device_endpoint",
            Self::ApplicationStream => "application_stream",
        }
    }

    /// Parse from string (as written by `as_str`)
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "device_endpoint" => Some(Self::DeviceEndpoint),
            "application_stream" => Some(Self::ApplicationStream),
            _ => None,
        }
    }
}

/// Descriptive information about a monitored source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceInfo {
    /// Stable identifier
    pub id: SourceId,

    /// Device endpoint or application stream
    pub kind: SourceKind,

    /// Human-readable name for logs and display
    pub name: String,
}

impl SourceInfo {
    /// Create a new source description
    pub fn new(id: SourceId, kind: SourceKind, name: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            name: name.into(),
        }
    }
}

/// One instantaneous measurement of a source
///
/// All scalar fields are fractions of full scale in `[0.0, 1.0]`.
/// `raw_peak` is the backend's instantaneous peak meter value, reported
/// pre-fader where the backend supports it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelReading {
    /// Instantaneous peak amplitude
    pub raw_peak: f64,

    /// The source's own volume scalar
    pub session_volume: f64,

    /// The device master volume scalar
    pub master_volume: f64,

    /// Whether the source is currently muted
    pub muted: bool,
}

impl LevelReading {
    /// Create a new reading
    pub fn new(raw_peak: f64, session_volume: f64, master_volume: f64, muted: bool) -> Self {
        Self {
            raw_peak,
            session_volume,
            master_volume,
            muted,
        }
    }

    /// Copy of this reading with every scalar clamped to `[0.0, 1.0]`
    ///
    /// Backends occasionally report transient values slightly outside the
    /// nominal range (driver quirks, float rounding). Clamping at the edge
    /// keeps the control math defined.
    pub fn clamped(&self) -> Self {
        Self {
            raw_peak: self.raw_peak.clamp(0.0, 1.0),
            session_volume: self.session_volume.clamp(0.0, 1.0),
            master_volume: self.master_volume.clamp(0.0, 1.0),
            muted: self.muted,
        }
    }
}

/// A single actuation the engine wants performed on a source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// The source to act on
    pub source: SourceId,

    /// What to do
    pub op: CommandOp,
}

impl Command {
    /// Command to set a source's volume scalar
    pub fn set_volume(source: SourceId, level: f64) -> Self {
        Self {
            source,
            op: CommandOp::SetVolume { level },
        }
    }

    /// Command to mute or unmute a source
    pub fn set_mute(source: SourceId, muted: bool) -> Self {
        Self {
            source,
            op: CommandOp::SetMute { muted },
        }
    }
}

/// The operation half of a `Command`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CommandOp {
    /// Set the source volume scalar
    SetVolume {
        /// Target volume in `[0.0, 1.0]`
        level: f64,
    },

    /// Mute or unmute the source
    SetMute {
        /// `true` to mute, `false` to unmute
        muted: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_id_from_string() {
        let id = SourceId::new("firefox.exe");
        assert_eq!(id.as_str(), "firefox.exe");
        assert_eq!(format!("{}", id), "firefox.exe");
    }

    #[test]
    fn source_kind_round_trips_through_string() {
        for kind in [SourceKind::DeviceEndpoint, SourceKind::ApplicationStream] {
            assert_eq!(SourceKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(SourceKind::from_str("loopback"), None);
    }

    #[test]
    fn reading_clamp_bounds_out_of_range_values() {
        let reading = LevelReading::new(1.7, -0.2, 0.5, false);
        let clamped = reading.clamped();
        assert_eq!(clamped.raw_peak, 1.0);
        assert_eq!(clamped.session_volume, 0.0);
        assert_eq!(clamped.master_volume, 0.5);
    }

    #[test]
    fn command_constructors_fill_op() {
        let id = SourceId::new("vlc");
        let cmd = Command::set_volume(id.clone(), 0.3);
        assert_eq!(cmd.op, CommandOp::SetVolume { level: 0.3 });

        let cmd = Command::set_mute(id, true);
        assert_eq!(cmd.op, CommandOp::SetMute { muted: true });
    }
}
