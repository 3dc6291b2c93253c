//! earguard Core
//!
//! Platform-agnostic core types, traits, and error handling for earguard.
//!
//! This crate provides the foundational building blocks shared by the
//! protection engine and by every endpoint backend (simulated or real).
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `SourceId`, `SourceInfo`, `LevelReading`, `Command`
//! - **Collaborator Traits**: `LevelProbe`, `VolumeActuator`
//! - **Error Handling**: Unified `EndpointError` and `Result` types
//!
//! The protection engine never talks to an audio backend directly. It sees
//! the world only through the two collaborator traits, which keeps the
//! control loop testable with in-memory fakes and portable across backends.
//!
//! # Example
//!
//! ```rust
//! use earguard_core::types::{SourceId, SourceInfo, SourceKind};
//!
//! let id = SourceId::new("spotify.exe");
//! let info = SourceInfo::new(id.clone(), SourceKind::ApplicationStream, "Spotify");
//!
//! assert_eq!(info.id, id);
//! assert_eq!(info.kind.as_str(), "application_stream");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::{EndpointError, Result};
pub use traits::{LevelProbe, VolumeActuator};
pub use types::{Command, CommandOp, LevelReading, SourceId, SourceInfo, SourceKind};
