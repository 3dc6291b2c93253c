/// Core error types for earguard endpoint backends
use thiserror::Error;

use crate::types::SourceId;

/// Result type alias using `EndpointError`
pub type Result<T> = std::result::Result<T, EndpointError>;

/// Error type for probe and actuator operations
///
/// Every collaborator call the protection engine makes can fail at the
/// backend boundary. The engine treats `SourceGone` as an eviction signal
/// and everything else as a recoverable fault for the affected source.
#[derive(Error, Debug)]
pub enum EndpointError {
    /// The source disappeared between enumeration and access
    #[error("Source no longer present: {0}")]
    SourceGone(SourceId),

    /// The backend reported a failure
    #[error("Backend error: {0}")]
    Backend(String),

    /// The backend does not support the requested operation
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl EndpointError {
    /// Create a backend error
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Create an unsupported-operation error
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    /// Whether this error means the source should be evicted
    pub fn is_source_gone(&self) -> bool {
        matches!(self, Self::SourceGone(_))
    }
}
