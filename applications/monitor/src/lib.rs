//! earguard Monitor
//!
//! Runnable front end for the protection engine: configuration loading,
//! the polling runner, and a simulated audio endpoint for demos and
//! development on machines without a supported backend.
//!
//! This library exposes the components for testing purposes.

pub mod config;
pub mod error;
pub mod runner;
pub mod sim;

// Re-export commonly used types for convenience
pub use config::MonitorConfig;
pub use error::{MonitorError, Result};
pub use runner::{run_until_shutdown, Display};
pub use sim::SimulatedEndpoint;
