/// Monitor error types
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MonitorError>;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Limiter error: {0}")]
    Limiter(#[from] earguard_limiter::LimiterError),

    #[error("Endpoint error: {0}")]
    Endpoint(#[from] earguard_core::EndpointError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
