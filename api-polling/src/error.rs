//! Error types for the api-polling crate.
//!
//! Fetch failures are not represented here: they are the caller's own error
//! type and are absorbed by the engine's failure policy.

/// Errors that can occur when driving a polling engine.
#[derive(Debug, thiserror::Error)]
pub enum PollingError {
    /// No Tokio runtime was supplied and none is running on this thread
    #[error("No Tokio runtime available to drive the polling loop")]
    NoRuntime,

    /// Invalid configuration provided
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Convenience type alias for Results using PollingError.
pub type Result<T> = std::result::Result<T, PollingError>;
