/// Unified error types for the SkyLens identity core
use thiserror::Error;

/// Failure taxonomy for identity resolution.
///
/// "Not found" is deliberately absent: an identifier that no source confirms
/// is a normal outcome and is represented as `Ok(None)` by every resolution
/// function, never as an error.
#[derive(Error, Debug, Clone)]
pub enum IdentityError {
    /// Input that cannot be interpreted as a handle or DID
    #[error("Malformed identifier: {0}")]
    MalformedInput(String),

    /// A network call itself failed (non-2xx, connection error, timeout,
    /// undecodable body)
    #[error("Transport failure: {0}")]
    Transport(String),

    /// The caller abandoned the request
    #[error("Request cancelled")]
    Cancelled,

    /// Configuration errors
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl IdentityError {
    /// Cancellation is distinguished so it is never logged as a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, IdentityError::Cancelled)
    }
}

/// Result type alias for identity operations
pub type IdentityResult<T> = Result<T, IdentityError>;
