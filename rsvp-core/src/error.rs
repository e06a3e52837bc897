//! Error types for discord-rsvp.

use thiserror::Error;

/// Errors that can occur in rsvp operations.
#[derive(Error, Debug)]
pub enum RsvpError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown repeat value '{0}'. Only daily, weekly and never are allowed")]
    UnknownRepeat(String),

    #[error("Delivery error: {0}")]
    Delivery(String),

    #[error("Credential refresh failed: {0}")]
    Refresh(String),

    #[error("Unknown interaction command: {0}")]
    UnknownCommand(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for RsvpError {
    fn from(err: serde_json::Error) -> Self {
        RsvpError::Serialization(err.to_string())
    }
}

/// Result type alias for rsvp operations.
pub type RsvpResult<T> = Result<T, RsvpError>;
