// crates/verity-core/src/error.rs

use thiserror::Error;

/// Protocol-wide error types for the Verity network.
///
/// Only `InputValidation` is ever surfaced by the engines to their callers.
/// The remaining variants describe collaborator failures that the engines
/// recover from locally (a dropped opinion, a fallback value).
#[derive(Debug, Error)]
pub enum VerityError {
    /// A request was missing required fields or carried out-of-range values.
    #[error("Invalid input: {0}")]
    InputValidation(String),

    /// A collaborator (validator transport, commitment module, ledger) failed.
    #[error("Collaborator error: {0}")]
    Collaborator(String),

    /// A bounded wait expired before the collaborator answered.
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid state transition (e.g. submitting to a closed round).
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Configuration could not be loaded or parsed.
    #[error("Config error: {0}")]
    Config(String),
}

impl VerityError {
    /// Shorthand used throughout the engines for rejected requests.
    pub fn invalid(msg: impl Into<String>) -> Self {
        VerityError::InputValidation(msg.into())
    }
}

impl From<serde_json::Error> for VerityError {
    fn from(e: serde_json::Error) -> Self {
        VerityError::Serialization(e.to_string())
    }
}
