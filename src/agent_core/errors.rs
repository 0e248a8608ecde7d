//! Agent Core error types.
//!
//! Turns themselves never fail (they end in a `TurnOutcome`); these errors
//! cover the host around the engine.

use thiserror::Error;

/// Errors that can occur in the session host and its collaborators.
#[derive(Debug, Error)]
pub enum AgentError {
    /// A submit arrived while the previous turn was still unresolved.
    #[error("a turn is already in progress")]
    TurnInProgress,

    /// The host was closed.
    #[error("session host is closed")]
    Closed,

    /// Speech synthesis, capture or wake-word spotting failed.
    #[error("speech error: {reason}")]
    Speech { reason: String },

    /// The engine could not be built from configuration.
    #[error("configuration error: {reason}")]
    Config { reason: String },
}

impl From<crate::inference::errors::GatewayError> for AgentError {
    fn from(e: crate::inference::errors::GatewayError) -> Self {
        AgentError::Config {
            reason: e.to_string(),
        }
    }
}
