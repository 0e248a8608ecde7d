//! Model gateway error types.
//!
//! All errors implement `std::error::Error` via `thiserror`. None of them cross
//! the gateway boundary as `Err` — [`GatewayError::into_response`] folds each
//! one into the `Error` variant of [`ModelResponse`] with its retry flag.

use thiserror::Error;

use super::types::ModelResponse;

/// Errors that can occur during a gateway round trip.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No API key configured. Checked before any network activity.
    #[error("credentials missing")]
    CredentialsMissing,

    /// `send` was called with an empty history.
    #[error("conversation history is empty")]
    EmptyHistory,

    /// TCP/HTTP connection to the generation endpoint failed.
    #[error("Network error: {reason}")]
    ConnectionFailed { endpoint: String, reason: String },

    /// The endpoint did not respond within the configured timeout.
    #[error("Network error: request timed out after {duration_secs}s")]
    Timeout { duration_secs: u64 },

    /// The response body could not be read off the wire.
    #[error("Network error: failed to read response body: {reason}")]
    BodyRead { reason: String },

    /// Non-2xx HTTP response.
    #[error("API Error {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The body was not the JSON shape we expect.
    #[error("malformed response: {reason}")]
    MalformedResponse { reason: String },

    /// `candidates` missing or empty.
    #[error("No candidates received from API.")]
    EmptyCandidates,

    /// The model emitted a function call on a request that offered no tools.
    #[error("model requested '{name}' but tools were not offered")]
    UnexpectedFunctionCall { name: String },

    /// Configuration loading or validation error.
    #[error("config error: {reason}")]
    ConfigError { reason: String },
}

impl GatewayError {
    /// Whether a caller could reasonably retry the same request.
    ///
    /// Only network-layer failures qualify. Application-layer errors (bad
    /// request, empty candidates, protocol violations) would fail again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GatewayError::ConnectionFailed { .. }
                | GatewayError::Timeout { .. }
                | GatewayError::BodyRead { .. }
        )
    }

    /// Fold this error into the `Error` response variant.
    pub fn into_response(self) -> ModelResponse {
        ModelResponse::Error {
            retryable: self.is_retryable(),
            message: self.to_string(),
        }
    }
}
