// ============================================================================
// File: src/error.rs
// Errors surfaced by the completion client
// ============================================================================

use thiserror::Error;

/// Message used when the provider rejects a call without saying why
pub const FALLBACK_ERROR_MESSAGE: &str = "Failed to get response from OpenRouter";

/// Errors that can occur during a chat-completion call
#[derive(Debug, Error)]
pub enum LlmError {
    /// Network-level failure: DNS, TLS, connection reset
    #[error("transport error: {0}")]
    Transport(String),

    /// A header could not be encoded; retrying cannot help
    #[error("invalid request header: {0}")]
    InvalidHeader(String),

    /// Provider answered with a non-success status
    #[error("{message}")]
    Api { status: u16, message: String },

    /// Success status but the body was not a completion response
    #[error("failed to decode completion response: {0}")]
    Decode(String),

    /// Success status but no first choice to read
    #[error("completion response contained no choices")]
    EmptyResponse,
}

impl LlmError {
    /// Build an API error from a status and an optional provider message
    pub fn api(status: u16, message: Option<String>) -> Self {
        Self::Api {
            status,
            message: message.unwrap_or_else(|| FALLBACK_ERROR_MESSAGE.to_string()),
        }
    }

    /// Whether a caller could reasonably try the same call again.
    ///
    /// The client never retries on its own.
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            Self::InvalidHeader(_) | Self::Decode(_) | Self::EmptyResponse => false,
        }
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
