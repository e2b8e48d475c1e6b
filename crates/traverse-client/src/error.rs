//! Error types for the HTTP client.
//!
//! [`ClientError`] stays inside this crate's boundary: every public
//! [`Arbiter`](traverse_core::arbiter::Arbiter) call converts it into an
//! [`ArbiterError`] class the vehicles know how to handle.

use traverse_core::arbiter::ArbiterError;
use traverse_types::UnknownVariant;

/// Substring the server uses when a scout flight is too long.
pub const TOO_FAR_MARKER: &str = "cannot fly that far";

/// Errors that can occur while talking to the game server.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The HTTP client could not be built.
    #[error("HTTP client setup failed: {0}")]
    Setup(String),

    /// The request never got a response (connect, timeout, body read).
    #[error("request to {path} failed: {source}")]
    Request {
        /// Endpoint path.
        path: &'static str,
        /// Underlying transport error.
        source: reqwest::Error,
    },

    /// The server throttled the request.
    #[error("rate limited on {path}")]
    RateLimited {
        /// Endpoint path.
        path: &'static str,
    },

    /// The server answered with a non-success status.
    #[error("{path} returned {status}: {detail}")]
    Status {
        /// Endpoint path.
        path: &'static str,
        /// HTTP status code.
        status: u16,
        /// Problem detail text, or the raw body.
        detail: String,
    },

    /// A success body was not valid JSON for the endpoint.
    #[error("invalid response from {path}: {source}")]
    Json {
        /// Endpoint path.
        path: &'static str,
        /// Decoder error.
        source: serde_json::Error,
    },

    /// A field held a value outside its enumeration.
    #[error("invalid field in response: {0}")]
    Field(#[from] UnknownVariant),
}

impl From<ClientError> for ArbiterError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::RateLimited { .. } => Self::RateLimited,
            ClientError::Setup(_) | ClientError::Request { .. } => Self::Transport {
                message: err.to_string(),
            },
            ClientError::Status { status, detail, .. } => {
                if detail.contains(TOO_FAR_MARKER) {
                    Self::TooFar { message: detail }
                } else if status >= 500 {
                    Self::Transport {
                        message: format!("server error {status}: {detail}"),
                    }
                } else {
                    Self::Rejected { message: detail }
                }
            }
            ClientError::Json { .. } | ClientError::Field(_) => Self::Decode {
                message: err.to_string(),
            },
        }
    }
}
