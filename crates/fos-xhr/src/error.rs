//! Error types

use crate::transport::ReadyState;

/// XHR proxy errors
#[derive(Debug, thiserror::Error)]
pub enum XhrError {
    #[error("Invalid state: {operation}() requires {expected:?}, found {found:?}")]
    InvalidState {
        operation: &'static str,
        expected: ReadyState,
        found: ReadyState,
    },

    #[error("Unsupported method: {0}")]
    UnsupportedMethod(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Unknown event type: {0}")]
    UnknownEvent(String),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Failure raised by the native transport
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct TransportError(pub String);

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Response coercion errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoerceError {
    #[error("Parse error: {0}")]
    Json(String),
}

impl From<serde_json::Error> for CoerceError {
    fn from(err: serde_json::Error) -> Self {
        CoerceError::Json(err.to_string())
    }
}
