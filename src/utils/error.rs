//! The `error` module defines the error type shared by every layer of
//! `popsub-udp`.
//!
//! The broker turns `Permission`, `NotFound` and `Conflict` into typed error
//! frames sent back to the origin. `Protocol` errors are dropped silently
//! by the broker. `Transport` failures are logged and, on the actor side,
//! trigger a reconnect.

use std::io;

use thiserror::Error;

use crate::protocol::MessageType;

pub type Result<T> = std::result::Result<T, PopsubError>;

#[derive(Debug, Error)]
pub enum PopsubError {
    /// Malformed or undecodable frame.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Sender has the wrong role for the operation, or does not own the topic.
    #[error("{0}")]
    Permission(String),

    /// Unknown client or topic.
    #[error("{0}")]
    NotFound(String),

    /// Topic already exists.
    #[error("{0}")]
    Conflict(String),

    #[error("transport error: {0}")]
    Transport(#[from] io::Error),

    #[error("compression error: {0}")]
    Compression(String),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("no response within {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// An error frame received from the broker.
    #[error("{kind:?}: {message}")]
    Rejected { kind: MessageType, message: String },

    #[error("sink error: {0}")]
    Sink(String),
}

impl PopsubError {
    pub fn protocol<S: Into<String>>(message: S) -> Self {
        Self::Protocol(message.into())
    }

    pub fn permission<S: Into<String>>(message: S) -> Self {
        Self::Permission(message.into())
    }

    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::NotFound(message.into())
    }

    pub fn conflict<S: Into<String>>(message: S) -> Self {
        Self::Conflict(message.into())
    }
}

impl From<serde_json::Error> for PopsubError {
    fn from(err: serde_json::Error) -> Self {
        Self::Protocol(format!("invalid JSON body: {err}"))
    }
}
