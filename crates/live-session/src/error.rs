use crate::config::ConfigError;
use live_types::{AdapterError, Vendor};
use thiserror::Error;

/// Errors surfaced by live sessions.
#[derive(Debug, Error)]
pub enum LiveError {
    /// The connection could not be opened, or failed while open.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The vendor rejected the handshake, or it could not be completed.
    #[error("{vendor} handshake failed: {reason}")]
    Handshake { vendor: Vendor, reason: String },

    #[error("Failed to decode frame: {0}")]
    Decode(String),

    #[error("Failed to encode message: {0}")]
    Encode(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The session is not (or no longer) connected.
    #[error("Session is not connected")]
    NotConnected,

    #[error("Connection is closed")]
    Closed,
}

impl From<AdapterError> for LiveError {
    fn from(err: AdapterError) -> Self {
        match err {
            AdapterError::Decode(reason) => LiveError::Decode(reason),
            AdapterError::Encode(e) => LiveError::Encode(e.to_string()),
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for LiveError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        LiveError::Transport(err.to_string())
    }
}

pub type Result<T, E = LiveError> = std::result::Result<T, E>;
