use thiserror::Error;

/// Errors raised by a protocol adapter while encoding or decoding frames.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// An inbound frame could not be decoded.
    #[error("Failed to decode frame: {0}")]
    Decode(String),

    /// An outbound message could not be serialized.
    #[error("Failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

impl AdapterError {
    pub fn decode(reason: impl Into<String>) -> Self {
        Self::Decode(reason.into())
    }
}

pub type Result<T, E = AdapterError> = std::result::Result<T, E>;
