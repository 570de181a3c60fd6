//! Errors raised while turning frames into envelopes and back.

/// Failure to encode, decode, or interpret a wire message.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(#[source] serde_json::Error),

    /// Well-formed, but not acceptable at this point of the conversation
    /// (for example anything other than a handshake as the first frame).
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    #[error("protocol version mismatch: expected {expected}, got {got}")]
    VersionMismatch { expected: u32, got: u32 },
}
