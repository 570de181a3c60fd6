//! Text codecs for envelopes.
//!
//! Browsers speak WebSocket text frames, so a codec maps values to and
//! from `String` rather than raw bytes. The server is generic over
//! [`Codec`]; [`JsonCodec`] is the only implementation shipped today.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Turns wire values into text frames and back.
pub trait Codec: Send + Sync + 'static {
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError>;

    fn decode<T: DeserializeOwned>(&self, text: &str) -> Result<T, ProtocolError>;
}

/// `serde_json` backed codec.
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        serde_json::to_string(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, text: &str) -> Result<T, ProtocolError> {
        serde_json::from_str(text).map_err(ProtocolError::Decode)
    }
}
