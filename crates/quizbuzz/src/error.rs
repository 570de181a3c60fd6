//! Unified error type for the quizbuzz server.

use quizbuzz_protocol::ProtocolError;
use quizbuzz_room::RoomError;
use quizbuzz_transport::TransportError;

use crate::AuthError;

/// Top-level error wrapping every crate-specific error, so `?` works
/// across layers.
#[derive(Debug, thiserror::Error)]
pub enum QuizbuzzError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Room(#[from] RoomError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use quizbuzz_protocol::RoomId;

    #[test]
    fn test_from_transport_error() {
        let err: QuizbuzzError = TransportError::ConnectionClosed("gone".into()).into();
        assert!(matches!(err, QuizbuzzError::Transport(_)));
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err: QuizbuzzError = ProtocolError::InvalidMessage("bad".into()).into();
        assert!(matches!(err, QuizbuzzError::Protocol(_)));
    }

    #[test]
    fn test_from_room_error_keeps_message() {
        let err: QuizbuzzError = RoomError::NotFound(RoomId(3)).into();
        assert!(matches!(err, QuizbuzzError::Room(_)));
        assert_eq!(err.to_string(), "room R-3 not found");
    }

    #[test]
    fn test_from_auth_error() {
        let err: QuizbuzzError = AuthError::MissingToken.into();
        assert!(matches!(err, QuizbuzzError::Auth(AuthError::MissingToken)));
    }
}
