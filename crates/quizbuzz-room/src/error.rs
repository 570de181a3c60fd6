//! Error types for the room layer.

use quizbuzz_protocol::{PlayerId, RoomId};

/// Coarse classification of a [`RoomError`], used to pick a wire code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Forbidden,
    Upstream,
}

/// Errors returned to whoever requested a room operation. None of them
/// leave the room mutated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// Missing or out-of-range room settings.
    #[error("invalid room settings: {0}")]
    Validation(String),

    #[error("room {0} not found")]
    NotFound(RoomId),

    #[error("player {0} not in room {1}")]
    NotInRoom(PlayerId, RoomId),

    #[error("room {0} is full")]
    RoomFull(RoomId),

    #[error("player {0} already in room {1}")]
    AlreadyInRoom(PlayerId, RoomId),

    /// The room has left the waiting state.
    #[error("game in room {0} has already started")]
    AlreadyStarted(RoomId),

    #[error("room {room} needs at least {need} players to start, has {have}")]
    NotEnoughPlayers { room: RoomId, have: usize, need: usize },

    #[error("player {0} is not the host of room {1}")]
    NotHost(PlayerId, RoomId),

    /// The question provider failed, timed out, or returned the wrong
    /// number of questions.
    #[error("question source failed: {0}")]
    QuestionSource(String),

    /// The room's actor stopped between lookup and delivery.
    #[error("room {0} is unavailable")]
    Unavailable(RoomId),
}

impl RoomError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound(_) | Self::NotInRoom(..) | Self::Unavailable(_) => ErrorKind::NotFound,
            Self::RoomFull(_)
            | Self::AlreadyInRoom(..)
            | Self::AlreadyStarted(_)
            | Self::NotEnoughPlayers { .. } => ErrorKind::Conflict,
            Self::NotHost(..) => ErrorKind::Forbidden,
            Self::QuestionSource(_) => ErrorKind::Upstream,
        }
    }

    /// HTTP-style status code for the wire.
    pub fn code(&self) -> u16 {
        match self.kind() {
            ErrorKind::Validation => 400,
            ErrorKind::Forbidden => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::Upstream => 502,
        }
    }
}
