//! Shared vocabulary for quizbuzz: the entity model, room events, and
//! the JSON envelope that carries them over a WebSocket.
//!
//! # Feature flags
//!
//! - `json` (default): [`JsonCodec`] via `serde_json`.

mod codec;
mod error;
pub mod events;
pub mod model;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use events::{ClientEvent, RoundSnapshot, ScoreChange, ServerEvent};
pub use model::{
    CreateRoomRequest, Difficulty, GameMode, GameSession, PlayerProfile, Question,
    QuestionPrompt, RoomSettings, RoomStatus, ScoreEntry, Scoreboard,
};
pub use types::{
    Envelope, PROTOCOL_VERSION, Payload, PlayerId, RoomBroadcast, RoomId, SystemMessage,
};
