//! Identities and the envelope every frame travels in.
//!
//! A frame on the socket is always one [`Envelope`]. Its [`Payload`] is
//! one of three families:
//!
//! - [`SystemMessage`]: connection plumbing and request/response room
//!   operations (create, join, start, ...), including error replies.
//! - [`ClientEvent`]: real-time events a player emits inside a room.
//! - [`RoomBroadcast`]: an event published on a room's topic.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::events::{ClientEvent, ServerEvent};
use crate::model::{CreateRoomRequest, GameSession, PlayerProfile, RoomStatus};

/// Version a client must announce in its handshake.
pub const PROTOCOL_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Identity of an authenticated player. Serialized as a bare number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// Identity of a room. Allocated by the registry, never reused within a
/// process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub u64);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// SystemMessage
// ---------------------------------------------------------------------------

/// Connection plumbing and room requests with their replies.
///
/// Requests travel client → server and are answered by exactly one reply
/// (or an `Error`). Internally tagged by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum SystemMessage {
    // -- Connection lifecycle --
    Handshake {
        version: u32,
        token: Option<String>,
    },
    HandshakeAck {
        player_id: PlayerId,
        /// Milliseconds since the server started.
        server_time: u64,
    },
    Disconnect {
        reason: String,
    },
    Heartbeat {
        client_time: u64,
    },
    HeartbeatAck {
        client_time: u64,
        server_time: u64,
    },

    // -- Room requests --
    CreateRoom(CreateRoomRequest),
    JoinGame {
        room_id: RoomId,
    },
    LeaveGame {
        room_id: RoomId,
    },
    StartGame {
        room_id: RoomId,
    },
    GetRoom {
        room_id: RoomId,
    },
    /// Without a filter, lists rooms that are waiting or playing.
    ListRooms {
        #[serde(default)]
        status: Option<RoomStatus>,
    },
    GetProfile {
        player_id: PlayerId,
    },
    Leaderboard {
        #[serde(default)]
        limit: Option<usize>,
    },

    // -- Replies --
    /// Reply to create, join, and get.
    Room {
        room: Box<GameSession>,
    },
    RoomLeft {
        room_id: RoomId,
    },
    GameStarting {
        room_id: RoomId,
    },
    RoomList {
        rooms: Vec<GameSession>,
    },
    Profile {
        profile: PlayerProfile,
    },
    LeaderboardList {
        entries: Vec<PlayerProfile>,
    },

    /// `code` follows HTTP conventions: 400 invalid input, 401 bad
    /// credentials, 403 not allowed, 404 unknown room or player,
    /// 409 conflicting room state, 502 a collaborator failed.
    Error {
        code: u16,
        message: String,
    },
}

// ---------------------------------------------------------------------------
// Payload / Envelope
// ---------------------------------------------------------------------------

/// An event published on a room's topic, labelled with the room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomBroadcast {
    pub room_id: RoomId,
    pub event: ServerEvent,
}

/// Adjacently tagged: `{"type": "Client", "data": {"event": "playerBuzzed", ...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Payload {
    System(SystemMessage),
    Client(ClientEvent),
    Server(RoomBroadcast),
}

/// The top-level frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Per-sender counter. The server numbers every frame it sends on a
    /// connection, starting at 0 for the handshake ack.
    pub seq: u64,
    /// Milliseconds since the sender started.
    pub timestamp: u64,
    pub payload: Payload,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ids_serialize_as_plain_numbers() {
        assert_eq!(serde_json::to_string(&PlayerId(42)).unwrap(), "42");
        assert_eq!(serde_json::to_string(&RoomId(7)).unwrap(), "7");
        let back: PlayerId = serde_json::from_str("42").unwrap();
        assert_eq!(back, PlayerId(42));
    }

    #[test]
    fn test_ids_display_with_prefix() {
        assert_eq!(PlayerId(42).to_string(), "P-42");
        assert_eq!(RoomId(7).to_string(), "R-7");
    }

    #[test]
    fn test_handshake_json_shape() {
        let msg = SystemMessage::Handshake {
            version: 1,
            token: Some("abc".into()),
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value, json!({"type": "Handshake", "version": 1, "token": "abc"}));
    }

    #[test]
    fn test_handshake_ack_uses_camel_case_fields() {
        let msg = SystemMessage::HandshakeAck {
            player_id: PlayerId(3),
            server_time: 10,
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["playerId"], 3);
        assert_eq!(value["serverTime"], 10);
    }

    #[test]
    fn test_create_room_request_is_inlined() {
        let raw = json!({
            "type": "CreateRoom",
            "name": "Friday",
            "maxPlayers": 4,
            "questionsPerGame": 5
        });
        let msg: SystemMessage = serde_json::from_value(raw).unwrap();
        match msg {
            SystemMessage::CreateRoom(req) => {
                assert_eq!(req.name.as_deref(), Some("Friday"));
                assert_eq!(req.max_players, Some(4));
                assert_eq!(req.answer_time_limit, None);
            }
            other => panic!("expected CreateRoom, got {other:?}"),
        }
    }

    #[test]
    fn test_list_rooms_filter_defaults_to_none() {
        let msg: SystemMessage = serde_json::from_value(json!({"type": "ListRooms"})).unwrap();
        assert_eq!(msg, SystemMessage::ListRooms { status: None });
    }

    #[test]
    fn test_envelope_with_client_event() {
        let raw = json!({
            "seq": 4,
            "timestamp": 100,
            "payload": {
                "type": "Client",
                "data": {"event": "playerBuzzed", "roomId": 2, "playerId": 9}
            }
        });
        let env: Envelope = serde_json::from_value(raw).unwrap();
        assert_eq!(
            env.payload,
            Payload::Client(ClientEvent::PlayerBuzzed {
                room_id: RoomId(2),
                player_id: PlayerId(9),
            })
        );
    }

    #[test]
    fn test_envelope_with_room_broadcast() {
        let env = Envelope {
            seq: 1,
            timestamp: 5,
            payload: Payload::Server(RoomBroadcast {
                room_id: RoomId(2),
                event: ServerEvent::Roast {
                    message: "ouch".into(),
                },
            }),
        };
        let value = serde_json::to_value(&env).unwrap();
        assert_eq!(value["payload"]["type"], "Server");
        assert_eq!(value["payload"]["data"]["roomId"], 2);
        assert_eq!(
            value["payload"]["data"]["event"],
            json!({"event": "roast", "message": "ouch"})
        );
    }

    #[test]
    fn test_error_message_json_shape() {
        let msg = SystemMessage::Error {
            code: 409,
            message: "room R-1 is full".into(),
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!({"type": "Error", "code": 409, "message": "room R-1 is full"})
        );
    }
}
