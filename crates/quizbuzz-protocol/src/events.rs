//! Real-time room events.
//!
//! [`ClientEvent`]s are what a connected player emits during a game;
//! [`ServerEvent`]s are what a room publishes on its topic. Both are
//! internally tagged by an `event` field whose value is the camelCase
//! event name, e.g. `{"event": "playerBuzzed", "roomId": 4, "playerId": 9}`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{GameSession, QuestionPrompt, Scoreboard};
use crate::{PlayerId, RoomId};

/// Inbound, fire-and-forget events. Success is never acknowledged; a
/// failing room operation comes back as a `SystemMessage::Error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    /// Subscribe to the room's topic. Membership is handled by the
    /// `JoinGame` request, not by this event.
    JoinRoom { room_id: RoomId },
    /// Unsubscribe from the room's topic.
    LeaveRoom { room_id: RoomId },
    PlayerBuzzed { room_id: RoomId, player_id: PlayerId },
    SubmitAnswer {
        room_id: RoomId,
        player_id: PlayerId,
        answer: String,
    },
    SendChatMessage {
        room_id: RoomId,
        text: String,
        sender: PlayerId,
    },
}

impl ClientEvent {
    pub fn room_id(&self) -> RoomId {
        match self {
            Self::JoinRoom { room_id }
            | Self::LeaveRoom { room_id }
            | Self::PlayerBuzzed { room_id, .. }
            | Self::SubmitAnswer { room_id, .. }
            | Self::SendChatMessage { room_id, .. } => *room_id,
        }
    }

    /// The identity the client claims to act as, if the event names one.
    pub fn claimed_player(&self) -> Option<PlayerId> {
        match self {
            Self::PlayerBuzzed { player_id, .. } | Self::SubmitAnswer { player_id, .. } => {
                Some(*player_id)
            }
            Self::SendChatMessage { sender, .. } => Some(*sender),
            Self::JoinRoom { .. } | Self::LeaveRoom { .. } => None,
        }
    }
}

/// The most recent score movement in the current question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreChange {
    pub player_id: PlayerId,
    /// Nominal delta: `+points` or `-5`, even if the floor at zero
    /// absorbed part of the penalty.
    pub delta: i64,
}

/// Everything a client needs to render the current question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundSnapshot {
    pub current_question: Option<QuestionPrompt>,
    pub current_question_index: usize,
    pub total_questions: usize,
    pub scores: Scoreboard,
    pub active_player: Option<PlayerId>,
    pub waiting_for_answer: bool,
    pub locked_players: Vec<PlayerId>,
    pub last_score_change: Option<ScoreChange>,
    pub last_roast: Option<String>,
    pub timer_start: Option<DateTime<Utc>>,
}

/// Events published on a room's topic, in the order the room produced
/// them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    PlayerJoined {
        player: PlayerId,
        room: Box<GameSession>,
    },
    PlayerLeft {
        player: PlayerId,
        room: Box<GameSession>,
    },
    GameStarted {
        room: Box<GameSession>,
    },
    StateUpdate(RoundSnapshot),
    /// Someone won the buzz.
    BuzzerSound,
    CorrectAnswer,
    IncorrectAnswer,
    BuzzerLockout {
        player_id: PlayerId,
    },
    Roast {
        message: String,
    },
    GameEnded {
        winner: Option<PlayerId>,
        final_scores: Scoreboard,
        session: Box<GameSession>,
    },
    ChatMessage {
        room_id: RoomId,
        sender: PlayerId,
        text: String,
        sent_at: DateTime<Utc>,
    },
}

impl ServerEvent {
    /// The wire name of this event, handy for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::PlayerJoined { .. } => "playerJoined",
            Self::PlayerLeft { .. } => "playerLeft",
            Self::GameStarted { .. } => "gameStarted",
            Self::StateUpdate(_) => "stateUpdate",
            Self::BuzzerSound => "buzzerSound",
            Self::CorrectAnswer => "correctAnswer",
            Self::IncorrectAnswer => "incorrectAnswer",
            Self::BuzzerLockout { .. } => "buzzerLockout",
            Self::Roast { .. } => "roast",
            Self::GameEnded { .. } => "gameEnded",
            Self::ChatMessage { .. } => "chatMessage",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_event_uses_event_tag_and_camel_case() {
        let ev: ClientEvent = serde_json::from_value(json!({
            "event": "submitAnswer",
            "roomId": 3,
            "playerId": 8,
            "answer": "42"
        }))
        .unwrap();
        assert_eq!(
            ev,
            ClientEvent::SubmitAnswer {
                room_id: RoomId(3),
                player_id: PlayerId(8),
                answer: "42".into(),
            }
        );
        assert_eq!(ev.room_id(), RoomId(3));
        assert_eq!(ev.claimed_player(), Some(PlayerId(8)));
    }

    #[test]
    fn test_subscribe_event_claims_no_player() {
        let ev: ClientEvent =
            serde_json::from_value(json!({"event": "joinRoom", "roomId": 5})).unwrap();
        assert_eq!(ev.claimed_player(), None);
    }

    #[test]
    fn test_unit_server_events_serialize_as_bare_tag() {
        let value = serde_json::to_value(ServerEvent::BuzzerSound).unwrap();
        assert_eq!(value, json!({"event": "buzzerSound"}));
    }

    #[test]
    fn test_buzzer_lockout_shape() {
        let value = serde_json::to_value(ServerEvent::BuzzerLockout {
            player_id: PlayerId(2),
        })
        .unwrap();
        assert_eq!(value, json!({"event": "buzzerLockout", "playerId": 2}));
    }

    #[test]
    fn test_state_update_flattens_snapshot() {
        let snapshot = RoundSnapshot {
            current_question: None,
            current_question_index: 1,
            total_questions: 5,
            scores: Scoreboard::new(),
            active_player: Some(PlayerId(4)),
            waiting_for_answer: true,
            locked_players: vec![PlayerId(1)],
            last_score_change: Some(ScoreChange {
                player_id: PlayerId(1),
                delta: -5,
            }),
            last_roast: None,
            timer_start: None,
        };
        let value = serde_json::to_value(ServerEvent::StateUpdate(snapshot)).unwrap();
        assert_eq!(value["event"], "stateUpdate");
        assert_eq!(value["activePlayer"], 4);
        assert_eq!(value["waitingForAnswer"], true);
        assert_eq!(value["lockedPlayers"], json!([1]));
        assert_eq!(value["lastScoreChange"], json!({"playerId": 1, "delta": -5}));
    }
}
