//! The quiz entity model: rooms, questions, scores, and profiles.
//!
//! These types are shared by the room actors (which own and mutate them)
//! and the wire layer (which serializes snapshots of them). Field names
//! are camelCase on the wire.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{PlayerId, RoomId};

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

/// Which flavour of questions a room plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    #[default]
    Trivia,
    Code,
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trivia => f.write_str("trivia"),
            Self::Code => f.write_str("code"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

/// Lifecycle of a room.
///
/// ```text
/// Waiting → Playing → Finished
/// ```
///
/// There is no way back: a finished room stays finished until it is
/// destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    Waiting,
    Playing,
    Finished,
}

impl RoomStatus {
    /// Rooms that still show up in the default lobby listing.
    pub fn is_open(self) -> bool {
        matches!(self, Self::Waiting | Self::Playing)
    }

    pub fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Waiting, Self::Playing) | (Self::Playing, Self::Finished)
        )
    }
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => f.write_str("waiting"),
            Self::Playing => f.write_str("playing"),
            Self::Finished => f.write_str("finished"),
        }
    }
}

// ---------------------------------------------------------------------------
// Questions
// ---------------------------------------------------------------------------

/// A single quiz question. Never mutated once a game has started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub text: String,
    #[serde(rename = "type")]
    pub kind: GameMode,
    pub category: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    pub correct_answer: String,
    pub points: u32,
}

impl Question {
    /// The question as players see it while it is still in play.
    pub fn prompt(&self) -> QuestionPrompt {
        QuestionPrompt {
            text: self.text.clone(),
            kind: self.kind,
            category: self.category.clone(),
            difficulty: self.difficulty,
            points: self.points,
        }
    }
}

/// A [`Question`] without its answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionPrompt {
    pub text: String,
    #[serde(rename = "type")]
    pub kind: GameMode,
    pub category: String,
    pub difficulty: Difficulty,
    pub points: u32,
}

// ---------------------------------------------------------------------------
// Scoreboard
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreEntry {
    pub player_id: PlayerId,
    pub score: u32,
}

/// Per-player scores, kept in the same order as the room's roster.
///
/// Serialized as an array of `{playerId, score}` entries so the order
/// survives any JSON consumer. Scores are unsigned; penalties saturate
/// at zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scoreboard {
    entries: Vec<ScoreEntry>,
}

impl Scoreboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `player` with a score of zero. Returns `false` if they were
    /// already on the board.
    pub fn seed(&mut self, player: PlayerId) -> bool {
        if self.contains(player) {
            return false;
        }
        self.entries.push(ScoreEntry {
            player_id: player,
            score: 0,
        });
        true
    }

    /// Drops `player` from the board, returning their last score.
    pub fn remove(&mut self, player: PlayerId) -> Option<u32> {
        let index = self.entries.iter().position(|e| e.player_id == player)?;
        Some(self.entries.remove(index).score)
    }

    pub fn get(&self, player: PlayerId) -> Option<u32> {
        self.entries
            .iter()
            .find(|e| e.player_id == player)
            .map(|e| e.score)
    }

    pub fn contains(&self, player: PlayerId) -> bool {
        self.entries.iter().any(|e| e.player_id == player)
    }

    /// Applies a signed delta, flooring the result at zero. Returns the
    /// new score, or `None` if the player is not on the board.
    pub fn apply(&mut self, player: PlayerId, delta: i64) -> Option<u32> {
        let entry = self.entries.iter_mut().find(|e| e.player_id == player)?;
        let next = (i64::from(entry.score) + delta).clamp(0, i64::from(u32::MAX));
        entry.score = next as u32;
        Some(entry.score)
    }

    /// The first player, in board order, whose score is strictly greater
    /// than everyone before them. Ties go to the earlier player.
    pub fn leader(&self) -> Option<PlayerId> {
        let mut best: Option<ScoreEntry> = None;
        for entry in &self.entries {
            if best.is_none_or(|b| entry.score > b.score) {
                best = Some(*entry);
            }
        }
        best.map(|b| b.player_id)
    }

    pub fn players(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.entries.iter().map(|e| e.player_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScoreEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Rooms
// ---------------------------------------------------------------------------

/// Validated room configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSettings {
    pub max_players: usize,
    pub questions_per_game: usize,
    /// Seconds a buzzing player has to submit.
    pub answer_time_limit: u32,
    pub allow_teams: bool,
    pub game_mode: GameMode,
}

/// What a host sends to open a room. Every field is optional on the
/// wire; the registry decides which ones are required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    pub name: Option<String>,
    pub max_players: Option<usize>,
    pub questions_per_game: Option<usize>,
    pub answer_time_limit: Option<u32>,
    pub allow_teams: Option<bool>,
    pub game_mode: Option<GameMode>,
}

/// One room: roster, configuration, question set, and progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSession {
    pub id: RoomId,
    pub name: String,
    pub host: PlayerId,
    /// Join order. The first entry inherits the host seat.
    pub players: Vec<PlayerId>,
    #[serde(flatten)]
    pub settings: RoomSettings,
    pub status: RoomStatus,
    pub scores: Scoreboard,
    pub questions: Vec<Question>,
    pub current_question_index: usize,
    pub game_start_time: Option<DateTime<Utc>>,
    pub game_end_time: Option<DateTime<Utc>>,
    pub winner: Option<PlayerId>,
    pub created_at: DateTime<Utc>,
}

impl GameSession {
    /// A fresh waiting room with the host as its only player.
    pub fn new(
        id: RoomId,
        name: impl Into<String>,
        host: PlayerId,
        settings: RoomSettings,
        created_at: DateTime<Utc>,
    ) -> Self {
        let mut scores = Scoreboard::new();
        scores.seed(host);
        Self {
            id,
            name: name.into(),
            host,
            players: vec![host],
            settings,
            status: RoomStatus::Waiting,
            scores,
            questions: Vec::new(),
            current_question_index: 0,
            game_start_time: None,
            game_end_time: None,
            winner: None,
            created_at,
        }
    }

    pub fn is_member(&self, player: PlayerId) -> bool {
        self.players.contains(&player)
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= self.settings.max_players
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current_question_index)
    }

    /// A copy safe to hand to players: answers are blanked until the
    /// game is over.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.status != RoomStatus::Finished {
            for q in &mut copy.questions {
                q.correct_answer.clear();
            }
        }
        copy
    }
}

// ---------------------------------------------------------------------------
// Profiles
// ---------------------------------------------------------------------------

/// Long-lived progression for a player, kept outside any room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerProfile {
    pub player_id: PlayerId,
    pub xp: u64,
    pub badges: Vec<String>,
}

impl PlayerProfile {
    pub fn new(player_id: PlayerId) -> Self {
        Self {
            player_id,
            xp: 0,
            badges: Vec::new(),
        }
    }

    pub fn has_badge(&self, badge: &str) -> bool {
        self.badges.iter().any(|b| b == badge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pid(id: u64) -> PlayerId {
        PlayerId(id)
    }

    fn settings() -> RoomSettings {
        RoomSettings {
            max_players: 2,
            questions_per_game: 5,
            answer_time_limit: 10,
            allow_teams: false,
            game_mode: GameMode::Trivia,
        }
    }

    #[test]
    fn test_scoreboard_penalty_floors_at_zero() {
        let mut board = Scoreboard::new();
        board.seed(pid(1));
        assert_eq!(board.apply(pid(1), 10), Some(10));
        assert_eq!(board.apply(pid(1), -5), Some(5));
        assert_eq!(board.apply(pid(1), -5), Some(0));
        assert_eq!(board.apply(pid(1), -5), Some(0));
        assert_eq!(board.apply(pid(9), 3), None);
    }

    #[test]
    fn test_scoreboard_seed_is_idempotent_and_keeps_order() {
        let mut board = Scoreboard::new();
        assert!(board.seed(pid(3)));
        assert!(board.seed(pid(1)));
        assert!(!board.seed(pid(3)));
        assert_eq!(board.players().collect::<Vec<_>>(), vec![pid(3), pid(1)]);
    }

    #[test]
    fn test_scoreboard_leader_prefers_earlier_player_on_tie() {
        let mut board = Scoreboard::new();
        board.seed(pid(1));
        board.seed(pid(2));
        board.seed(pid(3));
        board.apply(pid(2), 20);
        board.apply(pid(3), 20);
        assert_eq!(board.leader(), Some(pid(2)));
    }

    #[test]
    fn test_scoreboard_leader_all_zero_is_first_player() {
        let mut board = Scoreboard::new();
        board.seed(pid(4));
        board.seed(pid(5));
        assert_eq!(board.leader(), Some(pid(4)));
        assert_eq!(Scoreboard::new().leader(), None);
    }

    #[test]
    fn test_scoreboard_serializes_as_ordered_entries() {
        let mut board = Scoreboard::new();
        board.seed(pid(2));
        board.seed(pid(1));
        board.apply(pid(1), 7);
        let value = serde_json::to_value(&board).unwrap();
        assert_eq!(
            value,
            json!([
                {"playerId": 2, "score": 0},
                {"playerId": 1, "score": 7}
            ])
        );
    }

    #[test]
    fn test_room_status_transitions_only_forward() {
        assert!(RoomStatus::Waiting.can_transition_to(RoomStatus::Playing));
        assert!(RoomStatus::Playing.can_transition_to(RoomStatus::Finished));
        assert!(!RoomStatus::Waiting.can_transition_to(RoomStatus::Finished));
        assert!(!RoomStatus::Finished.can_transition_to(RoomStatus::Waiting));
        assert!(!RoomStatus::Playing.can_transition_to(RoomStatus::Waiting));
    }

    #[test]
    fn test_game_session_flattens_settings_in_camel_case() {
        let session = GameSession::new(RoomId(7), "friday", pid(1), settings(), Utc::now());
        let value = serde_json::to_value(&session).unwrap();
        assert_eq!(value["maxPlayers"], 2);
        assert_eq!(value["questionsPerGame"], 5);
        assert_eq!(value["gameMode"], "trivia");
        assert_eq!(value["status"], "waiting");
        assert_eq!(value["currentQuestionIndex"], 0);
        assert_eq!(value["scores"], json!([{"playerId": 1, "score": 0}]));
    }

    #[test]
    fn test_redacted_hides_answers_until_finished() {
        let mut session = GameSession::new(RoomId(1), "r", pid(1), settings(), Utc::now());
        session.questions.push(Question {
            text: "What is 1 + 2?".into(),
            kind: GameMode::Trivia,
            category: "Math".into(),
            difficulty: Difficulty::Easy,
            correct_answer: "3".into(),
            points: 10,
        });
        session.status = RoomStatus::Playing;
        assert_eq!(session.redacted().questions[0].correct_answer, "");

        session.status = RoomStatus::Finished;
        assert_eq!(session.redacted().questions[0].correct_answer, "3");
    }

    #[test]
    fn test_create_request_accepts_missing_fields() {
        let req: CreateRoomRequest =
            serde_json::from_value(json!({"name": "quiz night", "maxPlayers": 4})).unwrap();
        assert_eq!(req.name.as_deref(), Some("quiz night"));
        assert_eq!(req.max_players, Some(4));
        assert_eq!(req.questions_per_game, None);
        assert_eq!(req.game_mode, None);
    }

    #[test]
    fn test_question_type_field_name() {
        let q: Question = serde_json::from_value(json!({
            "text": "t",
            "type": "code",
            "category": "JavaScript",
            "correctAnswer": "12",
            "points": 10
        }))
        .unwrap();
        assert_eq!(q.kind, GameMode::Code);
        assert_eq!(q.difficulty, Difficulty::Medium);
    }
}
