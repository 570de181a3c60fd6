//! Room lifecycle and game flow for quizbuzz.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns its
//! [`GameSession`](quizbuzz_protocol::GameSession) and processes one
//! command at a time. Buzzes, answers, and timer events all pass through
//! that single queue.
//!
//! # Key types
//!
//! - [`RoomRegistry`]: creates, finds, lists, and deletes rooms
//! - [`RoomHandle`]: address of a running room actor
//! - [`BuzzArbiter`]: first-buzz-wins decision over a [`RoundState`]
//! - [`RewardEngine`]: XP and badges at game end
//! - [`Services`]: the external collaborators a room calls out to

mod arbiter;
mod broadcast;
pub mod builtin;
mod config;
mod error;
mod registry;
mod reward;
mod room;
mod round;
mod services;

pub use arbiter::{BuzzArbiter, BuzzOutcome, BuzzRejection};
pub use broadcast::Broadcaster;
pub use config::{RoomLimits, RoomTiming};
pub use error::{ErrorKind, RoomError};
pub use registry::RoomRegistry;
pub use reward::{
    CODE_WARRIOR, FIRST_VICTORY, PARTICIPATION_XP, PlayerReward, RewardEngine, RewardPlan,
    RewardSummary, SCORE_MASTER, SCORE_MASTER_THRESHOLD, WINNER_BONUS_XP,
};
pub use room::{
    AnswerOutcome, AnswerRejection, LeaveOutcome, MIN_PLAYERS_TO_START, RoomHandle, RoomView,
    WRONG_ANSWER_PENALTY,
};
pub use round::{RoundPhase, RoundState};
pub use services::{
    AnswerEvaluator, CollaboratorError, ProfileError, ProfileStore, QuestionProvider,
    RoastGenerator, Services,
};
