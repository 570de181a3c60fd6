//! External collaborators a room depends on.
//!
//! Question generation, answer judging, roast writing, and player
//! profiles all live outside the game core. Each is an async trait object
//! so deployments can plug in an LLM-backed judge or a database-backed
//! profile store; [`crate::builtin`] has simple in-process versions.
//!
//! Rooms await these calls inside their command loop, bounded by
//! [`RoomTiming::collaborator_timeout`](crate::RoomTiming).

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use quizbuzz_protocol::{GameMode, PlayerId, PlayerProfile, Question};

use crate::builtin::{CannedRoasts, InMemoryProfiles, SampleQuestions, SubstringEvaluator};

/// Failure of a question, evaluation, or roast collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollaboratorError {
    #[error("collaborator failed: {0}")]
    Failed(String),

    #[error("collaborator timed out after {0:?}")]
    Timeout(Duration),
}

/// Failure of the profile store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProfileError {
    #[error("no profile for player {0}")]
    UnknownPlayer(PlayerId),

    #[error("profile store error: {0}")]
    Storage(String),
}

/// Produces the question set for a game.
#[async_trait]
pub trait QuestionProvider: Send + Sync {
    /// Must return exactly `count` questions of the given mode.
    async fn generate(
        &self,
        mode: GameMode,
        count: usize,
    ) -> Result<Vec<Question>, CollaboratorError>;
}

/// Decides whether a submitted answer is correct.
#[async_trait]
pub trait AnswerEvaluator: Send + Sync {
    async fn evaluate(
        &self,
        question: &Question,
        answer: &str,
        mode: GameMode,
    ) -> Result<bool, CollaboratorError>;
}

/// Writes the jab shown after a wrong answer.
#[async_trait]
pub trait RoastGenerator: Send + Sync {
    async fn roast(
        &self,
        question: &Question,
        answer: &str,
        mode: GameMode,
    ) -> Result<String, CollaboratorError>;
}

/// Long-lived player progression.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Adds XP and returns the new total.
    async fn adjust_xp(&self, player: PlayerId, delta: u64) -> Result<u64, ProfileError>;

    /// Grants a badge. Returns `true` only if the player did not already
    /// hold it.
    async fn grant_badge(&self, player: PlayerId, badge: &str) -> Result<bool, ProfileError>;

    async fn profile(&self, player: PlayerId) -> Result<Option<PlayerProfile>, ProfileError>;

    /// Top players by XP, highest first.
    async fn leaderboard(&self, limit: usize) -> Result<Vec<PlayerProfile>, ProfileError>;
}

/// The full set of collaborators handed to every room.
#[derive(Clone)]
pub struct Services {
    pub questions: Arc<dyn QuestionProvider>,
    pub evaluator: Arc<dyn AnswerEvaluator>,
    pub roaster: Arc<dyn RoastGenerator>,
    pub profiles: Arc<dyn ProfileStore>,
}

impl Services {
    /// In-process collaborators: sample questions, substring judging,
    /// canned roasts, and an in-memory profile store.
    pub fn builtin() -> Self {
        Self {
            questions: Arc::new(SampleQuestions::default()),
            evaluator: Arc::new(SubstringEvaluator),
            roaster: Arc::new(CannedRoasts),
            profiles: Arc::new(InMemoryProfiles::default()),
        }
    }
}

impl Default for Services {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Runs a collaborator call with an upper bound on its duration.
pub(crate) async fn bounded<T, E, F>(limit: Duration, call: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<CollaboratorError>,
{
    tokio::time::timeout(limit, call)
        .await
        .unwrap_or_else(|_| Err(CollaboratorError::Timeout(limit).into()))
}

impl From<CollaboratorError> for ProfileError {
    fn from(err: CollaboratorError) -> Self {
        ProfileError::Storage(err.to_string())
    }
}
