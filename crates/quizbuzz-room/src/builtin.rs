//! In-process collaborators.
//!
//! Good enough to run a game end to end without any external service.

use std::collections::HashMap;

use async_trait::async_trait;
use quizbuzz_protocol::{Difficulty, GameMode, PlayerId, PlayerProfile, Question};
use rand::seq::IndexedRandom;
use tokio::sync::RwLock;

use crate::services::{
    AnswerEvaluator, CollaboratorError, ProfileError, ProfileStore, QuestionProvider,
    RoastGenerator,
};

/// Shown whenever a roast cannot be produced.
pub const FALLBACK_ROAST: &str = "Well, that wasn't quite right, but nice try!";

// ---------------------------------------------------------------------------
// Questions
// ---------------------------------------------------------------------------

/// Generates numbered arithmetic (trivia) or string-concatenation (code)
/// questions.
#[derive(Debug, Clone)]
pub struct SampleQuestions {
    pub points: u32,
}

impl Default for SampleQuestions {
    fn default() -> Self {
        Self { points: 10 }
    }
}

#[async_trait]
impl QuestionProvider for SampleQuestions {
    async fn generate(
        &self,
        mode: GameMode,
        count: usize,
    ) -> Result<Vec<Question>, CollaboratorError> {
        let questions = (0..count)
            .map(|i| match mode {
                GameMode::Trivia => Question {
                    text: format!("What is {i} + 2?"),
                    kind: GameMode::Trivia,
                    category: "Math".into(),
                    difficulty: Difficulty::Easy,
                    correct_answer: (i + 2).to_string(),
                    points: self.points,
                },
                GameMode::Code => Question {
                    text: format!("What will this code output? console.log({i} + \"2\");"),
                    kind: GameMode::Code,
                    category: "JavaScript".into(),
                    difficulty: Difficulty::Medium,
                    correct_answer: format!("{i}2"),
                    points: self.points,
                },
            })
            .collect();
        Ok(questions)
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Case-insensitive containment check.
///
/// Code answers must contain the expected output. Trivia answers pass if
/// either string contains the other. Blank answers never pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstringEvaluator;

#[async_trait]
impl AnswerEvaluator for SubstringEvaluator {
    async fn evaluate(
        &self,
        question: &Question,
        answer: &str,
        mode: GameMode,
    ) -> Result<bool, CollaboratorError> {
        let answer = answer.trim().to_lowercase();
        let expected = question.correct_answer.trim().to_lowercase();
        if answer.is_empty() || expected.is_empty() {
            return Ok(false);
        }
        Ok(match mode {
            GameMode::Code => answer.contains(&expected),
            GameMode::Trivia => answer.contains(&expected) || expected.contains(&answer),
        })
    }
}

// ---------------------------------------------------------------------------
// Roasts
// ---------------------------------------------------------------------------

const TRIVIA_ROASTS: &[&str] = &[
    "Bold answer. Wrong, but bold.",
    "That answer took a scenic route and never arrived.",
    "Close! Well, close in the sense that it was an answer.",
    "Somewhere a quizmaster just sighed.",
    "Confidence: high. Accuracy: pending.",
];

const CODE_ROASTS: &[&str] = &[
    "The compiler would have rejected that one too.",
    "Have you tried turning your answer off and on again?",
    "That output only exists in a parallel runtime.",
    "Even undefined would have been closer.",
];

/// Picks a random line from a mode-specific list.
#[derive(Debug, Clone, Copy, Default)]
pub struct CannedRoasts;

#[async_trait]
impl RoastGenerator for CannedRoasts {
    async fn roast(
        &self,
        _question: &Question,
        _answer: &str,
        mode: GameMode,
    ) -> Result<String, CollaboratorError> {
        let pool = match mode {
            GameMode::Trivia => TRIVIA_ROASTS,
            GameMode::Code => CODE_ROASTS,
        };
        let line = pool.choose(&mut rand::rng()).copied().unwrap_or(FALLBACK_ROAST);
        Ok(line.to_string())
    }
}

// ---------------------------------------------------------------------------
// Profiles
// ---------------------------------------------------------------------------

/// Profiles kept in a map. Unknown players get a fresh profile on first
/// write.
#[derive(Debug, Default)]
pub struct InMemoryProfiles {
    profiles: RwLock<HashMap<PlayerId, PlayerProfile>>,
}

#[async_trait]
impl ProfileStore for InMemoryProfiles {
    async fn adjust_xp(&self, player: PlayerId, delta: u64) -> Result<u64, ProfileError> {
        let mut profiles = self.profiles.write().await;
        let profile = profiles
            .entry(player)
            .or_insert_with(|| PlayerProfile::new(player));
        profile.xp = profile.xp.saturating_add(delta);
        Ok(profile.xp)
    }

    async fn grant_badge(&self, player: PlayerId, badge: &str) -> Result<bool, ProfileError> {
        let mut profiles = self.profiles.write().await;
        let profile = profiles
            .entry(player)
            .or_insert_with(|| PlayerProfile::new(player));
        if profile.has_badge(badge) {
            return Ok(false);
        }
        profile.badges.push(badge.to_string());
        Ok(true)
    }

    async fn profile(&self, player: PlayerId) -> Result<Option<PlayerProfile>, ProfileError> {
        Ok(self.profiles.read().await.get(&player).cloned())
    }

    async fn leaderboard(&self, limit: usize) -> Result<Vec<PlayerProfile>, ProfileError> {
        let mut all: Vec<PlayerProfile> = self.profiles.read().await.values().cloned().collect();
        all.sort_by(|a, b| b.xp.cmp(&a.xp).then(a.player_id.cmp(&b.player_id)));
        all.truncate(limit);
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(answer: &str) -> Question {
        Question {
            text: "?".into(),
            kind: GameMode::Trivia,
            category: "Test".into(),
            difficulty: Difficulty::Easy,
            correct_answer: answer.into(),
            points: 10,
        }
    }

    #[tokio::test]
    async fn test_sample_questions_match_count_and_mode() {
        let provider = SampleQuestions::default();
        let trivia = provider.generate(GameMode::Trivia, 5).await.unwrap();
        assert_eq!(trivia.len(), 5);
        assert_eq!(trivia[0].text, "What is 0 + 2?");
        assert_eq!(trivia[3].correct_answer, "5");
        assert!(trivia.iter().all(|q| q.points == 10 && q.kind == GameMode::Trivia));

        let code = provider.generate(GameMode::Code, 2).await.unwrap();
        assert_eq!(code[1].correct_answer, "12");
        assert_eq!(code[1].category, "JavaScript");
    }

    #[tokio::test]
    async fn test_trivia_evaluation_accepts_containment_either_way() {
        let q = question("Paris");
        let judge = SubstringEvaluator;
        assert!(judge.evaluate(&q, "paris", GameMode::Trivia).await.unwrap());
        assert!(judge.evaluate(&q, "It's Paris!", GameMode::Trivia).await.unwrap());
        assert!(judge.evaluate(&q, "par", GameMode::Trivia).await.unwrap());
        assert!(!judge.evaluate(&q, "London", GameMode::Trivia).await.unwrap());
    }

    #[tokio::test]
    async fn test_code_evaluation_requires_expected_output() {
        let q = question("12");
        let judge = SubstringEvaluator;
        assert!(judge.evaluate(&q, "it prints 12", GameMode::Code).await.unwrap());
        assert!(!judge.evaluate(&q, "1", GameMode::Code).await.unwrap());
    }

    #[tokio::test]
    async fn test_blank_answer_is_never_correct() {
        let q = question("Paris");
        let judge = SubstringEvaluator;
        assert!(!judge.evaluate(&q, "", GameMode::Trivia).await.unwrap());
        assert!(!judge.evaluate(&q, "   ", GameMode::Trivia).await.unwrap());
    }

    #[tokio::test]
    async fn test_canned_roast_comes_from_mode_list() {
        let q = question("x");
        let line = CannedRoasts.roast(&q, "y", GameMode::Code).await.unwrap();
        assert!(CODE_ROASTS.contains(&line.as_str()));
    }

    #[tokio::test]
    async fn test_badges_are_idempotent() {
        let store = InMemoryProfiles::default();
        let p = PlayerId(1);
        assert!(store.grant_badge(p, "First Victory").await.unwrap());
        assert!(!store.grant_badge(p, "First Victory").await.unwrap());
        let profile = store.profile(p).await.unwrap().unwrap();
        assert_eq!(profile.badges, vec!["First Victory".to_string()]);
    }

    #[tokio::test]
    async fn test_leaderboard_orders_by_xp() {
        let store = InMemoryProfiles::default();
        store.adjust_xp(PlayerId(1), 10).await.unwrap();
        store.adjust_xp(PlayerId(2), 35).await.unwrap();
        store.adjust_xp(PlayerId(3), 20).await.unwrap();
        let top = store.leaderboard(2).await.unwrap();
        let ids: Vec<_> = top.iter().map(|p| p.player_id).collect();
        assert_eq!(ids, vec![PlayerId(2), PlayerId(3)]);
        assert_eq!(store.profile(PlayerId(9)).await.unwrap(), None);
    }
}
