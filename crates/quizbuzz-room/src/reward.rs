//! End-of-game rewards.
//!
//! Rewards are planned from the finished session first (pure, easy to
//! test) and then applied to the profile store one player at a time. A
//! failure for one player is logged and does not stop the others.

use std::sync::Arc;
use std::time::Duration;

use quizbuzz_protocol::{GameMode, GameSession, PlayerId};

use crate::services::{ProfileError, ProfileStore, bounded};

pub const PARTICIPATION_XP: u64 = 10;
pub const WINNER_BONUS_XP: u64 = 25;
pub const SCORE_MASTER_THRESHOLD: u32 = 50;

pub const FIRST_VICTORY: &str = "First Victory";
pub const SCORE_MASTER: &str = "Score Master";
pub const CODE_WARRIOR: &str = "Code Warrior";

/// What one player earns from a game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerReward {
    pub player: PlayerId,
    pub xp: u64,
    pub badges: Vec<&'static str>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewardPlan {
    pub rewards: Vec<PlayerReward>,
}

impl RewardPlan {
    /// Everyone on the final roster gets participation XP. The winner gets
    /// a bonus and "First Victory"; a final score of 50 or more earns
    /// "Score Master"; every player of a code game earns "Code Warrior".
    pub fn for_session(session: &GameSession) -> Self {
        let rewards = session
            .players
            .iter()
            .map(|&player| {
                let won = session.winner == Some(player);
                let score = session.scores.get(player).unwrap_or(0);
                let mut badges = Vec::new();
                if won {
                    badges.push(FIRST_VICTORY);
                }
                if score >= SCORE_MASTER_THRESHOLD {
                    badges.push(SCORE_MASTER);
                }
                if session.settings.game_mode == GameMode::Code {
                    badges.push(CODE_WARRIOR);
                }
                PlayerReward {
                    player,
                    xp: PARTICIPATION_XP + if won { WINNER_BONUS_XP } else { 0 },
                    badges,
                }
            })
            .collect();
        Self { rewards }
    }

    pub fn get(&self, player: PlayerId) -> Option<&PlayerReward> {
        self.rewards.iter().find(|r| r.player == player)
    }
}

/// Outcome of applying a plan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewardSummary {
    pub rewarded: usize,
    pub failed: usize,
    /// Badges the store reported as newly granted.
    pub new_badges: Vec<(PlayerId, &'static str)>,
}

pub struct RewardEngine {
    store: Arc<dyn ProfileStore>,
    timeout: Duration,
}

impl RewardEngine {
    pub fn new(store: Arc<dyn ProfileStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Plans and applies rewards for a finished session.
    pub async fn settle(&self, session: &GameSession) -> RewardSummary {
        let plan = RewardPlan::for_session(session);
        let mut summary = RewardSummary::default();

        for reward in &plan.rewards {
            match self.apply(reward).await {
                Ok(new_badges) => {
                    summary.rewarded += 1;
                    summary
                        .new_badges
                        .extend(new_badges.into_iter().map(|b| (reward.player, b)));
                }
                Err(e) => {
                    tracing::warn!(
                        room_id = %session.id,
                        player_id = %reward.player,
                        error = %e,
                        "failed to apply rewards"
                    );
                    summary.failed += 1;
                }
            }
        }

        tracing::info!(
            room_id = %session.id,
            rewarded = summary.rewarded,
            failed = summary.failed,
            "rewards settled"
        );
        summary
    }

    async fn apply(&self, reward: &PlayerReward) -> Result<Vec<&'static str>, ProfileError> {
        bounded(self.timeout, self.store.adjust_xp(reward.player, reward.xp)).await?;

        let mut granted = Vec::new();
        for badge in &reward.badges {
            if bounded(self.timeout, self.store.grant_badge(reward.player, badge)).await? {
                granted.push(*badge);
            }
        }
        Ok(granted)
    }
}
