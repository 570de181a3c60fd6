//! Buzz-in arbitration.
//!
//! The arbiter is a pure decision over a [`RoundState`]. It has no locks
//! of its own: the room actor calls it while processing one command at a
//! time, so the first buzz in queue order that finds the question idle
//! wins and every later buzz sees the claim.

use std::fmt;

use chrono::{DateTime, Utc};
use quizbuzz_protocol::PlayerId;

use crate::round::{RoundPhase, RoundState};

/// Why a buzz had no effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuzzRejection {
    /// The room is not in a game.
    NotPlaying,
    /// The buzzer is not on the roster.
    NotMember,
    /// Someone else holds the window.
    AlreadyClaimed(PlayerId),
    /// The buzzer already answered this question wrong.
    LockedOut,
    /// The previous answer is still being judged or settling.
    Settling,
}

impl fmt::Display for BuzzRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotPlaying => f.write_str("room is not playing"),
            Self::NotMember => f.write_str("not a member of the room"),
            Self::AlreadyClaimed(by) => write!(f, "already claimed by {by}"),
            Self::LockedOut => f.write_str("locked out for this question"),
            Self::Settling => f.write_str("question is resolving"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuzzOutcome {
    Granted,
    Ignored(BuzzRejection),
}

impl BuzzOutcome {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted)
    }
}

pub struct BuzzArbiter;

impl BuzzArbiter {
    /// Grants the answer window to `player` if the question is idle and
    /// they are not locked out. On success the round moves to
    /// [`RoundPhase::AnswerWindowOpen`]; otherwise it is left untouched.
    pub fn arbitrate(round: &mut RoundState, player: PlayerId, now: DateTime<Utc>) -> BuzzOutcome {
        match round.phase() {
            RoundPhase::Resolving => BuzzOutcome::Ignored(BuzzRejection::Settling),
            RoundPhase::AnswerWindowOpen => match round.active_player() {
                Some(holder) => BuzzOutcome::Ignored(BuzzRejection::AlreadyClaimed(holder)),
                None => BuzzOutcome::Ignored(BuzzRejection::Settling),
            },
            RoundPhase::QuestionIdle if round.is_locked(player) => {
                BuzzOutcome::Ignored(BuzzRejection::LockedOut)
            }
            RoundPhase::QuestionIdle => {
                round.open_window(player, now);
                BuzzOutcome::Granted
            }
        }
    }
}
