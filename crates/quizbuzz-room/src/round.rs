//! Per-question round state.
//!
//! A [`RoundState`] lives only while a room is playing and is replaced
//! wholesale each time the room moves to the next question. It is the
//! room actor's scratch space for who holds the answer window, who is
//! locked out, and what happened last.

use std::fmt;

use chrono::{DateTime, Utc};
use quizbuzz_protocol::{GameSession, PlayerId, RoundSnapshot, ScoreChange};
use quizbuzz_timer::RoundVersion;

/// Where the current question is in its buzz/answer cycle.
///
/// ```text
/// QuestionIdle ──buzz──▶ AnswerWindowOpen ──answer/timeout──▶ Resolving
///       ▲                      │                                  │
///       └──── claimant left ───┘                 settle delay ─▶ next question
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    /// Anyone not locked out may buzz.
    QuestionIdle,
    /// One player holds the answer window.
    AnswerWindowOpen,
    /// The answer is being judged or the settle delay is running.
    Resolving,
}

impl fmt::Display for RoundPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QuestionIdle => f.write_str("QuestionIdle"),
            Self::AnswerWindowOpen => f.write_str("AnswerWindowOpen"),
            Self::Resolving => f.write_str("Resolving"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundState {
    version: RoundVersion,
    phase: RoundPhase,
    active_player: Option<PlayerId>,
    /// In lockout order.
    locked_players: Vec<PlayerId>,
    timer_start: Option<DateTime<Utc>>,
    last_score_change: Option<ScoreChange>,
    last_roast: Option<String>,
}

impl RoundState {
    pub fn new(version: RoundVersion) -> Self {
        Self {
            version,
            phase: RoundPhase::QuestionIdle,
            active_player: None,
            locked_players: Vec::new(),
            timer_start: None,
            last_score_change: None,
            last_roast: None,
        }
    }

    pub fn version(&self) -> RoundVersion {
        self.version
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn active_player(&self) -> Option<PlayerId> {
        self.active_player
    }

    pub fn is_locked(&self, player: PlayerId) -> bool {
        self.locked_players.contains(&player)
    }

    pub fn locked_players(&self) -> &[PlayerId] {
        &self.locked_players
    }

    pub fn waiting_for_answer(&self) -> bool {
        self.phase == RoundPhase::AnswerWindowOpen
    }

    pub(crate) fn open_window(&mut self, player: PlayerId, now: DateTime<Utc>) {
        self.phase = RoundPhase::AnswerWindowOpen;
        self.active_player = Some(player);
        self.timer_start = Some(now);
    }

    /// Closes the window for judging. The claimant stays recorded until
    /// the verdict is in.
    pub(crate) fn begin_resolving(&mut self) {
        self.phase = RoundPhase::Resolving;
    }

    pub(crate) fn record_verdict(&mut self, change: ScoreChange, roast: Option<String>) {
        if change.delta < 0 && !self.is_locked(change.player_id) {
            self.locked_players.push(change.player_id);
        }
        self.active_player = None;
        self.timer_start = None;
        self.last_score_change = Some(change);
        self.last_roast = roast;
    }

    /// Drops every reference to a departed player. Returns `true` if they
    /// held the answer window, in which case the question is open for
    /// buzzing again.
    pub(crate) fn forget(&mut self, player: PlayerId) -> bool {
        self.locked_players.retain(|p| *p != player);
        if self.active_player == Some(player) && self.phase == RoundPhase::AnswerWindowOpen {
            self.reopen();
            return true;
        }
        false
    }

    /// Back to buzzing on the same question. Lockouts survive.
    pub(crate) fn reopen(&mut self) {
        self.phase = RoundPhase::QuestionIdle;
        self.active_player = None;
        self.timer_start = None;
    }

    /// What clients see for this round of `session`.
    pub fn snapshot(&self, session: &GameSession) -> RoundSnapshot {
        RoundSnapshot {
            current_question: session.current_question().map(|q| q.prompt()),
            current_question_index: session.current_question_index,
            total_questions: session.questions.len(),
            scores: session.scores.clone(),
            active_player: self.active_player,
            waiting_for_answer: self.waiting_for_answer(),
            locked_players: self.locked_players.clone(),
            last_score_change: self.last_score_change,
            last_roast: self.last_roast.clone(),
            timer_start: self.timer_start,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(id: u64) -> PlayerId {
        PlayerId(id)
    }

    #[test]
    fn test_new_round_is_idle_and_empty() {
        let round = RoundState::new(RoundVersion::new(3));
        assert_eq!(round.version(), RoundVersion::new(3));
        assert_eq!(round.phase(), RoundPhase::QuestionIdle);
        assert_eq!(round.active_player(), None);
        assert!(round.locked_players().is_empty());
        assert!(!round.waiting_for_answer());
    }

    #[test]
    fn test_wrong_verdict_locks_and_clears_window() {
        let mut round = RoundState::new(RoundVersion::default());
        round.open_window(pid(1), Utc::now());
        assert!(round.waiting_for_answer());

        round.begin_resolving();
        round.record_verdict(
            ScoreChange {
                player_id: pid(1),
                delta: -5,
            },
            Some("ouch".into()),
        );

        assert_eq!(round.phase(), RoundPhase::Resolving);
        assert_eq!(round.active_player(), None);
        assert!(round.is_locked(pid(1)));
        assert!(!round.waiting_for_answer());
    }

    #[test]
    fn test_right_verdict_does_not_lock() {
        let mut round = RoundState::new(RoundVersion::default());
        round.open_window(pid(2), Utc::now());
        round.begin_resolving();
        round.record_verdict(
            ScoreChange {
                player_id: pid(2),
                delta: 10,
            },
            None,
        );
        assert!(!round.is_locked(pid(2)));
    }

    #[test]
    fn test_forgetting_claimant_reopens_question() {
        let mut round = RoundState::new(RoundVersion::default());
        round.open_window(pid(1), Utc::now());
        assert!(round.forget(pid(1)));
        assert_eq!(round.phase(), RoundPhase::QuestionIdle);
        assert_eq!(round.active_player(), None);
    }

    #[test]
    fn test_forgetting_bystander_keeps_window() {
        let mut round = RoundState::new(RoundVersion::default());
        round.open_window(pid(1), Utc::now());
        assert!(!round.forget(pid(2)));
        assert_eq!(round.active_player(), Some(pid(1)));
    }
}
