//! Room actor: one Tokio task per room that owns its session.
//!
//! Every mutation of a room (joins, leaves, the start request, buzzes,
//! answers, chat, and the delayed timeout/advance events from the
//! [`TimerService`]) is a [`RoomCommand`] on the actor's queue. Commands
//! run one at a time, in arrival order, including any awaited call to an
//! external collaborator. That serialization is what makes buzz
//! arbitration race-free without locks.

use std::time::Duration;

use chrono::Utc;
use quizbuzz_protocol::{
    GameSession, PlayerId, RoomId, RoomStatus, RoundSnapshot, ScoreChange, ServerEvent,
};
use quizbuzz_timer::{RoundVersion, TimerCounts, TimerService};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::arbiter::{BuzzArbiter, BuzzOutcome, BuzzRejection};
use crate::broadcast::Broadcaster;
use crate::builtin::FALLBACK_ROAST;
use crate::reward::RewardEngine;
use crate::round::{RoundPhase, RoundState};
use crate::services::{Services, bounded};
use crate::{RoomError, RoomTiming};

/// Players needed before the host may start.
pub const MIN_PLAYERS_TO_START: usize = 2;

/// Score change for a wrong or missing answer, before the floor at zero.
pub const WRONG_ANSWER_PENALTY: i64 = -5;

/// Why a submitted answer had no effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerRejection {
    NotPlaying,
    /// Nobody holds the answer window.
    NoOpenWindow,
    /// Someone else holds the answer window.
    NotActivePlayer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    Judged { correct: bool, delta: i64 },
    Ignored(AnswerRejection),
}

/// What a successful leave did to the room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// The room lives on. `new_host` is set if the leaver was host.
    Left { new_host: Option<PlayerId> },
    /// The last player left. The actor has stopped.
    Emptied,
}

/// Point-in-time view of a room.
#[derive(Debug, Clone)]
pub struct RoomView {
    pub session: GameSession,
    /// Present while the game is running.
    pub round: Option<RoundSnapshot>,
    pub timers: TimerCounts,
}

/// How an answer reached the actor.
enum AnswerSource {
    Submitted(String),
    /// The answer window ran out.
    Timeout,
}

pub(crate) enum RoomCommand {
    Join {
        player: PlayerId,
        reply: oneshot::Sender<Result<GameSession, RoomError>>,
    },
    Leave {
        player: PlayerId,
        reply: oneshot::Sender<Result<LeaveOutcome, RoomError>>,
    },
    Start {
        requester: PlayerId,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    Buzz {
        player: PlayerId,
        reply: oneshot::Sender<BuzzOutcome>,
    },
    Answer {
        player: PlayerId,
        answer: String,
        reply: oneshot::Sender<AnswerOutcome>,
    },
    Chat {
        sender: PlayerId,
        text: String,
    },
    /// Scheduled when a buzz is granted.
    AnswerTimeout {
        version: RoundVersion,
        player: PlayerId,
    },
    /// Scheduled when an answer is resolved.
    Advance {
        version: RoundVersion,
    },
    Inspect {
        reply: oneshot::Sender<RoomView>,
    },
    Shutdown,
}

// ---------------------------------------------------------------------------
// RoomHandle
// ---------------------------------------------------------------------------

/// Cheap, cloneable address of a running room.
#[derive(Clone)]
pub struct RoomHandle {
    room_id: RoomId,
    sender: mpsc::Sender<RoomCommand>,
    topic: Broadcaster,
}

impl RoomHandle {
    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    /// Sends a command carrying a reply channel and waits for the answer.
    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(command(reply_tx))
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id))
    }

    pub async fn join(&self, player: PlayerId) -> Result<GameSession, RoomError> {
        self.request(|reply| RoomCommand::Join { player, reply })
            .await?
    }

    pub async fn leave(&self, player: PlayerId) -> Result<LeaveOutcome, RoomError> {
        self.request(|reply| RoomCommand::Leave { player, reply })
            .await?
    }

    pub async fn start(&self, requester: PlayerId) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Start { requester, reply })
            .await?
    }

    pub async fn buzz(&self, player: PlayerId) -> Result<BuzzOutcome, RoomError> {
        self.request(|reply| RoomCommand::Buzz { player, reply })
            .await
    }

    pub async fn submit_answer(
        &self,
        player: PlayerId,
        answer: String,
    ) -> Result<AnswerOutcome, RoomError> {
        self.request(|reply| RoomCommand::Answer {
            player,
            answer,
            reply,
        })
        .await
    }

    /// Fire-and-forget; non-members are dropped by the room.
    pub async fn chat(&self, sender: PlayerId, text: String) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Chat { sender, text })
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id))
    }

    pub async fn inspect(&self) -> Result<RoomView, RoomError> {
        self.request(|reply| RoomCommand::Inspect { reply }).await
    }

    pub async fn session(&self) -> Result<GameSession, RoomError> {
        Ok(self.inspect().await?.session)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.topic.subscribe()
    }

    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Shutdown)
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id))
    }
}

// ---------------------------------------------------------------------------
// RoomActor
// ---------------------------------------------------------------------------

struct RoomActor {
    session: GameSession,
    /// `Some` exactly while the session is playing.
    round: Option<RoundState>,
    services: Services,
    timing: RoomTiming,
    rewards: RewardEngine,
    topic: Broadcaster,
    timers: TimerService<RoomCommand>,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    fn room_id(&self) -> RoomId {
        self.session.id
    }

    async fn run(mut self) {
        info!(room_id = %self.room_id(), "room actor started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                RoomCommand::Join { player, reply } => {
                    let _ = reply.send(self.handle_join(player));
                }
                RoomCommand::Leave { player, reply } => {
                    let result = self.handle_leave(player);
                    let emptied = matches!(result, Ok(LeaveOutcome::Emptied));
                    let _ = reply.send(result);
                    if emptied {
                        break;
                    }
                }
                RoomCommand::Start { requester, reply } => {
                    let result = self.handle_start(requester).await;
                    let _ = reply.send(result);
                }
                RoomCommand::Buzz { player, reply } => {
                    let _ = reply.send(self.handle_buzz(player));
                }
                RoomCommand::Answer {
                    player,
                    answer,
                    reply,
                } => {
                    let outcome = self
                        .handle_answer(player, AnswerSource::Submitted(answer))
                        .await;
                    let _ = reply.send(outcome);
                }
                RoomCommand::Chat { sender, text } => self.handle_chat(sender, text),
                RoomCommand::AnswerTimeout { version, player } => {
                    self.handle_timeout(version, player).await;
                }
                RoomCommand::Advance { version } => self.handle_advance(version).await,
                RoomCommand::Inspect { reply } => {
                    let _ = reply.send(self.view());
                }
                RoomCommand::Shutdown => {
                    info!(room_id = %self.room_id(), "room shutting down");
                    break;
                }
            }
        }

        info!(room_id = %self.room_id(), "room actor stopped");
    }

    // -- Roster --

    fn handle_join(&mut self, player: PlayerId) -> Result<GameSession, RoomError> {
        let room_id = self.room_id();
        if self.session.status != RoomStatus::Waiting {
            return Err(RoomError::AlreadyStarted(room_id));
        }
        if self.session.is_full() {
            return Err(RoomError::RoomFull(room_id));
        }
        if self.session.is_member(player) {
            return Err(RoomError::AlreadyInRoom(player, room_id));
        }

        self.session.players.push(player);
        self.session.scores.seed(player);
        info!(
            %room_id,
            player_id = %player,
            players = self.session.players.len(),
            "player joined"
        );

        self.topic.publish(ServerEvent::PlayerJoined {
            player,
            room: Box::new(self.session.redacted()),
        });
        Ok(self.session.clone())
    }

    fn handle_leave(&mut self, player: PlayerId) -> Result<LeaveOutcome, RoomError> {
        let room_id = self.room_id();
        let Some(index) = self.session.players.iter().position(|p| *p == player) else {
            return Err(RoomError::NotInRoom(player, room_id));
        };
        self.session.players.remove(index);
        self.session.scores.remove(player);

        let reopened = self
            .round
            .as_mut()
            .is_some_and(|round| round.forget(player));

        info!(
            %room_id,
            player_id = %player,
            players = self.session.players.len(),
            "player left"
        );

        if self.session.players.is_empty() {
            info!(%room_id, "last player left, closing room");
            self.topic.publish(ServerEvent::PlayerLeft {
                player,
                room: Box::new(self.session.redacted()),
            });
            return Ok(LeaveOutcome::Emptied);
        }

        let mut new_host = None;
        if self.session.host == player {
            let next = self.session.players[0];
            self.session.host = next;
            new_host = Some(next);
            info!(%room_id, host = %next, "host reassigned");
        }

        self.topic.publish(ServerEvent::PlayerLeft {
            player,
            room: Box::new(self.session.redacted()),
        });
        if reopened {
            debug!(%room_id, player_id = %player, "answer window holder left, question reopened");
            self.publish_state();
        }
        Ok(LeaveOutcome::Left { new_host })
    }

    // -- Game flow --

    async fn handle_start(&mut self, requester: PlayerId) -> Result<(), RoomError> {
        let room_id = self.room_id();
        if requester != self.session.host {
            return Err(RoomError::NotHost(requester, room_id));
        }
        if !self.session.status.can_transition_to(RoomStatus::Playing) {
            return Err(RoomError::AlreadyStarted(room_id));
        }
        let have = self.session.players.len();
        if have < MIN_PLAYERS_TO_START {
            return Err(RoomError::NotEnoughPlayers {
                room: room_id,
                have,
                need: MIN_PLAYERS_TO_START,
            });
        }

        let mode = self.session.settings.game_mode;
        let count = self.session.settings.questions_per_game;
        let questions = bounded(
            self.timing.collaborator_timeout,
            self.services.questions.generate(mode, count),
        )
        .await
        .map_err(|e| {
            warn!(%room_id, error = %e, "question provider failed");
            RoomError::QuestionSource(e.to_string())
        })?;
        if questions.len() != count {
            warn!(%room_id, expected = count, got = questions.len(), "wrong question count");
            return Err(RoomError::QuestionSource(format!(
                "expected {count} questions, got {}",
                questions.len()
            )));
        }

        self.session.questions = questions;
        self.session.current_question_index = 0;
        self.session.game_start_time = Some(Utc::now());
        self.session.status = RoomStatus::Playing;
        self.round = Some(RoundState::new(RoundVersion::default()));

        info!(%room_id, players = have, questions = count, %mode, "game started");
        self.topic.publish(ServerEvent::GameStarted {
            room: Box::new(self.session.redacted()),
        });
        self.publish_state();
        Ok(())
    }

    fn handle_buzz(&mut self, player: PlayerId) -> BuzzOutcome {
        let room_id = self.room_id();
        let answer_window = Duration::from_secs(u64::from(self.session.settings.answer_time_limit));

        let outcome = if !self.session.is_member(player) {
            BuzzOutcome::Ignored(BuzzRejection::NotMember)
        } else if let Some(round) = self.round.as_mut() {
            BuzzArbiter::arbitrate(round, player, Utc::now())
        } else {
            BuzzOutcome::Ignored(BuzzRejection::NotPlaying)
        };

        match outcome {
            BuzzOutcome::Granted => {
                let version = self.current_version();
                info!(%room_id, player_id = %player, %version, "buzz granted");
                self.timers
                    .schedule(answer_window, RoomCommand::AnswerTimeout { version, player });
                self.topic.publish(ServerEvent::BuzzerSound);
                self.publish_state();
            }
            BuzzOutcome::Ignored(reason) => {
                debug!(%room_id, player_id = %player, %reason, "buzz ignored");
            }
        }
        outcome
    }

    async fn handle_answer(&mut self, player: PlayerId, source: AnswerSource) -> AnswerOutcome {
        let room_id = self.room_id();

        let Some(round) = self.round.as_mut() else {
            return AnswerOutcome::Ignored(AnswerRejection::NotPlaying);
        };
        if round.phase() != RoundPhase::AnswerWindowOpen {
            debug!(%room_id, player_id = %player, phase = %round.phase(), "answer ignored");
            return AnswerOutcome::Ignored(AnswerRejection::NoOpenWindow);
        }
        if round.active_player() != Some(player) {
            debug!(%room_id, player_id = %player, "answer from non-holder ignored");
            return AnswerOutcome::Ignored(AnswerRejection::NotActivePlayer);
        }
        let Some(question) = self.session.current_question().cloned() else {
            warn!(%room_id, index = self.session.current_question_index, "no current question");
            return AnswerOutcome::Ignored(AnswerRejection::NotPlaying);
        };
        round.begin_resolving();
        let version = round.version();
        let mode = self.session.settings.game_mode;
        let limit = self.timing.collaborator_timeout;

        let (answer, correct) = match source {
            AnswerSource::Timeout => (String::new(), false),
            AnswerSource::Submitted(answer) => {
                let verdict =
                    bounded(limit, self.services.evaluator.evaluate(&question, &answer, mode))
                        .await
                        .unwrap_or_else(|e| {
                            warn!(%room_id, error = %e, "answer evaluation failed, counting as wrong");
                            false
                        });
                (answer, verdict)
            }
        };

        let (delta, roast) = if correct {
            (i64::from(question.points), None)
        } else {
            let roast = bounded(limit, self.services.roaster.roast(&question, &answer, mode))
                .await
                .unwrap_or_else(|e| {
                    warn!(%room_id, error = %e, "roast generation failed, using fallback");
                    FALLBACK_ROAST.to_string()
                });
            (WRONG_ANSWER_PENALTY, Some(roast))
        };

        let score = self.session.scores.apply(player, delta).unwrap_or(0);
        if let Some(round) = self.round.as_mut() {
            round.record_verdict(
                ScoreChange {
                    player_id: player,
                    delta,
                },
                roast.clone(),
            );
        }
        info!(%room_id, player_id = %player, correct, delta, score, "answer resolved");

        if correct {
            self.topic.publish(ServerEvent::CorrectAnswer);
        } else {
            self.topic
                .publish(ServerEvent::BuzzerLockout { player_id: player });
            self.topic.publish(ServerEvent::IncorrectAnswer);
        }
        self.publish_state();
        if let Some(message) = roast {
            self.topic.publish(ServerEvent::Roast { message });
        }

        self.timers
            .schedule(self.timing.settle_delay, RoomCommand::Advance { version });
        AnswerOutcome::Judged { correct, delta }
    }

    async fn handle_timeout(&mut self, version: RoundVersion, player: PlayerId) {
        let live = self.round.as_ref().is_some_and(|round| {
            round.phase() == RoundPhase::AnswerWindowOpen
                && round.active_player() == Some(player)
                && round.version() == version
        });
        if !live {
            debug!(room_id = %self.room_id(), %version, player_id = %player, "stale answer timeout");
            return;
        }
        info!(room_id = %self.room_id(), player_id = %player, "answer window expired");
        self.handle_answer(player, AnswerSource::Timeout).await;
    }

    async fn handle_advance(&mut self, version: RoundVersion) {
        let Some(round) = self.round.as_ref() else {
            debug!(room_id = %self.room_id(), %version, "advance after game end ignored");
            return;
        };
        if round.phase() != RoundPhase::Resolving || round.version() != version {
            debug!(room_id = %self.room_id(), %version, "stale advance");
            return;
        }
        let next_version = round.version().next();

        self.session.current_question_index += 1;
        if self.session.current_question_index >= self.session.questions.len() {
            self.finish().await;
            return;
        }

        self.round = Some(RoundState::new(next_version));
        debug!(
            room_id = %self.room_id(),
            index = self.session.current_question_index,
            version = %next_version,
            "next question"
        );
        self.publish_state();
    }

    async fn finish(&mut self) {
        if !self.session.status.can_transition_to(RoomStatus::Finished) {
            return;
        }
        let room_id = self.room_id();
        self.session.status = RoomStatus::Finished;
        self.session.game_end_time = Some(Utc::now());
        self.session.winner = self.session.scores.leader();
        self.round = None;

        info!(
            %room_id,
            winner = ?self.session.winner.map(|w| w.to_string()),
            "game finished"
        );

        self.rewards.settle(&self.session).await;

        self.topic.publish(ServerEvent::GameEnded {
            winner: self.session.winner,
            final_scores: self.session.scores.clone(),
            session: Box::new(self.session.clone()),
        });
    }

    fn handle_chat(&mut self, sender: PlayerId, text: String) {
        if !self.session.is_member(sender) {
            debug!(room_id = %self.room_id(), %sender, "chat from non-member, ignoring");
            return;
        }
        if text.trim().is_empty() {
            return;
        }
        self.topic.publish(ServerEvent::ChatMessage {
            room_id: self.room_id(),
            sender,
            text,
            sent_at: Utc::now(),
        });
    }

    // -- Helpers --

    fn current_version(&self) -> RoundVersion {
        self.round
            .as_ref()
            .map(RoundState::version)
            .unwrap_or_default()
    }

    fn publish_state(&self) {
        if let Some(round) = &self.round {
            self.topic
                .publish(ServerEvent::StateUpdate(round.snapshot(&self.session)));
        }
    }

    fn view(&self) -> RoomView {
        RoomView {
            session: self.session.clone(),
            round: self.round.as_ref().map(|r| r.snapshot(&self.session)),
            timers: self.timers.counts(),
        }
    }
}

/// Spawns the actor for a freshly created session and returns its handle.
pub(crate) fn spawn_room(session: GameSession, services: Services, timing: RoomTiming) -> RoomHandle {
    let room_id = session.id;
    let (tx, rx) = mpsc::channel(timing.command_channel_size);
    let topic = Broadcaster::new(room_id, timing.broadcast_capacity);

    let actor = RoomActor {
        session,
        round: None,
        rewards: RewardEngine::new(services.profiles.clone(), timing.collaborator_timeout),
        services,
        timing,
        topic: topic.clone(),
        timers: TimerService::new(&tx),
        receiver: rx,
    };

    tokio::spawn(actor.run());

    RoomHandle {
        room_id,
        sender: tx,
        topic,
    }
}
