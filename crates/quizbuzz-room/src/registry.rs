//! Room registry: creates, finds, lists, and retires rooms.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use futures_util::future::join_all;
use quizbuzz_protocol::{
    CreateRoomRequest, GameSession, PlayerId, RoomId, RoomStatus, RoundSnapshot, ServerEvent,
};
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, info};

use crate::arbiter::BuzzOutcome;
use crate::room::{AnswerOutcome, LeaveOutcome, RoomHandle, RoomView, spawn_room};
use crate::services::Services;
use crate::{RoomError, RoomLimits, RoomTiming};

static NEXT_ROOM_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide table of live rooms.
///
/// The map lock is only held to look up, insert, or remove a handle.
/// Every room operation clones the handle and then talks to the room's
/// actor without the lock, so a slow room never blocks the others.
pub struct RoomRegistry {
    rooms: RwLock<HashMap<RoomId, RoomHandle>>,
    services: Services,
    limits: RoomLimits,
    timing: RoomTiming,
}

impl RoomRegistry {
    pub fn new(services: Services, limits: RoomLimits, timing: RoomTiming) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            services,
            limits,
            timing,
        }
    }

    /// Default limits and timing around the given collaborators.
    pub fn with_services(services: Services) -> Self {
        Self::new(services, RoomLimits::default(), RoomTiming::default())
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn limits(&self) -> &RoomLimits {
        &self.limits
    }

    /// Validates the request and opens a waiting room with `host` as its
    /// only player.
    pub async fn create(
        &self,
        req: &CreateRoomRequest,
        host: PlayerId,
    ) -> Result<GameSession, RoomError> {
        let (name, settings) = self.limits.validate(req)?;
        let room_id = RoomId(NEXT_ROOM_ID.fetch_add(1, Ordering::Relaxed));
        let session = GameSession::new(room_id, name, host, settings, Utc::now());

        let handle = spawn_room(session.clone(), self.services.clone(), self.timing.clone());
        self.rooms.write().await.insert(room_id, handle);

        info!(
            %room_id,
            host = %host,
            max_players = session.settings.max_players,
            questions = session.settings.questions_per_game,
            mode = %session.settings.game_mode,
            "room created"
        );
        Ok(session)
    }

    async fn handle(&self, room_id: RoomId) -> Result<RoomHandle, RoomError> {
        self.rooms
            .read()
            .await
            .get(&room_id)
            .cloned()
            .ok_or(RoomError::NotFound(room_id))
    }

    pub async fn join(&self, room_id: RoomId, player: PlayerId) -> Result<GameSession, RoomError> {
        self.handle(room_id).await?.join(player).await
    }

    /// Removes `player` from the room. The room is deleted once its last
    /// player is gone.
    pub async fn leave(&self, room_id: RoomId, player: PlayerId) -> Result<LeaveOutcome, RoomError> {
        let outcome = self.handle(room_id).await?.leave(player).await?;
        if outcome == LeaveOutcome::Emptied {
            self.rooms.write().await.remove(&room_id);
            info!(%room_id, "room deleted");
        }
        Ok(outcome)
    }

    pub async fn start(&self, room_id: RoomId, requester: PlayerId) -> Result<(), RoomError> {
        self.handle(room_id).await?.start(requester).await
    }

    pub async fn buzz(&self, room_id: RoomId, player: PlayerId) -> Result<BuzzOutcome, RoomError> {
        self.handle(room_id).await?.buzz(player).await
    }

    pub async fn submit_answer(
        &self,
        room_id: RoomId,
        player: PlayerId,
        answer: impl Into<String>,
    ) -> Result<AnswerOutcome, RoomError> {
        self.handle(room_id)
            .await?
            .submit_answer(player, answer.into())
            .await
    }

    pub async fn send_chat(
        &self,
        room_id: RoomId,
        sender: PlayerId,
        text: impl Into<String>,
    ) -> Result<(), RoomError> {
        self.handle(room_id).await?.chat(sender, text.into()).await
    }

    /// Full session, answers included.
    pub async fn get(&self, room_id: RoomId) -> Result<GameSession, RoomError> {
        self.handle(room_id).await?.session().await
    }

    pub async fn view(&self, room_id: RoomId) -> Result<RoomView, RoomError> {
        self.handle(room_id).await?.inspect().await
    }

    /// Current round as clients see it, or `None` outside a game.
    pub async fn snapshot(&self, room_id: RoomId) -> Result<Option<RoundSnapshot>, RoomError> {
        Ok(self.view(room_id).await?.round)
    }

    /// Rooms with the given status, newest first. Without a filter,
    /// waiting and playing rooms are listed.
    pub async fn list(&self, status: Option<RoomStatus>) -> Vec<GameSession> {
        let handles: Vec<RoomHandle> = self.rooms.read().await.values().cloned().collect();

        // Rooms busy past the reply timeout are skipped, not waited on.
        let wait = self.timing.list_reply_timeout;
        let replies = join_all(
            handles
                .iter()
                .map(|handle| tokio::time::timeout(wait, handle.session())),
        )
        .await;
        let mut sessions = Vec::with_capacity(replies.len());
        for (handle, reply) in handles.iter().zip(replies) {
            match reply {
                Ok(Ok(session)) => sessions.push(session),
                Ok(Err(e)) => debug!(room_id = %handle.room_id(), error = %e, "skipping room in list"),
                Err(_) => debug!(room_id = %handle.room_id(), "room busy, skipping in list"),
            }
        }

        sessions.retain(|s| match status {
            Some(wanted) => s.status == wanted,
            None => s.status.is_open(),
        });
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        sessions
    }

    /// Live events for one room.
    pub async fn subscribe(
        &self,
        room_id: RoomId,
    ) -> Result<broadcast::Receiver<ServerEvent>, RoomError> {
        Ok(self.handle(room_id).await?.subscribe())
    }

    /// Stops a room's actor and forgets it. Subscribers see their stream
    /// close.
    pub async fn destroy(&self, room_id: RoomId) -> Result<(), RoomError> {
        let handle = self
            .rooms
            .write()
            .await
            .remove(&room_id)
            .ok_or(RoomError::NotFound(room_id))?;
        let _ = handle.shutdown().await;
        info!(%room_id, "room destroyed");
        Ok(())
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::with_services(Services::builtin())
    }
}
