//! Per-connection handler: handshake, request dispatch, and room
//! subscriptions.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Receive Handshake → check version → authenticate → HandshakeAck
//!   2. Spawn the writer task that owns outbound sequencing
//!   3. Loop: receive envelopes → dispatch system requests or client events
//!
//! Room topics are forwarded by one task per subscribed room. All outbound
//! frames, replies and broadcasts alike, go through the writer so `seq`
//! stays strictly increasing on the wire.

use std::collections::HashMap;
use std::sync::Arc;

use quizbuzz_protocol::{
    ClientEvent, Codec, Envelope, PROTOCOL_VERSION, Payload, PlayerId, ProtocolError,
    RoomBroadcast, RoomId, ServerEvent, SystemMessage,
};
use quizbuzz_room::RoomError;
use quizbuzz_transport::{Connection, WebSocketConnection};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::server::ServerState;
use crate::{Authenticator, QuizbuzzError};

/// Used when a leaderboard request carries no limit.
pub const DEFAULT_LEADERBOARD_LIMIT: usize = 50;

/// Outbound frames waiting for the writer.
const OUTBOX_CAPACITY: usize = 256;

type Outbox = mpsc::Sender<Payload>;

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<A, C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<A, C>>,
) -> Result<(), QuizbuzzError>
where
    A: Authenticator,
    C: Codec,
{
    let conn_id = conn.id();
    debug!(%conn_id, "handling new connection");

    let conn = Arc::new(conn);
    let player_id = perform_handshake(&conn, &state).await?;
    info!(%conn_id, %player_id, "player authenticated");

    let (outbox, outbox_rx) = mpsc::channel(OUTBOX_CAPACITY);
    let writer = tokio::spawn(write_frames(Arc::clone(&conn), Arc::clone(&state), outbox_rx));

    let mut session = Session {
        player_id,
        state: Arc::clone(&state),
        outbox,
        subscriptions: HashMap::new(),
    };

    loop {
        let text = match tokio::time::timeout(state.idle_timeout, conn.recv_text()).await {
            Ok(Ok(Some(text))) => text,
            Ok(Ok(None)) => {
                info!(%player_id, "connection closed cleanly");
                break;
            }
            Ok(Err(e)) => {
                debug!(%player_id, error = %e, "recv error");
                break;
            }
            Err(_) => {
                info!(%player_id, "connection idle, dropping");
                break;
            }
        };

        let envelope: Envelope = match state.codec.decode(&text) {
            Ok(env) => env,
            Err(e) => {
                debug!(%player_id, error = %e, "failed to decode envelope");
                session.send_error(400, format!("invalid envelope: {e}")).await;
                continue;
            }
        };

        match envelope.payload {
            Payload::System(msg) => {
                if session.handle_system(msg).await {
                    break;
                }
            }
            Payload::Client(event) => session.handle_event(event).await,
            Payload::Server(_) => {
                debug!(%player_id, "ignoring server-only payload from client");
            }
        }
    }

    session.unsubscribe_all();
    drop(session);
    // Flush whatever is queued, then say goodbye.
    let _ = writer.await;
    let _ = conn.close().await;
    Ok(())
}

/// Receives the handshake, checks the version, authenticates, and sends
/// the ack (always `seq` 0).
async fn perform_handshake<A, C>(
    conn: &WebSocketConnection,
    state: &ServerState<A, C>,
) -> Result<PlayerId, QuizbuzzError>
where
    A: Authenticator,
    C: Codec,
{
    let text = match tokio::time::timeout(state.handshake_timeout, conn.recv_text()).await {
        Ok(Ok(Some(text))) => text,
        Ok(Ok(None)) => {
            return Err(ProtocolError::InvalidMessage("connection closed before handshake".into()).into());
        }
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => {
            return Err(ProtocolError::InvalidMessage("handshake timed out".into()).into());
        }
    };

    let envelope: Envelope = match state.codec.decode(&text) {
        Ok(env) => env,
        Err(e) => {
            send_direct(conn, state, error_payload(400, "expected Handshake")).await?;
            return Err(e.into());
        }
    };

    let Payload::System(SystemMessage::Handshake { version, token }) = envelope.payload else {
        send_direct(conn, state, error_payload(400, "expected Handshake")).await?;
        return Err(ProtocolError::InvalidMessage("first message must be Handshake".into()).into());
    };

    if version != PROTOCOL_VERSION {
        let message = format!("version mismatch: expected {PROTOCOL_VERSION}, got {version}");
        send_direct(conn, state, error_payload(400, message)).await?;
        return Err(ProtocolError::VersionMismatch {
            expected: PROTOCOL_VERSION,
            got: version,
        }
        .into());
    }

    let player_id = match state.auth.authenticate(token.as_deref()).await {
        Ok(pid) => pid,
        Err(e) => {
            send_direct(conn, state, error_payload(401, "unauthorized")).await?;
            return Err(e.into());
        }
    };

    let ack = Payload::System(SystemMessage::HandshakeAck {
        player_id,
        server_time: state.now_ms(),
    });
    send_direct(conn, state, ack).await?;
    Ok(player_id)
}

/// Writes a `seq` 0 frame before the writer task exists.
async fn send_direct<A, C>(
    conn: &WebSocketConnection,
    state: &ServerState<A, C>,
    payload: Payload,
) -> Result<(), QuizbuzzError>
where
    A: Authenticator,
    C: Codec,
{
    let envelope = Envelope {
        seq: 0,
        timestamp: state.now_ms(),
        payload,
    };
    let text = state.codec.encode(&envelope)?;
    conn.send_text(&text).await?;
    Ok(())
}

/// Drains the outbox onto the socket, numbering frames from 1.
async fn write_frames<A, C>(
    conn: Arc<WebSocketConnection>,
    state: Arc<ServerState<A, C>>,
    mut frames: mpsc::Receiver<Payload>,
) where
    A: Authenticator,
    C: Codec,
{
    let mut seq: u64 = 1;
    while let Some(payload) = frames.recv().await {
        let envelope = Envelope {
            seq: next_seq(&mut seq),
            timestamp: state.now_ms(),
            payload,
        };
        let text = match state.codec.encode(&envelope) {
            Ok(text) => text,
            Err(e) => {
                warn!(conn_id = %conn.id(), error = %e, "failed to encode frame");
                continue;
            }
        };
        if let Err(e) = conn.send_text(&text).await {
            debug!(conn_id = %conn.id(), error = %e, "send failed, stopping writer");
            break;
        }
    }
}

fn error_payload(code: u16, message: impl Into<String>) -> Payload {
    Payload::System(SystemMessage::Error {
        code,
        message: message.into(),
    })
}

/// Increments and returns the next sequence number.
fn next_seq(seq: &mut u64) -> u64 {
    let current = *seq;
    *seq += 1;
    current
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Everything the handler knows about one authenticated connection.
struct Session<A: Authenticator, C: Codec> {
    player_id: PlayerId,
    state: Arc<ServerState<A, C>>,
    outbox: Outbox,
    /// One forwarding task per subscribed room topic.
    subscriptions: HashMap<RoomId, JoinHandle<()>>,
}

impl<A: Authenticator, C: Codec> Session<A, C> {
    async fn send(&self, payload: Payload) {
        if self.outbox.send(payload).await.is_err() {
            debug!(player_id = %self.player_id, "writer gone, dropping frame");
        }
    }

    async fn reply(&self, msg: SystemMessage) {
        self.send(Payload::System(msg)).await;
    }

    async fn send_error(&self, code: u16, message: impl Into<String>) {
        self.send(error_payload(code, message)).await;
    }

    async fn send_room_error(&self, err: &RoomError) {
        debug!(player_id = %self.player_id, error = %err, "room request failed");
        self.send_error(err.code(), err.to_string()).await;
    }

    /// Handles a system message. Returns `true` if the connection should
    /// close.
    async fn handle_system(&mut self, msg: SystemMessage) -> bool {
        let player_id = self.player_id;
        let registry = &self.state.registry;

        match msg {
            SystemMessage::Heartbeat { client_time } => {
                self.reply(SystemMessage::HeartbeatAck {
                    client_time,
                    server_time: self.state.now_ms(),
                })
                .await;
            }

            SystemMessage::CreateRoom(req) => match registry.create(&req, player_id).await {
                Ok(room) => {
                    self.reply(SystemMessage::Room {
                        room: Box::new(room.redacted()),
                    })
                    .await;
                }
                Err(e) => self.send_room_error(&e).await,
            },

            SystemMessage::JoinGame { room_id } => match registry.join(room_id, player_id).await {
                Ok(room) => {
                    self.reply(SystemMessage::Room {
                        room: Box::new(room.redacted()),
                    })
                    .await;
                }
                Err(e) => self.send_room_error(&e).await,
            },

            SystemMessage::LeaveGame { room_id } => {
                match registry.leave(room_id, player_id).await {
                    Ok(_) => {
                        self.unsubscribe(room_id);
                        self.reply(SystemMessage::RoomLeft { room_id }).await;
                    }
                    Err(e) => self.send_room_error(&e).await,
                }
            }

            SystemMessage::StartGame { room_id } => {
                match registry.start(room_id, player_id).await {
                    Ok(()) => self.reply(SystemMessage::GameStarting { room_id }).await,
                    Err(e) => self.send_room_error(&e).await,
                }
            }

            SystemMessage::GetRoom { room_id } => match registry.get(room_id).await {
                Ok(room) => {
                    self.reply(SystemMessage::Room {
                        room: Box::new(room.redacted()),
                    })
                    .await;
                }
                Err(e) => self.send_room_error(&e).await,
            },

            SystemMessage::ListRooms { status } => {
                let rooms = registry
                    .list(status)
                    .await
                    .iter()
                    .map(|room| room.redacted())
                    .collect();
                self.reply(SystemMessage::RoomList { rooms }).await;
            }

            SystemMessage::GetProfile { player_id: wanted } => {
                let profiles = &registry.services().profiles;
                match tokio::time::timeout(self.state.collaborator_timeout, profiles.profile(wanted))
                    .await
                {
                    Ok(Ok(Some(profile))) => self.reply(SystemMessage::Profile { profile }).await,
                    Ok(Ok(None)) => {
                        self.send_error(404, format!("no profile for player {wanted}"))
                            .await;
                    }
                    Ok(Err(e)) => {
                        warn!(%player_id, error = %e, "profile lookup failed");
                        self.send_error(502, e.to_string()).await;
                    }
                    Err(_) => {
                        warn!(%player_id, "profile lookup timed out");
                        self.send_error(502, "profile store timed out").await;
                    }
                }
            }

            SystemMessage::Leaderboard { limit } => {
                let limit = limit.unwrap_or(DEFAULT_LEADERBOARD_LIMIT);
                let profiles = &registry.services().profiles;
                match tokio::time::timeout(
                    self.state.collaborator_timeout,
                    profiles.leaderboard(limit),
                )
                .await
                {
                    Ok(Ok(entries)) => {
                        self.reply(SystemMessage::LeaderboardList { entries }).await;
                    }
                    Ok(Err(e)) => {
                        warn!(%player_id, error = %e, "leaderboard lookup failed");
                        self.send_error(502, e.to_string()).await;
                    }
                    Err(_) => {
                        warn!(%player_id, "leaderboard lookup timed out");
                        self.send_error(502, "profile store timed out").await;
                    }
                }
            }

            SystemMessage::Disconnect { reason } => {
                info!(%player_id, %reason, "client disconnected");
                return true;
            }

            SystemMessage::Handshake { .. } => {
                self.send_error(400, "already handshaken").await;
            }

            other => {
                debug!(%player_id, message = ?other, "ignoring server-only system message");
                self.send_error(400, "unexpected system message").await;
            }
        }

        false
    }

    /// Handles a real-time client event. Events acting for a player other
    /// than the authenticated one are dropped.
    async fn handle_event(&mut self, event: ClientEvent) {
        let player_id = self.player_id;
        if let Some(claimed) = event.claimed_player() {
            if claimed != player_id {
                debug!(%player_id, %claimed, "ignoring event for another player");
                return;
            }
        }

        let registry = &self.state.registry;
        let result = match event {
            ClientEvent::JoinRoom { room_id } => {
                self.subscribe(room_id).await;
                Ok(())
            }
            ClientEvent::LeaveRoom { room_id } => {
                self.unsubscribe(room_id);
                Ok(())
            }
            ClientEvent::PlayerBuzzed { room_id, .. } => registry
                .buzz(room_id, player_id)
                .await
                .map(|outcome| debug!(%player_id, %room_id, ?outcome, "buzz handled")),
            ClientEvent::SubmitAnswer {
                room_id, answer, ..
            } => registry
                .submit_answer(room_id, player_id, answer)
                .await
                .map(|outcome| debug!(%player_id, %room_id, ?outcome, "answer handled")),
            ClientEvent::SendChatMessage { room_id, text, .. } => {
                registry.send_chat(room_id, player_id, text).await
            }
        };

        if let Err(e) = result {
            self.send_room_error(&e).await;
        }
    }

    async fn subscribe(&mut self, room_id: RoomId) {
        if self
            .subscriptions
            .get(&room_id)
            .is_some_and(|task| !task.is_finished())
        {
            debug!(player_id = %self.player_id, %room_id, "already subscribed");
            return;
        }
        match self.state.registry.subscribe(room_id).await {
            Ok(rx) => {
                let task = tokio::spawn(forward_room(
                    room_id,
                    rx,
                    self.outbox.clone(),
                    Arc::clone(&self.state),
                ));
                self.subscriptions.insert(room_id, task);
                debug!(player_id = %self.player_id, %room_id, "subscribed to room");
            }
            Err(e) => self.send_room_error(&e).await,
        }
    }

    fn unsubscribe(&mut self, room_id: RoomId) {
        if let Some(task) = self.subscriptions.remove(&room_id) {
            task.abort();
            debug!(player_id = %self.player_id, %room_id, "unsubscribed from room");
        }
    }

    fn unsubscribe_all(&mut self) {
        for (_, task) in self.subscriptions.drain() {
            task.abort();
        }
    }
}

/// Relays one room's topic to the connection. A lagging subscriber is
/// resynced with a fresh snapshot instead of the events it missed.
async fn forward_room<A, C>(
    room_id: RoomId,
    mut events: broadcast::Receiver<ServerEvent>,
    outbox: Outbox,
    state: Arc<ServerState<A, C>>,
) where
    A: Authenticator,
    C: Codec,
{
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                warn!(%room_id, missed, "subscriber lagged, resyncing");
                match state.registry.snapshot(room_id).await {
                    Ok(Some(snapshot)) => ServerEvent::StateUpdate(snapshot),
                    Ok(None) => continue,
                    Err(e) => {
                        debug!(%room_id, error = %e, "resync failed");
                        break;
                    }
                }
            }
            Err(broadcast::error::RecvError::Closed) => {
                debug!(%room_id, "room topic closed");
                break;
            }
        };

        let frame = Payload::Server(RoomBroadcast { room_id, event });
        if outbox.send(frame).await.is_err() {
            break;
        }
    }
}
