//! # quizbuzz
//!
//! Real-time multiplayer buzz-in quiz server.
//!
//! Players connect over WebSocket, open or join rooms, and race to buzz
//! in on each question. Every room runs as its own actor (see
//! [`quizbuzz_room`]); this crate adds the network shell around it:
//! handshake and authentication, request dispatch, and per-room event
//! forwarding.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use quizbuzz::prelude::*;
//!
//! # async fn run() -> Result<(), QuizbuzzError> {
//! let server = QuizbuzzServerBuilder::new()
//!     .config(ServerConfig::from_env())
//!     .build(DevAuthenticator)
//!     .await?;
//! server.run().await
//! # }
//! ```

mod auth;
mod config;
mod error;
mod handler;
mod server;

pub use auth::{AuthError, Authenticator, DevAuthenticator};
pub use config::{DEFAULT_BIND, ServerConfig};
pub use error::QuizbuzzError;
pub use handler::DEFAULT_LEADERBOARD_LIMIT;
pub use server::{QuizbuzzServer, QuizbuzzServerBuilder};

pub mod prelude {
    pub use crate::{
        AuthError, Authenticator, DevAuthenticator, QuizbuzzError, QuizbuzzServer,
        QuizbuzzServerBuilder, ServerConfig,
    };
    pub use quizbuzz_protocol::{
        ClientEvent, CreateRoomRequest, Envelope, GameMode, GameSession, PROTOCOL_VERSION,
        Payload, PlayerId, PlayerProfile, RoomBroadcast, RoomId, RoomStatus, ServerEvent,
        SystemMessage,
    };
    pub use quizbuzz_room::{RoomLimits, RoomTiming, Services};
}
