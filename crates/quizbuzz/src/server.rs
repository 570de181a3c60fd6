//! `QuizbuzzServer` builder and accept loop.
//!
//! Ties the layers together: transport → protocol → room registry.

use std::sync::Arc;
use std::time::{Duration, Instant};

use quizbuzz_protocol::{Codec, JsonCodec};
use quizbuzz_room::{RoomLimits, RoomRegistry, RoomTiming, Services};
use quizbuzz_transport::{Transport, WebSocketTransport};

use crate::handler::handle_connection;
use crate::{Authenticator, QuizbuzzError, ServerConfig};

/// Shared state handed to every connection task.
pub(crate) struct ServerState<A: Authenticator, C: Codec> {
    pub(crate) registry: RoomRegistry,
    pub(crate) auth: A,
    pub(crate) codec: C,
    pub(crate) idle_timeout: Duration,
    pub(crate) handshake_timeout: Duration,
    pub(crate) collaborator_timeout: Duration,
    started: Instant,
}

impl<A: Authenticator, C: Codec> ServerState<A, C> {
    /// Milliseconds since the server started; used for envelope
    /// timestamps.
    pub(crate) fn now_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}

/// Builder for configuring and starting a quizbuzz server.
///
/// ```rust,ignore
/// use quizbuzz::prelude::*;
///
/// let server = QuizbuzzServer::builder()
///     .bind("0.0.0.0:8080")
///     .build(DevAuthenticator)
///     .await?;
/// server.run().await
/// ```
pub struct QuizbuzzServerBuilder {
    config: ServerConfig,
    services: Services,
}

impl QuizbuzzServerBuilder {
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            services: Services::builtin(),
        }
    }

    /// Replaces every setting at once, e.g. with [`ServerConfig::from_env`].
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind = addr.to_string();
        self
    }

    pub fn limits(mut self, limits: RoomLimits) -> Self {
        self.config.limits = limits;
        self
    }

    pub fn timing(mut self, timing: RoomTiming) -> Self {
        self.config.timing = timing;
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout = timeout;
        self
    }

    /// External collaborators. Defaults to [`Services::builtin`].
    pub fn services(mut self, services: Services) -> Self {
        self.services = services;
        self
    }

    /// Binds the listener. Uses [`JsonCodec`] and [`WebSocketTransport`].
    pub async fn build<A: Authenticator>(
        self,
        auth: A,
    ) -> Result<QuizbuzzServer<A, JsonCodec>, QuizbuzzError> {
        let transport = WebSocketTransport::bind(&self.config.bind).await?;

        let collaborator_timeout = self.config.timing.collaborator_timeout;
        let state = Arc::new(ServerState {
            registry: RoomRegistry::new(self.services, self.config.limits, self.config.timing),
            auth,
            codec: JsonCodec,
            idle_timeout: self.config.idle_timeout,
            handshake_timeout: self.config.handshake_timeout,
            collaborator_timeout,
            started: Instant::now(),
        });

        Ok(QuizbuzzServer { transport, state })
    }
}

impl Default for QuizbuzzServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound quizbuzz server. Call [`run`](Self::run) to start accepting.
pub struct QuizbuzzServer<A: Authenticator, C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<A, C>>,
}

impl QuizbuzzServer<crate::DevAuthenticator, JsonCodec> {
    pub fn builder() -> QuizbuzzServerBuilder {
        QuizbuzzServerBuilder::new()
    }
}

impl<A, C> QuizbuzzServer<A, C>
where
    A: Authenticator,
    C: Codec,
{
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Accepts connections until the process ends, one task per
    /// connection.
    pub async fn run(mut self) -> Result<(), QuizbuzzError> {
        tracing::info!(addr = ?self.local_addr().ok(), "quizbuzz server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
