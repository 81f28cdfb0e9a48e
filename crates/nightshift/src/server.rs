//! `RelayServer` builder and accept loop.
//!
//! This is the entry point for running a relay. It ties together all the
//! layers: transport → protocol → session → world.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use nightshift_protocol::{Codec, JsonCodec};
use nightshift_session::{RandomSkins, SessionRegistry, SkinPalette, SkinSource};
use nightshift_transport::{Transport, WebSocketTransport};
use nightshift_world::{spawn_world, World, WorldHandle, DEFAULT_CHANNEL_SIZE};

use crate::handler::handle_connection;
use crate::{RelayConfig, RelayError};

/// Shared server state passed to each connection task.
///
/// Holds no player state: that lives in the world actor, reached through
/// `world`.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) world: WorldHandle,
    pub(crate) codec: C,
    pub(crate) idle_timeout: Option<Duration>,
    pub(crate) handshake_timeout: Duration,
    pub(crate) outbox_capacity: usize,
}

/// Builder for configuring and starting a relay.
///
/// # Example
///
/// ```rust,no_run
/// use nightshift::prelude::*;
///
/// # async fn start() -> Result<(), RelayError> {
/// let server = RelayServer::builder()
///     .host("127.0.0.1")
///     .port(3000)
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct RelayServerBuilder {
    config: RelayConfig,
    channel_size: usize,
}

impl RelayServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: RelayConfig::default(),
            channel_size: DEFAULT_CHANNEL_SIZE,
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: RelayConfig) -> Self {
        self.config = config;
        self
    }

    pub fn host(mut self, host: &str) -> Self {
        self.config.host = host.to_string();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Closes connections that stay silent for `timeout`.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout = Some(timeout);
        self
    }

    /// Drops TCP peers that have not finished the WebSocket upgrade
    /// within `timeout`.
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.config.handshake_timeout = timeout;
        self
    }

    /// Bounds each connection's queue of outgoing events. A connection
    /// that lets it fill up is disconnected. Raised to
    /// [`RelayConfig::MIN_OUTBOX_CAPACITY`] if smaller.
    pub fn outbox_capacity(mut self, capacity: usize) -> Self {
        self.config.outbox_capacity = capacity;
        self
    }

    pub fn skins(mut self, skins: SkinPalette) -> Self {
        self.config.skins = skins;
        self
    }

    /// Bounds the world actor's command queue.
    pub fn channel_size(mut self, size: usize) -> Self {
        self.channel_size = size;
        self
    }

    /// Binds the transport and starts the world, drawing skins at random
    /// from the configured palette.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build(self) -> Result<RelayServer<JsonCodec>, RelayError> {
        let skins = RandomSkins::new(self.config.skins.clone());
        self.build_with_skins(skins).await
    }

    /// Like [`build`](Self::build), with a caller-supplied skin source.
    /// Tests use this to make skins deterministic.
    pub async fn build_with_skins<S: SkinSource>(
        self,
        skins: S,
    ) -> Result<RelayServer<JsonCodec>, RelayError> {
        let transport = WebSocketTransport::bind(&self.config.bind_addr()).await?;

        let world = World::new(SessionRegistry::new(skins));
        let state = Arc::new(ServerState {
            world: spawn_world(world, self.channel_size),
            codec: JsonCodec,
            idle_timeout: self.config.idle_timeout,
            handshake_timeout: self.config.handshake_timeout,
            outbox_capacity: self
                .config
                .outbox_capacity
                .max(RelayConfig::MIN_OUTBOX_CAPACITY),
        });

        Ok(RelayServer { transport, state })
    }
}

impl Default for RelayServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound relay, ready to accept connections.
///
/// Call [`run()`](Self::run) to start accepting.
pub struct RelayServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl RelayServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> RelayServerBuilder {
        RelayServerBuilder::new()
    }
}

impl<C: Codec> RelayServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, RelayError> {
        Ok(self.transport.local_addr()?)
    }

    /// Returns a handle to the world actor, e.g. to inspect the registry.
    pub fn world(&self) -> WorldHandle {
        self.state.world.clone()
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), RelayError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` completes, then stops the
    /// world, which closes every open connection.
    ///
    /// Accepting only takes the TCP connection; the WebSocket upgrade runs
    /// on the connection's own task. Accept failures are logged and do not
    /// stop the loop.
    pub async fn run_until(
        mut self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), RelayError> {
        tokio::pin!(shutdown);
        tracing::info!(addr = %self.local_addr()?, "relay running");

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    tracing::info!("shutdown requested");
                    // Already stopped is fine.
                    let _ = self.state.world.shutdown().await;
                    return Ok(());
                }
                accepted = self.transport.accept() => match accepted {
                    Ok(incoming) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(incoming, state).await {
                                tracing::debug!(
                                    error = %e,
                                    "connection ended with error"
                                );
                            }
                        });
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "accept failed");
                    }
                },
            }
        }
    }
}
