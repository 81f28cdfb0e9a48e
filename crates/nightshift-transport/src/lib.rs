//! Connection transport for Nightshift.
//!
//! The relay only sees three seams: a [`Transport`] that hands out accepted
//! sockets, an [`Incoming`] socket that still has to be upgraded, and a
//! [`Connection`] that moves opaque frames. The
//! transport is also the one place that assigns identity: every accepted
//! connection gets a [`ConnectionId`] that is never reused while the
//! process lives.
//!
//! # Feature Flags
//!
//! - `websocket` (default) — [`WebSocketTransport`] over `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{IncomingWebSocket, WebSocketConnection, WebSocketTransport};

use std::fmt;
use std::net::SocketAddr;

/// Process-unique id of an accepted connection, shown as `conn-<n>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Wraps a raw counter value.
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw counter value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A listener that yields connections.
pub trait Transport: Send + Sync + 'static {
    type Incoming: Incoming<Connection = Self::Connection, Error = Self::Error>;
    type Connection: Connection;
    type Error: std::error::Error + Send + Sync;

    /// Resolves with the next peer as soon as its socket is accepted.
    ///
    /// No protocol bytes are read here. A peer that connects and then goes
    /// quiet must not hold up the peers queued behind it, so the upgrade is
    /// left to [`Incoming::upgrade`] on the caller's per-connection task.
    async fn accept(&mut self) -> Result<Self::Incoming, Self::Error>;

    /// The bound address, including the real port when bound to `:0`.
    fn local_addr(&self) -> Result<SocketAddr, Self::Error>;
}

/// An accepted socket that has not finished its protocol handshake yet.
pub trait Incoming: Send + 'static {
    type Connection: Connection;
    type Error: std::error::Error + Send + Sync;

    fn peer_addr(&self) -> SocketAddr;

    /// Runs the handshake. Callers bound it with a timeout; the future
    /// waits as long as the peer does.
    async fn upgrade(self) -> Result<Self::Connection, Self::Error>;
}

/// A bidirectional frame pipe to one client.
///
/// `send` and `recv` take `&self` and must not block each other: the
/// relay pushes broadcasts to a client while that client's next read is
/// still pending on another task.
pub trait Connection: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync;

    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Next data frame from the peer, or `Ok(None)` once the peer has
    /// closed the connection.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    async fn close(&self) -> Result<(), Self::Error>;

    fn id(&self) -> ConnectionId;

    fn peer_addr(&self) -> SocketAddr;
}
