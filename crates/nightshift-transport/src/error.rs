use std::io;
use std::net::SocketAddr;

/// Transport-level failures.
///
/// Socket-level causes are kept as `io::Error` sources so the transport's
/// public API does not leak the WebSocket library's error type.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The listening socket could not be bound.
    #[error("cannot listen on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// The listener stopped handing out sockets.
    #[error("accept failed: {0}")]
    Accept(#[source] io::Error),

    /// A TCP peer connected but did not complete the WebSocket upgrade,
    /// either because the request was bad or because it took too long.
    #[error("websocket handshake with {peer} failed: {source}")]
    Handshake {
        peer: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// The peer is gone; nothing more can be sent on this connection.
    #[error("connection closed")]
    Closed,

    #[error("send failed: {0}")]
    Send(#[source] io::Error),

    #[error("receive failed: {0}")]
    Receive(#[source] io::Error),
}
