//! WebSocket transport over `tokio-tungstenite`.
//!
//! Browser clients speak JSON, so outbound frames that are valid UTF-8 are
//! sent as text frames. Inbound text and binary frames are both accepted;
//! control frames never reach the caller.

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::WebSocketStream;

use crate::{Connection, ConnectionId, Incoming, Transport, TransportError};

/// Source of connection ids. Never reset, so an id is never reused while
/// the process lives.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

type Socket = WebSocketStream<TcpStream>;

/// Listens for TCP connections that are later upgraded to WebSockets.
pub struct WebSocketTransport {
    listener: TcpListener,
}

impl WebSocketTransport {
    /// Binds to `addr` (`host:port`).
    ///
    /// Port `0` lets the OS pick a free port; read it back with
    /// [`Transport::local_addr`].
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| TransportError::Bind {
                addr: addr.to_owned(),
                source,
            })?;
        tracing::info!(addr, "websocket listener bound");
        Ok(Self { listener })
    }
}

impl Transport for WebSocketTransport {
    type Incoming = IncomingWebSocket;
    type Connection = WebSocketConnection;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<IncomingWebSocket, TransportError> {
        let (tcp, peer) = self.listener.accept().await.map_err(TransportError::Accept)?;
        tracing::trace!(%peer, "tcp accepted");
        Ok(IncomingWebSocket { tcp, peer })
    }

    fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        self.listener.local_addr().map_err(TransportError::Accept)
    }
}

/// A TCP socket waiting for its WebSocket upgrade request.
pub struct IncomingWebSocket {
    tcp: TcpStream,
    peer: SocketAddr,
}

impl Incoming for IncomingWebSocket {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    async fn upgrade(self) -> Result<WebSocketConnection, TransportError> {
        let peer = self.peer;
        let socket = tokio_tungstenite::accept_async(self.tcp)
            .await
            .map_err(|e| TransportError::Handshake {
                peer,
                source: io::Error::new(io::ErrorKind::InvalidData, e),
            })?;

        // Ids are handed out only to upgraded sockets, so they stay dense.
        let id = ConnectionId::new(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(%id, %peer, "websocket upgraded");

        let (writer, reader) = socket.split();
        Ok(WebSocketConnection {
            id,
            peer,
            writer: Mutex::new(writer),
            reader: Mutex::new(reader),
        })
    }
}

/// One upgraded client socket.
///
/// The socket is split into halves with a lock each, so a writer task can
/// push frames while a reader task is parked waiting for the client.
pub struct WebSocketConnection {
    id: ConnectionId,
    peer: SocketAddr,
    writer: Mutex<SplitSink<Socket, Message>>,
    reader: Mutex<SplitStream<Socket>>,
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        let frame = match std::str::from_utf8(data) {
            Ok(text) => Message::text(text.to_owned()),
            Err(_) => Message::binary(data.to_vec()),
        };
        self.writer
            .lock()
            .await
            .send(frame)
            .await
            .map_err(outbound_error)
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        let mut reader = self.reader.lock().await;
        while let Some(frame) = reader.next().await {
            match frame {
                Ok(Message::Text(text)) => return Ok(Some(text.as_bytes().to_vec())),
                Ok(Message::Binary(bytes)) => return Ok(Some(bytes.into())),
                Ok(Message::Close(_)) => return Ok(None),
                // Ping/pong are answered by tungstenite itself.
                Ok(_) => {}
                Err(tungstenite::Error::ConnectionClosed) => return Ok(None),
                Err(e) => {
                    return Err(TransportError::Receive(io::Error::new(
                        io::ErrorKind::ConnectionReset,
                        e,
                    )));
                }
            }
        }
        Ok(None)
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.writer
            .lock()
            .await
            .close()
            .await
            .map_err(outbound_error)
    }

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

fn outbound_error(e: tungstenite::Error) -> TransportError {
    match e {
        tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
            TransportError::Closed
        }
        other => TransportError::Send(io::Error::new(io::ErrorKind::BrokenPipe, other)),
    }
}
