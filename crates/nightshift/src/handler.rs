//! Per-connection handler: upgrade, join, movement loop, and teardown.
//!
//! Each accepted TCP connection gets its own Tokio task running this
//! handler, plus a writer task that drains the connection's outbox. The
//! flow is:
//!   1. Upgrade to WebSocket within the handshake timeout
//!   2. Register with the world → connect, snapshot, and join frames queued
//!   3. Loop: receive frames → forward movement to the world
//!   4. On close, error, idle timeout, or a stopped writer → leave the world

use std::io;
use std::sync::Arc;
use std::time::Duration;

use nightshift_protocol::{decode_client_event, ClientEvent, Codec, PlayerId, ServerEvent};
use nightshift_transport::{
    Connection, Incoming, IncomingWebSocket, TransportError, WebSocketConnection,
};
use nightshift_world::{ConnectionPhase, WorldHandle};
use tokio::sync::mpsc;
use tokio::time::error::Elapsed;

use crate::server::ServerState;
use crate::RelayError;

/// How long one frame may take to reach the socket before the client is
/// treated as gone.
const WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Drop guard that removes a player from the world when the handler exits.
///
/// Cleanup runs even if the handler panics. Since `Drop` is synchronous,
/// the disconnect is sent from a fire-and-forget task.
struct DisconnectGuard {
    player_id: PlayerId,
    world: WorldHandle,
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        let player_id = self.player_id.clone();
        let world = self.world.clone();
        // No runtime means the process is exiting; nothing left to tell.
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            runtime.spawn(async move {
                let _ = world.disconnect(player_id).await;
            });
        }
    }
}

/// Handles a single connection from TCP accept to close.
///
/// A peer that never completes the upgrade only costs this task; it ends
/// with [`TransportError::Handshake`] once the handshake timeout passes.
pub(crate) async fn handle_connection<C: Codec>(
    incoming: IncomingWebSocket,
    state: Arc<ServerState<C>>,
) -> Result<(), RelayError> {
    let peer = incoming.peer_addr();
    let conn = match tokio::time::timeout(state.handshake_timeout, incoming.upgrade()).await {
        Ok(upgraded) => Arc::new(upgraded?),
        Err(_) => {
            return Err(TransportError::Handshake {
                peer,
                source: io::Error::new(io::ErrorKind::TimedOut, "upgrade not completed in time"),
            }
            .into());
        }
    };

    let player_id = PlayerId::from(conn.id());
    let mut phase = ConnectionPhase::Connecting;
    tracing::debug!(%player_id, %peer, %phase, "handling new connection");

    let (outbox, inbox) = mpsc::channel(state.outbox_capacity);
    let mut writer = tokio::spawn(write_outbound(
        Arc::clone(&conn),
        inbox,
        Arc::clone(&state),
    ));

    // On failure the world drops the outbox, which lets the writer close
    // the socket.
    state.world.connect(player_id.clone(), outbox).await?;
    let _guard = DisconnectGuard {
        player_id: player_id.clone(),
        world: state.world.clone(),
    };
    phase = phase.activate()?;

    loop {
        let received = tokio::select! {
            // The writer stops when the world cuts this client off or the
            // socket stops taking frames. Either way the client is gone.
            _ = &mut writer => {
                tracing::debug!(%player_id, "writer stopped, ending connection");
                break;
            }
            received = next_frame(&conn, state.idle_timeout) => received,
        };

        let data = match received {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                tracing::debug!(%player_id, "connection closed cleanly");
                break;
            }
            Ok(Err(e)) => {
                tracing::debug!(%player_id, error = %e, "recv error");
                break;
            }
            Err(_) => {
                tracing::info!(%player_id, "connection idle, closing");
                break;
            }
        };

        match decode_client_event(&state.codec, &data) {
            Ok(ClientEvent::PlayerMovement(movement)) => {
                state.world.movement(player_id.clone(), movement).await?;
            }
            Err(e) => {
                tracing::debug!(%player_id, error = %e, "dropping frame");
            }
        }
    }

    phase = phase.disconnect();
    tracing::debug!(%player_id, %phase, "connection handler finished");

    // _guard drops here → world disconnect fires.
    Ok(())
}

/// Waits for the next frame, giving up after `idle` if one is set.
async fn next_frame(
    conn: &WebSocketConnection,
    idle: Option<Duration>,
) -> Result<Result<Option<Vec<u8>>, TransportError>, Elapsed> {
    match idle {
        Some(limit) => tokio::time::timeout(limit, conn.recv()).await,
        None => Ok(conn.recv().await),
    }
}

/// Drains one connection's outbox onto the socket, in queue order.
///
/// Ends when the world drops the outbox or the socket refuses a frame or
/// takes longer than [`WRITE_TIMEOUT`] to accept one, then closes the
/// connection.
async fn write_outbound<C: Codec>(
    conn: Arc<WebSocketConnection>,
    mut inbox: mpsc::Receiver<ServerEvent>,
    state: Arc<ServerState<C>>,
) {
    let conn_id = conn.id();

    while let Some(event) = inbox.recv().await {
        let bytes = match state.codec.encode(&event) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(%conn_id, event = %event.name(), error = %e, "encode failed");
                continue;
            }
        };
        match tokio::time::timeout(WRITE_TIMEOUT, conn.send(&bytes)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::debug!(%conn_id, error = %e, "send failed, stopping writer");
                break;
            }
            Err(_) => {
                tracing::info!(%conn_id, "send timed out, stopping writer");
                break;
            }
        }
    }

    // The peer may already be gone, or stalled.
    let _ = tokio::time::timeout(WRITE_TIMEOUT, conn.close()).await;
}
