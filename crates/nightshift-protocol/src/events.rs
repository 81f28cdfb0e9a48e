//! The message catalog and inbound dispatch.
//!
//! Every event the relay knows about is listed in [`EventName`], together
//! with the direction it may travel. Outbound events are the
//! [`ServerEvent`] enum; inbound frames go through
//! [`decode_client_event`], which looks the event name up in an explicit
//! table instead of trusting whatever tag a client sends.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Codec, Movement, PlayerId, PlayerState, ProtocolError, Snapshot};

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Which way an event travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ClientToServer,
    ServerToClient,
}

/// Every event name in the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventName {
    /// Server → new client: "this is your id". Always the first frame on a
    /// connection; lets the client skip itself in `currentPlayers`.
    Connect,
    /// Server → new client: everyone currently in the world.
    CurrentPlayers,
    /// Server → everyone else: a session joined.
    NewPlayer,
    /// Client → server: my new position and heading.
    PlayerMovement,
    /// Server → everyone else: a session moved.
    PlayerMoved,
    /// Server → everyone: a session left.
    PlayerDisconnected,
}

impl EventName {
    /// The full catalog, in the order a session typically sees them.
    pub const CATALOG: [EventName; 6] = [
        EventName::Connect,
        EventName::CurrentPlayers,
        EventName::NewPlayer,
        EventName::PlayerMovement,
        EventName::PlayerMoved,
        EventName::PlayerDisconnected,
    ];

    /// The name as it appears in a frame's `event` field.
    pub fn as_str(self) -> &'static str {
        match self {
            EventName::Connect => "connect",
            EventName::CurrentPlayers => "currentPlayers",
            EventName::NewPlayer => "newPlayer",
            EventName::PlayerMovement => "playerMovement",
            EventName::PlayerMoved => "playerMoved",
            EventName::PlayerDisconnected => "playerDisconnected",
        }
    }

    /// Looks a wire name up in the catalog. Matching is exact.
    pub fn parse(name: &str) -> Option<Self> {
        Self::CATALOG.into_iter().find(|event| event.as_str() == name)
    }

    pub fn direction(self) -> Direction {
        match self {
            EventName::PlayerMovement => Direction::ClientToServer,
            _ => Direction::ServerToClient,
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// Payload of `connect`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Welcome {
    pub id: PlayerId,
}

/// Payload of `newPlayer`: `{"id": ..., "player": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerJoined {
    pub id: PlayerId,
    pub player: PlayerState,
}

/// Payload of `playerMoved`: `{"id","x","y","z","rotation","skin"}`.
///
/// The skin rides along on every relay even though it never changes, so
/// each message is self-describing even if it overtakes the matching
/// `newPlayer`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerMoved {
    pub id: PlayerId,
    #[serde(flatten)]
    pub state: PlayerState,
}

/// Everything the relay sends to clients.
///
/// `#[serde(tag = "event", content = "data")]` produces the
/// `{"event": "...", "data": ...}` frame shape, with variant names
/// camel-cased to match the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    Connect(Welcome),
    CurrentPlayers(Snapshot),
    NewPlayer(PlayerJoined),
    PlayerMoved(PlayerMoved),
    PlayerDisconnected(PlayerId),
}

impl ServerEvent {
    /// The catalog entry for this event.
    pub fn name(&self) -> EventName {
        match self {
            ServerEvent::Connect(_) => EventName::Connect,
            ServerEvent::CurrentPlayers(_) => EventName::CurrentPlayers,
            ServerEvent::NewPlayer(_) => EventName::NewPlayer,
            ServerEvent::PlayerMoved(_) => EventName::PlayerMoved,
            ServerEvent::PlayerDisconnected(_) => EventName::PlayerDisconnected,
        }
    }
}

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// Everything a client may send.
///
/// Serializes to the same frame shape as [`ServerEvent`], which is what
/// test clients and tooling use. The relay itself never deserializes this
/// type directly; inbound frames go through [`decode_client_event`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    PlayerMovement(Movement),
}

impl ClientEvent {
    pub fn name(&self) -> EventName {
        match self {
            ClientEvent::PlayerMovement(_) => EventName::PlayerMovement,
        }
    }
}

/// An inbound frame before its payload has been checked.
#[derive(Deserialize)]
struct Frame {
    event: String,
    #[serde(default)]
    data: serde_json::Value,
}

type PayloadDecoder = fn(serde_json::Value) -> Result<ClientEvent, serde_json::Error>;

/// Inbound dispatch table. An event is accepted from clients only if it
/// has an entry here.
const INBOUND: &[(EventName, PayloadDecoder)] =
    &[(EventName::PlayerMovement, decode_movement)];

fn decode_movement(data: serde_json::Value) -> Result<ClientEvent, serde_json::Error> {
    serde_json::from_value(data).map(ClientEvent::PlayerMovement)
}

/// Decodes one inbound frame into a typed client event.
///
/// # Errors
/// - [`ProtocolError::Decode`] — not a `{"event", "data"}` frame
/// - [`ProtocolError::UnknownEvent`] — event name not in the catalog
/// - [`ProtocolError::UnexpectedEvent`] — a server-to-client event
/// - [`ProtocolError::Payload`] — payload missing fields or ill-typed
pub fn decode_client_event<C: Codec>(
    codec: &C,
    data: &[u8],
) -> Result<ClientEvent, ProtocolError> {
    let frame: Frame = codec.decode(data)?;

    let event = EventName::parse(&frame.event)
        .ok_or(ProtocolError::UnknownEvent(frame.event))?;

    let decoder = INBOUND
        .iter()
        .find(|(name, _)| *name == event)
        .map(|(_, decoder)| *decoder)
        .ok_or(ProtocolError::UnexpectedEvent(event))?;

    decoder(frame.data).map_err(|source| ProtocolError::Payload { event, source })
}
