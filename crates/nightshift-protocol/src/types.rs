//! Replicated state types.
//!
//! Everything here is serialized straight onto the wire, so the serde
//! attributes define the JSON shapes the browser client reads.

use std::collections::HashMap;
use std::fmt;

use nightshift_transport::ConnectionId;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Identifies one live session.
///
/// The value is derived from the transport's [`ConnectionId`] when the
/// connection is accepted and is opaque to clients: they only compare it
/// and use it as a map key. `#[serde(transparent)]` puts it on the wire as
/// a bare string, e.g. `"conn-7"`, which also lets it key a JSON object.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    /// Wraps a raw id string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as it appears on the wire.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<ConnectionId> for PlayerId {
    fn from(id: ConnectionId) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A visual-variant identifier. Purely cosmetic: many players may share
/// the same skin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Skin(pub u8);

impl fmt::Display for Skin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Player state
// ---------------------------------------------------------------------------

/// A point in world space. Clients keep `y` at 0 (players are
/// ground-locked) but nothing on the server enforces it.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    /// Where every session starts.
    pub const ORIGIN: Position = Position { x: 0.0, y: 0.0, z: 0.0 };
}

/// The replicated state of one session.
///
/// On the wire the position is flattened, giving
/// `{"x":0,"y":0,"z":0,"rotation":0,"skin":2}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    #[serde(flatten)]
    pub position: Position,
    /// Yaw heading. Units are whatever the client uses (radians for the
    /// browser client).
    pub rotation: f64,
    /// Assigned once at creation and never changed afterwards.
    pub skin: Skin,
}

impl PlayerState {
    /// A fresh session at the origin, facing heading 0.
    pub fn spawn(skin: Skin) -> Self {
        Self {
            position: Position::ORIGIN,
            rotation: 0.0,
            skin,
        }
    }

    /// Overwrites position and heading. The skin is left alone.
    pub fn apply(&mut self, position: Position, rotation: f64) {
        self.position = position;
        self.rotation = rotation;
    }
}

/// A movement report from a client: where it is now and which way it
/// faces. Carries absolute values, not deltas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    #[serde(flatten)]
    pub position: Position,
    pub rotation: f64,
}

/// A point-in-time copy of every session in the world.
pub type Snapshot = HashMap<PlayerId, PlayerState>;
