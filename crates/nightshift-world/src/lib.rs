//! Broadcast routing and connection lifecycle for Nightshift.
//!
//! The world runs as a single Tokio task (actor model) that exclusively
//! owns the session registry and the per-connection outboxes. Connection
//! tasks never touch shared state; they send commands through a
//! [`WorldHandle`] and the actor applies them one at a time.
//!
//! # Key types
//!
//! - [`World`] — the lifecycle handler: connect, movement, disconnect
//! - [`Router`] — fans events out to connections ([`Recipient`])
//! - [`ConnectionPhase`] — per-connection state machine
//! - [`WorldHandle`] / [`spawn_world`] — the actor and its mailbox

mod actor;
mod error;
mod lifecycle;
mod router;

pub use actor::{spawn_world, WorldHandle, DEFAULT_CHANNEL_SIZE};
pub use error::WorldError;
pub use lifecycle::{ConnectionPhase, World};
pub use router::{PlayerSender, Recipient, Router, DEFAULT_OUTBOX_CAPACITY};
