//! Wire protocol for the Nightshift relay.
//!
//! This crate defines the "language" spoken between browser clients and
//! the relay:
//!
//! - **Types** ([`PlayerId`], [`PlayerState`], [`Movement`], etc.) — the
//!   replicated state that travels on the wire.
//! - **Events** ([`EventName`], [`ServerEvent`], [`ClientEvent`]) — the
//!   message catalog, and the dispatch table that turns an inbound frame
//!   into a typed event ([`decode_client_event`]).
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how frames are turned
//!   into bytes and back.
//! - **Errors** ([`ProtocolError`]).
//!
//! # Frame shape
//!
//! Every frame is a JSON object naming the event and carrying its payload:
//!
//! ```text
//! {"event": "playerMovement", "data": {"x": 5, "y": 0, "z": -3, "rotation": 1.2}}
//! ```
//!
//! The protocol layer knows nothing about connections or who is in the
//! world. It only knows how messages look.

mod codec;
mod error;
mod events;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use events::{
    decode_client_event, ClientEvent, Direction, EventName, PlayerJoined,
    PlayerMoved, ServerEvent, Welcome,
};
pub use types::{Movement, PlayerId, PlayerState, Position, Skin, Snapshot};
