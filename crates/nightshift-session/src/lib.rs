//! Session registry and skin assignment for Nightshift.
//!
//! This crate owns "who is currently in the world":
//!
//! 1. **Registry** — [`SessionRegistry`] maps each live session's
//!    [`PlayerId`](nightshift_protocol::PlayerId) to its
//!    [`PlayerState`](nightshift_protocol::PlayerState). It is the single
//!    source of truth for position, heading, and skin.
//! 2. **Skins** — [`SkinSource`] hands out a cosmetic variant for each new
//!    session. [`RandomSkins`] draws uniformly from a [`SkinPalette`];
//!    [`SequenceSkins`] replays a fixed list for deterministic tests.
//!
//! # How it fits in the stack
//!
//! ```text
//! World Layer (above)  ← drives the registry from connection events
//!     ↕
//! Session Layer (this crate)  ← stores replicated player state
//!     ↕
//! Protocol Layer (below)  ← provides PlayerId, PlayerState, Skin
//! ```

mod error;
mod registry;
mod skins;

pub use error::SessionError;
pub use registry::SessionRegistry;
pub use skins::{RandomSkins, SequenceSkins, SkinPalette, SkinSource};
