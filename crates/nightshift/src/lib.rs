//! # Nightshift
//!
//! Real-time position relay for browser multiplayer games.
//!
//! Nightshift keeps an in-memory registry of who is connected, where they
//! stand, which way they face, and which skin they wear, and relays every
//! change to everyone else. It holds no game rules: the last movement
//! message from a player wins, and is forwarded as-is.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nightshift::prelude::*;
//!
//! # async fn start() -> Result<(), RelayError> {
//! let server = RelayServer::builder()
//!     .config(RelayConfig::from_env()?)
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::{ConfigError, RelayConfig};
pub use error::RelayError;
pub use server::{RelayServer, RelayServerBuilder};

/// Everything needed to embed or test the relay.
pub mod prelude {
    pub use crate::{ConfigError, RelayConfig, RelayError, RelayServer, RelayServerBuilder};
    pub use nightshift_protocol::{
        ClientEvent, Codec, EventName, JsonCodec, Movement, PlayerId, PlayerJoined,
        PlayerMoved, PlayerState, Position, ServerEvent, Skin, Snapshot, Welcome,
    };
    pub use nightshift_session::{RandomSkins, SequenceSkins, SkinPalette, SkinSource};
    pub use nightshift_world::{WorldError, WorldHandle};
}
