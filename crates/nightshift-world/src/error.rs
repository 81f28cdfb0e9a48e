//! Error types for the world layer.

use nightshift_session::SessionError;

use crate::ConnectionPhase;

/// Errors that can occur while driving the world.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// The registry refused the operation (e.g. duplicate session id).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A connection tried to move between phases in an order the
    /// lifecycle does not allow.
    #[error("invalid connection transition: {from} -> {to}")]
    InvalidTransition {
        from: ConnectionPhase,
        to: ConnectionPhase,
    },

    /// The world actor has stopped and its mailbox is closed.
    #[error("world is unavailable")]
    Unavailable,
}
