//! Unified error type for the relay.

use nightshift_protocol::ProtocolError;
use nightshift_session::SessionError;
use nightshift_transport::TransportError;
use nightshift_world::WorldError;

use crate::ConfigError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates the `From` impls, so
/// `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, unknown event).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (duplicate id, empty palette).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A world-level error (actor gone, bad lifecycle transition).
    #[error(transparent)]
    World(#[from] WorldError),

    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use nightshift_protocol::PlayerId;

    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::Bind {
            addr: "0.0.0.0:3000".into(),
            source: std::io::Error::from(std::io::ErrorKind::AddrInUse),
        };
        let relay_err: RelayError = err.into();
        assert!(matches!(relay_err, RelayError::Transport(_)));
        assert!(relay_err.to_string().contains("0.0.0.0:3000"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::UnknownEvent("teleport".into());
        let relay_err: RelayError = err.into();
        assert!(matches!(relay_err, RelayError::Protocol(_)));
        assert!(relay_err.to_string().contains("teleport"));
    }

    #[test]
    fn test_from_world_error_keeps_session_message() {
        let err = WorldError::from(SessionError::AlreadyExists(PlayerId::new("conn-1")));
        let relay_err: RelayError = err.into();
        assert!(matches!(relay_err, RelayError::World(WorldError::Session(_))));
        assert_eq!(relay_err.to_string(), "session conn-1 already exists");
    }

    #[test]
    fn test_from_config_error() {
        let err = ConfigError::InvalidPort("abc".into());
        let relay_err: RelayError = err.into();
        assert!(matches!(relay_err, RelayError::Config(_)));
    }
}
