//! Frame encoding.
//!
//! Turns typed events into the bytes a
//! [`Connection`](nightshift_transport::Connection) carries and back.
//! The rest of the relay only depends on the [`Codec`] trait, so the wire
//! encoding can be swapped without touching the routing code.

use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;

/// Byte encoding for frames.
///
/// `Send + Sync + 'static` because one codec instance is shared by every
/// connection task for the life of the server.
pub trait Codec: Send + Sync + 'static {
    /// # Errors
    /// [`ProtocolError::Encode`] if the value cannot be represented.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// # Errors
    /// [`ProtocolError::Decode`] if `data` is not a valid `T`.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// JSON frames via `serde_json`.
///
/// JSON is what the browser client speaks natively, so frames can be
/// produced and consumed with plain `JSON.stringify`/`JSON.parse`.
///
/// # Example
///
/// ```rust
/// use nightshift_protocol::{Codec, JsonCodec, PlayerId, ServerEvent};
///
/// let codec = JsonCodec;
/// let event = ServerEvent::PlayerDisconnected(PlayerId::new("conn-4"));
///
/// let bytes = codec.encode(&event).unwrap();
/// assert_eq!(bytes, br#"{"event":"playerDisconnected","data":"conn-4"}"#);
///
/// let decoded: ServerEvent = codec.decode(&bytes).unwrap();
/// assert_eq!(decoded, event);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
