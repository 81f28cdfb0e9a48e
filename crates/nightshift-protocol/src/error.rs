//! Error types for the protocol layer.

use crate::EventName;

/// Errors that can occur while encoding frames or dispatching inbound ones.
///
/// None of these are fatal to a connection: the relay drops the offending
/// frame and keeps reading.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// The bytes are not a well-formed frame (malformed JSON, missing
    /// `event` field, wrong top-level shape).
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The frame names an event that is not in the message catalog.
    #[error("unknown event {0:?}")]
    UnknownEvent(String),

    /// The event exists but may not be sent in this direction, e.g. a
    /// client sending `playerMoved`.
    #[error("event {0} is not accepted from clients")]
    UnexpectedEvent(EventName),

    /// The event is known but its payload is missing fields or has the
    /// wrong types.
    #[error("invalid {event} payload: {source}")]
    Payload {
        event: EventName,
        source: serde_json::Error,
    },
}
