//! Error types for the session layer.

use nightshift_protocol::PlayerId;

/// Errors that can occur during session management.
///
/// Most registry "failures" are not errors at all: updating or removing a
/// session that is already gone is an expected race and quietly does
/// nothing. Only the cases below are real precondition violations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A session with this id is already live. The transport guarantees
    /// unique ids, so this indicates a bug upstream; the existing entry is
    /// left untouched.
    #[error("session {0} already exists")]
    AlreadyExists(PlayerId),

    /// A skin palette must offer at least one variant.
    #[error("skin palette is empty")]
    EmptyPalette,
}
