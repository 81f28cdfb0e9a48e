//! The session registry: tracks every live session and its state.
//!
//! # Concurrency note
//!
//! `SessionRegistry` is NOT thread-safe by itself: it is a plain
//! `HashMap`. It is owned by exactly one task (the world actor), which
//! applies connection and movement events one at a time. That makes every
//! `create`/`update`/`remove` atomic with respect to the others without
//! any locking.

use std::collections::HashMap;

use nightshift_protocol::{PlayerId, PlayerState, Position, Snapshot};

use crate::{RandomSkins, SessionError, SkinSource};

/// Maps each live session id to its replicated state.
///
/// Invariant: an id is present if and only if its connection is live.
/// Callers keep that true by calling [`create`](Self::create) on accept
/// and [`remove`](Self::remove) on teardown; the registry itself
/// guarantees that nothing else can insert.
///
/// ## Lifecycle
///
/// ```text
/// create() ──→ update()* ──→ remove()
///    │             │             │
///    ▼             ▼             ▼
/// [spawned]   [moved, same skin] [gone; later updates are no-ops]
/// ```
pub struct SessionRegistry<S: SkinSource = RandomSkins> {
    players: HashMap<PlayerId, PlayerState>,
    skins: S,
}

impl<S: SkinSource> SessionRegistry<S> {
    /// Creates an empty registry that draws skins from `skins`.
    pub fn new(skins: S) -> Self {
        Self {
            players: HashMap::new(),
            skins,
        }
    }

    /// Creates a session at the origin with a freshly assigned skin.
    ///
    /// # Errors
    /// Returns [`SessionError::AlreadyExists`] if `player_id` is already
    /// live. The existing entry is not modified, and no skin is drawn.
    pub fn create(
        &mut self,
        player_id: PlayerId,
    ) -> Result<&PlayerState, SessionError> {
        if self.players.contains_key(&player_id) {
            tracing::warn!(%player_id, "refusing to overwrite live session");
            return Err(SessionError::AlreadyExists(player_id));
        }

        let state = PlayerState::spawn(self.skins.assign());
        tracing::debug!(%player_id, skin = %state.skin, "session created");
        Ok(self.players.entry(player_id).or_insert(state))
    }

    /// Looks up a session.
    pub fn get(&self, player_id: &PlayerId) -> Option<&PlayerState> {
        self.players.get(player_id)
    }

    /// Overwrites a session's position and heading in place.
    ///
    /// Returns the updated state, or `None` if the session is gone. A
    /// missing id is not an error: a movement message can be in flight
    /// while its connection is torn down. The skin is never touched, and
    /// a missing id is never re-inserted.
    pub fn update(
        &mut self,
        player_id: &PlayerId,
        position: Position,
        rotation: f64,
    ) -> Option<&PlayerState> {
        let state = self.players.get_mut(player_id)?;
        state.apply(position, rotation);
        Some(state)
    }

    /// Removes a session, returning its last state.
    ///
    /// Removing an id that is not present returns `None`; duplicate
    /// teardown is tolerated.
    pub fn remove(&mut self, player_id: &PlayerId) -> Option<PlayerState> {
        self.players.remove(player_id)
    }

    /// Returns a point-in-time copy of every session.
    pub fn snapshot(&self) -> Snapshot {
        self.players.clone()
    }

    /// Returns `true` if `player_id` has a live session.
    pub fn contains(&self, player_id: &PlayerId) -> bool {
        self.players.contains_key(player_id)
    }

    /// Iterates over the ids of all live sessions, in no particular order.
    pub fn ids(&self) -> impl Iterator<Item = &PlayerId> {
        self.players.keys()
    }

    /// Returns the number of live sessions.
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// Returns `true` if nobody is in the world.
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

impl Default for SessionRegistry<RandomSkins> {
    fn default() -> Self {
        Self::new(RandomSkins::default())
    }
}

// =========================================================================
// Tests
// =========================================================================
