//! The broadcast router: decides who receives which event.
//!
//! The router holds one outbound channel per live connection and nothing
//! else. It never stores player state; callers hand it the state to send,
//! read from the registry in the same turn as the triggering event.
//!
//! Outboxes are bounded. A connection whose outbox is full when an event
//! arrives is cut off: its outbox is detached on the spot and its id is
//! queued for the world to evict, so one stalled client cannot make the
//! relay buffer without limit.

use std::collections::{HashMap, VecDeque};

use nightshift_protocol::{
    PlayerId, PlayerJoined, PlayerMoved, PlayerState, ServerEvent, Snapshot,
    Welcome,
};
use tokio::sync::mpsc::{self, error::TrySendError};

/// Events a connection may have queued before it counts as a slow consumer.
pub const DEFAULT_OUTBOX_CAPACITY: usize = 256;

/// Channel sender for delivering outbound events to one connection.
///
/// Each connection has exactly one, drained in order by that connection's
/// writer task, so per-connection delivery order is the order events were
/// dispatched here.
pub type PlayerSender = mpsc::Sender<ServerEvent>;

/// Specifies who should receive an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    /// Every attached connection.
    All,
    /// One specific connection.
    Player(PlayerId),
    /// Every attached connection except one, typically the sender.
    AllExcept(PlayerId),
}

/// Fans events out to attached connections.
#[derive(Debug, Default)]
pub struct Router {
    outboxes: HashMap<PlayerId, PlayerSender>,
    /// Cut off for falling behind, oldest first, not yet taken by the world.
    overflowed: VecDeque<PlayerId>,
}

impl Router {
    /// Creates a router with no attached connections.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection's outbox. Returns the outbox previously
    /// attached under the same id, if any.
    pub fn attach(
        &mut self,
        player_id: PlayerId,
        outbox: PlayerSender,
    ) -> Option<PlayerSender> {
        self.outboxes.insert(player_id, outbox)
    }

    /// Drops a connection's outbox, which ends its writer task once the
    /// queued events are flushed. Returns `false` if nothing was attached.
    pub fn detach(&mut self, player_id: &PlayerId) -> bool {
        self.outboxes.remove(player_id).is_some()
    }

    /// Whether `player_id` still has an outbox here.
    pub fn is_attached(&self, player_id: &PlayerId) -> bool {
        self.outboxes.contains_key(player_id)
    }

    /// Returns the number of attached connections.
    pub fn len(&self) -> usize {
        self.outboxes.len()
    }

    /// Returns `true` if no connection is attached.
    pub fn is_empty(&self) -> bool {
        self.outboxes.is_empty()
    }

    /// Takes the next connection cut off for a full outbox, if any.
    ///
    /// The router has already detached it; removing its session and
    /// telling everyone else is up to the caller.
    pub fn pop_overflowed(&mut self) -> Option<PlayerId> {
        self.overflowed.pop_front()
    }

    /// Tells a new connection its own id.
    pub fn welcome(&mut self, to: &PlayerId) {
        let event = ServerEvent::Connect(Welcome { id: to.clone() });
        self.dispatch(Recipient::Player(to.clone()), event);
    }

    /// Sends the full world to one connection. The snapshot is not
    /// filtered: it includes the recipient's own entry.
    pub fn send_snapshot(&mut self, to: &PlayerId, snapshot: Snapshot) {
        self.dispatch(
            Recipient::Player(to.clone()),
            ServerEvent::CurrentPlayers(snapshot),
        );
    }

    /// Announces a new session to everyone except the newcomer.
    pub fn announce_join(&mut self, new_id: &PlayerId, state: PlayerState) {
        let event = ServerEvent::NewPlayer(PlayerJoined {
            id: new_id.clone(),
            player: state,
        });
        self.dispatch(Recipient::AllExcept(new_id.clone()), event);
    }

    /// Relays a session's new state to everyone except its owner.
    pub fn relay_movement(&mut self, from: &PlayerId, state: PlayerState) {
        let event = ServerEvent::PlayerMoved(PlayerMoved {
            id: from.clone(),
            state,
        });
        self.dispatch(Recipient::AllExcept(from.clone()), event);
    }

    /// Announces a departure to every attached connection.
    pub fn announce_leave(&mut self, id: &PlayerId) {
        self.dispatch(Recipient::All, ServerEvent::PlayerDisconnected(id.clone()));
    }

    /// Delivers one event to the given recipients. Returns how many
    /// outboxes accepted it.
    ///
    /// Never waits: a full outbox is detached and recorded for
    /// [`pop_overflowed`](Self::pop_overflowed) instead.
    pub fn dispatch(&mut self, recipient: Recipient, event: ServerEvent) -> usize {
        let name = event.name();
        let mut delivered = 0;
        let mut full = Vec::new();

        for (id, outbox) in &self.outboxes {
            let wanted = match &recipient {
                Recipient::All => true,
                Recipient::Player(target) => id == target,
                Recipient::AllExcept(excluded) => id != excluded,
            };
            if !wanted {
                continue;
            }
            match outbox.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => full.push(id.clone()),
                // Writer already gone; the disconnect is on its way.
                Err(TrySendError::Closed(_)) => {}
            }
        }

        for id in full {
            tracing::warn!(player_id = %id, event = %name, "outbox full, cutting off slow consumer");
            self.outboxes.remove(&id);
            self.overflowed.push_back(id);
        }

        tracing::trace!(event = %name, ?recipient, delivered, "dispatched");
        delivered
    }
}
