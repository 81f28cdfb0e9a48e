//! Connection lifecycle: wires connect, movement, and disconnect events to
//! registry mutations and router notifications.

use std::fmt;

use nightshift_protocol::{Movement, PlayerId, PlayerState, Snapshot};
use nightshift_session::{RandomSkins, SessionRegistry, SkinSource};

use crate::{PlayerSender, Router, WorldError};

// ---------------------------------------------------------------------------
// ConnectionPhase
// ---------------------------------------------------------------------------

/// Where a single connection is in its life.
///
/// ```text
///   Connecting ──(activate)──→ Active ──(disconnect)──→ Disconnected
///        │                                                   ↑
///        └───────────────────(disconnect)────────────────────┘
/// ```
///
/// There is no way back: a client that reconnects gets a brand-new
/// connection, id, and skin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    Connecting,
    Active,
    Disconnected,
}

impl ConnectionPhase {
    /// `Connecting → Active`, once the session exists and has been
    /// announced.
    ///
    /// # Errors
    /// Returns [`WorldError::InvalidTransition`] from any other phase.
    pub fn activate(self) -> Result<Self, WorldError> {
        match self {
            ConnectionPhase::Connecting => Ok(ConnectionPhase::Active),
            from => Err(WorldError::InvalidTransition {
                from,
                to: ConnectionPhase::Active,
            }),
        }
    }

    /// Any phase → `Disconnected`. Network errors and clean closes end up
    /// here alike.
    pub fn disconnect(self) -> Self {
        ConnectionPhase::Disconnected
    }

    /// Movement is only forwarded while active.
    pub fn accepts_movement(self) -> bool {
        self == ConnectionPhase::Active
    }

    /// `Disconnected` has no way out.
    pub fn is_terminal(self) -> bool {
        self == ConnectionPhase::Disconnected
    }
}

impl fmt::Display for ConnectionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionPhase::Connecting => "connecting",
            ConnectionPhase::Active => "active",
            ConnectionPhase::Disconnected => "disconnected",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// The shared world: the session registry plus the router that fans its
/// changes out.
///
/// Every method runs to completion synchronously, and the world is owned
/// by a single task, so reads used to build broadcast payloads always see
/// the state produced by the event being handled.
pub struct World<S: SkinSource = RandomSkins> {
    registry: SessionRegistry<S>,
    router: Router,
}

impl<S: SkinSource> World<S> {
    /// Wraps `registry` with a router that has nothing attached yet.
    pub fn new(registry: SessionRegistry<S>) -> Self {
        Self {
            registry,
            router: Router::new(),
        }
    }

    /// A connection was accepted.
    ///
    /// Order matters: the session is created *before* the snapshot is
    /// taken, so the newcomer sees itself in `currentPlayers` and never
    /// gets a redundant `newPlayer` about itself. Everyone else then gets
    /// `newPlayer`.
    ///
    /// # Errors
    /// Returns [`WorldError::Session`] if the id is already live. Nothing
    /// is sent and the existing session is untouched; `outbox` is dropped.
    pub fn connect(
        &mut self,
        player_id: PlayerId,
        outbox: PlayerSender,
    ) -> Result<PlayerState, WorldError> {
        let state = *self.registry.create(player_id.clone())?;

        self.router.attach(player_id.clone(), outbox);
        self.router.welcome(&player_id);
        self.router.send_snapshot(&player_id, self.registry.snapshot());
        self.router.announce_join(&player_id, state);

        tracing::info!(
            %player_id,
            skin = %state.skin,
            players = self.registry.len(),
            "player joined"
        );
        self.evict_slow_consumers();
        Ok(state)
    }

    /// A movement message arrived from `player_id`.
    ///
    /// Returns the updated state, or `None` if the session is already
    /// gone, in which case nothing is relayed.
    pub fn movement(
        &mut self,
        player_id: &PlayerId,
        movement: Movement,
    ) -> Option<PlayerState> {
        let Some(state) = self
            .registry
            .update(player_id, movement.position, movement.rotation)
            .copied()
        else {
            tracing::debug!(%player_id, "movement for departed session ignored");
            return None;
        };

        self.router.relay_movement(player_id, state);
        self.evict_slow_consumers();
        Some(state)
    }

    /// A connection went away, by close or by error.
    ///
    /// The departure is announced to everyone still attached even if the
    /// session was already removed; the registry ends up in the same state
    /// either way.
    pub fn disconnect(&mut self, player_id: &PlayerId) -> Option<PlayerState> {
        let removed = self.registry.remove(player_id);
        self.router.detach(player_id);
        self.router.announce_leave(player_id);

        tracing::info!(
            %player_id,
            was_live = removed.is_some(),
            players = self.registry.len(),
            "player left"
        );
        self.evict_slow_consumers();
        removed
    }

    /// Drops every session whose outbox the router cut off, announcing
    /// each departure like a disconnect. An announcement can overflow
    /// another outbox, so this loops until the router reports none.
    fn evict_slow_consumers(&mut self) {
        while let Some(player_id) = self.router.pop_overflowed() {
            let removed = self.registry.remove(&player_id);
            self.router.announce_leave(&player_id);
            tracing::warn!(
                %player_id,
                was_live = removed.is_some(),
                players = self.registry.len(),
                "slow consumer evicted"
            );
        }
    }

    /// A point-in-time copy of every session.
    pub fn snapshot(&self) -> Snapshot {
        self.registry.snapshot()
    }

    /// Read access for inspection and tests.
    pub fn registry(&self) -> &SessionRegistry<S> {
        &self.registry
    }

    /// Read access for inspection and tests.
    pub fn router(&self) -> &Router {
        &self.router
    }
}

impl Default for World<RandomSkins> {
    fn default() -> Self {
        Self::new(SessionRegistry::default())
    }
}

#[cfg(test)]
mod tests {
    //! Lifecycle scenarios driven directly against `World`, with
    //! deterministic skins and in-memory outboxes.

    use nightshift_protocol::{PlayerJoined, PlayerMoved, Position, ServerEvent, Skin, Welcome};
    use nightshift_session::SequenceSkins;
    use tokio::sync::mpsc::{self, Receiver};

    use super::*;

    fn pid(id: &str) -> PlayerId {
        PlayerId::new(id)
    }

    fn world() -> World<SequenceSkins> {
        World::new(SessionRegistry::new(
            SequenceSkins::new([Skin(1), Skin(3), Skin(2)]).unwrap(),
        ))
    }

    fn connect(
        world: &mut World<SequenceSkins>,
        id: &str,
    ) -> Receiver<ServerEvent> {
        let (tx, rx) = mpsc::channel(16);
        world.connect(pid(id), tx).expect("connect should succeed");
        rx
    }

    fn drain(rx: &mut Receiver<ServerEvent>) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn movement(x: f64, z: f64, rotation: f64) -> Movement {
        Movement {
            position: Position { x, y: 0.0, z },
            rotation,
        }
    }

    // =====================================================================
    // ConnectionPhase
    // =====================================================================

    #[test]
    fn test_phase_activate_from_connecting_succeeds() {
        let phase = ConnectionPhase::Connecting.activate().unwrap();
        assert_eq!(phase, ConnectionPhase::Active);
        assert!(phase.accepts_movement());
    }

    #[test]
    fn test_phase_activate_twice_is_rejected() {
        let result = ConnectionPhase::Active.activate();
        assert!(matches!(
            result,
            Err(WorldError::InvalidTransition {
                from: ConnectionPhase::Active,
                to: ConnectionPhase::Active
            })
        ));
    }

    #[test]
    fn test_phase_disconnected_is_terminal() {
        let phase = ConnectionPhase::Active.disconnect();
        assert!(phase.is_terminal());
        assert!(!phase.accepts_movement());
        assert!(phase.activate().is_err());
        assert_eq!(phase.disconnect(), ConnectionPhase::Disconnected);
    }

    #[test]
    fn test_phase_connecting_does_not_accept_movement() {
        assert!(!ConnectionPhase::Connecting.accepts_movement());
    }

    // =====================================================================
    // Scenarios
    // =====================================================================

    #[test]
    fn test_first_player_receives_welcome_and_empty_world_except_self() {
        let mut world = world();
        let mut a = connect(&mut world, "a");

        let events = drain(&mut a);

        assert_eq!(events.len(), 2);
        assert_eq!(events[0], ServerEvent::Connect(Welcome { id: pid("a") }));
        match &events[1] {
            ServerEvent::CurrentPlayers(snapshot) => {
                // Created before the snapshot, so A sees only itself.
                assert_eq!(snapshot.len(), 1);
                assert_eq!(snapshot[&pid("a")], PlayerState::spawn(Skin(1)));
            }
            other => panic!("expected CurrentPlayers, got {other:?}"),
        }
    }

    #[test]
    fn test_second_player_is_announced_and_sees_first() {
        let mut world = world();
        let mut a = connect(&mut world, "a");
        drain(&mut a);

        let mut b = connect(&mut world, "b");

        assert_eq!(
            drain(&mut a),
            vec![ServerEvent::NewPlayer(PlayerJoined {
                id: pid("b"),
                player: PlayerState::spawn(Skin(3)),
            })]
        );
        let b_events = drain(&mut b);
        assert_eq!(b_events.len(), 2, "welcome + snapshot, no self-announce");
        match &b_events[1] {
            ServerEvent::CurrentPlayers(snapshot) => {
                assert_eq!(snapshot[&pid("a")], PlayerState::spawn(Skin(1)));
                assert!(snapshot.contains_key(&pid("b")));
            }
            other => panic!("expected CurrentPlayers, got {other:?}"),
        }
    }

    #[test]
    fn test_movement_relayed_to_others_with_original_skin() {
        let mut world = world();
        let mut a = connect(&mut world, "a");
        let mut b = connect(&mut world, "b");
        drain(&mut a);
        drain(&mut b);

        let state = world
            .movement(&pid("b"), movement(5.0, -3.0, 1.2))
            .expect("b is live");

        assert_eq!(state.skin, Skin(3));
        assert_eq!(
            drain(&mut a),
            vec![ServerEvent::PlayerMoved(PlayerMoved {
                id: pid("b"),
                state: PlayerState {
                    position: Position { x: 5.0, y: 0.0, z: -3.0 },
                    rotation: 1.2,
                    skin: Skin(3),
                },
            })]
        );
        assert!(drain(&mut b).is_empty(), "mover must not hear itself");
    }

    #[test]
    fn test_movement_reaches_every_other_live_session() {
        let mut world = world();
        let mut receivers: Vec<_> = ["a", "b", "c", "d"]
            .into_iter()
            .map(|id| (id, connect(&mut world, id)))
            .collect();
        for (_, rx) in receivers.iter_mut() {
            drain(rx);
        }

        world.movement(&pid("c"), movement(1.0, 1.0, 0.0));

        for (id, rx) in receivers.iter_mut() {
            let got = drain(rx).len();
            let expected = if *id == "c" { 0 } else { 1 };
            assert_eq!(got, expected, "session {id}");
        }
    }

    #[test]
    fn test_movement_after_disconnect_is_noop() {
        let mut world = world();
        let mut a = connect(&mut world, "a");
        let _b = connect(&mut world, "b");
        world.disconnect(&pid("b"));
        drain(&mut a);

        let result = world.movement(&pid("b"), movement(9.0, 9.0, 0.0));

        assert!(result.is_none());
        assert!(!world.registry().contains(&pid("b")));
        assert!(drain(&mut a).is_empty(), "no relay for a departed session");
    }

    #[test]
    fn test_disconnect_announces_to_remaining_and_removes_from_snapshot() {
        let mut world = world();
        let mut a = connect(&mut world, "a");
        let mut b = connect(&mut world, "b");
        drain(&mut a);
        drain(&mut b);

        let removed = world.disconnect(&pid("a"));

        assert!(removed.is_some());
        assert_eq!(
            drain(&mut b),
            vec![ServerEvent::PlayerDisconnected(pid("a"))]
        );
        assert!(a.try_recv().is_err(), "departed session is detached");

        let mut c = connect(&mut world, "c");
        match &drain(&mut c)[1] {
            ServerEvent::CurrentPlayers(snapshot) => {
                assert!(!snapshot.contains_key(&pid("a")));
                assert!(snapshot.contains_key(&pid("b")));
            }
            other => panic!("expected CurrentPlayers, got {other:?}"),
        }
    }

    #[test]
    fn test_disconnect_twice_announces_again_but_state_is_stable() {
        let mut world = world();
        let _a = connect(&mut world, "a");
        let mut b = connect(&mut world, "b");
        drain(&mut b);

        assert!(world.disconnect(&pid("a")).is_some());
        let after_first = world.snapshot();
        assert!(world.disconnect(&pid("a")).is_none());

        assert_eq!(world.snapshot(), after_first);
        assert_eq!(
            drain(&mut b),
            vec![
                ServerEvent::PlayerDisconnected(pid("a")),
                ServerEvent::PlayerDisconnected(pid("a")),
            ]
        );
    }

    #[test]
    fn test_disconnect_last_player_leaves_empty_world() {
        let mut world = world();
        let _a = connect(&mut world, "a");

        world.disconnect(&pid("a"));

        assert!(world.registry().is_empty());
        assert!(world.router().is_empty());
    }

    #[test]
    fn test_connect_duplicate_id_is_refused_without_side_effects() {
        let mut world = world();
        let mut a = connect(&mut world, "a");
        drain(&mut a);
        world.movement(&pid("a"), movement(2.0, 2.0, 0.5));

        let (tx, mut dup) = mpsc::channel(16);
        let result = world.connect(pid("a"), tx);

        assert!(matches!(result, Err(WorldError::Session(_))));
        assert_eq!(
            world.registry().get(&pid("a")).unwrap().position,
            Position { x: 2.0, y: 0.0, z: 2.0 }
        );
        assert!(drain(&mut a).is_empty());
        assert!(dup.try_recv().is_err());
    }

    #[test]
    fn test_skin_survives_many_movements() {
        let mut world = world();
        let _a = connect(&mut world, "a");
        let skin = world.registry().get(&pid("a")).unwrap().skin;

        for i in 0..50 {
            let f = f64::from(i);
            world.movement(&pid("a"), movement(f, -f, f / 7.0));
        }

        assert_eq!(world.registry().get(&pid("a")).unwrap().skin, skin);
    }

    #[test]
    fn test_movement_evicts_slow_consumer_and_announces_leave() {
        let mut world = world();
        // Room for welcome, snapshot, and one more event.
        let (tx, mut slow) = mpsc::channel(3);
        world.connect(pid("slow"), tx).expect("connect should succeed");
        let mut a = connect(&mut world, "a");
        drain(&mut a);

        let state = world.movement(&pid("a"), movement(1.0, 1.0, 0.0));

        assert!(state.is_some(), "the mover is unaffected");
        assert!(!world.registry().contains(&pid("slow")));
        assert!(!world.router().is_attached(&pid("slow")));
        assert_eq!(
            drain(&mut a),
            vec![ServerEvent::PlayerDisconnected(pid("slow"))]
        );
        // Welcome, snapshot, and newPlayer(a) were queued before the cut-off.
        assert_eq!(drain(&mut slow).len(), 3);
        assert!(slow.is_closed());
    }

    #[test]
    fn test_connect_evicts_slow_consumer_before_returning() {
        let mut world = world();
        let (tx, _stalled) = mpsc::channel(2);
        world.connect(pid("stalled"), tx).expect("connect should succeed");

        let mut b = connect(&mut world, "b");

        assert_eq!(world.registry().len(), 1);
        assert!(world.registry().contains(&pid("b")));
        let events = drain(&mut b);
        assert_eq!(
            events.last(),
            Some(&ServerEvent::PlayerDisconnected(pid("stalled")))
        );
    }
}
