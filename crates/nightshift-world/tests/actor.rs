//! Integration tests for the world actor.
//!
//! These exercise the actor through its handle only, the way connection
//! tasks use it. Because the actor applies commands in order, a
//! `snapshot()` round-trip doubles as a barrier: once it returns, every
//! command sent before it has been handled.

use nightshift_protocol::{Movement, PlayerId, Position, ServerEvent, Skin};
use nightshift_session::{SequenceSkins, SessionRegistry};
use nightshift_world::{
    spawn_world, World, WorldError, WorldHandle, DEFAULT_CHANNEL_SIZE, DEFAULT_OUTBOX_CAPACITY,
};
use tokio::sync::mpsc::{self, Receiver};

fn pid(id: &str) -> PlayerId {
    PlayerId::new(id)
}

fn start_world() -> WorldHandle {
    let skins = SequenceSkins::new([Skin(2), Skin(1)]).unwrap();
    spawn_world(World::new(SessionRegistry::new(skins)), DEFAULT_CHANNEL_SIZE)
}

async fn join(world: &WorldHandle, id: &str) -> Receiver<ServerEvent> {
    let (tx, rx) = mpsc::channel(DEFAULT_OUTBOX_CAPACITY);
    world.connect(pid(id), tx).await.expect("connect");
    rx
}

fn drain(rx: &mut Receiver<ServerEvent>) -> Vec<ServerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_connect_returns_spawned_state() {
    let world = start_world();
    let (tx, _rx) = mpsc::channel(DEFAULT_OUTBOX_CAPACITY);

    let state = world.connect(pid("a"), tx).await.unwrap();

    assert_eq!(state.position, Position::ORIGIN);
    assert_eq!(state.skin, Skin(2));
}

#[tokio::test]
async fn test_connect_duplicate_returns_session_error() {
    let world = start_world();
    let _a = join(&world, "a").await;
    let (tx, _rx) = mpsc::channel(DEFAULT_OUTBOX_CAPACITY);

    let result = world.connect(pid("a"), tx).await;

    assert!(matches!(result, Err(WorldError::Session(_))));
    assert_eq!(world.snapshot().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_movement_is_applied_in_order_and_relayed() {
    let world = start_world();
    let mut a = join(&world, "a").await;
    let mut b = join(&world, "b").await;

    for i in 1..=10 {
        let movement = Movement {
            position: Position { x: f64::from(i), y: 0.0, z: 0.0 },
            rotation: 0.0,
        };
        world.movement(pid("b"), movement).await.unwrap();
    }
    let snapshot = world.snapshot().await.unwrap();

    assert_eq!(snapshot[&pid("b")].position.x, 10.0);
    assert_eq!(snapshot[&pid("b")].skin, Skin(1));

    let xs: Vec<f64> = drain(&mut a)
        .into_iter()
        .filter_map(|event| match event {
            ServerEvent::PlayerMoved(moved) => Some(moved.state.position.x),
            _ => None,
        })
        .collect();
    assert_eq!(xs, (1..=10).map(f64::from).collect::<Vec<_>>());
    assert!(
        drain(&mut b)
            .iter()
            .all(|event| !matches!(event, ServerEvent::PlayerMoved(_))),
        "b must never see its own movement"
    );
}

#[tokio::test]
async fn test_disconnect_removes_and_closes_outbox() {
    let world = start_world();
    let mut a = join(&world, "a").await;
    let mut b = join(&world, "b").await;
    drain(&mut b);

    world.disconnect(pid("a")).await.unwrap();
    let snapshot = world.snapshot().await.unwrap();

    assert!(!snapshot.contains_key(&pid("a")));
    assert_eq!(drain(&mut b), vec![ServerEvent::PlayerDisconnected(pid("a"))]);

    // A's queued events are still readable, then the channel reports closed.
    drain(&mut a);
    assert!(a.recv().await.is_none());
}

#[tokio::test]
async fn test_late_movement_after_disconnect_is_ignored() {
    let world = start_world();
    let mut a = join(&world, "a").await;
    let _b = join(&world, "b").await;

    world.disconnect(pid("b")).await.unwrap();
    world
        .movement(
            pid("b"),
            Movement {
                position: Position { x: 3.0, y: 0.0, z: 3.0 },
                rotation: 1.0,
            },
        )
        .await
        .unwrap();
    let snapshot = world.snapshot().await.unwrap();

    assert!(!snapshot.contains_key(&pid("b")));
    assert!(
        drain(&mut a)
            .iter()
            .all(|event| !matches!(event, ServerEvent::PlayerMoved(_)))
    );
}

#[tokio::test]
async fn test_shutdown_makes_handle_unavailable() {
    let world = start_world();
    let mut a = join(&world, "a").await;

    world.shutdown().await.unwrap();
    // Shutdown drops the world, which closes every outbox.
    drain(&mut a);
    assert!(a.recv().await.is_none());

    assert!(world.is_closed());
    assert!(matches!(world.snapshot().await, Err(WorldError::Unavailable)));
}
