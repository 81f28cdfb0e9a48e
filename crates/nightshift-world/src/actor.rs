//! World actor: the single task that owns the [`World`].
//!
//! Connection tasks talk to it through an mpsc channel. Commands are
//! applied strictly one at a time, which is what makes registry mutations
//! atomic without locks.

use nightshift_protocol::{Movement, PlayerId, PlayerState, Snapshot};
use nightshift_session::SkinSource;
use tokio::sync::{mpsc, oneshot};

use crate::{PlayerSender, World, WorldError};

/// Default command channel size for the world actor.
pub const DEFAULT_CHANNEL_SIZE: usize = 256;

/// Commands sent to the world actor through its channel.
///
/// The `oneshot::Sender` in some variants is a reply channel: the caller
/// sends a command and waits for the result on it.
enum WorldCommand {
    Connect {
        player_id: PlayerId,
        outbox: PlayerSender,
        reply: oneshot::Sender<Result<PlayerState, WorldError>>,
    },

    /// Fire-and-forget: the mover gets no reply.
    Movement {
        player_id: PlayerId,
        movement: Movement,
    },

    Disconnect {
        player_id: PlayerId,
    },

    Snapshot {
        reply: oneshot::Sender<Snapshot>,
    },

    Shutdown,
}

/// Handle to the running world actor.
///
/// Cheap to clone; every connection task holds one.
#[derive(Clone)]
pub struct WorldHandle {
    sender: mpsc::Sender<WorldCommand>,
}

impl WorldHandle {
    /// Registers a new session and announces it.
    ///
    /// When this returns `Ok`, the connect frame, the snapshot, and the
    /// join announcement have all been queued on the relevant outboxes.
    pub async fn connect(
        &self,
        player_id: PlayerId,
        outbox: PlayerSender,
    ) -> Result<PlayerState, WorldError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(WorldCommand::Connect {
                player_id,
                outbox,
                reply: reply_tx,
            })
            .await
            .map_err(|_| WorldError::Unavailable)?;
        reply_rx.await.map_err(|_| WorldError::Unavailable)?
    }

    /// Applies a movement message.
    pub async fn movement(
        &self,
        player_id: PlayerId,
        movement: Movement,
    ) -> Result<(), WorldError> {
        self.sender
            .send(WorldCommand::Movement {
                player_id,
                movement,
            })
            .await
            .map_err(|_| WorldError::Unavailable)
    }

    /// Tears a session down and announces the departure.
    pub async fn disconnect(&self, player_id: PlayerId) -> Result<(), WorldError> {
        self.sender
            .send(WorldCommand::Disconnect { player_id })
            .await
            .map_err(|_| WorldError::Unavailable)
    }

    /// Requests a point-in-time copy of the registry.
    pub async fn snapshot(&self) -> Result<Snapshot, WorldError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(WorldCommand::Snapshot { reply: reply_tx })
            .await
            .map_err(|_| WorldError::Unavailable)?;
        reply_rx.await.map_err(|_| WorldError::Unavailable)
    }

    /// Stops the actor. Dropping the world closes every outbox, which in
    /// turn ends every connection's writer.
    pub async fn shutdown(&self) -> Result<(), WorldError> {
        self.sender
            .send(WorldCommand::Shutdown)
            .await
            .map_err(|_| WorldError::Unavailable)
    }

    /// Returns `true` once the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// The internal actor state. Runs inside a Tokio task.
struct WorldActor<S: SkinSource> {
    world: World<S>,
    receiver: mpsc::Receiver<WorldCommand>,
}

impl<S: SkinSource> WorldActor<S> {
    /// Runs the actor loop, processing commands until shutdown or until
    /// every handle is dropped.
    async fn run(mut self) {
        tracing::info!("world actor started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                WorldCommand::Connect {
                    player_id,
                    outbox,
                    reply,
                } => {
                    let result = self.world.connect(player_id, outbox);
                    let _ = reply.send(result);
                }
                WorldCommand::Movement {
                    player_id,
                    movement,
                } => {
                    self.world.movement(&player_id, movement);
                }
                WorldCommand::Disconnect { player_id } => {
                    self.world.disconnect(&player_id);
                }
                WorldCommand::Snapshot { reply } => {
                    let _ = reply.send(self.world.snapshot());
                }
                WorldCommand::Shutdown => {
                    tracing::info!(
                        players = self.world.registry().len(),
                        "world shutting down"
                    );
                    break;
                }
            }
        }

        tracing::info!("world actor stopped");
    }
}

/// Spawns the world actor task and returns a handle to it.
///
/// `channel_size` bounds the command queue; when it fills up, connection
/// tasks wait, which pushes back on clients that flood movement.
pub fn spawn_world<S: SkinSource>(world: World<S>, channel_size: usize) -> WorldHandle {
    let (tx, rx) = mpsc::channel(channel_size);

    let actor = WorldActor {
        world,
        receiver: rx,
    };
    tokio::spawn(actor.run());

    WorldHandle { sender: tx }
}
