//! Match state and the task that owns it.
//!
//! Each match runs in its own task holding the only reference to its
//! [`Engine`]. Sessions talk to it through a [`MatchHandle`]; every batch is
//! applied and answered in arrival order, so two connections can never step
//! the same engine concurrently.

use log::{debug, info, trace};
use shared::protocol::{default_name, Command, CommandBatch, Greeting, Snapshot};
use shared::{Engine, GameMode};
use tokio::sync::{mpsc, oneshot};

pub type MatchId = u32;

const MATCH_QUEUE_DEPTH: usize = 64;

#[derive(Debug)]
pub enum MatchCommand {
    Join {
        player: usize,
        greeting: Greeting,
    },
    Batch {
        player: usize,
        batch: CommandBatch,
        reply: oneshot::Sender<Snapshot>,
    },
    Leave {
        player: usize,
    },
}

pub struct MatchState {
    id: MatchId,
    engine: Engine,
    ready: bool,
    player_count: usize,
    names: [String; 2],
}

impl MatchState {
    pub fn new(id: MatchId, engine: Engine) -> Self {
        Self {
            id,
            engine,
            ready: false,
            player_count: 0,
            names: [default_name(0), default_name(1)],
        }
    }

    pub fn id(&self) -> MatchId {
        self.id
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn player_count(&self) -> usize {
        self.player_count
    }

    pub fn names(&self) -> &[String; 2] {
        &self.names
    }

    pub fn join(&mut self, player: usize, greeting: Greeting) {
        if let Some(name) = self.names.get_mut(player) {
            *name = greeting.name;
        }
        self.engine.set_style(player, greeting.style);
        // Whatever was queued for an empty seat is stale.
        self.engine.take_sounds(player);
        self.player_count += 1;
        if self.player_count >= 2 {
            self.ready = true;
        }
        let name = self.names.get(player).map(String::as_str).unwrap_or("?");
        info!("Match {}: player {} joined as {}", self.id, player, name);
    }

    pub fn leave(&mut self, player: usize) {
        self.player_count = self.player_count.saturating_sub(1);
        self.engine.set_direction(player, shared::Direction::None);
        self.engine.take_sounds(player);
        info!("Match {}: player {} left", self.id, player);
    }

    /// Only one connection may step the clock: player 0, or whoever is alone.
    pub fn may_advance(&self, player: usize) -> bool {
        self.player_count <= 1 || player == 0
    }

    /// Applies a batch in order and returns the state as seen by `player`.
    pub fn apply(&mut self, player: usize, batch: &CommandBatch) -> Snapshot {
        for command in batch.commands() {
            match *command {
                Command::Direction(direction) => self.engine.set_direction(player, direction),
                Command::Shoot => self.engine.shoot(player),
                Command::Update(dt) => {
                    if self.may_advance(player) {
                        self.engine.update(dt);
                    } else {
                        trace!("Match {}: update from player {} ignored", self.id, player);
                    }
                }
            }
        }
        self.snapshot(player)
    }

    pub fn snapshot(&mut self, player: usize) -> Snapshot {
        Snapshot::capture(&mut self.engine, player, self.ready, self.names.clone())
    }
}

/// Cloneable sender side of a match task.
#[derive(Debug, Clone)]
pub struct MatchHandle {
    id: MatchId,
    tx: mpsc::Sender<MatchCommand>,
}

impl MatchHandle {
    pub fn new(id: MatchId, tx: mpsc::Sender<MatchCommand>) -> Self {
        Self { id, tx }
    }

    pub fn id(&self) -> MatchId {
        self.id
    }

    /// Returns false when the match task is already gone.
    pub async fn join(&self, player: usize, greeting: Greeting) -> bool {
        self.tx
            .send(MatchCommand::Join { player, greeting })
            .await
            .is_ok()
    }

    pub async fn submit(&self, player: usize, batch: CommandBatch) -> Option<Snapshot> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(MatchCommand::Batch {
                player,
                batch,
                reply,
            })
            .await
            .ok()?;
        rx.await.ok()
    }

    pub async fn leave(&self, player: usize) {
        if self.tx.send(MatchCommand::Leave { player }).await.is_err() {
            debug!("Match {} already closed", self.id);
        }
    }
}

pub fn new_engine(seed: Option<u64>, id: MatchId) -> Engine {
    match seed {
        Some(seed) => Engine::with_seed(GameMode::Pair, seed.wrapping_add(id as u64)),
        None => Engine::new(GameMode::Pair),
    }
}

/// Starts the task owning `engine`. It runs until every handle is dropped.
pub fn spawn_match(id: MatchId, engine: Engine) -> MatchHandle {
    let (tx, rx) = mpsc::channel(MATCH_QUEUE_DEPTH);
    tokio::spawn(run_match(MatchState::new(id, engine), rx));
    MatchHandle::new(id, tx)
}

async fn run_match(mut state: MatchState, mut rx: mpsc::Receiver<MatchCommand>) {
    info!("Match {} started", state.id());

    while let Some(command) = rx.recv().await {
        match command {
            MatchCommand::Join { player, greeting } => state.join(player, greeting),
            MatchCommand::Batch {
                player,
                batch,
                reply,
            } => {
                let snapshot = state.apply(player, &batch);
                if reply.send(snapshot).is_err() {
                    debug!("Match {}: player {} stopped waiting", state.id(), player);
                }
            }
            MatchCommand::Leave { player } => state.leave(player),
        }
    }

    info!("Match {} closed", state.id());
}
