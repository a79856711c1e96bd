use crate::input::{Idle, InputSource, RequestBuilder};
use crate::network::ClientProxy;
use crate::rendering::RenderSink;
use crate::scores::{pair_label, LeaderboardMode, ScoreStore};
use log::{debug, info, warn};
use shared::protocol::{default_name, Command, CommandBatch, Snapshot};
use shared::{Engine, GameMode};
use std::time::Duration;
use tokio::time::{interval, sleep, Interval, MissedTickBehavior};

/// Style given to the second ship in a same-screen game.
const PARTNER_STYLE: u8 = 1;

/// A game simulated in this process, for one player or two sharing a screen.
pub struct LocalGame {
    engine: Engine,
    names: [String; 2],
}

impl LocalGame {
    pub fn solo(name: &str, style: u8, seed: Option<u64>) -> Self {
        let mut game = Self::new(GameMode::Solo, [name, ""], seed);
        game.engine.set_style(0, style);
        game
    }

    pub fn pair(names: [&str; 2], style: u8, seed: Option<u64>) -> Self {
        let mut game = Self::new(GameMode::Pair, names, seed);
        game.engine.set_style(0, style);
        game.engine.set_style(1, PARTNER_STYLE);
        game
    }

    fn new(mode: GameMode, names: [&str; 2], seed: Option<u64>) -> Self {
        let engine = match seed {
            Some(seed) => Engine::with_seed(mode, seed),
            None => Engine::new(mode),
        };
        let name = |p: usize| {
            let name = names[p].trim();
            if name.is_empty() {
                default_name(p)
            } else {
                name.to_string()
            }
        };

        Self {
            engine,
            names: [name(0), name(1)],
        }
    }

    pub fn mode(&self) -> GameMode {
        self.engine.mode()
    }

    pub fn player_count(&self) -> usize {
        self.mode().player_count()
    }

    pub fn names(&self) -> &[String; 2] {
        &self.names
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Applies a player's direction and shoot commands. Time only moves
    /// through [`step`](Self::step), so `update` tokens are ignored here.
    pub fn apply(&mut self, player: usize, batch: &CommandBatch) {
        for command in batch.commands() {
            match command {
                Command::Direction(direction) => self.engine.set_direction(player, *direction),
                Command::Shoot => self.engine.shoot(player),
                Command::Update(_) => {}
            }
        }
    }

    pub fn step(&mut self, dt_ms: u32) {
        self.engine.update(dt_ms);
    }

    /// Frame for the shared screen. Both players hear the same sounds, so
    /// only player 0's queue is reported and the others are discarded.
    pub fn snapshot(&mut self) -> Snapshot {
        let snapshot = Snapshot::capture(&mut self.engine, 0, true, self.names.clone());
        for player in 1..self.player_count() {
            self.engine.take_sounds(player);
        }
        snapshot
    }

    pub fn is_over(&self) -> bool {
        self.engine.is_over()
    }
}

/// Frame timing for the game loops
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Simulated time per frame
    pub dt_ms: u32,
    /// Stop after this many frames, even if the game is still running
    pub frame_limit: Option<u64>,
    /// Wait for wall-clock time between frames instead of running flat out
    pub paced: bool,
    /// Countdown between the match becoming ready and the first frame
    pub start_delay_ms: u64,
}

impl LoopConfig {
    pub fn from_fps(fps: u32) -> Self {
        Self {
            dt_ms: (1000 / fps.max(1)).max(1),
            ..Self::default()
        }
    }

    fn frame_interval(&self) -> Option<Interval> {
        if !self.paced {
            return None;
        }
        let mut ticker = interval(Duration::from_millis(self.dt_ms as u64));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Some(ticker)
    }

    fn limit_reached(&self, frames: u64) -> bool {
        self.frame_limit.is_some_and(|limit| frames >= limit)
    }
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            dt_ms: 16,
            frame_limit: None,
            paced: true,
            start_delay_ms: 4000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    GameOver,
    FrameLimit,
    Disconnected,
}

/// How a game ended and what each player scored.
#[derive(Debug, Clone)]
pub struct GameSummary {
    pub outcome: Outcome,
    pub mode: LeaderboardMode,
    pub names: Vec<String>,
    pub scores: Vec<u32>,
    pub frames: u64,
}

impl GameSummary {
    fn from_snapshot(
        outcome: Outcome,
        mode: LeaderboardMode,
        snapshot: Option<&Snapshot>,
        frames: u64,
    ) -> Self {
        let (names, scores) = match snapshot {
            Some(s) => (
                s.names.iter().take(s.players.len()).cloned().collect(),
                s.players.iter().map(|p| p.score).collect(),
            ),
            None => (Vec::new(), Vec::new()),
        };

        Self {
            outcome,
            mode,
            names,
            scores,
            frames,
        }
    }

    pub fn total_score(&self) -> u32 {
        self.scores.iter().sum()
    }

    /// Name the score is filed under: the player's own name, or both names
    /// shortened for a team.
    pub fn leaderboard_name(&self) -> String {
        match self.names.as_slice() {
            [first, second, ..] => pair_label(first, second),
            [only] => only.clone(),
            [] => default_name(0),
        }
    }
}

/// Files a finished game's score. Games cut short by a lost connection are
/// not recorded.
pub fn record_score<S: ScoreStore + ?Sized>(store: &mut S, summary: &GameSummary) -> bool {
    if summary.outcome == Outcome::Disconnected {
        return false;
    }
    store.save_score(&summary.leaderboard_name(), summary.total_score(), summary.mode)
}

/// Runs a local game until it is over or the frame limit is reached.
///
/// `sources[p]` steers player `p`; players without a source stand still.
pub async fn run_local(
    game: &mut LocalGame,
    sources: &mut [Box<dyn InputSource + Send>],
    sink: &mut dyn RenderSink,
    config: &LoopConfig,
) -> GameSummary {
    let players = game.player_count();
    let mut builders: Vec<RequestBuilder> = (0..players).map(|_| RequestBuilder::new()).collect();
    let mut idle = Idle;
    let mut ticker = config.frame_interval();
    let mut frames = 0;

    info!("Starting {:?} game", game.mode());

    loop {
        if let Some(ticker) = ticker.as_mut() {
            ticker.tick().await;
        }

        for (player, builder) in builders.iter_mut().enumerate() {
            let events = match sources.get_mut(player) {
                Some(source) => source.poll(),
                None => idle.poll(),
            };
            for event in events {
                builder.handle(event);
            }
            game.apply(player, &builder.take());
        }

        game.step(config.dt_ms);
        let snapshot = game.snapshot();
        sink.play(&snapshot.sounds);
        sink.present(&snapshot);
        frames += 1;

        let outcome = if snapshot.is_over() {
            Some(Outcome::GameOver)
        } else if config.limit_reached(frames) {
            Some(Outcome::FrameLimit)
        } else {
            None
        };

        if let Some(outcome) = outcome {
            info!(
                "Game finished ({:?}) after {} frames with {} points",
                outcome,
                frames,
                snapshot.total_score()
            );
            return GameSummary::from_snapshot(
                outcome,
                game.mode().into(),
                Some(&snapshot),
                frames,
            );
        }
    }
}

/// Plays an online match through `proxy`.
///
/// Polls the match until a partner has joined, waits out the start
/// countdown, then sends one batch per frame until either player is out of
/// lives. The proxy is disconnected when the game ends.
pub async fn run_online(
    proxy: &mut ClientProxy,
    source: &mut dyn InputSource,
    sink: &mut dyn RenderSink,
    config: &LoopConfig,
) -> GameSummary {
    let mode = LeaderboardMode::Multi;
    let frame = Duration::from_millis(config.dt_ms as u64);
    let mut last: Option<Snapshot> = None;
    let mut polls = 0;

    // Waiting room
    loop {
        match proxy.exchange(&CommandBatch::new()).await {
            Some(snapshot) => {
                sink.play(&snapshot.sounds);
                sink.present(&snapshot);
                let ready = snapshot.ready;
                last = Some(snapshot);
                if ready {
                    break;
                }
            }
            // Unreadable reply with nothing cached yet; the link is still up.
            None if proxy.is_connected() => {}
            None => {
                warn!("Lost the server while waiting for a partner");
                return GameSummary::from_snapshot(Outcome::Disconnected, mode, last.as_ref(), 0);
            }
        }

        polls += 1;
        if config.limit_reached(polls) {
            info!("No partner joined");
            proxy.disconnect().await;
            return GameSummary::from_snapshot(Outcome::FrameLimit, mode, last.as_ref(), 0);
        }
        sleep(frame).await;
    }

    info!("Partner found, starting in {} ms", config.start_delay_ms);
    sleep(Duration::from_millis(config.start_delay_ms)).await;

    let mut builder = RequestBuilder::new();
    let mut ticker = config.frame_interval();
    let mut frames = 0;

    let outcome = loop {
        if let Some(ticker) = ticker.as_mut() {
            ticker.tick().await;
        }

        for event in source.poll() {
            builder.handle(event);
        }
        let reply = proxy.exchange(&builder.finish(config.dt_ms)).await;
        if reply.is_none() && !proxy.is_connected() {
            break Outcome::Disconnected;
        }
        frames += 1;

        if let Some(snapshot) = reply {
            sink.play(&snapshot.sounds);
            sink.present(&snapshot);

            let over = snapshot.is_over();
            last = Some(snapshot);
            if over {
                break Outcome::GameOver;
            }
        }
        if config.limit_reached(frames) {
            break Outcome::FrameLimit;
        }
    };

    debug!("Online game ended: {:?}", outcome);
    proxy.disconnect().await;
    GameSummary::from_snapshot(outcome, mode, last.as_ref(), frames)
}
