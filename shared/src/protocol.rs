//! Messages exchanged between the client proxy and a session.
//!
//! Client to server input is a small text grammar, `get|direction:left|shoot|update:16|`,
//! so a batch can be read in a packet capture. Server to client state is a typed
//! [`Snapshot`] encoded with bincode.

use crate::engine::{Engine, SoundEvent};
use crate::sprite::{Direction, Sprite, SpriteKind};
use crate::MAX_NAME_CHARS;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const BATCH_MARKER: &str = "get";
const SEPARATOR: char = '|';

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("command batch does not start with `get`")]
    MissingMarker,
    #[error("unknown direction `{0}`")]
    BadDirection(String),
    #[error("invalid update delta `{0}`")]
    BadDelta(String),
    #[error("command batch carries more than one update")]
    DuplicateUpdate,
    #[error("message is not valid UTF-8")]
    NotUtf8,
    #[error("invalid player token `{0}`")]
    BadToken(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Direction(Direction),
    Shoot,
    /// Elapsed milliseconds for this tick.
    Update(u32),
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Direction(direction) => write!(f, "direction:{}", direction.as_str()),
            Command::Shoot => write!(f, "shoot"),
            Command::Update(dt) => write!(f, "update:{}", dt),
        }
    }
}

/// Ordered commands sent in one request. Holds at most one `Update`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandBatch {
    commands: Vec<Command>,
}

impl CommandBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a command. A second `Update` replaces the first in place.
    pub fn push(&mut self, command: Command) {
        if let Command::Update(_) = command {
            if let Some(existing) = self
                .commands
                .iter_mut()
                .find(|c| matches!(c, Command::Update(_)))
            {
                *existing = command;
                return;
            }
        }
        self.commands.push(command);
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn delta(&self) -> Option<u32> {
        self.commands.iter().find_map(|c| match c {
            Command::Update(dt) => Some(*dt),
            _ => None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let mut tokens = text.split(SEPARATOR);
        if tokens.next().map(str::trim) != Some(BATCH_MARKER) {
            return Err(ProtocolError::MissingMarker);
        }

        let mut batch = Self::new();
        for token in tokens.map(str::trim).filter(|t| !t.is_empty()) {
            if token == "shoot" {
                batch.commands.push(Command::Shoot);
            } else if let Some(value) = token.strip_prefix("direction:") {
                let direction = match value {
                    "" => Direction::None,
                    "left" => Direction::Left,
                    "right" => Direction::Right,
                    other => return Err(ProtocolError::BadDirection(other.to_string())),
                };
                batch.commands.push(Command::Direction(direction));
            } else if let Some(value) = token.strip_prefix("update:") {
                let dt = value
                    .parse::<u32>()
                    .map_err(|_| ProtocolError::BadDelta(value.to_string()))?;
                if batch.delta().is_some() {
                    return Err(ProtocolError::DuplicateUpdate);
                }
                batch.commands.push(Command::Update(dt));
            } else {
                debug!("Ignoring unknown command token `{}`", token);
            }
        }

        Ok(batch)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let text = std::str::from_utf8(bytes).map_err(|_| ProtocolError::NotUtf8)?;
        Self::parse(text)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl fmt::Display for CommandBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", BATCH_MARKER, SEPARATOR)?;
        for command in &self.commands {
            write!(f, "{}{}", command, SEPARATOR)?;
        }
        Ok(())
    }
}

impl FromStr for CommandBatch {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SpriteView {
    pub x: f32,
    pub y: f32,
    pub kind: SpriteKind,
}

impl SpriteView {
    pub fn of<S: Sprite>(sprite: &S) -> Self {
        let rect = sprite.rect();
        Self {
            x: rect.x,
            y: rect.y,
            kind: sprite.kind(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PlayerView {
    pub x: f32,
    pub y: f32,
    pub direction: Direction,
    pub score: u32,
    pub life: u32,
    pub kind: SpriteKind,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BossView {
    pub x: f32,
    pub y: f32,
    pub life: u32,
    pub kind: SpriteKind,
}

/// Everything a client needs to draw one frame of a match.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Snapshot {
    pub ready: bool,
    pub names: [String; 2],
    pub players: Vec<PlayerView>,
    pub lasers: Vec<Vec<SpriteView>>,
    pub invaders: Vec<SpriteView>,
    pub boss: BossView,
    pub bombs: Vec<SpriteView>,
    pub explosions: Vec<SpriteView>,
    /// Drained from the viewer's queue, so each event shows up once.
    pub sounds: Vec<SoundEvent>,
}

impl Snapshot {
    pub fn capture(engine: &mut Engine, viewer: usize, ready: bool, names: [String; 2]) -> Self {
        let sounds = engine.take_sounds(viewer);
        let boss = engine.boss();

        Self {
            ready,
            names,
            players: engine
                .players()
                .iter()
                .map(|p| PlayerView {
                    x: p.x,
                    y: p.y,
                    direction: p.direction,
                    score: p.score,
                    life: p.life,
                    kind: p.kind(),
                })
                .collect(),
            lasers: engine
                .lasers()
                .iter()
                .map(|lasers| lasers.iter().map(SpriteView::of).collect())
                .collect(),
            invaders: engine.invaders().iter().map(SpriteView::of).collect(),
            boss: BossView {
                x: boss.x,
                y: boss.y,
                life: boss.life,
                kind: boss.kind(),
            },
            bombs: engine.bombs().iter().map(SpriteView::of).collect(),
            explosions: engine.explosions().iter().map(SpriteView::of).collect(),
            sounds,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }

    pub fn total_score(&self) -> u32 {
        self.players.iter().map(|p| p.score).sum()
    }

    pub fn is_over(&self) -> bool {
        self.players.iter().any(|p| p.life == 0)
    }

    pub fn sound_names(&self) -> Vec<&'static str> {
        self.sounds.iter().map(SoundEvent::name).collect()
    }
}

pub fn default_name(player: usize) -> String {
    format!("PLAYER-{}", player + 1)
}

/// Name and visual style a client announces after receiving its seat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Greeting {
    pub name: String,
    pub style: u8,
}

impl Greeting {
    pub fn new(name: &str, style: u8) -> Self {
        Self {
            name: name.to_string(),
            style,
        }
    }

    pub fn encode(&self) -> String {
        let name: String = self
            .name
            .chars()
            .map(|c| if c == SEPARATOR { '-' } else { c })
            .take(MAX_NAME_CHARS)
            .collect();
        format!("{}{}{}", name, SEPARATOR, self.style)
    }

    /// Never fails: a blank name falls back to the seat's default name and an
    /// unreadable style to 0.
    pub fn parse(text: &str, player: usize) -> Self {
        let (name, style) = match text.rsplit_once(SEPARATOR) {
            Some((name, style)) => (name, style.trim().parse().unwrap_or(0)),
            None => (text, 0),
        };

        let name: String = name.trim().chars().take(MAX_NAME_CHARS).collect();
        let name = if name.is_empty() {
            default_name(player)
        } else {
            name
        };

        Self { name, style }
    }
}

pub fn encode_player_token(player: usize) -> String {
    player.to_string()
}

pub fn parse_player_token(text: &str) -> Result<usize, ProtocolError> {
    text.trim()
        .parse()
        .map_err(|_| ProtocolError::BadToken(text.to_string()))
}
