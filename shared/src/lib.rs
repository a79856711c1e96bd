pub mod engine;
pub mod framing;
pub mod protocol;
pub mod schedule;
pub mod sprite;

pub use engine::{Engine, GameMode, SoundEvent};
pub use framing::{read_frame, write_frame, FrameError};
pub use protocol::{Command, CommandBatch, Greeting, ProtocolError, Snapshot};
pub use sprite::{Direction, Rect, Sprite, SpriteKind};

use std::time::Duration;

pub const GAME_WIDTH: f32 = 725.0;
pub const GAME_HEIGHT: f32 = 750.0;
pub const N_INVADERS: usize = 6;

pub const DEFAULT_PORT: u16 = 1313;
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

pub const MAX_BATCH_BYTES: usize = 512;
pub const MAX_SNAPSHOT_BYTES: usize = 2048;
pub const MAX_TOKEN_BYTES: usize = 16;
pub const MAX_GREETING_BYTES: usize = 1024;
pub const MAX_NAME_CHARS: usize = 20;
