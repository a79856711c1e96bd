//! Turns per-frame input events into command batches

use shared::protocol::{Command, CommandBatch};
use shared::Direction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Left,
    Right,
    Shoot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Pressed(Action),
    Released(Action),
}

/// Anything that can produce the input events of one frame
pub trait InputSource {
    fn poll(&mut self) -> Vec<InputEvent>;
}

/// Accumulates one frame of input for one player
pub struct RequestBuilder {
    direction: Direction,
    batch: CommandBatch,
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self {
            direction: Direction::None,
            batch: CommandBatch::new(),
        }
    }

    /// Direction the player is currently holding
    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn handle(&mut self, event: InputEvent) {
        match event {
            InputEvent::Pressed(Action::Left) => self.set_direction(Direction::Left),
            InputEvent::Pressed(Action::Right) => self.set_direction(Direction::Right),
            InputEvent::Pressed(Action::Shoot) => self.batch.push(Command::Shoot),
            // Releasing a key only stops the ship if it is the one steering it.
            InputEvent::Released(Action::Left) if self.direction == Direction::Left => {
                self.set_direction(Direction::None)
            }
            InputEvent::Released(Action::Right) if self.direction == Direction::Right => {
                self.set_direction(Direction::None)
            }
            InputEvent::Released(_) => {}
        }
    }

    fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
        self.batch.push(Command::Direction(direction));
    }

    /// Returns the commands gathered so far and starts a new frame
    pub fn take(&mut self) -> CommandBatch {
        std::mem::take(&mut self.batch)
    }

    /// Like [`take`](Self::take), with the frame's elapsed time appended
    pub fn finish(&mut self, dt_ms: u32) -> CommandBatch {
        let mut batch = self.take();
        batch.push(Command::Update(dt_ms));
        batch
    }
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Scripted player for headless runs: sweeps the ship back and forth and
/// fires at a fixed rhythm.
pub struct Autopilot {
    frame: u64,
    sweep_frames: u64,
    shoot_every: u64,
    heading: Action,
}

impl Autopilot {
    pub fn new(sweep_frames: u64, shoot_every: u64) -> Self {
        Self {
            frame: 0,
            sweep_frames: sweep_frames.max(1),
            shoot_every: shoot_every.max(1),
            heading: Action::Left,
        }
    }
}

impl Default for Autopilot {
    fn default() -> Self {
        Self::new(90, 10)
    }
}

impl InputSource for Autopilot {
    fn poll(&mut self) -> Vec<InputEvent> {
        let mut events = Vec::new();

        if self.frame % self.sweep_frames == 0 {
            if self.frame > 0 {
                events.push(InputEvent::Released(self.heading));
                self.heading = match self.heading {
                    Action::Left => Action::Right,
                    _ => Action::Left,
                };
            }
            events.push(InputEvent::Pressed(self.heading));
        }
        if self.frame % self.shoot_every == 0 {
            events.push(InputEvent::Pressed(Action::Shoot));
        }

        self.frame += 1;
        events
    }
}

/// Plays nothing at all
pub struct Idle;

impl InputSource for Idle {
    fn poll(&mut self) -> Vec<InputEvent> {
        Vec::new()
    }
}
