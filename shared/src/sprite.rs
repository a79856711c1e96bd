//! Entity model: every gameplay object is an axis-aligned rectangle with a
//! position in playfield pixels and a sprite kind for the presentation layer.

use crate::{GAME_HEIGHT, GAME_WIDTH};
use rand::Rng;
use serde::{Deserialize, Serialize};

pub const PLAYER_WIDTH: f32 = 64.0;
pub const PLAYER_HEIGHT: f32 = 64.0;
pub const PLAYER_LIFE: u32 = 3;

pub const INVADER_WIDTH: f32 = 66.0;
pub const INVADER_HEIGHT: f32 = 54.0;
pub const INVADER_TYPES: u8 = 4;
/// Travel time divisors per invader type; a bigger type falls faster.
const INVADER_SPEED_DIVISORS: [f32; 4] = [15000.0, 12500.0, 10715.0, 9375.0];
/// Invaders whose bottom edge passes this line have crashed.
pub const DANGER_LINE: f32 = GAME_HEIGHT - 20.0;

pub const BOSS_WIDTH: f32 = 256.0;
pub const BOSS_HEIGHT: f32 = 101.0;
pub const BOSS_MAX_LIFE: u32 = 10;
pub const BOSS_PATROL_Y: f32 = 50.0;

pub const LASER_WIDTH: f32 = 8.0;
pub const LASER_HEIGHT: f32 = 46.0;

pub const BOMB_WIDTH: f32 = 32.0;
pub const BOMB_HEIGHT: f32 = 62.0;

pub const EXPLOSION_SIZE: f32 = 64.0;

/// Axis-aligned bounding rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Strict overlap on both axes. Rectangles sharing only an edge do not
    /// overlap.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x + self.width > other.x
            && self.x < other.x + other.width
            && self.y + self.height > other.y
            && self.y < other.y + other.height
    }
}

/// Image asset shown for an entity.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum SpriteKind {
    Spaceship(u8),
    Invader(u8),
    Boss,
    Laser,
    Bomb,
    Explosion,
}

impl SpriteKind {
    pub fn image_name(&self) -> String {
        match self {
            SpriteKind::Spaceship(style) => format!("spaceship{}", style),
            SpriteKind::Invader(kind) => format!("invader{}", kind),
            SpriteKind::Boss => "boss".to_string(),
            SpriteKind::Laser => "laser".to_string(),
            SpriteKind::Bomb => "bomb".to_string(),
            SpriteKind::Explosion => "explode".to_string(),
        }
    }
}

/// Shared capability of every entity.
pub trait Sprite {
    fn rect(&self) -> Rect;

    fn kind(&self) -> SpriteKind;

    fn collides<S: Sprite + ?Sized>(&self, other: &S) -> bool {
        self.rect().overlaps(&other.rect())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    None,
    Left,
    Right,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::None => "",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub x: f32,
    pub y: f32,
    pub direction: Direction,
    pub speed: f32,
    pub life: u32,
    pub score: u32,
    pub style: u8,
}

impl Player {
    pub fn new() -> Self {
        Self {
            x: (GAME_WIDTH / 2.0).floor() - PLAYER_WIDTH / 2.0,
            y: GAME_HEIGHT - 100.0,
            direction: Direction::None,
            speed: GAME_WIDTH / 4000.0,
            life: PLAYER_LIFE,
            score: 0,
            style: 0,
        }
    }

    /// Moves in the current direction unless already against that wall.
    pub fn step(&mut self, dt: f32) {
        match self.direction {
            Direction::Left if self.x > 0.0 => self.x -= self.speed * dt,
            Direction::Right if self.x + PLAYER_WIDTH < GAME_WIDTH => self.x += self.speed * dt,
            _ => {}
        }
    }

    pub fn add_points(&mut self, points: u32) {
        self.score += points;
    }

    pub fn center_x(&self) -> f32 {
        self.x + PLAYER_WIDTH / 2.0
    }
}

impl Default for Player {
    fn default() -> Self {
        Self::new()
    }
}

impl Sprite for Player {
    fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, PLAYER_WIDTH, PLAYER_HEIGHT)
    }

    fn kind(&self) -> SpriteKind {
        SpriteKind::Spaceship(self.style)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Invader {
    pub x: f32,
    pub y: f32,
    pub kind: u8,
    pub speed: f32,
    pub dx: f32,
}

impl Invader {
    pub fn spawn<R: Rng>(rng: &mut R, speed_factor: f32) -> Self {
        let mut invader = Self {
            x: 0.0,
            y: 0.0,
            kind: 0,
            speed: 0.0,
            dx: 0.0,
        };
        invader.reset(rng, speed_factor);
        invader
    }

    /// Respawns this slot above the playfield with a fresh type and drift.
    pub fn reset<R: Rng>(&mut self, rng: &mut R, speed_factor: f32) {
        self.kind = rng.gen_range(0..INVADER_TYPES);
        self.x = rng.gen_range(0..(GAME_WIDTH - INVADER_WIDTH) as u32) as f32;
        self.y = rng.gen_range(-(4.0 * INVADER_HEIGHT) as i32..-(INVADER_HEIGHT as i32)) as f32;
        self.speed = GAME_HEIGHT / INVADER_SPEED_DIVISORS[self.kind as usize] * speed_factor;
        let sign = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        self.dx = rng.gen::<f32>() * sign * self.speed / 2.0;
    }

    pub fn increase_speed(&mut self, factor: f32) {
        self.speed *= factor;
    }

    pub fn step(&mut self, dt: f32) {
        self.y += self.speed * dt;
        self.x = (self.x + self.dx * dt).clamp(0.0, GAME_WIDTH - INVADER_WIDTH);
        if self.x <= 0.0 || self.x + INVADER_WIDTH >= GAME_WIDTH {
            self.dx = -self.dx;
        }
    }

    pub fn crashed(&self) -> bool {
        self.y + INVADER_HEIGHT > DANGER_LINE
    }

    pub fn points(&self) -> u32 {
        self.kind as u32 + 1
    }
}

impl Sprite for Invader {
    fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, INVADER_WIDTH, INVADER_HEIGHT)
    }

    fn kind(&self) -> SpriteKind {
        SpriteKind::Invader(self.kind)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Boss {
    pub x: f32,
    pub y: f32,
    pub speed: f32,
    pub life: u32,
    pub alive: bool,
}

impl Boss {
    pub fn new() -> Self {
        Self {
            x: Self::rest_x(),
            y: -BOSS_HEIGHT,
            speed: GAME_HEIGHT / 12500.0,
            life: BOSS_MAX_LIFE,
            alive: false,
        }
    }

    fn rest_x() -> f32 {
        (GAME_WIDTH / 2.0).floor() - BOSS_WIDTH / 2.0
    }

    pub fn appear(&mut self) {
        self.alive = true;
        self.life = BOSS_MAX_LIFE;
    }

    /// Takes one hit and returns true when that hit was the last one.
    pub fn hit(&mut self) -> bool {
        if !self.alive || self.life == 0 {
            return false;
        }
        self.life -= 1;
        if self.life == 0 {
            self.alive = false;
            return true;
        }
        false
    }

    /// Alive: descend to patrol altitude then sweep sideways. Dead: climb back
    /// out of sight and recentre.
    pub fn step(&mut self, dt: f32) {
        if self.alive {
            if self.y < BOSS_PATROL_Y {
                self.y += self.speed.abs() * dt;
            } else {
                self.x = (self.x + self.speed * dt).clamp(0.0, GAME_WIDTH - BOSS_WIDTH);
                if self.x <= 0.0 || self.x + BOSS_WIDTH >= GAME_WIDTH {
                    self.speed = -self.speed;
                }
            }
        } else if self.y > -BOSS_HEIGHT {
            self.y -= self.speed.abs() * dt;
        } else {
            self.x = Self::rest_x();
        }
    }
}

impl Default for Boss {
    fn default() -> Self {
        Self::new()
    }
}

impl Sprite for Boss {
    fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, BOSS_WIDTH, BOSS_HEIGHT)
    }

    fn kind(&self) -> SpriteKind {
        SpriteKind::Boss
    }
}

/// A loaded laser follows its owner; a shot one flies up on its own.
#[derive(Debug, Clone, PartialEq)]
pub struct Laser {
    pub x: f32,
    pub y: f32,
    pub speed: f32,
    pub shot: bool,
}

impl Laser {
    pub fn loaded(owner: &Player) -> Self {
        Self {
            x: Self::muzzle_x(owner),
            y: owner.y,
            speed: GAME_HEIGHT / 2150.0,
            shot: false,
        }
    }

    fn muzzle_x(owner: &Player) -> f32 {
        owner.center_x() - LASER_WIDTH / 2.0
    }

    pub fn shoot(&mut self) {
        self.shot = true;
    }

    pub fn step(&mut self, dt: f32, owner: &Player) {
        if self.shot {
            self.y -= self.speed * dt;
        } else {
            self.x = Self::muzzle_x(owner);
        }
    }

    pub fn off_screen(&self) -> bool {
        self.y + LASER_HEIGHT <= 0.0
    }
}

impl Sprite for Laser {
    fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, LASER_WIDTH, LASER_HEIGHT)
    }

    fn kind(&self) -> SpriteKind {
        SpriteKind::Laser
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bomb {
    pub x: f32,
    pub y: f32,
    pub speed: f32,
}

impl Bomb {
    pub fn dropped_by(boss: &Boss) -> Self {
        Self {
            x: boss.x + BOSS_WIDTH / 2.0 - BOMB_WIDTH / 2.0,
            y: boss.y,
            speed: GAME_HEIGHT / 6500.0,
        }
    }

    pub fn step(&mut self, dt: f32) {
        self.y += self.speed * dt;
    }

    pub fn off_screen(&self) -> bool {
        self.y > GAME_HEIGHT
    }
}

impl Sprite for Bomb {
    fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, BOMB_WIDTH, BOMB_HEIGHT)
    }

    fn kind(&self) -> SpriteKind {
        SpriteKind::Bomb
    }
}

/// Cosmetic only. Expires on the engine clock.
#[derive(Debug, Clone, PartialEq)]
pub struct Explosion {
    pub x: f32,
    pub y: f32,
    pub expires_at: u64,
}

impl Explosion {
    pub fn new(x: f32, y: f32, expires_at: u64) -> Self {
        Self { x, y, expires_at }
    }

    pub fn is_over(&self, now: u64) -> bool {
        now >= self.expires_at
    }
}

impl Sprite for Explosion {
    fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, EXPLOSION_SIZE, EXPLOSION_SIZE)
    }

    fn kind(&self) -> SpriteKind {
        SpriteKind::Explosion
    }
}
