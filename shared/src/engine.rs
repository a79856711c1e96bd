//! Authoritative simulation for one game, solo or two players sharing a
//! playfield.
//!
//! The engine advances only through [`Engine::update`]; every delayed effect
//! (laser reload, boss bombs, explosion expiry) is keyed to the engine's own
//! clock and resolved inside that call, so whoever owns the engine owns all of
//! its state transitions.

use crate::schedule::Schedule;
use crate::sprite::{
    Bomb, Boss, Direction, Explosion, Invader, Laser, Player, Sprite, EXPLOSION_SIZE,
    LASER_HEIGHT,
};
use crate::N_INVADERS;
use log::debug;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

pub const LASER_COOLDOWN_MS: u64 = 600;
pub const BOSS_BOMB_INTERVAL_MS: u64 = 4000;
pub const EXPLOSION_LIFETIME_MS: u64 = 300;
pub const INVADER_GOAL_STEP: u32 = 100;
pub const INVADER_SPEEDUP: f32 = 1.1;
pub const BOSS_KILL_POINTS: u32 = 50;
pub const BOMB_POINTS: u32 = 1;

/// Sounds kept per player between reads. Older events are dropped first.
pub const MAX_PENDING_SOUNDS: usize = 32;

/// Both players draw from one life pool, stored on the first player slot.
pub const LIFE_HOLDER: usize = 0;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum GameMode {
    Solo,
    Pair,
}

impl GameMode {
    pub fn player_count(self) -> usize {
        match self {
            GameMode::Solo => 1,
            GameMode::Pair => 2,
        }
    }

    pub fn invader_count(self) -> usize {
        match self {
            GameMode::Solo => N_INVADERS,
            GameMode::Pair => N_INVADERS * 5 / 2,
        }
    }

    /// First boss threshold, also the amount it grows by after each crossing.
    pub fn boss_goal_step(self) -> u32 {
        match self {
            GameMode::Solo => 200,
            GameMode::Pair => 300,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum SoundEvent {
    Shoot,
    Killed,
    Explosion,
    Bomb,
    Boss,
}

impl SoundEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SoundEvent::Shoot => "shoot",
            SoundEvent::Killed => "killed",
            SoundEvent::Explosion => "explosion",
            SoundEvent::Bomb => "bomb",
            SoundEvent::Boss => "boss",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EngineEvent {
    ReloadLaser(usize),
    BossBomb,
}

pub struct Engine {
    mode: GameMode,
    rng: StdRng,
    clock_ms: u64,

    players: Vec<Player>,
    lasers: Vec<Vec<Laser>>,
    invaders: Vec<Invader>,
    boss: Boss,
    bombs: Vec<Bomb>,
    explosions: Vec<Explosion>,
    sounds: Vec<Vec<SoundEvent>>,

    invader_goal: u32,
    boss_goal: u32,
    speed_factor: f32,
    schedule: Schedule<EngineEvent>,
}

impl Engine {
    pub fn new(mode: GameMode) -> Self {
        Self::with_rng(mode, StdRng::from_entropy())
    }

    /// Same seed and same sequence of calls give the same game.
    pub fn with_seed(mode: GameMode, seed: u64) -> Self {
        Self::with_rng(mode, StdRng::seed_from_u64(seed))
    }

    fn with_rng(mode: GameMode, mut rng: StdRng) -> Self {
        let players: Vec<Player> = (0..mode.player_count()).map(|_| Player::new()).collect();
        let lasers = players.iter().map(|p| vec![Laser::loaded(p)]).collect();
        let invaders = (0..mode.invader_count())
            .map(|_| Invader::spawn(&mut rng, 1.0))
            .collect();

        Self {
            mode,
            rng,
            clock_ms: 0,
            sounds: vec![Vec::new(); players.len()],
            players,
            lasers,
            invaders,
            boss: Boss::new(),
            bombs: Vec::new(),
            explosions: Vec::new(),
            invader_goal: INVADER_GOAL_STEP,
            boss_goal: mode.boss_goal_step(),
            speed_factor: 1.0,
            schedule: Schedule::new(),
        }
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn clock_ms(&self) -> u64 {
        self.clock_ms
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn lasers(&self) -> &[Vec<Laser>] {
        &self.lasers
    }

    pub fn invaders(&self) -> &[Invader] {
        &self.invaders
    }

    pub fn boss(&self) -> &Boss {
        &self.boss
    }

    pub fn bombs(&self) -> &[Bomb] {
        &self.bombs
    }

    pub fn explosions(&self) -> &[Explosion] {
        &self.explosions
    }

    pub fn invader_goal(&self) -> u32 {
        self.invader_goal
    }

    pub fn boss_goal(&self) -> u32 {
        self.boss_goal
    }

    pub fn total_score(&self) -> u32 {
        self.players.iter().map(|p| p.score).sum()
    }

    pub fn life(&self) -> u32 {
        self.players[LIFE_HOLDER].life
    }

    pub fn is_over(&self) -> bool {
        self.life() == 0
    }

    pub fn set_direction(&mut self, player: usize, direction: Direction) {
        match self.players.get_mut(player) {
            Some(p) => p.direction = direction,
            None => debug!("Ignoring direction for unknown player {}", player),
        }
    }

    pub fn set_style(&mut self, player: usize, style: u8) {
        if let Some(p) = self.players.get_mut(player) {
            p.style = style;
        }
    }

    /// Fires the player's loaded laser, if any, and queues the next one.
    pub fn shoot(&mut self, player: usize) {
        let Some(laser) = self.lasers.get_mut(player).and_then(|l| l.last_mut()) else {
            debug!("Player {} has no laser to shoot", player);
            return;
        };
        if laser.shot {
            return;
        }

        laser.shoot();
        self.add_sound(SoundEvent::Shoot);
        self.schedule.push(
            self.clock_ms + LASER_COOLDOWN_MS,
            EngineEvent::ReloadLaser(player),
        );
    }

    /// Drains the sound queue of one player.
    pub fn take_sounds(&mut self, player: usize) -> Vec<SoundEvent> {
        self.sounds
            .get_mut(player)
            .map(std::mem::take)
            .unwrap_or_default()
    }

    /// Advances the game by `dt_ms` milliseconds. Step order is fixed and
    /// decides every same-tick tie.
    pub fn update(&mut self, dt_ms: u32) {
        self.clock_ms += dt_ms as u64;
        self.run_due_events();

        self.move_entities(dt_ms as f32);
        self.check_invader_collisions();
        for owner in 0..self.players.len() {
            self.check_laser_collisions(owner);
        }
        self.check_bomb_collisions();
        self.check_explosions();
        self.check_scores();
    }

    fn run_due_events(&mut self) {
        for event in self.schedule.take_due(self.clock_ms) {
            match event {
                EngineEvent::ReloadLaser(player) => {
                    let laser = Laser::loaded(&self.players[player]);
                    self.lasers[player].push(laser);
                }
                EngineEvent::BossBomb => {
                    if self.boss.alive {
                        self.bombs.push(Bomb::dropped_by(&self.boss));
                        self.add_sound(SoundEvent::Bomb);
                        self.schedule
                            .push(self.clock_ms + BOSS_BOMB_INTERVAL_MS, EngineEvent::BossBomb);
                    }
                }
            }
        }
    }

    fn move_entities(&mut self, dt: f32) {
        for player in &mut self.players {
            player.step(dt);
        }
        for (owner, lasers) in self.players.iter().zip(self.lasers.iter_mut()) {
            for laser in lasers {
                laser.step(dt, owner);
            }
        }
        for invader in &mut self.invaders {
            invader.step(dt);
        }
        self.boss.step(dt);
        for bomb in &mut self.bombs {
            bomb.step(dt);
        }
    }

    fn check_invader_collisions(&mut self) {
        for i in 0..self.invaders.len() {
            let invader = &self.invaders[i];
            let reached = invader.crashed() || self.players.iter().any(|p| invader.collides(p));
            let (x, y) = (invader.x, invader.y);

            if reached && self.players[LIFE_HOLDER].life > 0 {
                self.players[LIFE_HOLDER].life -= 1;
                self.add_explosion(x, y);
                self.add_sound(SoundEvent::Explosion);
                self.reset_invader(i);
            }
        }
    }

    /// Shot lasers of `owner`, highest index first so removals never shift an
    /// index still to be visited.
    fn shot_lasers_desc(&self, owner: usize) -> Vec<usize> {
        (0..self.lasers[owner].len())
            .rev()
            .filter(|&i| self.lasers[owner][i].shot)
            .collect()
    }

    fn check_laser_collisions(&mut self, owner: usize) {
        self.lasers[owner].retain(|laser| !laser.off_screen());

        for i in self.shot_lasers_desc(owner) {
            let laser = &self.lasers[owner][i];
            let Some(j) = self.invaders.iter().position(|inv| laser.collides(inv)) else {
                continue;
            };

            let (x, y, points) = {
                let invader = &self.invaders[j];
                (invader.x, invader.y, invader.points())
            };
            self.lasers[owner].remove(i);
            self.add_explosion(x, y);
            self.add_sound(SoundEvent::Killed);
            self.players[owner].add_points(points);
            self.reset_invader(j);
        }

        for i in self.shot_lasers_desc(owner) {
            let laser = &self.lasers[owner][i];
            let Some(j) = self.bombs.iter().rposition(|bomb| laser.collides(bomb)) else {
                continue;
            };

            let bomb = self.bombs.remove(j);
            self.lasers[owner].remove(i);
            self.add_explosion(bomb.x, bomb.y);
            self.add_sound(SoundEvent::Killed);
            self.players[owner].add_points(BOMB_POINTS);
        }

        for i in self.shot_lasers_desc(owner) {
            if !self.boss.alive || !self.lasers[owner][i].collides(&self.boss) {
                continue;
            }

            let laser = self.lasers[owner].remove(i);
            self.add_explosion(
                laser.x - EXPLOSION_SIZE / 2.0,
                laser.y - LASER_HEIGHT / 2.0,
            );
            self.add_sound(SoundEvent::Killed);

            if self.boss.hit() {
                debug!("Boss defeated by player {}", owner);
                self.add_sound(SoundEvent::Boss);
                self.players[owner].add_points(BOSS_KILL_POINTS);
            }
        }
    }

    fn check_bomb_collisions(&mut self) {
        for i in (0..self.bombs.len()).rev() {
            if self.bombs[i].off_screen() {
                self.bombs.remove(i);
                continue;
            }

            let bomb = &self.bombs[i];
            let hit = self.players.iter().any(|p| bomb.collides(p));
            if hit && self.players[LIFE_HOLDER].life > 0 {
                let bomb = self.bombs.remove(i);
                self.players[LIFE_HOLDER].life -= 1;
                self.add_explosion(bomb.x, bomb.y);
                self.add_sound(SoundEvent::Explosion);
            }
        }
    }

    fn check_explosions(&mut self) {
        let now = self.clock_ms;
        self.explosions.retain(|explosion| !explosion.is_over(now));
    }

    fn check_scores(&mut self) {
        let total = self.total_score();

        if total >= self.invader_goal {
            self.invader_goal += INVADER_GOAL_STEP;
            self.speed_factor *= INVADER_SPEEDUP;
            for invader in &mut self.invaders {
                invader.increase_speed(INVADER_SPEEDUP);
            }
            debug!("Invaders sped up, next goal {}", self.invader_goal);
        }

        if total >= self.boss_goal {
            self.boss_goal += self.mode.boss_goal_step();
            self.boss.appear();
            self.add_sound(SoundEvent::Boss);
            self.schedule_boss_bomb();
            debug!("Boss appeared, next goal {}", self.boss_goal);
        }
    }

    fn schedule_boss_bomb(&mut self) {
        if !self.schedule.any(|event| *event == EngineEvent::BossBomb) {
            self.schedule
                .push(self.clock_ms + BOSS_BOMB_INTERVAL_MS, EngineEvent::BossBomb);
        }
    }

    fn reset_invader(&mut self, index: usize) {
        self.invaders[index].reset(&mut self.rng, self.speed_factor);
    }

    fn add_explosion(&mut self, x: f32, y: f32) {
        self.explosions
            .push(Explosion::new(x, y, self.clock_ms + EXPLOSION_LIFETIME_MS));
    }

    fn add_sound(&mut self, sound: SoundEvent) {
        for queue in &mut self.sounds {
            if queue.len() == MAX_PENDING_SOUNDS {
                queue.remove(0);
            }
            queue.push(sound);
        }
    }
}
