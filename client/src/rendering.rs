use log::{debug, info};
use shared::protocol::{Snapshot, SpriteView};
use shared::SoundEvent;

/// Consumer of rendered frames and sound cues.
///
/// Drawing and audio live outside this crate; anything that can show a
/// snapshot and play named sounds can drive a game.
pub trait RenderSink {
    fn present(&mut self, snapshot: &Snapshot);

    fn play(&mut self, sounds: &[SoundEvent]);
}

/// Sprites of a snapshot in back-to-front order as seen by `viewer`.
///
/// The viewer's own lasers and ship are drawn last so they stay on top of
/// everything the other player does.
pub fn draw_list(snapshot: &Snapshot, viewer: usize) -> Vec<SpriteView> {
    let mut items = Vec::new();

    items.extend(snapshot.explosions.iter().cloned());
    items.extend(snapshot.invaders.iter().cloned());
    items.extend(snapshot.bombs.iter().cloned());
    items.push(SpriteView {
        x: snapshot.boss.x,
        y: snapshot.boss.y,
        kind: snapshot.boss.kind,
    });

    let others = (0..snapshot.players.len()).filter(|&p| p != viewer);
    for player in others.clone() {
        if let Some(lasers) = snapshot.lasers.get(player) {
            items.extend(lasers.iter().cloned());
        }
    }
    for player in others {
        items.extend(player_sprite(snapshot, player));
    }

    if let Some(lasers) = snapshot.lasers.get(viewer) {
        items.extend(lasers.iter().cloned());
    }
    items.extend(player_sprite(snapshot, viewer));

    items
}

fn player_sprite(snapshot: &Snapshot, player: usize) -> Option<SpriteView> {
    snapshot.players.get(player).map(|p| SpriteView {
        x: p.x,
        y: p.y,
        kind: p.kind,
    })
}

/// Headless sink: writes a one-line summary to the log every few frames.
pub struct LogRenderer {
    viewer: usize,
    every: u64,
    frames: u64,
    sounds_played: u64,
    high_score: u32,
}

impl LogRenderer {
    pub fn new(viewer: usize, every: u64) -> Self {
        Self {
            viewer,
            every: every.max(1),
            frames: 0,
            sounds_played: 0,
            high_score: 0,
        }
    }

    /// Starts the running high score from a stored best.
    pub fn with_high_score(mut self, high_score: u32) -> Self {
        self.high_score = high_score;
        self
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn sounds_played(&self) -> u64 {
        self.sounds_played
    }

    pub fn high_score(&self) -> u32 {
        self.high_score
    }
}

impl RenderSink for LogRenderer {
    fn present(&mut self, snapshot: &Snapshot) {
        self.frames += 1;
        let score = snapshot.total_score();
        self.high_score = self.high_score.max(score);
        if self.frames % self.every != 0 {
            return;
        }

        let life = snapshot.players.first().map_or(0, |p| p.life);
        info!(
            "frame {}: score {} high {} life {} sprites {} boss life {}{}",
            self.frames,
            score,
            self.high_score,
            life,
            draw_list(snapshot, self.viewer).len(),
            snapshot.boss.life,
            if snapshot.ready { "" } else { " (waiting)" }
        );
    }

    fn play(&mut self, sounds: &[SoundEvent]) {
        for sound in sounds {
            debug!("play {}", sound.name());
        }
        self.sounds_played += sounds.len() as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::protocol::default_name;
    use shared::{Engine, GameMode, SpriteKind};

    fn pair_snapshot() -> Snapshot {
        let mut engine = Engine::with_seed(GameMode::Pair, 3);
        engine.set_style(1, 1);
        Snapshot::capture(&mut engine, 0, true, [default_name(0), default_name(1)])
    }

    #[test]
    fn test_own_ship_drawn_last() {
        let snapshot = pair_snapshot();

        let items = draw_list(&snapshot, 0);
        assert_eq!(items.last().map(|i| i.kind), Some(SpriteKind::Spaceship(0)));

        let items = draw_list(&snapshot, 1);
        assert_eq!(items.last().map(|i| i.kind), Some(SpriteKind::Spaceship(1)));
    }

    #[test]
    fn test_draw_list_covers_every_sprite() {
        let snapshot = pair_snapshot();
        let expected = snapshot.invaders.len()
            + snapshot.explosions.len()
            + snapshot.bombs.len()
            + 1
            + snapshot.lasers.iter().map(Vec::len).sum::<usize>()
            + snapshot.players.len();

        let items = draw_list(&snapshot, 0);
        assert_eq!(items.len(), expected);
        assert_eq!(items[snapshot.invaders.len()].kind, SpriteKind::Boss);
    }

    #[test]
    fn test_log_renderer_counts() {
        let snapshot = pair_snapshot();
        let mut renderer = LogRenderer::new(0, 2);

        renderer.present(&snapshot);
        renderer.present(&snapshot);
        renderer.play(&[SoundEvent::Shoot, SoundEvent::Boss]);

        assert_eq!(renderer.frames(), 2);
        assert_eq!(renderer.sounds_played(), 2);
    }

    #[test]
    fn test_log_renderer_tracks_high_score() {
        let mut snapshot = pair_snapshot();
        let mut renderer = LogRenderer::new(0, 1).with_high_score(50);

        renderer.present(&snapshot);
        assert_eq!(renderer.high_score(), 50);

        snapshot.players[0].score = 40;
        snapshot.players[1].score = 30;
        renderer.present(&snapshot);
        assert_eq!(renderer.high_score(), 70);

        snapshot.players[0].score = 0;
        renderer.present(&snapshot);
        assert_eq!(renderer.high_score(), 70);
    }
}
