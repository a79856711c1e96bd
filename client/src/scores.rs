//! High-score bookkeeping behind the `ScoreStore` collaborator trait

use log::info;
use shared::GameMode;
use std::collections::HashMap;

/// Entries kept per leaderboard.
pub const LEADERBOARD_SIZE: usize = 10;

/// Characters of each name kept in a two-player label.
const PAIR_NAME_CHARS: usize = 4;

/// Which table a score belongs to. Local and online pair games share `Multi`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeaderboardMode {
    Single,
    Multi,
}

impl From<GameMode> for LeaderboardMode {
    fn from(mode: GameMode) -> Self {
        match mode {
            GameMode::Solo => LeaderboardMode::Single,
            GameMode::Pair => LeaderboardMode::Multi,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreEntry {
    pub name: String,
    pub score: u32,
}

pub trait ScoreStore {
    /// Best score recorded for `mode`, 0 when there is none.
    fn high_score(&self, mode: LeaderboardMode) -> u32;

    /// Records a finished game. Returns whether the score made the table.
    fn save_score(&mut self, name: &str, score: u32, mode: LeaderboardMode) -> bool;
}

/// In-memory leaderboard holding the best [`LEADERBOARD_SIZE`] scores per mode
#[derive(Debug, Default)]
pub struct Leaderboard {
    tables: HashMap<LeaderboardMode, Vec<ScoreEntry>>,
}

impl Leaderboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries for `mode`, best first
    pub fn entries(&self, mode: LeaderboardMode) -> &[ScoreEntry] {
        self.tables.get(&mode).map(Vec::as_slice).unwrap_or(&[])
    }

    /// A score qualifies while the table has room or when it beats the last entry.
    pub fn qualifies(&self, score: u32, mode: LeaderboardMode) -> bool {
        let entries = self.entries(mode);
        entries.len() < LEADERBOARD_SIZE
            || entries.last().map_or(true, |last| score > last.score)
    }
}

impl ScoreStore for Leaderboard {
    fn high_score(&self, mode: LeaderboardMode) -> u32 {
        self.entries(mode).first().map_or(0, |e| e.score)
    }

    fn save_score(&mut self, name: &str, score: u32, mode: LeaderboardMode) -> bool {
        if !self.qualifies(score, mode) {
            return false;
        }

        let table = self.tables.entry(mode).or_default();
        // Equal scores keep their arrival order.
        let position = table.partition_point(|e| e.score >= score);
        table.insert(
            position,
            ScoreEntry {
                name: name.to_string(),
                score,
            },
        );
        table.truncate(LEADERBOARD_SIZE);

        info!("Saved {} points for {} ({:?})", score, name, mode);
        true
    }
}

/// Label under which a two-player team is stored, e.g. `"ALIC. & BOB."`.
pub fn pair_label(first: &str, second: &str) -> String {
    let short = |name: &str| name.chars().take(PAIR_NAME_CHARS).collect::<String>();
    format!("{}. & {}.", short(first), short(second))
}
