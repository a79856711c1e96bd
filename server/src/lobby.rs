//! Matchmaking and the registry of live matches
//!
//! The lobby decides where each new connection sits:
//! - the lowest free seat of the oldest match that is not yet ready
//! - otherwise a brand new match, as player 0
//!
//! A seat is only counted as taken for good once its handshake has finished
//! ([`Lobby::confirm`]). A connection that drops mid-handshake frees its seat
//! again, so the waiting player is offered to the next newcomer.
//!
//! It only tracks seating. The game itself lives in the match task behind each
//! [`MatchHandle`], and the lobby drops its handle once the last player leaves,
//! which lets that task finish.

use crate::game::{MatchHandle, MatchId};
use log::{debug, info};
use std::collections::BTreeMap;

/// Where a connection was placed by [`Lobby::join`]
#[derive(Debug, Clone)]
pub struct Seat {
    pub match_id: MatchId,
    /// Player index inside the match, 0 or 1
    pub player: usize,
    pub handle: MatchHandle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SeatState {
    Free,
    /// Handed out, handshake still running
    Seated,
    /// Handshake done and announced to the match task
    Joined,
}

#[derive(Debug)]
struct MatchSlot {
    seats: [SeatState; 2],
    /// Set once both seats have joined. Never cleared, so a match that
    /// loses a player is not offered to newcomers.
    ready: bool,
    handle: MatchHandle,
}

impl MatchSlot {
    fn free_seat(&self) -> Option<usize> {
        if self.ready {
            return None;
        }
        self.seats.iter().position(|s| *s == SeatState::Free)
    }

    fn occupied(&self) -> usize {
        self.seats.iter().filter(|s| **s != SeatState::Free).count()
    }
}

/// Tracks every running match and hands out seats
///
/// Match ids come from an incrementing counter starting at 1 and are never
/// reused while the server runs.
pub struct Lobby {
    matches: BTreeMap<MatchId, MatchSlot>,
    next_match_id: MatchId,
}

impl Lobby {
    pub fn new() -> Self {
        Self {
            matches: BTreeMap::new(),
            next_match_id: 1,
        }
    }

    /// Returns the oldest match that still has a free seat
    pub fn find_open(&self) -> Option<MatchId> {
        self.matches
            .iter()
            .find(|(_, slot)| slot.free_seat().is_some())
            .map(|(id, _)| *id)
    }

    /// Seats a new connection
    ///
    /// Takes the lowest free seat of the oldest open match. When none is open,
    /// `spawn` is called with a fresh id to start a new match and the
    /// connection becomes its player 0. Never waits for a peer.
    pub fn join<F>(&mut self, spawn: F) -> Seat
    where
        F: FnOnce(MatchId) -> MatchHandle,
    {
        if let Some(match_id) = self.find_open() {
            if let Some(slot) = self.matches.get_mut(&match_id) {
                if let Some(player) = slot.free_seat() {
                    slot.seats[player] = SeatState::Seated;

                    return Seat {
                        match_id,
                        player,
                        handle: slot.handle.clone(),
                    };
                }
            }
        }

        let match_id = self.next_match_id;
        self.next_match_id += 1;

        let handle = spawn(match_id);
        self.matches.insert(
            match_id,
            MatchSlot {
                seats: [SeatState::Seated, SeatState::Free],
                ready: false,
                handle: handle.clone(),
            },
        );
        info!("Match {} created", match_id);

        Seat {
            match_id,
            player: 0,
            handle,
        }
    }

    /// Marks a seat's handshake as finished. The match becomes ready when
    /// both seats have joined.
    pub fn confirm(&mut self, match_id: MatchId, player: usize) {
        let Some(slot) = self.matches.get_mut(&match_id) else {
            return;
        };
        let Some(seat) = slot.seats.get_mut(player) else {
            return;
        };

        *seat = SeatState::Joined;
        if !slot.ready && slot.seats.iter().all(|s| *s == SeatState::Joined) {
            slot.ready = true;
            info!("Match {} is ready", match_id);
        }
    }

    /// Releases one seat of a match
    ///
    /// Returns true if this was the last player and the match was removed. A
    /// match that is already gone is ignored.
    pub fn leave(&mut self, match_id: MatchId, player: usize) -> bool {
        let Some(slot) = self.matches.get_mut(&match_id) else {
            return false;
        };

        if let Some(seat) = slot.seats.get_mut(player) {
            if *seat == SeatState::Seated {
                debug!("Match {}: seat {} freed before joining", match_id, player);
            }
            *seat = SeatState::Free;
        }
        if slot.occupied() > 0 {
            return false;
        }

        self.matches.remove(&match_id);
        info!("Match {} removed", match_id);
        true
    }

    pub fn is_ready(&self, match_id: MatchId) -> Option<bool> {
        self.matches.get(&match_id).map(|slot| slot.ready)
    }

    /// Seats handed out in a match, whether or not their handshake finished
    pub fn player_count(&self, match_id: MatchId) -> Option<usize> {
        self.matches.get(&match_id).map(MatchSlot::occupied)
    }

    /// Returns the number of live matches
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

impl Default for Lobby {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn idle_match(id: MatchId) -> MatchHandle {
        let (tx, _rx) = mpsc::channel(1);
        MatchHandle::new(id, tx)
    }

    /// Seats and confirms a connection, like a finished handshake
    fn join_confirmed(lobby: &mut Lobby) -> Seat {
        let seat = lobby.join(idle_match);
        lobby.confirm(seat.match_id, seat.player);
        seat
    }

    #[test]
    fn test_lobby_creation() {
        let lobby = Lobby::new();
        assert!(lobby.is_empty());
        assert_eq!(lobby.len(), 0);
        assert_eq!(lobby.find_open(), None);
    }

    #[test]
    fn test_first_connection_opens_match() {
        let mut lobby = Lobby::new();
        let seat = lobby.join(idle_match);

        assert_eq!(seat.player, 0);
        assert_eq!(seat.match_id, 1);
        assert_eq!(seat.handle.id(), 1);
        assert_eq!(lobby.is_ready(1), Some(false));
        assert_eq!(lobby.find_open(), Some(1));
    }

    #[test]
    fn test_matchmaking_sequence() {
        let mut lobby = Lobby::new();

        let first = join_confirmed(&mut lobby);
        let second = lobby.join(|_| panic!("second player must join the open match"));
        let third = lobby.join(idle_match);

        assert_eq!((first.match_id, first.player), (1, 0));
        assert_eq!((second.match_id, second.player), (1, 1));
        assert_eq!((third.match_id, third.player), (2, 0));

        assert_eq!(lobby.is_ready(1), Some(false));
        lobby.confirm(second.match_id, second.player);
        assert_eq!(lobby.is_ready(1), Some(true));
        assert_eq!(lobby.player_count(1), Some(2));
        assert_eq!(lobby.is_ready(2), Some(false));
        assert_eq!(lobby.len(), 2);
    }

    #[test]
    fn test_seat_freed_mid_handshake_is_offered_again() {
        let mut lobby = Lobby::new();
        let first = join_confirmed(&mut lobby);
        let dropped = lobby.join(idle_match);
        assert_eq!(dropped.player, 1);

        assert!(!lobby.leave(dropped.match_id, dropped.player));
        assert_eq!(lobby.is_ready(1), Some(false));
        assert_eq!(lobby.player_count(1), Some(1));

        let next = lobby.join(|_| panic!("the waiting match must be reused"));
        assert_eq!((next.match_id, next.player), (first.match_id, 1));
        lobby.confirm(next.match_id, next.player);
        assert_eq!(lobby.is_ready(1), Some(true));
    }

    #[test]
    fn test_leave_removes_empty_match() {
        let mut lobby = Lobby::new();
        let first = join_confirmed(&mut lobby);
        let second = join_confirmed(&mut lobby);

        assert!(!lobby.leave(first.match_id, first.player));
        assert_eq!(lobby.player_count(first.match_id), Some(1));

        assert!(lobby.leave(second.match_id, second.player));
        assert!(lobby.is_empty());
    }

    #[test]
    fn test_leave_unknown_match() {
        let mut lobby = Lobby::new();
        assert!(!lobby.leave(42, 0));
    }

    #[test]
    fn test_half_empty_ready_match_is_not_reopened() {
        let mut lobby = Lobby::new();
        let first = join_confirmed(&mut lobby);
        join_confirmed(&mut lobby);
        lobby.leave(first.match_id, first.player);

        let next = lobby.join(idle_match);
        assert_eq!(next.match_id, 2);
        assert_eq!(next.player, 0);
    }

    #[test]
    fn test_match_ids_are_not_reused() {
        let mut lobby = Lobby::new();
        let first = lobby.join(idle_match);
        lobby.leave(first.match_id, first.player);

        let next = lobby.join(idle_match);
        assert_eq!(next.match_id, 2);
    }
}
