//! Deferred engine events keyed by simulation time.
//!
//! The engine owns one of these and drains it at the start of every tick, so
//! delayed work (laser reloads, boss bomb cadence) always runs on the thread
//! that owns the engine and in a deterministic order.

#[derive(Debug, Clone)]
struct Scheduled<E> {
    due_ms: u64,
    seq: u64,
    event: E,
}

#[derive(Debug, Clone)]
pub struct Schedule<E> {
    pending: Vec<Scheduled<E>>,
    next_seq: u64,
}

impl<E> Schedule<E> {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            next_seq: 0,
        }
    }

    pub fn push(&mut self, due_ms: u64, event: E) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.push(Scheduled { due_ms, seq, event });
    }

    /// Removes and returns every event due at or before `now_ms`, ordered by
    /// due time and then by insertion order.
    pub fn take_due(&mut self, now_ms: u64) -> Vec<E> {
        let (mut due, rest): (Vec<_>, Vec<_>) = self
            .pending
            .drain(..)
            .partition(|scheduled| scheduled.due_ms <= now_ms);
        self.pending = rest;

        due.sort_by_key(|scheduled| (scheduled.due_ms, scheduled.seq));
        due.into_iter().map(|scheduled| scheduled.event).collect()
    }

    pub fn any(&self, predicate: impl Fn(&E) -> bool) -> bool {
        self.pending.iter().any(|scheduled| predicate(&scheduled.event))
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl<E> Default for Schedule<E> {
    fn default() -> Self {
        Self::new()
    }
}
