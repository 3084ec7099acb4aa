//! Delayed events expressed in ticks
//!
//! Replaces wall-clock timers: an entry fires on the first `due` call whose
//! tick count reaches its deadline, so replays with the same inputs fire
//! at the same tick.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Entry<E> {
    at: u64,
    seq: u64,
    event: E,
}

/// Queue of events keyed by the tick they fall due
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledEvents<E> {
    entries: Vec<Entry<E>>,
    now: u64,
    seq: u64,
}

impl<E> Default for ScheduledEvents<E> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            now: 0,
            seq: 0,
        }
    }
}

impl<E> ScheduledEvents<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tick count seen by the last [`ScheduledEvents::due`] call
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Fire `event` `ticks` after the current tick
    pub fn schedule_in(&mut self, ticks: u64, event: E) {
        self.schedule_at(self.now.saturating_add(ticks), event);
    }

    pub fn schedule_at(&mut self, at: u64, event: E) {
        let seq = self.seq;
        self.seq += 1;
        self.entries.push(Entry { at, seq, event });
    }

    /// Remove and return everything due at `now`, ordered by deadline then
    /// insertion
    pub fn due(&mut self, now: u64) -> Vec<E> {
        self.now = now;
        if !self.entries.iter().any(|e| e.at <= now) {
            return Vec::new();
        }
        let (mut ready, pending): (Vec<_>, Vec<_>) =
            self.entries.drain(..).partition(|e| e.at <= now);
        self.entries = pending;
        ready.sort_by_key(|e| (e.at, e.seq));
        ready.into_iter().map(|e| e.event).collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
