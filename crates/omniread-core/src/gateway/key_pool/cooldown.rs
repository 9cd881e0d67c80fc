use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Per-key cooldown deadlines. Entries are checked against the clock on
/// every read, so an entry whose removal timer has not fired yet is already
/// treated as expired.
#[derive(Default)]
pub(super) struct CooldownTracker {
    deadlines: DashMap<String, Instant>,
}

impl CooldownTracker {
    pub fn new() -> Self {
        Self { deadlines: DashMap::new() }
    }

    /// Start (or restart) the cooldown of `key`; returns the new deadline.
    pub fn start(&self, key: &str, window: Duration) -> Instant {
        let deadline = Instant::now() + window;
        self.deadlines.insert(key.to_string(), deadline);
        deadline
    }

    pub fn is_cooling(&self, key: &str) -> bool {
        self.deadlines.get(key).is_some_and(|deadline| *deadline > Instant::now())
    }

    /// Remaining cooldown of `key`, zero when not cooling.
    pub fn remaining(&self, key: &str) -> Duration {
        self.deadlines
            .get(key)
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
            .unwrap_or(Duration::ZERO)
    }

    /// Drop the entry only if it still carries `deadline`. A key re-marked
    /// after the timer was scheduled keeps its newer deadline.
    pub fn expire(&self, key: &str, deadline: Instant) -> bool {
        self.deadlines.remove_if(key, |_, current| *current == deadline).is_some()
    }

    pub fn forget(&self, key: &str) -> bool {
        self.deadlines.remove(key).is_some()
    }

    pub fn clear(&self) -> usize {
        let count = self.deadlines.len();
        self.deadlines.clear();
        count
    }

    /// Cleanup entries whose deadline has passed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.deadlines.len();
        self.deadlines.retain(|_, deadline| *deadline > now);
        before - self.deadlines.len()
    }
}
