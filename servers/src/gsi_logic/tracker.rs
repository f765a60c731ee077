use crate::gsi_logic::model::DEFAULT_HEALTH;

/// Rolling memory used for edge detection across snapshots.
///
/// `last_kill_count` never decreases through [`StateTracker::observe_kills`];
/// a lower count (e.g. after a match restart) is ignored until play catches
/// up with the remembered baseline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateTracker {
    last_health: i64,
    last_kill_count: i64,
}

impl Default for StateTracker {
    fn default() -> Self {
        Self {
            last_health: DEFAULT_HEALTH,
            last_kill_count: 0,
        }
    }
}

impl StateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_health(&mut self, health: i64) {
        self.last_health = health;
    }

    /// True when `kills` is above the baseline; the baseline moves up in the
    /// same call, so the same count seen twice is a new kill only once.
    pub fn observe_kills(&mut self, kills: i64) -> bool {
        if kills > self.last_kill_count {
            self.last_kill_count = kills;
            true
        } else {
            false
        }
    }

    pub fn last_health(&self) -> i64 {
        self.last_health
    }

    pub fn last_kill_count(&self) -> i64 {
        self.last_kill_count
    }
}
