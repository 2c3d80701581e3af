use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

/// Per-channel last-intervention timestamps.
///
/// Cooldown is a pure wall-clock comparison at query time; there is no timer.
/// Absence of an entry means "never intervened, or cooldown reset".
#[derive(Default)]
pub struct InterventionState {
    last: DashMap<String, DateTime<Utc>>,
}

impl InterventionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_intervention(&self, channel_id: &str) -> Option<DateTime<Utc>> {
        self.last.get(channel_id).map(|t| *t)
    }

    pub fn mark_intervened(&self, channel_id: &str, at: DateTime<Utc>) {
        self.last.insert(channel_id.to_string(), at);
    }

    pub fn reset_cooldown(&self, channel_id: &str) {
        self.last.remove(channel_id);
    }

    pub fn cooldown_active(&self, channel_id: &str, cooldown: Duration, now: DateTime<Utc>) -> bool {
        self.last_intervention(channel_id)
            .map(|at| now - at < cooldown)
            .unwrap_or(false)
    }
}
