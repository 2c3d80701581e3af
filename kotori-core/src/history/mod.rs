// File: kotori-core/src/history/mod.rs

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tracing::debug;

/// Single cached chat message
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub message_id: String,
    pub author_id: String,
    pub author_name: String,
    pub text: String,
    pub is_bot: bool,
    pub timestamp: DateTime<Utc>,
}

/// Bounds for the per-channel ring buffers
#[derive(Debug, Clone)]
pub struct HistoryConfig {
    /// Ring-buffer cap per channel
    pub max_entries_per_channel: usize,
    /// Entries older than this are dead, even if still stored
    pub max_entry_age: Duration,
    /// Hard bound on tracked channels; least-recently-active loses
    pub max_channels: usize,
    /// Channels with no traffic for this long are dropped by the sweep
    pub channel_idle_cutoff: Duration,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_entries_per_channel: 50,
            max_entry_age: Duration::minutes(30),
            max_channels: 512,
            channel_idle_cutoff: Duration::hours(24),
        }
    }
}

#[derive(Debug)]
struct ChannelHistory {
    entries: VecDeque<HistoryEntry>,
    last_activity: DateTime<Utc>,
}

/// Per-channel bounded history of recent messages with age-based eviction.
///
/// Expiry is enforced lazily: `append` prunes the head, `recent` filters on
/// read, and the periodic sweep (see `tasks::history_maintenance`) handles
/// channels that went quiet.
pub struct HistoryStore {
    channels: DashMap<String, ChannelHistory>,
    config: HistoryConfig,
}

impl HistoryStore {
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            channels: DashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// Insert an entry at the tail of the channel's buffer. A missing channel
    /// id or message id makes this a no-op rather than an error.
    pub fn append(&self, channel_id: &str, entry: HistoryEntry, now: DateTime<Utc>) {
        if channel_id.is_empty() || entry.message_id.is_empty() {
            debug!("HistoryStore::append ignoring entry with missing ids");
            return;
        }

        let cutoff = now - self.config.max_entry_age;
        {
            let mut channel = self
                .channels
                .entry(channel_id.to_string())
                .or_insert_with(|| ChannelHistory {
                    entries: VecDeque::with_capacity(self.config.max_entries_per_channel),
                    last_activity: now,
                });

            // Entries are insertion-ordered, so expired ones sit at the head.
            while channel
                .entries
                .front()
                .map(|e| e.timestamp < cutoff)
                .unwrap_or(false)
            {
                channel.entries.pop_front();
            }

            channel.entries.push_back(entry);
            while channel.entries.len() > self.config.max_entries_per_channel {
                channel.entries.pop_front();
            }
            channel.last_activity = now;
        }

        // Guard dropped above; safe to walk the map for a victim now.
        if self.channels.len() > self.config.max_channels {
            self.evict_least_recently_active(channel_id);
        }
    }

    /// Last `limit` live entries in chronological order (oldest first).
    /// Unknown channels yield an empty vec. Never mutates.
    pub fn recent(&self, channel_id: &str, limit: usize, now: DateTime<Utc>) -> Vec<HistoryEntry> {
        let cutoff = now - self.config.max_entry_age;
        let Some(channel) = self.channels.get(channel_id) else {
            return Vec::new();
        };

        let live: Vec<&HistoryEntry> = channel
            .entries
            .iter()
            .filter(|e| e.timestamp >= cutoff)
            .collect();

        let start = live.len().saturating_sub(limit);
        live[start..].iter().map(|e| (*e).clone()).collect()
    }

    /// Remove a channel's history entirely. Returns whether anything was removed.
    pub fn clear(&self, channel_id: &str) -> bool {
        self.channels.remove(channel_id).is_some()
    }

    /// Number of channels currently tracked.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Total stored entries across all channels (including not-yet-pruned
    /// expired ones; this is an observability counter, not a contract).
    pub fn message_count(&self) -> usize {
        self.channels.iter().map(|c| c.entries.len()).sum()
    }

    /// Periodic cleanup: drop expired entries everywhere, drop channels left
    /// empty, and drop channels idle past the inactivity cutoff. Returns the
    /// number of channels removed.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let entry_cutoff = now - self.config.max_entry_age;
        let idle_cutoff = now - self.config.channel_idle_cutoff;

        for mut channel in self.channels.iter_mut() {
            channel.entries.retain(|e| e.timestamp >= entry_cutoff);
        }

        let victims: Vec<String> = self
            .channels
            .iter()
            .filter(|c| c.entries.is_empty() || c.last_activity < idle_cutoff)
            .map(|c| c.key().clone())
            .collect();

        for key in &victims {
            self.channels.remove(key);
        }
        if !victims.is_empty() {
            debug!("History sweep removed {} channel(s)", victims.len());
        }
        victims.len()
    }

    /// Evict the channel whose most recent entry is oldest among all tracked
    /// channels. `keep` is the channel that just got traffic and is never the
    /// victim.
    fn evict_least_recently_active(&self, keep: &str) {
        let victim = self
            .channels
            .iter()
            .filter(|c| c.key() != keep)
            .min_by_key(|c| c.last_activity)
            .map(|c| c.key().clone());

        if let Some(key) = victim {
            debug!("Channel cap exceeded; evicting least-recently-active '{key}'");
            self.channels.remove(&key);
        }
    }
}
