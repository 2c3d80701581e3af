// File: kotori-core/tests/history_tests.rs

use chrono::{DateTime, Duration, TimeZone, Utc};
use kotori_core::history::{HistoryConfig, HistoryEntry, HistoryStore};

fn base_time() -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0).unwrap()
}

fn entry(id: &str, author: &str, text: &str, at: DateTime<Utc>) -> HistoryEntry {
    HistoryEntry {
        message_id: id.to_string(),
        author_id: author.to_string(),
        author_name: author.to_string(),
        text: text.to_string(),
        is_bot: false,
        timestamp: at,
    }
}

fn default_store() -> HistoryStore {
    HistoryStore::new(HistoryConfig::default())
}

#[test]
fn recent_returns_latest_oldest_first() {
    let store = default_store();
    let t0 = base_time();

    for i in 0..10 {
        let at = t0 + Duration::seconds(i);
        store.append("general", entry(&format!("m{i}"), "alice", &format!("msg {i}"), at), at);
    }

    let recent = store.recent("general", 3, t0 + Duration::seconds(10));
    assert_eq!(recent.len(), 3);
    assert_eq!(recent[0].text, "msg 7");
    assert_eq!(recent[2].text, "msg 9");

    // Shorter history than the limit just returns everything.
    assert_eq!(store.recent("general", 100, t0 + Duration::seconds(10)).len(), 10);

    // Unknown channel is empty, not an error.
    assert!(store.recent("nowhere", 5, t0).is_empty());
}

#[test]
fn cap_keeps_exactly_the_last_fifty_in_order() {
    let store = default_store();
    let t0 = base_time();

    for i in 0..51 {
        let at = t0 + Duration::seconds(i);
        store.append("general", entry(&format!("m{i}"), "alice", &format!("msg {i}"), at), at);
    }

    let recent = store.recent("general", 100, t0 + Duration::seconds(51));
    assert_eq!(recent.len(), 50);
    assert_eq!(recent[0].text, "msg 1");
    assert_eq!(recent[49].text, "msg 50");
    for window in recent.windows(2) {
        assert!(window[0].timestamp <= window[1].timestamp);
    }
}

#[test]
fn expired_entries_are_invisible_on_read_and_gone_after_sweep() {
    let store = default_store();
    let t0 = base_time();

    store.append("general", entry("old", "alice", "stale", t0), t0);
    let later = t0 + Duration::minutes(31);
    assert!(store.recent("general", 10, later).is_empty());

    // Entry still counted until a sweep actually removes it.
    assert_eq!(store.message_count(), 1);
    store.sweep(later);
    assert_eq!(store.message_count(), 0);
    assert_eq!(store.channel_count(), 0);
}

#[test]
fn append_with_missing_ids_is_a_noop() {
    let store = default_store();
    let t0 = base_time();

    store.append("", entry("m1", "alice", "hi", t0), t0);
    store.append("general", entry("", "alice", "hi", t0), t0);

    assert_eq!(store.channel_count(), 0);
    assert_eq!(store.message_count(), 0);
}

#[test]
fn clear_reports_whether_anything_was_removed() {
    let store = default_store();
    let t0 = base_time();

    assert!(!store.clear("general"));
    store.append("general", entry("m1", "alice", "hi", t0), t0);
    assert!(store.clear("general"));
    assert_eq!(store.channel_count(), 0);
}

#[test]
fn channel_cap_evicts_least_recently_active() {
    let store = HistoryStore::new(HistoryConfig {
        max_channels: 2,
        ..HistoryConfig::default()
    });
    let t0 = base_time();

    store.append("a", entry("m1", "alice", "hi", t0), t0);
    let t1 = t0 + Duration::seconds(10);
    store.append("b", entry("m2", "bob", "hi", t1), t1);

    // Channel "a" has the oldest most-recent entry, so it is the victim.
    let t2 = t0 + Duration::seconds(20);
    store.append("c", entry("m3", "carol", "hi", t2), t2);

    assert_eq!(store.channel_count(), 2);
    assert!(store.recent("a", 5, t2).is_empty());
    assert_eq!(store.recent("b", 5, t2).len(), 1);
    assert_eq!(store.recent("c", 5, t2).len(), 1);
}

#[test]
fn sweep_purges_idle_channels_independent_of_entry_ttl() {
    // TTL longer than the idle cutoff so the entries themselves are live.
    let store = HistoryStore::new(HistoryConfig {
        max_entry_age: Duration::hours(48),
        channel_idle_cutoff: Duration::hours(24),
        ..HistoryConfig::default()
    });
    let t0 = base_time();

    store.append("quiet", entry("m1", "alice", "hello?", t0), t0);

    let later = t0 + Duration::hours(25);
    store.sweep(later);

    assert_eq!(store.channel_count(), 0);
}
