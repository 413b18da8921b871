//! Staging store implementation.
//!
//! Counters, field maps, and published values live in separate dashmaps
//! keyed by `(namespace, key)`. Every operation is single-key atomic:
//! mutation goes through the entry API and `drain_*` removes the whole
//! value in one step, so a concurrent writer's update lands entirely
//! before or entirely after a drain, never split across it.

use std::collections::BTreeMap;

use dashmap::DashMap;
use metrics::counter;
use serde_json::Value;

use super::keys::Namespace;

type Key = (Namespace, String);

/// Whether a published value must survive a process restart. Durable
/// entries are swept into the artifact table by the job that produced
/// them and restored into the store at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persistence {
    Ephemeral,
    Durable,
}

#[derive(Debug, Clone)]
struct Published {
    value: Value,
    persistence: Persistence,
}

/// In-memory staging store backing all buffered counters, toggle queues,
/// and published artifacts.
#[derive(Debug, Default)]
pub struct StagingStore {
    counters: DashMap<Key, i64>,
    maps: DashMap<Key, BTreeMap<String, Value>>,
    published: DashMap<Key, Published>,
}

impl StagingStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Integer counters
    // ========================================================================

    /// Atomically add `delta` to a counter, creating it at zero if absent.
    pub fn increment(&self, namespace: Namespace, key: &str, delta: i64) {
        self.counters
            .entry((namespace, key.to_string()))
            .and_modify(|value| *value += delta)
            .or_insert(delta);
    }

    pub fn read_counter(&self, namespace: Namespace, key: &str) -> i64 {
        self.counters
            .get(&(namespace, key.to_string()))
            .map(|entry| *entry.value())
            .unwrap_or(0)
    }

    /// Atomically read and clear a counter; zero if absent.
    pub fn drain_counter(&self, namespace: Namespace, key: &str) -> i64 {
        counter!("palaver_staging_drain_total", "namespace" => namespace.as_str()).increment(1);
        self.counters
            .remove(&(namespace, key.to_string()))
            .map(|(_, value)| value)
            .unwrap_or(0)
    }

    // ========================================================================
    // Field maps
    // ========================================================================

    /// Atomically add `delta` to one numeric field of a mapping-valued
    /// key, creating map and field as needed.
    pub fn increment_field(&self, namespace: Namespace, key: &str, field: &str, delta: i64) {
        let mut map = self.maps.entry((namespace, key.to_string())).or_default();
        let slot = map.entry(field.to_string()).or_insert_with(|| Value::from(0));
        let current = slot.as_i64().unwrap_or(0);
        *slot = Value::from(current + delta);
    }

    /// Atomically merge one field into a mapping-valued key, overwriting
    /// any previous value for that field (last write wins).
    pub fn upsert_field(&self, namespace: Namespace, key: &str, field: &str, value: Value) {
        self.maps
            .entry((namespace, key.to_string()))
            .or_default()
            .insert(field.to_string(), value);
    }

    pub fn read_field(&self, namespace: Namespace, key: &str, field: &str) -> Option<Value> {
        self.maps
            .get(&(namespace, key.to_string()))
            .and_then(|map| map.value().get(field).cloned())
    }

    /// Atomically read and clear a mapping; empty if absent.
    pub fn drain_map(&self, namespace: Namespace, key: &str) -> BTreeMap<String, Value> {
        counter!("palaver_staging_drain_total", "namespace" => namespace.as_str()).increment(1);
        self.maps
            .remove(&(namespace, key.to_string()))
            .map(|(_, map)| map)
            .unwrap_or_default()
    }

    // ========================================================================
    // Published values
    // ========================================================================

    /// Unconditional overwrite of a published value. No merge: each pass
    /// fully replaces any prior artifact under the same key.
    pub fn publish(&self, namespace: Namespace, key: &str, value: Value, persistence: Persistence) {
        self.published.insert(
            (namespace, key.to_string()),
            Published { value, persistence },
        );
    }

    pub fn read_published(&self, namespace: Namespace, key: &str) -> Option<Value> {
        self.published
            .get(&(namespace, key.to_string()))
            .map(|entry| entry.value().value.clone())
    }

    /// Snapshot of every durable published entry, for mirroring into the
    /// artifact table.
    pub fn durable_entries(&self) -> Vec<(Namespace, String, Value)> {
        self.published
            .iter()
            .filter(|entry| entry.value().persistence == Persistence::Durable)
            .map(|entry| {
                let (namespace, key) = entry.key().clone();
                (namespace, key, entry.value().value.clone())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use serde_json::json;

    use super::*;

    #[test]
    fn counter_increment_and_drain() {
        let store = StagingStore::new();
        assert_eq!(store.read_counter(Namespace::Notify, "user-1"), 0);

        store.increment(Namespace::Notify, "user-1", 1);
        store.increment(Namespace::Notify, "user-1", 2);
        assert_eq!(store.read_counter(Namespace::Notify, "user-1"), 3);

        assert_eq!(store.drain_counter(Namespace::Notify, "user-1"), 3);
        assert_eq!(store.read_counter(Namespace::Notify, "user-1"), 0);
        assert_eq!(store.drain_counter(Namespace::Notify, "user-1"), 0);
    }

    #[test]
    fn namespaces_do_not_collide() {
        let store = StagingStore::new();
        store.increment(Namespace::Notify, "k", 5);
        store.increment_field(Namespace::Views, "k", "a", 7);

        assert_eq!(store.read_counter(Namespace::Notify, "k"), 5);
        assert_eq!(store.read_field(Namespace::Views, "k", "a"), Some(json!(7)));
        assert_eq!(store.read_counter(Namespace::Views, "k"), 0);
    }

    #[test]
    fn field_increment_accumulates_per_field() {
        let store = StagingStore::new();
        store.increment_field(Namespace::Views, "counts", "art-1", 1);
        store.increment_field(Namespace::Views, "counts", "art-1", 1);
        store.increment_field(Namespace::Views, "counts", "art-2", 1);

        let drained = store.drain_map(Namespace::Views, "counts");
        assert_eq!(drained.get("art-1"), Some(&json!(2)));
        assert_eq!(drained.get("art-2"), Some(&json!(1)));
        assert!(store.drain_map(Namespace::Views, "counts").is_empty());
    }

    #[test]
    fn upsert_field_is_last_write_wins() {
        let store = StagingStore::new();
        store.upsert_field(Namespace::Likes, "queue", "t1", json!({"status": true}));
        store.upsert_field(Namespace::Likes, "queue", "t1", json!({"status": false}));

        let drained = store.drain_map(Namespace::Likes, "queue");
        assert_eq!(drained.len(), 1);
        assert_eq!(drained["t1"]["status"], json!(false));
    }

    #[test]
    fn publish_replaces_and_tracks_persistence() {
        let store = StagingStore::new();
        store.publish(Namespace::Rank, "hot", json!(["a"]), Persistence::Durable);
        store.publish(Namespace::Rank, "hot", json!(["b", "c"]), Persistence::Durable);
        store.publish(Namespace::Views, "scratch", json!(1), Persistence::Ephemeral);

        assert_eq!(
            store.read_published(Namespace::Rank, "hot"),
            Some(json!(["b", "c"]))
        );

        let durable = store.durable_entries();
        assert_eq!(durable.len(), 1);
        assert_eq!(durable[0].0, Namespace::Rank);
        assert_eq!(durable[0].1, "hot");
    }

    #[test]
    fn concurrent_increments_and_drains_lose_nothing() {
        let store = Arc::new(StagingStore::new());
        let writers: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                thread::spawn(move || {
                    for _ in 0..1_000 {
                        store.increment_field(Namespace::Views, "counts", "art-1", 1);
                    }
                })
            })
            .collect();

        let drainer = {
            let store = store.clone();
            thread::spawn(move || {
                let mut total = 0i64;
                for _ in 0..50 {
                    let drained = store.drain_map(Namespace::Views, "counts");
                    total += drained
                        .values()
                        .map(|value| value.as_i64().unwrap_or(0))
                        .sum::<i64>();
                    thread::yield_now();
                }
                total
            })
        };

        for writer in writers {
            writer.join().unwrap();
        }
        let drained_total = drainer.join().unwrap();
        let remainder = store
            .drain_map(Namespace::Views, "counts")
            .values()
            .map(|value| value.as_i64().unwrap_or(0))
            .sum::<i64>();

        // every write lands exactly once: either in an interleaved drain
        // or in the final sweep
        assert_eq!(drained_total + remainder, 4_000);
    }
}
