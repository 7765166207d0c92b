//! In-memory store for captured webhooks

use crate::CapturedEvent;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Append-only, concurrency-safe store of captured webhooks.
///
/// Clones share the same underlying storage, so the capture handler and the
/// control plane (list/replay) can hold their own handles. Appends take the
/// write lock exclusively; reads run concurrently with each other.
#[derive(Debug, Clone, Default)]
pub struct EventStore {
    inner: Arc<RwLock<StoreInner>>,
}

#[derive(Debug, Default)]
struct StoreInner {
    events: Vec<CapturedEvent>,
    index: HashMap<String, usize>,
    next_seq: u64,
}

impl EventStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event, assigning the next `wh_<sequence>` ID.
    ///
    /// IDs increase monotonically in append order and are never reused for
    /// the lifetime of the store.
    pub fn append(&self, mut event: CapturedEvent) -> String {
        let mut inner = self.inner.write().unwrap();
        inner.next_seq += 1;
        let id = format!("wh_{}", inner.next_seq);
        event.id = id.clone();
        let position = inner.events.len();
        inner.index.insert(id.clone(), position);
        inner.events.push(event);
        id
    }

    /// Snapshot of all stored events in insertion order.
    ///
    /// The returned vector is a copy; mutating it never affects the store.
    pub fn list(&self) -> Vec<CapturedEvent> {
        let inner = self.inner.read().unwrap();
        inner.events.clone()
    }

    /// Look up an event by ID
    pub fn find_by_id(&self, id: &str) -> Option<CapturedEvent> {
        let inner = self.inner.read().unwrap();
        inner
            .index
            .get(id)
            .and_then(|&position| inner.events.get(position))
            .cloned()
    }

    /// Number of stored events
    pub fn count(&self) -> usize {
        let inner = self.inner.read().unwrap();
        inner.events.len()
    }

    /// Check whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Remove all stored events.
    ///
    /// The sequence counter keeps running so IDs are never reused within the
    /// process lifetime.
    pub fn clear(&self) {
        let mut inner = self.inner.write().unwrap();
        inner.events.clear();
        inner.index.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as Map;

    fn test_event(url: &str) -> CapturedEvent {
        CapturedEvent::new("POST", url, Map::new(), b"{}".to_vec())
    }

    #[test]
    fn test_append_assigns_sequential_ids() {
        let store = EventStore::new();

        assert_eq!(store.append(test_event("/a")), "wh_1");
        assert_eq!(store.append(test_event("/b")), "wh_2");
        assert_eq!(store.append(test_event("/c")), "wh_3");
        assert_eq!(store.count(), 3);
    }

    #[test]
    fn test_list_preserves_insertion_order() {
        let store = EventStore::new();
        store.append(test_event("/first"));
        store.append(test_event("/second"));

        let events = store.list();
        assert_eq!(events[0].url, "/first");
        assert_eq!(events[1].url, "/second");
    }

    #[test]
    fn test_list_returns_a_copy() {
        let store = EventStore::new();
        store.append(test_event("/keep"));

        let mut snapshot = store.list();
        snapshot.clear();
        snapshot.push(test_event("/injected"));

        assert_eq!(store.count(), 1);
        assert_eq!(store.list()[0].url, "/keep");
        assert!(store.find_by_id("wh_1").is_some());
    }

    #[test]
    fn test_find_by_id() {
        let store = EventStore::new();
        let id = store.append(test_event("/hooks"));

        let found = store.find_by_id(&id).unwrap();
        assert_eq!(found.id, id);
        assert_eq!(found.url, "/hooks");

        assert!(store.find_by_id("wh_999").is_none());
    }

    #[test]
    fn test_clear_never_reuses_ids() {
        let store = EventStore::new();
        store.append(test_event("/a"));
        store.append(test_event("/b"));

        store.clear();
        assert_eq!(store.count(), 0);
        assert!(store.find_by_id("wh_1").is_none());

        assert_eq!(store.append(test_event("/c")), "wh_3");
    }

    #[test]
    fn test_concurrent_appends_have_no_gaps_or_duplicates() {
        let store = EventStore::new();
        let threads = 8;
        let per_thread = 50;

        std::thread::scope(|scope| {
            for _ in 0..threads {
                let store = store.clone();
                scope.spawn(move || {
                    for _ in 0..per_thread {
                        store.append(test_event("/concurrent"));
                    }
                });
            }
        });

        let total = threads * per_thread;
        assert_eq!(store.count(), total);

        let mut ids: Vec<u64> = store
            .list()
            .iter()
            .map(|e| e.id.strip_prefix("wh_").unwrap().parse().unwrap())
            .collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), total);
        assert_eq!(ids[0], 1);
        assert_eq!(ids[total - 1], total as u64);
    }

    #[test]
    fn test_ids_match_insertion_order() {
        let store = EventStore::new();
        for _ in 0..5 {
            store.append(test_event("/ordered"));
        }

        let events = store.list();
        for (position, event) in events.iter().enumerate() {
            assert_eq!(event.id, format!("wh_{}", position + 1));
        }
    }
}
