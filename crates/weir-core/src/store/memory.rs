//! In-memory realm store.

use std::collections::VecDeque;

use dashmap::DashMap;
use tracing::trace;

use super::{RealmStore, StoreError, StoredEvent};

/// Volatile realm store keeping a bounded per-topic event ring.
pub struct MemoryRealmStore {
    events: DashMap<String, VecDeque<StoredEvent>>,
    limit: usize,
}

impl MemoryRealmStore {
    /// Create a store retaining up to `limit` events per topic.
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            events: DashMap::new(),
            limit,
        }
    }

    /// Number of topics with retained events.
    #[must_use]
    pub fn topic_count(&self) -> usize {
        self.events.len()
    }
}

impl RealmStore for MemoryRealmStore {
    fn store_event(&self, event: StoredEvent) -> Result<(), StoreError> {
        let mut ring = self.events.entry(event.topic.clone()).or_default();
        if ring.len() == self.limit {
            ring.pop_front();
        }
        trace!(topic = %event.topic, publication = event.publication, "event retained");
        ring.push_back(event);
        Ok(())
    }

    fn event_history(&self, topic: &str, limit: usize) -> Result<Vec<StoredEvent>, StoreError> {
        let history = self
            .events
            .get(topic)
            .map(|ring| {
                let skip = ring.len().saturating_sub(limit);
                ring.iter().skip(skip).cloned().collect()
            })
            .unwrap_or_default();
        Ok(history)
    }
}
