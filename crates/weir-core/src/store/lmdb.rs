//! LMDB-backed realm store (feature `lmdb`).

use std::path::Path;

use heed::types::{SerdeJson, Str};
use heed::{Database, Env, EnvOpenOptions};
use tracing::debug;

use super::{RealmStore, StoreError, StoredEvent};

const DEFAULT_MAP_SIZE: usize = 256 * 1024 * 1024;

/// Durable realm store backed by an LMDB environment.
///
/// Events are kept per topic under a single `event-history` database, with
/// the same bounded-ring semantics as the memory backend.
pub struct LmdbRealmStore {
    env: Env,
    events: Database<Str, SerdeJson<Vec<StoredEvent>>>,
    limit: usize,
}

impl LmdbRealmStore {
    /// Open (or create) the LMDB environment at `path`.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the directory cannot be created or the
    /// environment cannot be opened.
    pub fn open(
        path: impl AsRef<Path>,
        map_size: Option<usize>,
        limit: usize,
    ) -> Result<Self, StoreError> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)?;

        // Safety: the environment directory is exclusively owned by this
        // realm; no other process maps it.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size.unwrap_or(DEFAULT_MAP_SIZE))
                .max_dbs(1)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let events = env.create_database(&mut wtxn, Some("event-history"))?;
        wtxn.commit()?;

        debug!(path = %path.display(), "opened lmdb realm store");
        Ok(Self { env, events, limit })
    }
}

impl RealmStore for LmdbRealmStore {
    fn store_event(&self, event: StoredEvent) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn()?;
        let mut ring = self
            .events
            .get(&wtxn, &event.topic)?
            .unwrap_or_default();
        if ring.len() == self.limit {
            ring.remove(0);
        }
        let topic = event.topic.clone();
        ring.push(event);
        self.events.put(&mut wtxn, &topic, &ring)?;
        wtxn.commit()?;
        Ok(())
    }

    fn event_history(&self, topic: &str, limit: usize) -> Result<Vec<StoredEvent>, StoreError> {
        let rtxn = self.env.read_txn()?;
        let ring = self.events.get(&rtxn, topic)?.unwrap_or_default();
        let skip = ring.len().saturating_sub(limit);
        Ok(ring.into_iter().skip(skip).collect())
    }
}
