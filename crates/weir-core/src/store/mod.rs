//! Realm store abstraction.
//!
//! A realm may be configured with a persistence backend for retained
//! events. The routing core selects the backend at realm startup and fails
//! fast if the requested one is unavailable; everything else about the
//! persistence format is the backend's business.

mod memory;

#[cfg(feature = "lmdb")]
mod lmdb;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use weir_proto::message::{Args, Kwargs};

use crate::session::SessionId;

pub use memory::MemoryRealmStore;

#[cfg(feature = "lmdb")]
pub use lmdb::LmdbRealmStore;

/// Storage backend failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem-level failure.
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Backend rejected the operation or its configuration.
    #[error("store backend error: {0}")]
    Backend(String),

    /// LMDB environment failure.
    #[cfg(feature = "lmdb")]
    #[error("lmdb error: {0}")]
    Lmdb(#[from] heed::Error),
}

/// An event retained by a realm store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub topic: String,
    pub publication: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<SessionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Args>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kwargs: Option<Kwargs>,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
}

/// Pluggable per-realm persistence backend.
///
/// Synchronous by design, like the registries it sits next to; backends
/// needing async I/O should buffer internally.
pub trait RealmStore: Send + Sync {
    /// Retain a published event.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the backend cannot persist the event.
    fn store_event(&self, event: StoredEvent) -> Result<(), StoreError>;

    /// Return up to `limit` most recent events for `topic`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the backend cannot read.
    fn event_history(&self, topic: &str, limit: usize) -> Result<Vec<StoredEvent>, StoreError>;
}

pub(crate) fn now_millis() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
