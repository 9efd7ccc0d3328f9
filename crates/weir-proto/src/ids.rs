//! Router-scope WAMP ID generation.
//!
//! Subscription, registration, publication and invocation IDs live in the
//! router scope and must fall in `[1, 2^53]` so peers can represent them as
//! IEEE-754 doubles.

use std::sync::atomic::{AtomicU64, Ordering};

/// Upper bound for WAMP IDs (2^53).
pub const MAX_ID: u64 = 1 << 53;

static ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generate the next router-scope ID.
///
/// IDs are sequential and wrap back to 1 at [`MAX_ID`].
#[must_use]
pub fn next_id() -> u64 {
    let id = ID_COUNTER.fetch_add(1, Ordering::Relaxed);
    // wrap within the 2^53 range; reset is benign since the scope is huge
    (id % MAX_ID) + 1
}
