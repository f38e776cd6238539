//! Read-status tracking.
//!
//! Two sources of truth feed [`is_read`]: the locally tracked id set, and —
//! when site sync is enabled — the read position the server already reports
//! on each topic. The second lets server-side read state short-circuit local
//! tracking without requiring a write.
//!
//! Mutations here only touch in-memory state; the app layer persists the id
//! set immediately after every call and fires the best-effort site report.

use crate::core::state::{CanonicalState, Topic};

/// Mark a topic read. Returns true if the id was not already in the set.
pub fn mark_read(state: &mut CanonicalState, id: i64) -> bool {
    state.read_ids.insert(id)
}

/// Remove a topic from the read set. Returns true if it was present.
pub fn unmark_read(state: &mut CanonicalState, id: i64) -> bool {
    state.read_ids.remove(&id)
}

/// Whether a topic counts as read.
///
/// True if the id is in the local read set, or if `sync_enabled` and the
/// viewer's site-side read position covers the topic's highest post. A
/// missing or zero read position never counts.
pub fn is_read(state: &CanonicalState, topic: &Topic, sync_enabled: bool) -> bool {
    if state.read_ids.contains(&topic.id) {
        return true;
    }
    sync_enabled
        && topic.highest_post_number > 0
        && topic
            .last_read_post_number
            .is_some_and(|n| n >= topic.highest_post_number)
}
