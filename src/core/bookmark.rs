//! Bookmark reconciliation: optimistic local toggles against an
//! authoritative remote bookmark store.
//!
//! The local `bookmark_ids` set flips immediately on toggle so the view
//! updates before the remote call resolves. The reconciler is a pure state
//! machine: [`BookmarkReconciler::toggle`] hands back the remote operation
//! to send (if any), and [`BookmarkReconciler::complete`] folds the remote
//! acknowledgment back in, producing either a follow-up operation or a
//! rollback.
//!
//! One outstanding mutation per id: a toggle that lands while an operation
//! is in flight is queued, and the latest queued intent wins. Two toggles
//! that cancel out are dropped without a second network call.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

/// Direction of a remote bookmark mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookmarkIntent {
    Add,
    Remove,
}

impl BookmarkIntent {
    fn inverse(self) -> Self {
        match self {
            BookmarkIntent::Add => BookmarkIntent::Remove,
            BookmarkIntent::Remove => BookmarkIntent::Add,
        }
    }
}

/// A remote mutation the gateway should perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookmarkOp {
    pub id: i64,
    pub intent: BookmarkIntent,
}

/// What `complete` decided.
#[derive(Debug, Default)]
pub struct CompleteOutcome {
    /// Next operation to send for this id (a queued intent that still needs
    /// the remote side), if any.
    pub next: Option<BookmarkOp>,
    /// True when a failed operation forced the optimistic change to be
    /// inverted. Surfaced to the caller for logging only.
    pub rolled_back: bool,
}

#[derive(Debug)]
struct Pending {
    in_flight: BookmarkIntent,
    queued: Option<BookmarkIntent>,
}

/// Per-id in-flight bookmark mutations.
#[derive(Debug, Default)]
pub struct BookmarkReconciler {
    pending: HashMap<i64, Pending>,
}

impl BookmarkReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip the local bookmark state for `id` and return the remote
    /// operation to send, or `None` when one is already in flight (the new
    /// intent is queued; the latest toggle wins).
    pub fn toggle(&mut self, bookmark_ids: &mut HashSet<i64>, id: i64) -> Option<BookmarkOp> {
        // Optimistic flip, visible to the view immediately.
        let intent = if bookmark_ids.remove(&id) {
            BookmarkIntent::Remove
        } else {
            bookmark_ids.insert(id);
            BookmarkIntent::Add
        };

        match self.pending.entry(id) {
            Entry::Vacant(slot) => {
                slot.insert(Pending { in_flight: intent, queued: None });
                Some(BookmarkOp { id, intent })
            }
            Entry::Occupied(mut slot) => {
                slot.get_mut().queued = Some(intent);
                None
            }
        }
    }

    /// Fold the remote acknowledgment for `id` back into local state.
    ///
    /// On success, a queued intent that differs from the acknowledged one
    /// becomes the next in-flight operation; one that matches is dropped
    /// with no network call. On failure with nothing queued, the optimistic
    /// change is inverted so `bookmark_ids` stays consistent with the last
    /// known successful remote state.
    pub fn complete(
        &mut self,
        bookmark_ids: &mut HashSet<i64>,
        id: i64,
        succeeded: bool,
    ) -> CompleteOutcome {
        let Some(pending) = self.pending.remove(&id) else {
            tracing::warn!(id, "Bookmark completion with no pending operation");
            return CompleteOutcome::default();
        };

        // Remote state after this acknowledgment: the in-flight intent on
        // success, its inverse (unchanged remote) on failure.
        let remote = if succeeded {
            pending.in_flight
        } else {
            pending.in_flight.inverse()
        };

        match pending.queued {
            None => {
                if succeeded {
                    CompleteOutcome::default()
                } else {
                    // Roll back the optimistic flip.
                    match pending.in_flight {
                        BookmarkIntent::Add => {
                            bookmark_ids.remove(&id);
                        }
                        BookmarkIntent::Remove => {
                            bookmark_ids.insert(id);
                        }
                    }
                    CompleteOutcome { next: None, rolled_back: true }
                }
            }
            // Local already reflects the queued intent; if it matches the
            // remote state the toggles cancelled out and nothing is owed.
            Some(q) if q == remote => CompleteOutcome::default(),
            Some(q) => {
                self.pending.insert(id, Pending { in_flight: q, queued: None });
                CompleteOutcome { next: Some(BookmarkOp { id, intent: q }), rolled_back: false }
            }
        }
    }

    /// Whether a mutation for `id` is still awaiting acknowledgment.
    pub fn has_pending(&self, id: i64) -> bool {
        self.pending.contains_key(&id)
    }
}
