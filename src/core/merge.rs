//! Merge engine: folds a fetched collection into [`CanonicalState`].
//!
//! Remote is the source of truth for content fields, so a replace-mode merge
//! swaps `topics` and `authors` wholesale. The read and bookmark sets are
//! never touched — that is the invariant that makes user actions safe to
//! interleave with an in-flight poll.

use std::collections::HashSet;

use crate::core::state::{Author, CanonicalState, Topic};

/// How fetched topics combine with the current list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// Replace `topics`/`authors` wholesale (the normal poll path).
    Replace,
    /// Prepend fetched topics not already present; keep existing entries.
    /// Used for low-data incremental top-ups.
    Append,
}

/// Result of a single merge.
#[derive(Debug)]
pub struct MergeOutcome {
    /// Ids present in this fetch but never observed in any prior merge this
    /// session, in remote order. Feeds the notification pipeline.
    pub new_ids: Vec<i64>,
}

/// Tracks which topic ids have been observed this session.
///
/// The seen-set is monotonic and session-only (never persisted). Because it
/// only grows, delta computation is order-independent: a poll superseded by
/// a manual refresh can land late and still produce a correct delta.
#[derive(Debug, Default)]
pub struct MergeEngine {
    seen_ids: HashSet<i64>,
}

impl MergeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a fetched collection into `state` and return the delta of
    /// newly-seen ids.
    ///
    /// The caller must only invoke this with a successful fetch; a failed
    /// upstream call never reaches the merge and leaves state untouched.
    pub fn merge(
        &mut self,
        state: &mut CanonicalState,
        topics: Vec<Topic>,
        authors: Vec<Author>,
        mode: MergeMode,
    ) -> MergeOutcome {
        let new_ids: Vec<i64> = topics
            .iter()
            .map(|t| t.id)
            .filter(|id| !self.seen_ids.contains(id))
            .collect();
        self.seen_ids.extend(new_ids.iter().copied());

        match mode {
            MergeMode::Replace => {
                state.topics = topics;
                // Author map is rebuilt on every merge, never patched.
                state.authors = authors.into_iter().map(|a| (a.id, a)).collect();
            }
            MergeMode::Append => {
                let existing: HashSet<i64> = state.topics.iter().map(|t| t.id).collect();
                let mut fresh: Vec<Topic> =
                    topics.into_iter().filter(|t| !existing.contains(&t.id)).collect();
                if !fresh.is_empty() {
                    fresh.extend(state.topics.drain(..));
                    state.topics = fresh;
                }
                for a in authors {
                    state.authors.insert(a.id, a);
                }
            }
        }

        tracing::debug!(
            topics = state.topics.len(),
            new = new_ids.len(),
            mode = ?mode,
            "Merged fetched collection"
        );

        MergeOutcome { new_ids }
    }

    /// Number of distinct ids observed this session.
    #[cfg(test)]
    pub fn seen_count(&self) -> usize {
        self.seen_ids.len()
    }
}
