use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Domain Types
// ============================================================================

/// One forum topic as the unit of feed content.
///
/// Content fields are authoritative on the remote side and only change
/// through a merge. Read/bookmark status is tracked separately in
/// [`CanonicalState`] so a merge can never clobber it.
///
/// `title` uses `Arc<str>` for cheap cloning into notification text and
/// display rows.
#[derive(Debug, Clone)]
pub struct Topic {
    pub id: i64,
    pub title: Arc<str>,
    pub created_at: DateTime<Utc>,
    /// Last post activity; falls back to `created_at` for topics with no
    /// replies.
    pub last_activity_at: DateTime<Utc>,
    pub category_id: Option<i64>,
    pub tags: Vec<String>,
    pub views: i64,
    pub reply_count: i64,
    /// Resolved once during wire conversion from the poster list (the entry
    /// tagged "latest", else the final poster). Never re-derived later.
    pub last_author_id: Option<i64>,
    /// Highest post number the server knows about.
    pub highest_post_number: i64,
    /// Highest post number the viewer has read on the site, if logged in.
    pub last_read_post_number: Option<i64>,
}

/// Forum user referenced by a topic's poster list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub id: i64,
    pub trust_level: u8,
    pub is_admin: bool,
}

// ============================================================================
// Canonical State
// ============================================================================

/// Single source of truth for the session.
///
/// `topics` and `authors` are replaced wholesale on each successful poll
/// (remote order preserved for default display). `read_ids` and
/// `bookmark_ids` are independent of `topics`: an id may live in either set
/// with no matching topic, which covers cross-session persistence and the
/// bookmark-only view. Merges never remove ids from either set.
#[derive(Debug, Default)]
pub struct CanonicalState {
    pub topics: Vec<Topic>,
    pub authors: HashMap<i64, Author>,
    pub read_ids: HashSet<i64>,
    pub bookmark_ids: HashSet<i64>,
}

impl CanonicalState {
    pub fn topic(&self, id: i64) -> Option<&Topic> {
        self.topics.iter().find(|t| t.id == id)
    }

    pub fn author(&self, id: i64) -> Option<&Author> {
        self.authors.get(&id)
    }
}

// ============================================================================
// User Settings
// ============================================================================

/// Which feed the user is looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedSelection {
    Latest,
    Top,
    Category(i64),
    Bookmarks,
}

impl Default for FeedSelection {
    fn default() -> Self {
        FeedSelection::Latest
    }
}

/// Sort order for the projected topic list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    /// Descending by last activity.
    Latest,
    /// Descending by creation time.
    Created,
    /// Descending by view count.
    Views,
    /// Descending by reply count.
    Replies,
}

impl Default for SortMode {
    fn default() -> Self {
        SortMode::Latest
    }
}

/// Per-user view settings, persisted under the `user_settings` storage key.
///
/// Distinct from [`crate::config::Config`]: settings change from the UI
/// every session, config is the slow-moving knob file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    pub feed: FeedSelection,
    pub sort: SortMode,
    /// Whether the interval poll loop is active.
    pub auto_poll: bool,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            feed: FeedSelection::Latest,
            sort: SortMode::Latest,
            auto_poll: true,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
