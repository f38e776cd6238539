//! Notification decision pipeline.
//!
//! Candidates are topics that are genuinely new this session (the merge
//! delta), unread, and recent enough that a filter change cannot resurface
//! old content as "new". Matching is a case-insensitive substring check of
//! the configured keywords against the title.
//!
//! A session-wide cooldown throttles firings: during cooldown a burst of
//! matching candidates yields zero notifications, and the next poll cycle's
//! candidates are evaluated fresh. There is no "already notified" set — old
//! items become non-candidates through the delta and recency rules.

use chrono::{DateTime, Duration, Utc};

use crate::core::state::{CanonicalState, Topic};
use crate::util::text::{parse_keywords, title_matches_any};

/// Topics older than this never trigger a notification (4 hours).
const RECENCY_WINDOW_MS: i64 = 14_400_000;

/// Minimum spacing between notification firings.
const DEFAULT_COOLDOWN_MS: i64 = 5000;

/// Delivery boundary for notifications. Implementations are best-effort and
/// must swallow their own errors.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, text: &str);
}

/// Session-wide notification throttle and keyword matcher.
#[derive(Debug)]
pub struct NotificationPipeline {
    last_fired_at: Option<DateTime<Utc>>,
    cooldown: Duration,
}

impl Default for NotificationPipeline {
    fn default() -> Self {
        Self {
            last_fired_at: None,
            cooldown: Duration::milliseconds(DEFAULT_COOLDOWN_MS),
        }
    }
}

impl NotificationPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn with_cooldown(cooldown: Duration) -> Self {
        Self { last_fired_at: None, cooldown }
    }

    /// Decide which of the newly seen topics deserve a notification.
    ///
    /// Returns the matched topics in delta order. When anything is returned,
    /// `last_fired_at` advances to `now` exactly once for the whole call,
    /// not once per topic.
    pub fn decide<'a>(
        &mut self,
        delta_ids: &[i64],
        state: &'a CanonicalState,
        keyword_spec: &str,
        now: DateTime<Utc>,
    ) -> Vec<&'a Topic> {
        let keywords = parse_keywords(keyword_spec);
        if keywords.is_empty() {
            return Vec::new();
        }

        // Session-wide throttle, regardless of how many candidates matched.
        if let Some(last) = self.last_fired_at {
            if now - last < self.cooldown {
                tracing::debug!(delta = delta_ids.len(), "Notification cooldown active, skipping");
                return Vec::new();
            }
        }

        let matched: Vec<&Topic> = delta_ids
            .iter()
            .filter_map(|id| state.topic(*id))
            .filter(|t| !state.read_ids.contains(&t.id))
            .filter(|t| now - t.created_at < Duration::milliseconds(RECENCY_WINDOW_MS))
            .filter(|t| title_matches_any(&t.title, &keywords))
            .collect();

        if !matched.is_empty() {
            self.last_fired_at = Some(now);
            tracing::info!(count = matched.len(), "Keyword notifications firing");
        }
        matched
    }

    /// Clear the cooldown so the next decide call may fire immediately.
    pub fn reset_cooldown(&mut self) {
        self.last_fired_at = None;
    }
}
