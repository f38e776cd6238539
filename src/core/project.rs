//! Filter/sort projection: derives the visible topic list from canonical
//! state. Pure and deterministic for fixed inputs.
//!
//! Filter stages run in a fixed order; each narrows the candidate set, and
//! since they are conjunctive the output is exactly the topics satisfying
//! all four predicates:
//!
//! 1. category block-list
//! 2. keyword blacklist (case-insensitive title substring)
//! 3. quality threshold (reply count)
//! 4. read-hide (when the configured action is `hide`)
//!
//! An empty result is a valid terminal state, not an error.

use crate::config::{Config, ReadStatusAction};
use crate::core::categories;
use crate::core::read::is_read;
use crate::core::state::{CanonicalState, SortMode, Topic};
use crate::util::text::{parse_keywords, title_matches_any};

/// Replies at or below this count are dropped by the quality filter.
const QUALITY_REPLY_FLOOR: i64 = 10;

/// Derive the filtered, sorted view of `state.topics`.
pub fn project<'a>(state: &'a CanonicalState, config: &Config, sort: SortMode) -> Vec<&'a Topic> {
    let blacklist = parse_keywords(&config.keyword_blacklist);

    let mut visible: Vec<&Topic> = state
        .topics
        .iter()
        .filter(|t| !category_blocked(t, config))
        .filter(|t| !title_matches_any(&t.title, &blacklist))
        .filter(|t| !config.quality_filter || t.reply_count > QUALITY_REPLY_FLOOR)
        .filter(|t| {
            config.read_status_action != ReadStatusAction::Hide
                || !is_read(state, t, config.sync_read_status)
        })
        .collect();

    sort_topics(&mut visible, sort);
    visible
}

fn category_blocked(topic: &Topic, config: &Config) -> bool {
    if config.block_categories.is_empty() {
        return false;
    }
    // Topics with no category, or one outside the known table, always pass.
    topic
        .category_id
        .and_then(categories::slug_for)
        .is_some_and(|slug| config.block_categories.iter().any(|b| b == slug))
}

/// Stable descending sort; ties keep their pre-sort relative order.
fn sort_topics(topics: &mut [&Topic], sort: SortMode) {
    match sort {
        SortMode::Latest => topics.sort_by(|a, b| b.last_activity_at.cmp(&a.last_activity_at)),
        SortMode::Created => topics.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        SortMode::Views => topics.sort_by(|a, b| b.views.cmp(&a.views)),
        SortMode::Replies => topics.sort_by(|a, b| b.reply_count.cmp(&a.reply_count)),
    }
}
