//! Wire-format types for the Discourse JSON API and their conversion into
//! domain types.
//!
//! The feed endpoints are tolerant of shape drift: topics may live under
//! `topic_list.topics` or a bare `topics` array, and `users` may be absent.
//! Bookmark rows carry the topic id in different places depending on the
//! endpoint version.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::core::state::{Author, Topic};

// ============================================================================
// Feed Response
// ============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct FeedResponse {
    pub topic_list: Option<TopicListDto>,
    #[serde(default)]
    pub topics: Option<Vec<TopicDto>>,
    #[serde(default)]
    pub users: Vec<UserDto>,
}

impl FeedResponse {
    /// Topics from whichever shape the endpoint used.
    pub fn into_parts(self) -> (Vec<TopicDto>, Vec<UserDto>) {
        let topics = match self.topic_list {
            Some(list) => list.topics,
            None => self.topics.unwrap_or_default(),
        };
        (topics, self.users)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct TopicListDto {
    #[serde(default)]
    pub topics: Vec<TopicDto>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TopicDto {
    pub id: i64,
    pub title: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_posted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub views: i64,
    #[serde(default)]
    pub posts_count: i64,
    #[serde(default)]
    pub posters: Vec<PosterDto>,
    #[serde(default)]
    pub highest_post_number: i64,
    #[serde(default)]
    pub last_read_post_number: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PosterDto {
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub extras: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserDto {
    pub id: i64,
    #[serde(default)]
    pub trust_level: u8,
    #[serde(default)]
    pub admin: bool,
}

impl From<TopicDto> for Topic {
    fn from(dto: TopicDto) -> Self {
        // Resolve the latest poster once here; the rest of the app never
        // inspects the poster list again.
        let last_author_id = dto
            .posters
            .iter()
            .find(|p| p.extras.as_deref().is_some_and(|e| e.contains("latest")))
            .or_else(|| dto.posters.last())
            .and_then(|p| p.user_id);

        Topic {
            id: dto.id,
            title: Arc::from(dto.title),
            created_at: dto.created_at,
            last_activity_at: dto.last_posted_at.unwrap_or(dto.created_at),
            category_id: dto.category_id,
            tags: dto.tags,
            views: dto.views,
            reply_count: dto.posts_count,
            last_author_id,
            highest_post_number: dto.highest_post_number,
            last_read_post_number: dto.last_read_post_number,
        }
    }
}

impl From<UserDto> for Author {
    fn from(dto: UserDto) -> Self {
        Author {
            id: dto.id,
            trust_level: dto.trust_level.min(4),
            is_admin: dto.admin,
        }
    }
}

// ============================================================================
// Bookmark Response
// ============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct BookmarksResponse {
    #[serde(default)]
    pub user_bookmarks: Vec<BookmarkDto>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BookmarkDto {
    #[serde(default)]
    pub topic_id: Option<i64>,
    #[serde(default)]
    pub topic: Option<BookmarkTopicDto>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BookmarkTopicDto {
    pub id: i64,
}

impl BookmarkDto {
    pub fn topic_id(&self) -> Option<i64> {
        self.topic_id.or(self.topic.as_ref().map(|t| t.id))
    }
}
