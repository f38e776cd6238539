use std::collections::HashSet;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::core::bookmark::{BookmarkIntent, BookmarkOp};
use crate::core::categories;
use crate::core::state::{Author, Topic};
use crate::remote::types::{BookmarksResponse, FeedResponse};

const MAX_RETRIES: u32 = 2;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_RESPONSE_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Errors from remote operations.
///
/// Transient statuses are already retried before any of these surface, so
/// callers treat every variant as terminal for the current cycle.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status after retries
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the 30-second timeout
    #[error("Request timed out")]
    Timeout,
    /// Server returned 429 Too Many Requests after max retries
    #[error("Rate limited after {0} retries")]
    RateLimited(u32),
    /// Response body exceeded the size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Response body was not the expected JSON
    #[error("Decode error: {0}")]
    Decode(String),
}

/// Which feed to pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedQuery {
    Latest,
    Top,
    Category { id: i64 },
}

/// A successfully fetched topic collection.
#[derive(Debug)]
pub struct FetchedCollection {
    pub topics: Vec<Topic>,
    pub authors: Vec<Author>,
}

/// HTTP client for the forum API.
///
/// Cheap to clone (the reqwest client is reference-counted), which lets the
/// app spawn fire-and-forget calls like [`RemoteGateway::report_read`].
#[derive(Debug, Clone)]
pub struct RemoteGateway {
    client: reqwest::Client,
    base_url: Url,
}

impl RemoteGateway {
    pub fn new(client: reqwest::Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    /// Pull a topic feed.
    pub async fn fetch_collection(&self, query: FeedQuery) -> Result<FetchedCollection, FetchError> {
        let url = self.feed_url(query);
        let body = self.get_with_retry(url).await?;
        let response: FeedResponse =
            serde_json::from_slice(&body).map_err(|e| FetchError::Decode(e.to_string()))?;

        let (topic_dtos, user_dtos) = response.into_parts();
        let topics: Vec<Topic> = topic_dtos.into_iter().map(Topic::from).collect();
        let authors: Vec<Author> = user_dtos.into_iter().map(Author::from).collect();

        tracing::debug!(query = ?query, topics = topics.len(), authors = authors.len(), "Fetched collection");
        Ok(FetchedCollection { topics, authors })
    }

    /// Pull the authoritative bookmark set for the logged-in user.
    pub async fn fetch_bookmark_set(&self) -> Result<HashSet<i64>, FetchError> {
        let url = self.endpoint("user_bookmarks.json");
        let body = self.get_with_retry(url).await?;
        let response: BookmarksResponse =
            serde_json::from_slice(&body).map_err(|e| FetchError::Decode(e.to_string()))?;

        Ok(response
            .user_bookmarks
            .iter()
            .filter_map(|b| b.topic_id())
            .collect())
    }

    /// Apply one bookmark mutation on the remote side.
    pub async fn mutate_bookmark(&self, op: BookmarkOp) -> Result<(), FetchError> {
        let url = match op.intent {
            BookmarkIntent::Add => self.endpoint(&format!("t/{}/bookmark.json", op.id)),
            BookmarkIntent::Remove => self.endpoint(&format!("t/{}/remove_bookmarks.json", op.id)),
        };

        let mut attempt = 0;
        loop {
            let response = tokio::time::timeout(REQUEST_TIMEOUT, self.client.put(url.clone()).send())
                .await
                .map_err(|_| FetchError::Timeout)?
                .map_err(FetchError::Network)?;

            match self.check_retry(response.status(), attempt, &url).await? {
                RetryVerdict::Done => {
                    tracing::debug!(id = op.id, intent = ?op.intent, "Bookmark mutation acknowledged");
                    return Ok(());
                }
                RetryVerdict::Retry => attempt += 1,
            }
        }
    }

    /// Report a read position to the site. Fire-and-forget: failures are
    /// logged and never surface, local read state is the durable truth.
    pub async fn report_read(&self, topic_id: i64, post_number: i64) {
        let url = self.endpoint("topics/read");
        let form = [
            ("topic_id", topic_id.to_string()),
            ("post_number", post_number.to_string()),
        ];

        let result = tokio::time::timeout(
            REQUEST_TIMEOUT,
            self.client.post(url).form(&form).send(),
        )
        .await;

        match result {
            Ok(Ok(response)) if response.status().is_success() => {
                tracing::debug!(topic_id, post_number, "Reported read position");
            }
            Ok(Ok(response)) => {
                tracing::warn!(topic_id, status = %response.status(), "Read report rejected");
            }
            Ok(Err(e)) => {
                tracing::warn!(topic_id, error = %e, "Read report failed");
            }
            Err(_) => {
                tracing::warn!(topic_id, "Read report timed out");
            }
        }
    }

    // ========================================================================
    // Internal Helpers
    // ========================================================================

    fn endpoint(&self, path: &str) -> Url {
        // base_url is validated at startup; joining a static relative path
        // cannot fail.
        self.base_url
            .join(path)
            .unwrap_or_else(|_| self.base_url.clone())
    }

    fn feed_url(&self, query: FeedQuery) -> Url {
        match query {
            FeedQuery::Latest => self.endpoint("latest.json"),
            FeedQuery::Top => self.endpoint("top.json"),
            FeedQuery::Category { id } => match categories::slug_for(id) {
                Some(slug) => self.endpoint(&format!("c/{}/{}.json", slug, id)),
                None => {
                    tracing::warn!(category_id = id, "Unknown category, falling back to latest");
                    self.endpoint("latest.json")
                }
            },
        }
    }

    /// GET with bounded retry and a response size cap.
    async fn get_with_retry(&self, url: Url) -> Result<Vec<u8>, FetchError> {
        let mut attempt = 0;
        loop {
            let response = tokio::time::timeout(REQUEST_TIMEOUT, self.client.get(url.clone()).send())
                .await
                .map_err(|_| FetchError::Timeout)?
                .map_err(FetchError::Network)?;

            match self.check_retry(response.status(), attempt, &url).await? {
                RetryVerdict::Retry => {
                    attempt += 1;
                    continue;
                }
                RetryVerdict::Done => {}
            }

            if let Some(len) = response.content_length() {
                if len as usize > MAX_RESPONSE_SIZE {
                    return Err(FetchError::ResponseTooLarge);
                }
            }
            let bytes = response.bytes().await.map_err(FetchError::Network)?;
            if bytes.len() > MAX_RESPONSE_SIZE {
                return Err(FetchError::ResponseTooLarge);
            }
            return Ok(bytes.to_vec());
        }
    }

    /// Shared status handling: 2xx is done, 429/403/5xx back off and retry,
    /// anything else fails immediately.
    async fn check_retry(
        &self,
        status: reqwest::StatusCode,
        attempt: u32,
        url: &Url,
    ) -> Result<RetryVerdict, FetchError> {
        if status.is_success() {
            return Ok(RetryVerdict::Done);
        }

        let retryable = status == reqwest::StatusCode::TOO_MANY_REQUESTS
            || status == reqwest::StatusCode::FORBIDDEN
            || status.is_server_error();

        if !retryable {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }
        if attempt >= MAX_RETRIES {
            return if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                Err(FetchError::RateLimited(MAX_RETRIES))
            } else {
                Err(FetchError::HttpStatus(status.as_u16()))
            };
        }

        let delay_secs = 2u64.pow(attempt); // 1s, 2s
        tracing::warn!(
            url = %url,
            status = %status,
            retry = attempt,
            delay_secs,
            "Transient error, backing off"
        );
        tokio::time::sleep(Duration::from_secs(delay_secs)).await;
        Ok(RetryVerdict::Retry)
    }
}

enum RetryVerdict {
    Done,
    Retry,
}

// ============================================================================
// Tests
// ============================================================================
