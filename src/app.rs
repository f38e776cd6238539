//! Application orchestration: owns the canonical state and threads poll
//! results and user actions through the reconciliation core.
//!
//! All methods run on one logical thread of control; remote calls suspend
//! cooperatively. A poll cycle always completes its merge before any
//! projection happens for that cycle, and because merges never touch the
//! read/bookmark sets, user actions can interleave with an in-flight poll
//! without locking.

use std::sync::Arc;

use chrono::Utc;

use crate::config::Config;
use crate::core::bookmark::BookmarkReconciler;
use crate::core::merge::{MergeEngine, MergeMode};
use crate::core::notify::{NotificationPipeline, NotificationSink};
use crate::core::state::{CanonicalState, FeedSelection, SortMode, Topic, UserSettings};
use crate::core::{project, read};
use crate::remote::{FeedQuery, FetchError, RemoteGateway};
use crate::storage::{keys, Storage};

/// Summary of one poll cycle, for status display.
#[derive(Debug, Default)]
pub struct PollOutcome {
    /// Topics in the fetched collection (or bookmarks refreshed).
    pub fetched: usize,
    /// Newly seen this session.
    pub new: usize,
    /// Notifications fired.
    pub notified: usize,
}

pub struct App {
    pub config: Config,
    pub settings: UserSettings,
    pub state: CanonicalState,
    merge: MergeEngine,
    bookmarks: BookmarkReconciler,
    notifications: NotificationPipeline,
    gateway: RemoteGateway,
    store: Storage,
    sink: Arc<dyn NotificationSink>,
}

impl App {
    /// Build the app and restore persisted state (settings, read ids, the
    /// last bookmark snapshot). Storage failures degrade to defaults.
    pub async fn load(
        config: Config,
        gateway: RemoteGateway,
        store: Storage,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        let settings = match store.load_settings().await {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load settings, using defaults");
                UserSettings::default()
            }
        };

        let mut state = CanonicalState::default();
        state.read_ids = match store.load_id_set(keys::READ_TOPIC_IDS).await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load read ids, starting empty");
                Default::default()
            }
        };
        // Local snapshot only; seed_bookmarks replaces it when the remote
        // set is reachable (stale-but-available policy).
        state.bookmark_ids = match store.load_id_set(keys::BOOKMARK_IDS).await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load bookmark snapshot, starting empty");
                Default::default()
            }
        };

        tracing::info!(
            read = state.read_ids.len(),
            bookmarks = state.bookmark_ids.len(),
            "Restored persisted state"
        );

        Self {
            config,
            settings,
            state,
            merge: MergeEngine::new(),
            bookmarks: BookmarkReconciler::new(),
            notifications: NotificationPipeline::new(),
            gateway,
            store,
            sink,
        }
    }

    /// Seed `bookmark_ids` from the authoritative remote set. A failed
    /// fetch keeps whatever was last persisted locally.
    pub async fn seed_bookmarks(&mut self) {
        match self.gateway.fetch_bookmark_set().await {
            Ok(remote) => {
                self.state.bookmark_ids = remote;
                self.persist_bookmark_ids().await;
                tracing::info!(count = self.state.bookmark_ids.len(), "Seeded bookmarks from remote");
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    local = self.state.bookmark_ids.len(),
                    "Bookmark seed failed, keeping local snapshot"
                );
            }
        }
    }

    // ========================================================================
    // Poll Cycle
    // ========================================================================

    /// Run one poll cycle for the current feed selection.
    ///
    /// On fetch failure the canonical state is untouched and the error
    /// surfaces as a refresh failure. On success the merge completes before
    /// notification decisions, and the caller can project the fresh view.
    pub async fn poll(&mut self) -> Result<PollOutcome, FetchError> {
        let query = match self.settings.feed {
            FeedSelection::Latest => FeedQuery::Latest,
            FeedSelection::Top => FeedQuery::Top,
            FeedSelection::Category(id) => FeedQuery::Category { id },
            FeedSelection::Bookmarks => {
                // Bookmark view refreshes the set instead of the feed.
                let fetched = self.refresh_bookmarks().await?;
                return Ok(PollOutcome { fetched, ..Default::default() });
            }
        };

        let collection = self.gateway.fetch_collection(query).await?;
        let fetched = collection.topics.len();

        // Low-data mode tops the list up incrementally instead of replacing
        // it, so topics that dropped off the feed stay visible.
        let mode = if self.config.low_data_mode {
            MergeMode::Append
        } else {
            MergeMode::Replace
        };
        let outcome = self.merge.merge(
            &mut self.state,
            collection.topics,
            collection.authors,
            mode,
        );

        let decided = self.notifications.decide(
            &outcome.new_ids,
            &self.state,
            &self.config.notify_keywords,
            Utc::now(),
        );
        let notified = decided.len();
        for topic in &decided {
            self.sink.notify(&topic.title);
        }

        Ok(PollOutcome { fetched, new: outcome.new_ids.len(), notified })
    }

    /// Re-pull the authoritative bookmark set (bookmark view refresh).
    pub async fn refresh_bookmarks(&mut self) -> Result<usize, FetchError> {
        let remote = self.gateway.fetch_bookmark_set().await?;
        let count = remote.len();
        self.state.bookmark_ids = remote;
        self.persist_bookmark_ids().await;
        Ok(count)
    }

    // ========================================================================
    // Views
    // ========================================================================

    /// The filtered, sorted topic list for the current settings.
    pub fn visible_topics(&self) -> Vec<&Topic> {
        project::project(&self.state, &self.config, self.settings.sort)
    }

    /// Whether a topic counts as read under the current config.
    pub fn is_read(&self, topic: &Topic) -> bool {
        read::is_read(&self.state, topic, self.config.sync_read_status)
    }

    /// Unread topics in the current collection (for the status line; badge
    /// rendering itself is the platform's concern).
    pub fn unread_count(&self) -> usize {
        self.state
            .topics
            .iter()
            .filter(|t| !read::is_read(&self.state, t, self.config.sync_read_status))
            .count()
    }

    // ========================================================================
    // User Actions
    // ========================================================================

    /// Mark a topic read (the "open" action). Persists immediately and,
    /// when sync is enabled, reports the read position to the site without
    /// blocking or surfacing failures.
    pub async fn open_topic(&mut self, id: i64) {
        let report = self
            .state
            .topic(id)
            .filter(|t| self.config.sync_read_status && t.highest_post_number > 0)
            .map(|t| t.highest_post_number);

        if read::mark_read(&mut self.state, id) {
            self.persist_read_ids().await;
        }

        if let Some(post_number) = report {
            let gateway = self.gateway.clone();
            tokio::spawn(async move {
                gateway.report_read(id, post_number).await;
            });
        }
    }

    /// Remove a topic from the read set ("mark as unread").
    pub async fn unmark_read(&mut self, id: i64) {
        if read::unmark_read(&mut self.state, id) {
            self.persist_read_ids().await;
        }
    }

    /// Toggle a bookmark: local state flips immediately, then the remote
    /// mutation (and any intent queued while it was in flight) is driven to
    /// completion. Failures roll the optimistic change back.
    pub async fn toggle_bookmark(&mut self, id: i64) {
        let mut op = self.bookmarks.toggle(&mut self.state.bookmark_ids, id);
        self.persist_bookmark_ids().await;

        while let Some(current) = op {
            let result = self.gateway.mutate_bookmark(current).await;
            if let Err(e) = &result {
                tracing::warn!(id, intent = ?current.intent, error = %e, "Bookmark mutation failed");
            }

            let outcome = self
                .bookmarks
                .complete(&mut self.state.bookmark_ids, id, result.is_ok());
            if outcome.rolled_back {
                tracing::warn!(id, "Rolled back optimistic bookmark change");
                self.persist_bookmark_ids().await;
            }
            op = outcome.next;
        }
    }

    // ========================================================================
    // Settings / Config
    // ========================================================================

    pub async fn set_feed(&mut self, feed: FeedSelection) {
        self.settings.feed = feed;
        self.persist_settings().await;
    }

    pub async fn set_sort(&mut self, sort: SortMode) {
        self.settings.sort = sort;
        self.persist_settings().await;
    }

    pub async fn set_auto_poll(&mut self, enabled: bool) {
        self.settings.auto_poll = enabled;
        self.persist_settings().await;
    }

    /// Replace the active config and persist it as the stored override.
    pub async fn update_config(&mut self, config: Config) {
        self.config = config;
        match serde_json::to_string(&self.config) {
            Ok(json) => {
                if let Err(e) = self.store.put(keys::CONFIG, &json).await {
                    tracing::warn!(error = %e, "Failed to persist config override");
                }
            }
            Err(e) => tracing::warn!(error = %e, "Failed to serialize config"),
        }
    }

    /// Clear the notification cooldown (settings "test notification" path).
    pub fn reset_notification_cooldown(&mut self) {
        self.notifications.reset_cooldown();
    }

    // ========================================================================
    // Persistence Helpers
    // ========================================================================

    // Persistence failures are logged and swallowed: in-memory state stays
    // correct for the session.

    async fn persist_read_ids(&self) {
        if let Err(e) = self
            .store
            .save_id_set(keys::READ_TOPIC_IDS, &self.state.read_ids)
            .await
        {
            tracing::warn!(error = %e, "Failed to persist read ids");
        }
    }

    async fn persist_bookmark_ids(&self) {
        if let Err(e) = self
            .store
            .save_id_set(keys::BOOKMARK_IDS, &self.state.bookmark_ids)
            .await
        {
            tracing::warn!(error = %e, "Failed to persist bookmark ids");
        }
    }

    async fn persist_settings(&self) {
        if let Err(e) = self.store.save_settings(&self.settings).await {
            tracing::warn!(error = %e, "Failed to persist settings");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use url::Url;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Sink that records notification texts for assertions.
    #[derive(Default)]
    struct RecordingSink {
        texts: Mutex<Vec<String>>,
    }

    impl NotificationSink for RecordingSink {
        fn notify(&self, text: &str) {
            self.texts.lock().unwrap().push(text.to_string());
        }
    }

    fn topic_json(id: i64, title: &str, created_at: chrono::DateTime<Utc>) -> String {
        format!(
            r#"{{"id": {}, "title": "{}", "created_at": "{}", "posts_count": 20, "highest_post_number": 20}}"#,
            id,
            title,
            created_at.to_rfc3339()
        )
    }

    fn latest_body(topics: &[String]) -> String {
        format!(r#"{{"users": [], "topic_list": {{"topics": [{}]}}}}"#, topics.join(","))
    }

    async fn app_for(server: &MockServer, sink: Arc<RecordingSink>) -> App {
        let gateway = RemoteGateway::new(
            reqwest::Client::new(),
            Url::parse(&server.uri()).unwrap(),
        );
        let store = Storage::open(":memory:").await.unwrap();
        App::load(Config::default(), gateway, store, sink).await
    }

    #[tokio::test]
    async fn test_poll_merges_and_projects() {
        let server = MockServer::start().await;
        let body = latest_body(&[
            topic_json(1, "alpha", Utc::now()),
            topic_json(2, "beta", Utc::now()),
        ]);
        Mock::given(method("GET"))
            .and(path("/latest.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let mut app = app_for(&server, Arc::default()).await;
        let outcome = app.poll().await.unwrap();

        assert_eq!(outcome.fetched, 2);
        assert_eq!(outcome.new, 2);
        assert_eq!(app.visible_topics().len(), 2);
        assert_eq!(app.unread_count(), 2);
    }

    #[tokio::test]
    async fn test_failed_poll_leaves_state_untouched() {
        let server = MockServer::start().await;
        let body = latest_body(&[topic_json(1, "alpha", Utc::now())]);
        Mock::given(method("GET"))
            .and(path("/latest.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let mut app = app_for(&server, Arc::default()).await;
        app.poll().await.unwrap();

        let err = app.poll().await.unwrap_err();
        assert!(matches!(err, FetchError::HttpStatus(404)));
        // Previous collection still visible.
        assert_eq!(app.visible_topics().len(), 1);
    }

    #[tokio::test]
    async fn test_fresh_keyword_topic_notifies_once() {
        let server = MockServer::start().await;
        let one_hour_ago = Utc::now() - chrono::Duration::hours(1);
        let body = latest_body(&[topic_json(1, "AI news", one_hour_ago)]);
        Mock::given(method("GET"))
            .and(path("/latest.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let sink = Arc::new(RecordingSink::default());
        let mut app = app_for(&server, sink.clone()).await;
        app.config.notify_keywords = "ai".to_string();

        let outcome = app.poll().await.unwrap();
        assert_eq!(outcome.notified, 1);
        assert_eq!(sink.texts.lock().unwrap().as_slice(), ["AI news"]);

        // Same topic on the next poll: no longer in the delta, no repeat.
        let outcome = app.poll().await.unwrap();
        assert_eq!(outcome.notified, 0);
    }

    #[tokio::test]
    async fn test_low_data_mode_accumulates_across_polls() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/latest.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(latest_body(&[topic_json(1, "alpha", Utc::now())])),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/latest.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(latest_body(&[topic_json(2, "beta", Utc::now())])),
            )
            .mount(&server)
            .await;

        let mut app = app_for(&server, Arc::default()).await;
        app.config.low_data_mode = true;

        app.poll().await.unwrap();
        let outcome = app.poll().await.unwrap();
        assert_eq!(outcome.new, 1);

        // Topic 1 dropped off the feed but stays in the accumulated list.
        let ids: Vec<i64> = app.visible_topics().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[tokio::test]
    async fn test_open_topic_marks_read_and_persists() {
        let server = MockServer::start().await;
        let body = latest_body(&[topic_json(1, "alpha", Utc::now())]);
        Mock::given(method("GET"))
            .and(path("/latest.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/topics/read"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let mut app = app_for(&server, Arc::default()).await;
        app.poll().await.unwrap();

        app.open_topic(1).await;
        assert!(app.state.read_ids.contains(&1));
        assert_eq!(app.unread_count(), 0);

        // Persisted immediately, not at some later save point.
        let persisted = app.store.load_id_set(keys::READ_TOPIC_IDS).await.unwrap();
        assert!(persisted.contains(&1));

        app.unmark_read(1).await;
        let persisted = app.store.load_id_set(keys::READ_TOPIC_IDS).await.unwrap();
        assert!(!persisted.contains(&1));
    }

    #[tokio::test]
    async fn test_toggle_bookmark_remote_failure_rolls_back() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let mut app = app_for(&server, Arc::default()).await;
        app.toggle_bookmark(5).await;

        assert!(!app.state.bookmark_ids.contains(&5));
        let persisted = app.store.load_id_set(keys::BOOKMARK_IDS).await.unwrap();
        assert!(!persisted.contains(&5));
    }

    #[tokio::test]
    async fn test_toggle_bookmark_success_persists() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/t/5/bookmark.json"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let mut app = app_for(&server, Arc::default()).await;
        app.toggle_bookmark(5).await;

        assert!(app.state.bookmark_ids.contains(&5));
        let persisted = app.store.load_id_set(keys::BOOKMARK_IDS).await.unwrap();
        assert!(persisted.contains(&5));
    }

    #[tokio::test]
    async fn test_seed_bookmarks_failure_keeps_local_snapshot() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let sink: Arc<RecordingSink> = Arc::default();
        let gateway =
            RemoteGateway::new(reqwest::Client::new(), Url::parse(&server.uri()).unwrap());
        let store = Storage::open(":memory:").await.unwrap();
        // A previous session left a snapshot behind.
        store
            .save_id_set(keys::BOOKMARK_IDS, &[7, 8].into_iter().collect())
            .await
            .unwrap();

        let mut app = App::load(Config::default(), gateway, store, sink).await;
        assert_eq!(app.state.bookmark_ids.len(), 2);

        app.seed_bookmarks().await;
        // Stale-but-available: the snapshot survives the failed fetch.
        assert_eq!(app.state.bookmark_ids.len(), 2);
    }

    #[tokio::test]
    async fn test_bookmarks_feed_refreshes_set_not_topics() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user_bookmarks.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"user_bookmarks": [{"topic": {"id": 3}}]}"#,
            ))
            .mount(&server)
            .await;

        let mut app = app_for(&server, Arc::default()).await;
        app.set_feed(FeedSelection::Bookmarks).await;

        let outcome = app.poll().await.unwrap();
        assert_eq!(outcome.fetched, 1);
        assert!(app.state.bookmark_ids.contains(&3));
        assert!(app.state.topics.is_empty());
    }

    #[tokio::test]
    async fn test_settings_persist_across_load() {
        let server = MockServer::start().await;
        let gateway =
            RemoteGateway::new(reqwest::Client::new(), Url::parse(&server.uri()).unwrap());
        let store = Storage::open(":memory:").await.unwrap();

        let mut app = App::load(
            Config::default(),
            gateway.clone(),
            store.clone(),
            Arc::new(RecordingSink::default()),
        )
        .await;
        app.set_sort(SortMode::Views).await;
        app.set_feed(FeedSelection::Top).await;
        drop(app);

        let app = App::load(
            Config::default(),
            gateway,
            store,
            Arc::new(RecordingSink::default()),
        )
        .await;
        assert_eq!(app.settings.sort, SortMode::Views);
        assert_eq!(app.settings.feed, FeedSelection::Top);
    }
}
