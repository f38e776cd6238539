//! SQLite-backed key-value persistence.
//!
//! Everything the app persists — config overrides, user settings, the read
//! and bookmark id sets — is a JSON value under a string key in a single
//! `kv` table. Storage failures are never fatal: callers log the error and
//! carry on with in-memory state, which stays correct for the session.
//!
//! Keys: `config`, `user_settings`, `read_topic_ids`, `bookmark_ids`.

use std::collections::HashSet;
use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use thiserror::Error;

use crate::core::state::UserSettings;

/// Storage-specific errors with user-friendly messages.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Another instance of the application has locked the database
    #[error("Another instance of lurker appears to be running. Please close it and try again.")]
    InstanceLocked,

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl StorageError {
    /// Check if a sqlx error indicates database locking.
    fn from_sqlx(err: sqlx::Error) -> Self {
        let error_string = err.to_string().to_lowercase();
        if error_string.contains("database is locked")
            || error_string.contains("database table is locked")
            || error_string.contains("sqlite_busy")
            || error_string.contains("sqlite_locked")
            || error_string.contains("unable to open database file")
        {
            return StorageError::InstanceLocked;
        }
        StorageError::Other(err)
    }
}

/// Handle to the key-value store. Cheap to clone (pooled).
#[derive(Debug, Clone)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    /// Open (and create if missing) the database at `path`.
    /// `":memory:"` opens an in-memory database, used by tests.
    pub async fn open(path: &str) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(StorageError::Other)?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(StorageError::from_sqlx)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await
        .map_err(StorageError::from_sqlx)?;

        Ok(Self { pool })
    }

    /// Get a raw value by key.
    pub async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM kv WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(v,)| v))
    }

    /// Upsert a raw value.
    pub async fn put(&self, key: &str, value: &str) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO kv (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // ========================================================================
    // Typed Accessors
    // ========================================================================

    /// Load a persisted id set. Missing or corrupt values yield an empty
    /// set (corruption is logged, not fatal).
    pub async fn load_id_set(&self, key: &str) -> Result<HashSet<i64>, StorageError> {
        match self.get(key).await? {
            Some(json) => match serde_json::from_str::<Vec<i64>>(&json) {
                Ok(ids) => Ok(ids.into_iter().collect()),
                Err(e) => {
                    tracing::warn!(key, error = %e, "Stored id set is corrupt, starting empty");
                    Ok(HashSet::new())
                }
            },
            None => Ok(HashSet::new()),
        }
    }

    /// Persist an id set as a JSON array.
    pub async fn save_id_set(&self, key: &str, ids: &HashSet<i64>) -> Result<(), StorageError> {
        let mut sorted: Vec<i64> = ids.iter().copied().collect();
        sorted.sort_unstable(); // deterministic payloads make diffs sane
        let json = serde_json::to_string(&sorted)
            .expect("Vec<i64> serialization cannot fail");
        self.put(key, &json).await
    }

    /// Load persisted user settings, falling back to defaults when absent
    /// or corrupt.
    pub async fn load_settings(&self) -> Result<UserSettings, StorageError> {
        match self.get("user_settings").await? {
            Some(json) => match serde_json::from_str(&json) {
                Ok(settings) => Ok(settings),
                Err(e) => {
                    tracing::warn!(error = %e, "Stored settings are corrupt, using defaults");
                    Ok(UserSettings::default())
                }
            },
            None => Ok(UserSettings::default()),
        }
    }

    /// Persist user settings.
    pub async fn save_settings(&self, settings: &UserSettings) -> Result<(), StorageError> {
        let json = serde_json::to_string(settings)
            .expect("UserSettings serialization cannot fail");
        self.put("user_settings", &json).await
    }
}

/// Storage keys for the persisted id sets.
pub mod keys {
    pub const READ_TOPIC_IDS: &str = "read_topic_ids";
    pub const BOOKMARK_IDS: &str = "bookmark_ids";
    pub const CONFIG: &str = "config";
}
