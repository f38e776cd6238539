//! Configuration file parser for ~/.config/lurker/config.toml.
//!
//! The config file is optional — a missing file yields `Config::default()`.
//! Values the user changes at runtime are persisted as a JSON override under
//! the `config` storage key and layered on top of the file at startup
//! (stored values win). Unknown keys are silently ignored by serde, though
//! we log a warning when the file contains potential typos.
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds the maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// What to do with topics that count as read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadStatusAction {
    /// Keep them in the list, rendered dimmed.
    Fade,
    /// Drop them from the projected list entirely.
    Hide,
}

impl Default for ReadStatusAction {
    fn default() -> Self {
        ReadStatusAction::Fade
    }
}

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be
/// specified. Missing keys fall back to `Default::default()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Forum base URL.
    pub base_url: String,

    /// Poll interval in seconds. 0 = manual refresh only.
    pub polling_interval_secs: u64,

    /// Skip excerpts and author metadata in the listing.
    pub low_data_mode: bool,

    /// Category slugs to drop from the projected list.
    pub block_categories: Vec<String>,

    /// Comma-separated, case-insensitive title keywords to drop.
    pub keyword_blacklist: String,

    /// Drop topics with 10 or fewer replies.
    pub quality_filter: bool,

    /// Whether read topics are faded or hidden.
    pub read_status_action: ReadStatusAction,

    /// Comma-separated, case-insensitive title keywords that trigger a
    /// notification for newly seen topics.
    pub notify_keywords: String,

    /// Mirror read state with the site: honor the server's read position
    /// and report reads back.
    pub sync_read_status: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "https://linux.do".to_string(),
            polling_interval_secs: 30,
            low_data_mode: false,
            block_categories: Vec::new(),
            keyword_blacklist: String::new(),
            quality_filter: false,
            read_status_action: ReadStatusAction::Fade,
            notify_keywords: String::new(),
            sync_read_status: true,
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: &'static [&'static str] = &[
        "base_url",
        "polling_interval_secs",
        "low_data_mode",
        "block_categories",
        "keyword_blacklist",
        "quality_filter",
        "read_status_action",
        "notify_keywords",
        "sync_read_status",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as a warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Race: file deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        // Parse as a raw table first to detect unknown keys (typos).
        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(
            path = %path.display(),
            base_url = %config.base_url,
            interval = config.polling_interval_secs,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Layer a stored JSON override (the `config` storage key) on top of
    /// this config. Corrupt overrides are logged and ignored.
    pub fn apply_stored_override(self, stored: Option<&str>) -> Self {
        match stored {
            Some(json) => match serde_json::from_str::<Config>(json) {
                Ok(over) => over,
                Err(e) => {
                    tracing::warn!(error = %e, "Stored config override is corrupt, keeping file values");
                    self
                }
            },
            None => self,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.base_url, "https://linux.do");
        assert_eq!(config.polling_interval_secs, 30);
        assert!(!config.low_data_mode);
        assert!(config.block_categories.is_empty());
        assert_eq!(config.read_status_action, ReadStatusAction::Fade);
        assert!(config.sync_read_status);
    }

    #[test]
    fn test_missing_file_returns_default() {
        let path = Path::new("/tmp/lurker_test_nonexistent_config.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config.base_url, "https://linux.do");
    }

    #[test]
    fn test_empty_file_returns_default() {
        let dir = std::env::temp_dir().join("lurker_config_test_empty");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.polling_interval_secs, 30);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_partial_config_uses_defaults_for_missing() {
        let dir = std::env::temp_dir().join("lurker_config_test_partial");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "polling_interval_secs = 120\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.polling_interval_secs, 120);
        assert_eq!(config.base_url, "https://linux.do"); // default
        assert!(config.sync_read_status); // default

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_full_config() {
        let dir = std::env::temp_dir().join("lurker_config_test_full");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");

        let content = r#"
base_url = "https://forum.example.com"
polling_interval_secs = 60
low_data_mode = true
block_categories = ["gossip", "welfare"]
keyword_blacklist = "spam, lottery"
quality_filter = true
read_status_action = "hide"
notify_keywords = "ai, rust"
sync_read_status = false
"#;
        std::fs::write(&path, content).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.base_url, "https://forum.example.com");
        assert_eq!(config.polling_interval_secs, 60);
        assert!(config.low_data_mode);
        assert_eq!(config.block_categories, vec!["gossip", "welfare"]);
        assert_eq!(config.keyword_blacklist, "spam, lottery");
        assert!(config.quality_filter);
        assert_eq!(config.read_status_action, ReadStatusAction::Hide);
        assert_eq!(config.notify_keywords, "ai, rust");
        assert!(!config.sync_read_status);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let dir = std::env::temp_dir().join("lurker_config_test_invalid");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "this is not [valid toml").unwrap();

        let result = Config::load(&path);
        assert!(matches!(result.unwrap_err(), ConfigError::Parse(_)));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let dir = std::env::temp_dir().join("lurker_config_test_unknown");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "base_url = \"https://x.example\"\ntotally_fake = 42\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.base_url, "https://x.example");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_wrong_type_returns_error() {
        let dir = std::env::temp_dir().join("lurker_config_test_wrongtype");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "polling_interval_secs = \"soon\"\n").unwrap();

        assert!(Config::load(&path).is_err());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_too_large_file_rejected() {
        let dir = std::env::temp_dir().join("lurker_config_test_too_large");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "a".repeat(1_048_577)).unwrap();

        assert!(matches!(Config::load(&path).unwrap_err(), ConfigError::TooLarge(_)));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_stored_override_wins_over_file_values() {
        let file = Config::default();
        let stored = Config {
            quality_filter: true,
            notify_keywords: "ai".to_string(),
            ..Config::default()
        };
        let json = serde_json::to_string(&stored).unwrap();

        let merged = file.apply_stored_override(Some(&json));
        assert!(merged.quality_filter);
        assert_eq!(merged.notify_keywords, "ai");
    }

    #[test]
    fn test_corrupt_stored_override_ignored() {
        let merged = Config::default().apply_stored_override(Some("not json {{"));
        assert!(!merged.quality_filter);
        assert_eq!(merged.base_url, "https://linux.do");
    }
}
