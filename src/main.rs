use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use url::Url;

use lurker::app::App;
use lurker::config::Config;
use lurker::core::categories;
use lurker::core::notify::NotificationSink;
use lurker::remote::RemoteGateway;
use lurker::storage::{keys, Storage, StorageError};
use lurker::util::text;

/// Get the config directory path (~/.config/lurker/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("lurker"))
}

#[derive(Parser, Debug)]
#[command(name = "lurker", about = "Polling topic-feed client for Discourse forums")]
struct Args {
    /// Config file path (default: ~/.config/lurker/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the forum base URL from the config
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Poll once, print the topic list, and exit
    #[arg(long)]
    once: bool,

    /// Reset database (delete and recreate)
    #[arg(long)]
    reset_db: bool,
}

/// Prints notifications to the terminal. Desktop integration would slot in
/// behind the same trait.
struct TerminalNotifier;

impl NotificationSink for TerminalNotifier {
    fn notify(&self, text: &str) {
        println!("*** New topic: {}", text);
        tracing::info!(title = text, "Notification fired");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing for debug logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    // Set up config directory
    let config_dir = get_config_dir()?;
    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;
        println!("Created config directory: {}", config_dir.display());
    }

    let config_path = args
        .config
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let db_path = config_dir.join("lurker.db");

    // Handle --reset-db flag
    if args.reset_db && db_path.exists() {
        std::fs::remove_file(&db_path).context("Failed to delete database")?;
        println!("Database reset.");
    }

    // Open database
    let db_path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    let store = match Storage::open(db_path_str).await {
        Ok(store) => store,
        Err(StorageError::InstanceLocked) => {
            eprintln!(
                "Error: Another instance of lurker appears to be running. Please close it and try again."
            );
            std::process::exit(1);
        }
        Err(e) => {
            return Err(anyhow::anyhow!("Failed to open database: {}", e));
        }
    };

    // Layer config: file on disk, then the stored override from the last
    // in-app edit, then CLI flags.
    let mut config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    let stored = store.get(keys::CONFIG).await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to read stored config override");
        None
    });
    config = config.apply_stored_override(stored.as_deref());
    if let Some(base_url) = args.base_url {
        config.base_url = base_url;
    }

    let base_url = Url::parse(&config.base_url)
        .with_context(|| format!("Invalid base URL: {}", config.base_url))?;

    let client = reqwest::Client::builder()
        .user_agent(concat!("lurker/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;
    let gateway = RemoteGateway::new(client, base_url);

    let mut app = App::load(config, gateway, store, Arc::new(TerminalNotifier)).await;
    app.seed_bookmarks().await;

    // Poll loop. --once and auto_poll=false both degrade to a single cycle.
    loop {
        match app.poll().await {
            Ok(outcome) => {
                render(&app);
                println!(
                    "  {} topics ({} new, {} unread)",
                    outcome.fetched,
                    outcome.new,
                    app.unread_count()
                );
            }
            Err(e) => {
                eprintln!("Refresh failed: {}", e);
                tracing::warn!(error = %e, "Poll cycle failed");
            }
        }

        // Interval 0 means manual refresh only, which degrades to one cycle
        // in a non-interactive run.
        let interval = app.config.polling_interval_secs;
        if args.once || !app.settings.auto_poll || interval == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_secs(interval)).await;
    }

    Ok(())
}

/// Print the projected topic list.
fn render(app: &App) {
    let now = Utc::now();
    let low_data = app.config.low_data_mode;

    for topic in app.visible_topics() {
        let read_marker = if app.is_read(topic) { ' ' } else { '*' };
        let bookmark_marker = if app.state.bookmark_ids.contains(&topic.id) {
            'B'
        } else {
            ' '
        };

        let category = topic
            .category_id
            .and_then(categories::by_id)
            .map(|c| c.name)
            .unwrap_or("-");

        if low_data {
            println!("{}{} [{}] {}", read_marker, bookmark_marker, category, topic.title);
        } else {
            println!(
                "{}{} [{}] {}  ({} views, {} replies, {})",
                read_marker,
                bookmark_marker,
                category,
                topic.title,
                text::format_count(topic.views),
                text::format_count(topic.reply_count),
                text::format_age(topic.last_activity_at, now),
            );
        }
    }
}
