//! hatebu-relay CLI
//!
//! Runs one synchronization pass per invocation; schedule it externally.

use std::path::PathBuf;

use chrono::Utc;
use clap::{Parser, Subcommand};
use hatebu_relay::{
    error::{AppError, Result},
    models::{Bookmark, Config},
    pipeline::Synchronizer,
    services::{HatenaSource, WebhookNotifier},
    storage::{BookmarkStore, LocalStorage},
    utils::http,
};

/// hatebu-relay - Hatena Bookmark comment relay
#[derive(Parser, Debug)]
#[command(
    name = "hatebu-relay",
    version,
    about = "Relays new Hatena Bookmark comments to a chat webhook"
)]

struct Cli {
    /// Path to storage directory containing bookmarks and config
    #[arg(short, long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Path to config file (default: {storage_dir}/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Relay new comments for every tracked bookmark
    Sync,

    /// Start tracking an article
    Add {
        /// Article URL (http:// or https://)
        url: String,
    },

    /// Never relay comments from this user
    Ignore { username: String },

    /// Show tracked bookmarks
    List,

    /// Validate configuration
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| cli.storage_dir.join("config.toml"));
    let config = Config::load_or_default(&config_path).with_env_overrides();
    let storage = LocalStorage::new(&cli.storage_dir);

    match cli.command {
        Command::Sync => {
            config.validate()?;

            let client = http::create_async_client(&config.http)?;
            let source = HatenaSource::new(&config.source, client.clone())?;
            let sink = WebhookNotifier::new(&config.sink, client);

            let report = Synchronizer::new(&storage, &source, &sink, &config)
                .run(Utc::now())
                .await?;

            log::info!(
                "Sync complete: {} bookmarks ({} active, {} stale, {} retired, {} skipped)",
                report.bookmarks_total,
                report.bookmarks_active,
                report.bookmarks_stale,
                report.bookmarks_retired,
                report.bookmarks_skipped
            );
            log::info!(
                "Comments: {} fetched, {} new, {} delivered, {} failed deliveries, {} unresolved",
                report.comments_fetched,
                report.survivors,
                report.delivered,
                report.delivery_failures,
                report.resolution_failures
            );
            if report.persistence_failures > 0 {
                log::warn!("{} store updates failed", report.persistence_failures);
            }
        }

        Command::Add { url } => {
            let bookmark = Bookmark::new(url.trim());
            let entry = bookmark.comment_page_url(&config.source.site_base)?;

            if storage.list().await?.iter().any(|b| b.url == bookmark.url) {
                log::warn!("Already tracking {}", bookmark.url);
                return Ok(());
            }

            storage.save(&bookmark).await?;
            log::info!("Tracking {} (comments at {})", bookmark.url, entry);
        }

        Command::Ignore { username } => {
            let username = username.trim();
            if username.is_empty() {
                return Err(AppError::validation("username is empty"));
            }
            storage.ignore(username).await?;
            log::info!("Ignoring comments from {}", username);
        }

        Command::List => {
            let bookmarks = storage.list().await?;
            for bookmark in &bookmarks {
                let watermark = if bookmark.is_synced() {
                    bookmark.watermark.to_rfc3339()
                } else {
                    "never".to_string()
                };
                log::info!(
                    "{} (last comment: {}, {} users seen)",
                    bookmark.url,
                    watermark,
                    bookmark.seen_users.len()
                );
            }
            log::info!("{} bookmarks tracked", bookmarks.len());
        }

        Command::Validate => {
            log::info!("Validating configuration from {}...", config_path.display());

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK");
        }
    }

    Ok(())
}
