//! Sonar-Sweep main entry point
//!
//! This is the command-line interface for the Sonar-Sweep id-space crawler.

use clap::{ArgAction, Parser};
use sonar_sweep::api::{build_http_client, ApiClient, HttpApiClient};
use sonar_sweep::config::{load_config_with_hash, Backend, Config};
use sonar_sweep::crawler::{crawl, spawn_signal_listener, CrawlContext, CrawlOptions};
use sonar_sweep::output::{load_statistics, print_crawl_summary, print_statistics};
use sonar_sweep::writer::{BatchRecordWriter, RecordWriter, SqliteRecordWriter};
use sonar_sweep::{BatchStore, DurableQueue, MemoryStore, RedisStore, SweepError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Default highest playlist id
const DEFAULT_MAX_PLAYLIST_ID: u64 = 40_000_000;

/// Sonar-Sweep: a resumable id-space crawler
///
/// Sonar-Sweep walks every track id, then every playlist id, of the content
/// API and stores records, relationship lists and counters. Progress is kept
/// in a durable queue so an interrupted crawl can be resumed.
#[derive(Parser, Debug)]
#[command(name = "sonar-sweep")]
#[command(version = "1.0.0")]
#[command(about = "A resumable id-space crawler", long_about = None)]
struct Cli {
    /// Path to JSON configuration file
    #[arg(long, value_name = "PATH")]
    config: PathBuf,

    /// Highest playlist id to crawl
    #[arg(long, value_name = "MAX_ID", default_value_t = DEFAULT_MAX_PLAYLIST_ID)]
    playlist: u64,

    /// Reset the queue and re-initialize every batch before crawling
    #[arg(long, value_name = "BOOL", default_value_t = true, action = ArgAction::Set)]
    empty: bool,

    /// Move batches left in-flight by an interrupted run back to pending
    #[arg(long, value_name = "BOOL", default_value_t = false, action = ArgAction::Set)]
    restart: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Show queue and record statistics and exit
    #[arg(long)]
    stats: bool,
}

/// Queue and record writer of the configured backend
struct Backends {
    queue: DurableQueue,
    writer: Arc<dyn RecordWriter>,
    sqlite: Option<Arc<SqliteRecordWriter>>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    let backends = match open_backends(&config).await {
        Ok(b) => b,
        Err(e) => {
            tracing::error!("Failed to open the {:?} backend: {}", config.backend, e);
            return Err(e.into());
        }
    };

    if cli.stats {
        handle_stats(&backends).await?;
    } else {
        handle_crawl(&cli, &config, backends).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sonar_sweep=info,warn"),
            1 => EnvFilter::new("sonar_sweep=debug,info"),
            2 => EnvFilter::new("sonar_sweep=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Connects to the store and builds the record writer of the configured backend
async fn open_backends(config: &Config) -> Result<Backends, SweepError> {
    match config.backend {
        Backend::Redis => {
            let url = config.redis_url();
            tracing::info!("Connecting to store at {}", url);
            let store = Arc::new(RedisStore::connect(&url).await?);
            Ok(Backends {
                queue: DurableQueue::new(store.clone()),
                writer: Arc::new(BatchRecordWriter::new(BatchStore::new(store))),
                sqlite: None,
            })
        }
        Backend::Sqlite => {
            let path = config.sqlite_path();
            tracing::info!("Opening database at {}", path);
            let writer = Arc::new(SqliteRecordWriter::new(Path::new(&path))?);
            Ok(Backends {
                queue: DurableQueue::new(Arc::new(MemoryStore::new())),
                writer: writer.clone(),
                sqlite: Some(writer),
            })
        }
    }
}

/// Handles the --stats mode: shows queue and record statistics
async fn handle_stats(backends: &Backends) -> Result<(), Box<dyn std::error::Error>> {
    let stats = load_statistics(&backends.queue, backends.sqlite.as_deref()).await?;
    print_statistics(&stats);
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(
    cli: &Cli,
    config: &Config,
    backends: Backends,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = build_http_client()?;
    let api = Arc::new(HttpApiClient::new(client, &config.api_base, &config.client_id));

    // The track id-space ends at the newest upload
    let max_track_id = match api.high_track_id().await {
        Ok(id) => id,
        Err(e) => {
            tracing::error!("Failed to discover the highest track id: {}", e);
            return Err(e.into());
        }
    };
    tracing::info!(
        "Crawling tracks up to {} and playlists up to {}",
        max_track_id,
        cli.playlist
    );

    if cli.empty {
        tracing::info!("Starting fresh crawl (re-initializing every batch)");
    } else if cli.restart {
        tracing::info!("Resuming crawl (recovering in-flight batches)");
    } else {
        tracing::info!("Continuing crawl with the existing queue");
    }

    let shutdown = CancellationToken::new();
    let listener = spawn_signal_listener(shutdown.clone());

    let ctx = CrawlContext::new(backends.queue, backends.writer, api, shutdown.clone());
    let options = CrawlOptions {
        fresh: cli.empty,
        restart: cli.restart,
        max_track_id,
        max_playlist_id: cli.playlist,
        workers: config.worker_count(),
    };

    let result = crawl(ctx, options).await;

    // Stop the signal listener
    shutdown.cancel();
    let _ = listener.await;

    match result {
        Ok(summary) => {
            print_crawl_summary(&summary);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
