//! headlines CLI
//!
//! Runs ingests against the configured feed and inspects the local store.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use headlines::{
    error::{AppError, Result},
    feed::{FeedView, Thumbnail},
    models::{Config, IngestOutcome},
    pipeline::{Ingestor, Normalizer},
    services::{HttpImageFetcher, NewsApiClient, TcpProbe},
    storage::LocalStorage,
};
use tokio::sync::mpsc;

/// headlines - news feed ingester
#[derive(Parser, Debug)]
#[command(
    name = "headlines",
    version,
    about = "Fetches a headline feed into a local article store"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "headlines.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch the feed once and replace the stored articles
    Ingest,

    /// Print stored articles grouped by source
    List,

    /// Fetch thumbnails for every stored article
    Thumbnails,

    /// Ingest periodically until interrupted
    Watch {
        /// Seconds between ingests (default: schedule.interval_secs)
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Delete the article at a display position
    Delete { position: usize },

    /// Remove every stored article
    Clear,

    /// Validate the configuration file
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn build_ingestor(config: &Config, store: Arc<LocalStorage>) -> Result<Ingestor> {
    Ok(Ingestor::new(
        Arc::new(NewsApiClient::from_config(config)?),
        store,
        Arc::new(TcpProbe::from_config(config)?),
        Normalizer::from_config(&config.normalize),
    ))
}

fn report(outcome: &IngestOutcome) {
    if outcome.is_success() {
        log::info!("{}", outcome);
    } else {
        log::error!("{}", outcome);
    }
}

async fn open_store(config: &Config) -> Result<Arc<LocalStorage>> {
    let store = LocalStorage::open(config.storage.path.clone()).await?;
    log::debug!("Using store at {}", store.path().display());
    Ok(Arc::new(store))
}

async fn open_view(config: &Config) -> Result<FeedView> {
    let ingestor = build_ingestor(config, open_store(config).await?)?;
    let fetcher = Arc::new(HttpImageFetcher::from_config(&config.http)?);
    let mut view = FeedView::new(Arc::new(ingestor), fetcher);
    view.refresh().await?;
    Ok(view)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load_or_default(&cli.config);
    config.apply_env();

    match cli.command {
        Command::Ingest => {
            config.validate()?;
            let store = open_store(&config).await?;
            let ingestor = build_ingestor(&config, store)?;
            let outcome = ingestor.ingest(config.query()?).await;
            report(&outcome);
            if !outcome.is_success() {
                std::process::exit(1);
            }
        }

        Command::List => {
            let view = open_view(&config).await?;
            if view.is_empty() {
                log::info!("No articles stored yet. Run 'ingest' first.");
            }
            for section in view.sections() {
                println!("== {} ==", section.name);
                for position in section.rows {
                    let Some(article) = view.row(position) else {
                        continue;
                    };
                    let link = article.url.as_ref().map(|u| u.as_str()).unwrap_or("-");
                    let image = if article.image.is_some() { "*" } else { " " };
                    println!("{:>3} {} {}  {}", position, image, article.display_title(), link);
                }
            }
        }

        Command::Thumbnails => {
            let mut view = open_view(&config).await?;
            let mut stored = 0;
            for position in 0..view.len() {
                if let Thumbnail::Stored(_) = view.thumbnail(position) {
                    stored += 1;
                }
            }
            log::info!(
                "Requested {} thumbnails ({} already stored)",
                view.pending(),
                stored
            );

            let mut accepted = 0;
            while let Some(ok) = view.next_completion().await? {
                if ok {
                    accepted += 1;
                }
            }
            log::info!("Stored {} thumbnails", accepted);
        }

        Command::Watch { interval } => {
            config.validate()?;
            let every = Duration::from_secs(interval.unwrap_or(config.schedule.interval_secs));
            if every.is_zero() {
                return Err(AppError::validation("--interval must be > 0"));
            }
            let store = open_store(&config).await?;
            let ingestor = Arc::new(build_ingestor(&config, store)?);
            let (tx, mut rx) = mpsc::channel(4);
            let task = Arc::clone(&ingestor).spawn_periodic(config.query()?, every, tx)?;
            log::info!("Ingesting every {}s; press Ctrl-C to stop", every.as_secs());

            loop {
                tokio::select! {
                    outcome = rx.recv() => match outcome {
                        Some(outcome) => report(&outcome),
                        None => break,
                    },
                    _ = tokio::signal::ctrl_c() => {
                        log::info!("Stopping");
                        break;
                    }
                }
            }
            task.abort();
        }

        Command::Delete { position } => {
            let mut view = open_view(&config).await?;
            if !view.delete_row(position).await? {
                return Err(AppError::validation(format!(
                    "no article at position {position} (store has {})",
                    view.len()
                )));
            }
            log::info!("{} articles remain", view.len());
        }

        Command::Clear => {
            let ingestor = build_ingestor(&config, open_store(&config).await?)?;
            ingestor.clear().await?;
        }

        Command::Validate => {
            log::info!("Validating {}...", cli.config.display());
            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK");
        }
    }

    Ok(())
}
