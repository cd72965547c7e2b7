//! Harvester CLI
//!
//! Local execution entry point. Every stage reads and writes JSON files in
//! the storage directory, so stages can be run one at a time.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use harvester::{
    error::Result,
    models::{Config, RepliesConfig},
    pipeline,
    services::WaybackClient,
    storage::{HarvestStorage, LocalStorage},
};

/// Wayback Machine forum harvester
#[derive(Parser, Debug)]
#[command(
    name = "harvester",
    version,
    about = "Reconstructs forum topics and reply threads from archived snapshots"
)]

struct Cli {
    /// Path to storage directory containing config.toml and the harvest files
    #[arg(short, long, default_value = "storage", global = true)]
    storage_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve the closest listing snapshot of every forum page
    Forums {
        /// Continue from the stored observation history
        #[arg(long)]
        resume: bool,
    },

    /// Parse topic rows from the resolved listing snapshots
    Topics,

    /// Rebuild reply threads of the parsed topics
    Replies {
        /// First topic index (inclusive)
        #[arg(long)]
        from: Option<usize>,

        /// Last topic index (exclusive)
        #[arg(long)]
        to: Option<usize>,

        /// Only topics whose URL matches this regex from the start
        #[arg(long)]
        url_pattern: Option<String>,
    },

    /// Run full pipeline: Forums → Topics → Replies
    Pipeline {
        /// Continue the forums stage from the stored observation history
        #[arg(long)]
        resume: bool,
    },

    /// Validate configuration and selectors
    Validate,

    /// Show storage contents
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Command line filters override the ones from the config file.
fn replies_settings(
    config: &Config,
    from: Option<usize>,
    to: Option<usize>,
    url_pattern: Option<String>,
) -> RepliesConfig {
    RepliesConfig {
        from: from.or(config.replies.from),
        to: to.or(config.replies.to),
        url_pattern: url_pattern.or_else(|| config.replies.url_pattern.clone()),
    }
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    log::info!("Harvester starting...");

    let storage = LocalStorage::new(&cli.storage_dir);
    let config_path = storage.config_path();

    if let Command::Validate = cli.command {
        pipeline::run_validate(&config_path)?;
        log::info!("All validations passed!");
        return Ok(());
    }

    let config = Config::load_or_default(&config_path);
    config.validate()?;
    log::info!("Loaded configuration from {}", cli.storage_dir.display());

    match cli.command {
        Command::Forums { resume } => {
            let client = WaybackClient::new(&config.crawler, &config.archive)?;
            pipeline::run_forums(&config, &client, &storage, resume).await?;
        }

        Command::Topics => {
            let client = WaybackClient::new(&config.crawler, &config.archive)?;
            pipeline::run_topics(&config, &client, &storage).await?;
        }

        Command::Replies {
            from,
            to,
            url_pattern,
        } => {
            let settings = replies_settings(&config, from, to, url_pattern);
            let client = WaybackClient::new(&config.crawler, &config.archive)?;
            pipeline::run_replies(&config, &client, &storage, &settings).await?;
        }

        Command::Pipeline { resume } => {
            let client = WaybackClient::new(&config.crawler, &config.archive)?;
            pipeline::run_pipeline(&config, &client, &storage, resume).await?;
        }

        Command::Validate => {}

        Command::Info => {
            log::info!("Storage directory: {}", storage.root().display());
            log::info!(
                "Config: {}",
                if config_path.exists() {
                    "config.toml"
                } else {
                    "defaults (config.toml not found)"
                }
            );

            let forums = storage.load_forums().await?;
            let available = forums.iter().filter(|r| r.available).count();
            log::info!(
                "Snapshot records: {} ({} available)",
                forums.len(),
                available
            );
            log::info!("Topics: {}", storage.load_topics().await?.len());
            log::info!("Threads: {}", storage.load_threads().await?.len());

            match storage.load_stats().await? {
                Some(stats) => log::info!(
                    "Last run: {} finished {} ({} requests, {:.0}% ok)",
                    stats.stage,
                    stats.end_time,
                    stats.requests,
                    stats.success_rate() * 100.0
                ),
                None => log::info!("No runs recorded yet."),
            }
        }
    }

    log::info!("Done!");

    Ok(())
}
