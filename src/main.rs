//! Gallery-Mirror main entry point
//!
//! This is the command-line interface for the Gallery-Mirror downloader.

use anyhow::Context;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use gallery_mirror::config::{
    default_config_directory, load_config_with_hash, validate, Config, CONFIG_FILE_NAME,
};
use gallery_mirror::crawler::run_mirror;
use gallery_mirror::output::{load_statistics, print_statistics};
use gallery_mirror::storage::open_ledger;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Exit status when help is shown instead of running
const EXIT_HELP: u8 = 3;

/// Gallery-Mirror: an incremental gallery downloader
///
/// Walks the listings of the given artists and downloads every submission
/// not downloaded by an earlier run.
#[derive(Parser, Debug)]
#[command(name = "gallery-mirror")]
#[command(version = "1.0.0")]
#[command(about = "An incremental gallery downloader", long_about = None)]
struct Cli {
    /// Artists to mirror, as they appear in listing URLs
    #[arg(value_name = "ARTIST")]
    artists: Vec<String>,

    /// Scan the artists' galleries
    #[arg(long, overrides_with = "no_gallery")]
    gallery: bool,

    #[arg(long, overrides_with = "gallery", hide = true)]
    no_gallery: bool,

    /// Scan the artists' favorites
    #[arg(long, overrides_with = "no_favorites")]
    favorites: bool,

    #[arg(long, overrides_with = "favorites", hide = true)]
    no_favorites: bool,

    /// Scan the artists' scraps
    #[arg(long, overrides_with = "no_scraps")]
    scraps: bool,

    #[arg(long, overrides_with = "scraps", hide = true)]
    no_scraps: bool,

    /// Keep paginating even when a listing page has nothing new
    #[arg(long)]
    no_fast_scan: bool,

    /// Directory holding config.toml, the ledger and cookies
    #[arg(long, value_name = "DIR")]
    config_dir: Option<PathBuf>,

    /// Directory receiving downloaded images
    #[arg(long, value_name = "DIR")]
    download_dir: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Show statistics from the ledger and exit
    #[arg(long)]
    stats: bool,
}

impl Cli {
    /// Applies command-line overrides on top of the file configuration
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(enabled) = flag_pair(self.gallery, self.no_gallery) {
            config.crawler.gallery = enabled;
        }
        if let Some(enabled) = flag_pair(self.favorites, self.no_favorites) {
            config.crawler.favorites = enabled;
        }
        if let Some(enabled) = flag_pair(self.scraps, self.no_scraps) {
            config.crawler.scraps = enabled;
        }
        if self.no_fast_scan {
            config.crawler.fast_scan = false;
        }
        if let Some(dir) = &self.download_dir {
            config.paths.download_directory = dir.clone();
        }
    }
}

/// Resolves a `--x`/`--no-x` pair; `None` when neither was given
fn flag_pair(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                let _ = e.print();
                return ExitCode::from(EXIT_HELP);
            }
            _ => e.exit(),
        },
    };

    if cli.artists.is_empty() && !cli.stats {
        let _ = Cli::command().print_help();
        return ExitCode::from(EXIT_HELP);
    }

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config_dir = cli.config_dir.clone().unwrap_or_else(default_config_directory);
    let config_path = config_dir.join(CONFIG_FILE_NAME);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", config_path.display());
    let (mut config, hash) = load_config_with_hash(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    match hash {
        Some(hash) => tracing::info!("Configuration loaded successfully (hash: {})", hash),
        None => tracing::info!("No configuration file, using defaults"),
    }

    config.paths.config_directory = config_dir;
    cli.apply_overrides(&mut config);
    validate(&config)?;

    if cli.stats {
        return handle_stats(&config);
    }

    handle_mirror(config, &cli.artists).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("gallery_mirror=info,warn"),
            1 => EnvFilter::new("gallery_mirror=debug,info"),
            2 => EnvFilter::new("gallery_mirror=trace,debug"),
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

/// Handles the --stats mode: shows statistics from the ledger
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let ledger_path = config.ledger_path();
    println!("Ledger: {}\n", ledger_path.display());

    let ledger = open_ledger(&ledger_path)
        .with_context(|| format!("Failed to open ledger {}", ledger_path.display()))?;
    let stats = load_statistics(&ledger)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main mirror operation
async fn handle_mirror(config: Config, artists: &[String]) -> anyhow::Result<()> {
    tracing::info!(
        "Mirroring {} artists into {}",
        artists.len(),
        config.paths.download_directory.display()
    );

    let stats = run_mirror(config, artists).await?;
    if stats.failed > 0 {
        tracing::warn!("{} downloads failed and will be retried next run", stats.failed);
    }
    Ok(())
}
