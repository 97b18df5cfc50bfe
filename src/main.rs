//! Listing-Ripple main entry point
//!
//! This is the command-line interface for the Listing-Ripple harvester.

use anyhow::Context;
use clap::{Parser, Subcommand};
use listing_ripple::config::{load_config_with_hash, Config};
use listing_ripple::crawler::{crawl, parse_seeds};
use listing_ripple::output::{print_crawl_report, print_processing_report, write_crawl_summary};
use listing_ripple::processing::{process, processed_dir};
use listing_ripple::{ListingId, Source};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Listing-Ripple: a polite recommendation-graph harvester
///
/// Listing-Ripple follows the "related listings" recommendations of a
/// real-estate API from a few seed listings, stores every response verbatim,
/// and turns the stored snapshots into a deduplicated dataset.
#[derive(Parser, Debug)]
#[command(name = "listing-ripple")]
#[command(version = "1.0.0")]
#[command(about = "A polite recommendation-graph harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG", default_value = "ripple.toml")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Harvest raw snapshots by following recommendations from the seeds
    Crawl {
        /// Seed listing id (repeatable); replaces the configured seeds
        #[arg(short, long = "seed", value_name = "LISTING_ID")]
        seeds: Vec<ListingId>,

        /// Stop after this many listings were fetched
        #[arg(long)]
        max_visits: Option<u32>,

        /// Directory for raw snapshots
        #[arg(long)]
        raw_root: Option<String>,

        /// Also write a markdown summary of the session to this path
        #[arg(long, value_name = "PATH")]
        summary: Option<PathBuf>,
    },

    /// Normalize one source's stored snapshots into its processed dataset
    Process {
        /// Source to process (defaults to the configured source)
        #[arg(long)]
        source: Option<Source>,

        /// Directory holding raw snapshots
        #[arg(long)]
        raw_root: Option<String>,

        /// Directory for the dataset files
        #[arg(long)]
        processed_root: Option<String>,
    },

    /// Validate config and show what would be crawled without fetching anything
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e).with_context(|| format!("loading {}", cli.config.display()));
        }
    };

    match cli.command {
        Command::Crawl {
            seeds,
            max_visits,
            raw_root,
            summary,
        } => {
            if max_visits.is_some() {
                config.crawler.max_visits = max_visits;
            }
            if let Some(raw_root) = raw_root {
                config.output.raw_root = raw_root;
            }
            handle_crawl(&config, seeds, config_hash, summary).await
        }
        Command::Process {
            source,
            raw_root,
            processed_root,
        } => {
            if let Some(source) = source {
                config.source.kind = source;
            }
            if let Some(raw_root) = raw_root {
                config.output.raw_root = raw_root;
            }
            if let Some(processed_root) = processed_root {
                config.output.processed_root = processed_root;
            }
            handle_process(&config).await
        }
        Command::Check => {
            handle_check(&config, &config_hash);
            Ok(())
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("listing_ripple=info,warn"),
            1 => EnvFilter::new("listing_ripple=debug,info"),
            2 => EnvFilter::new("listing_ripple=trace,debug"),
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

/// Handles the check command: validates config and shows what would be crawled
fn handle_check(config: &Config, config_hash: &str) {
    println!("=== Listing-Ripple Check ===\n");

    println!("Crawler Configuration:");
    println!("  Strategy: {}", config.crawler.strategy);
    match config.crawler.max_visits {
        Some(max) => println!("  Max visits: {}", max),
        None => println!("  Max visits: unbounded"),
    }
    println!(
        "  Retries: {} (backoff {}ms..{}ms)",
        config.crawler.max_retries, config.crawler.retry_base_delay_ms, config.crawler.retry_max_delay_ms
    );
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);
    println!(
        "  Delay between fetches: {}ms..{}ms",
        config.pacer.min_delay_ms, config.pacer.max_delay_ms
    );

    println!("\nSource:");
    println!("  Kind: {}", config.source.kind);
    println!("  API: {}", config.source.api_base_url);
    println!("  Headers: {}", config.source.headers.len());
    println!("  Seeds ({}):", config.source.seeds.len());
    for seed in &config.source.seeds {
        println!("    * {}", seed);
    }

    println!("\nFilter:");
    println!("  Allowed categories: {}", config.filter.allowed_categories.join(", "));
    println!(
        "  Denied gallery titles: {}",
        config.filter.denied_gallery_titles.join(", ")
    );

    println!("\nOutput:");
    println!("  Raw snapshots: {}", config.output.raw_root);
    println!("  Processed dataset: {}", config.output.processed_root);
    let formats: Vec<String> = config.output.formats.iter().map(|f| f.to_string()).collect();
    println!("  Formats: {}", formats.join(", "));

    println!("\n✓ Configuration is valid (hash: {})", config_hash);
    println!(
        "✓ Would start crawling with {} seed listings",
        config.source.seeds.len()
    );
}

/// Handles the crawl command, cancelling cleanly on Ctrl-C
async fn handle_crawl(
    config: &Config,
    seeds: Vec<ListingId>,
    config_hash: String,
    summary: Option<PathBuf>,
) -> anyhow::Result<()> {
    let seeds = if seeds.is_empty() {
        parse_seeds(&config.source.seeds)
    } else {
        seeds
    };
    anyhow::ensure!(!seeds.is_empty(), "no seed listings configured or given");
    tracing::info!("Total seed listings: {}", seeds.len());

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing the current listing");
            on_signal.cancel();
        }
    });

    let mut report = match crawl(seeds, config, cancel).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            return Err(e.into());
        }
    };
    report.config_hash = Some(config_hash);

    print_crawl_report(&report);

    if let Some(path) = summary {
        write_crawl_summary(&report, &path)
            .with_context(|| format!("writing crawl summary to {}", path.display()))?;
        println!("✓ Summary written to: {}", path.display());
    }

    if let Some(reason) = report.aborted {
        anyhow::bail!("crawl stopped early: {}", reason);
    }

    Ok(())
}

/// Handles the process command
async fn handle_process(config: &Config) -> anyhow::Result<()> {
    tracing::info!(
        "Processing {} snapshots from {} into {}",
        config.source.kind,
        config.output.raw_root,
        processed_dir(config).display()
    );

    match process(config).await {
        Ok(report) => {
            print_processing_report(&report);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Processing failed: {}", e);
            Err(e.into())
        }
    }
}
