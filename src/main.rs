//! Dice-Harvest main entry point
//!
//! This is the command-line interface for the Dice-Harvest job crawler.

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use dice_harvest::config::{load_config_with_hash, Config, StoreBackend};
use dice_harvest::crawler::{build_http_client, DetailFetcher, HttpDetailFetcher, HttpPageLoader};
use dice_harvest::ingest::{IngestOrchestrator, IngestSettings, RunReport};
use dice_harvest::output::{load_statistics, print_statistics, record_to_json};
use dice_harvest::storage::{JsonFileStore, RunRecord, SqliteStore, Store};
use dice_harvest::HarvestError;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Dice-Harvest: an incremental job-listing crawler
///
/// Dice-Harvest walks the result pages of every configured search, fetches
/// only the postings it has not stored yet, and tags every posting with the
/// searches that found it.
#[derive(Parser, Debug)]
#[command(name = "dice-harvest")]
#[command(version)]
#[command(about = "An incremental job-listing crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show the searches that would run
    #[arg(long, conflicts_with_all = ["stats", "scrape_url"])]
    dry_run: bool,

    /// Show statistics from the configured store and exit
    #[arg(long, conflicts_with_all = ["dry_run", "scrape_url"])]
    stats: bool,

    /// Scrape a single job detail page, print it as JSON and exit
    #[arg(long, value_name = "URL", conflicts_with_all = ["dry_run", "stats"])]
    scrape_url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config)?;
    } else if cli.stats {
        handle_stats(&config)?;
    } else if let Some(url) = &cli.scrape_url {
        handle_scrape_url(&config, url).await?;
    } else {
        handle_ingest(config, config_hash).await?;
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
            0 => EnvFilter::new("dice_harvest=info,warn"),
            1 => EnvFilter::new("dice_harvest=debug,info"),
            2 => EnvFilter::new("dice_harvest=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== Dice-Harvest Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Page delay: {}ms", config.crawler.page_delay_ms);
    println!("  Item delay: {}ms", config.crawler.item_delay_ms);
    println!(
        "  Checkpoint every: {} records",
        config.crawler.checkpoint_interval
    );
    println!("  Page timeout: {}s", config.crawler.page_timeout_secs);

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nOutput:");
    match config.output.backend {
        StoreBackend::Sqlite => println!("  SQLite database: {}", config.output.database_path),
        StoreBackend::Json => println!("  JSON corpus: {}", config.output.json_path),
    }

    let queries = config.search_queries()?;
    println!("\nSearches ({}):", queries.len());
    for query in &queries {
        let url = query.search_url(&config.source.base_url)?;
        println!("  - {}", url);
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would run {} searches", queries.len());

    Ok(())
}

/// Handles the --stats mode: shows statistics from the configured store
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let stats = match config.output.backend {
        StoreBackend::Sqlite => {
            println!("Database: {}\n", config.output.database_path);
            let store = SqliteStore::new(Path::new(&config.output.database_path))?;
            load_statistics(&store)?
        }
        StoreBackend::Json => {
            println!("Corpus: {}\n", config.output.json_path);
            let store = JsonFileStore::new(&config.output.json_path)?;
            load_statistics(&store)?
        }
    };

    print_statistics(&stats);
    Ok(())
}

/// Handles the --scrape-url mode: fetches one detail page and prints it
async fn handle_scrape_url(config: &Config, url: &str) -> anyhow::Result<()> {
    let client = build_http_client(
        &config.user_agent,
        Duration::from_secs(config.crawler.page_timeout_secs),
    )?;
    let fetcher = HttpDetailFetcher::new(client, &config.source.base_url);

    let record = fetcher
        .fetch(url)
        .await
        .with_context(|| format!("Failed to scrape {}", url))?;
    println!("{}", record_to_json(&record)?);

    Ok(())
}

/// Handles the main ingest operation
async fn handle_ingest(config: Config, config_hash: String) -> anyhow::Result<()> {
    match config.output.backend {
        StoreBackend::Sqlite => {
            tracing::info!("Using SQLite store at {}", config.output.database_path);
            let store = SqliteStore::new(Path::new(&config.output.database_path))?;
            run_with_store(&config, &config_hash, store).await
        }
        StoreBackend::Json => {
            tracing::info!("Using JSON corpus at {}", config.output.json_path);
            let store = JsonFileStore::new(&config.output.json_path)?;
            run_with_store(&config, &config_hash, store).await
        }
    }
}

/// Runs every configured search against one store
async fn run_with_store<S: Store>(
    config: &Config,
    config_hash: &str,
    store: S,
) -> anyhow::Result<()> {
    let queries = config.search_queries()?;
    tracing::info!("Running {} searches", queries.len());

    let client = build_http_client(
        &config.user_agent,
        Duration::from_secs(config.crawler.page_timeout_secs),
    )?;
    let loader = HttpPageLoader::new(client.clone());
    let fetcher = HttpDetailFetcher::new(client, &config.source.base_url);

    let mut orchestrator =
        IngestOrchestrator::new(loader, fetcher, store, IngestSettings::from_config(config));

    let mut reports: Vec<RunReport> = Vec::new();
    let mut failed_queries: Vec<String> = Vec::new();

    for query in &queries {
        let started_at = Utc::now().to_rfc3339();

        match orchestrator.run(query).await {
            Ok(report) => {
                if let Err(e) = orchestrator
                    .store_mut()
                    .record_run(&report.to_run_record(config_hash))
                {
                    tracing::warn!("Could not record run for '{}': {}", report.query, e);
                }
                reports.push(report);
            }
            Err(HarvestError::Checkpoint {
                query: token,
                pending,
                source,
            }) => {
                tracing::error!(
                    "Query '{}' lost {} unsaved records: {}",
                    token,
                    pending,
                    source
                );
                let run = RunRecord::failed(
                    &token,
                    config_hash,
                    &started_at,
                    &Utc::now().to_rfc3339(),
                );
                if let Err(e) = orchestrator.store_mut().record_run(&run) {
                    tracing::warn!("Could not record failed run for '{}': {}", token, e);
                }
                failed_queries.push(token);
            }
            Err(e) => {
                tracing::error!("Ingest aborted: {}", e);
                return Err(e.into());
            }
        }
    }

    print_run_summary(&reports);

    if !failed_queries.is_empty() {
        anyhow::bail!(
            "{} of {} searches could not be checkpointed: {}",
            failed_queries.len(),
            queries.len(),
            failed_queries.join(", ")
        );
    }

    Ok(())
}

fn print_run_summary(reports: &[RunReport]) {
    println!("\n=== Ingest Summary ===\n");
    for report in reports {
        println!("{}", report.query);
        println!(
            "  Pages: {}{} ({} failed)",
            report.total_pages,
            if report.pages_degraded { " (fallback)" } else { "" },
            report.failed_pages.len()
        );
        println!(
            "  Links: {} collected, {} known, {} new",
            report.links_collected, report.known, report.to_fetch
        );
        println!(
            "  Stored: {} inserted, {} tagged, {} skipped",
            report.new_records,
            report.tagged_records,
            report.skipped.len()
        );
    }

    let new_total: usize = reports.iter().map(|r| r.new_records).sum();
    let tagged_total: usize = reports.iter().map(|r| r.tagged_records).sum();
    println!(
        "\n✓ {} searches, {} new records, {} tag updates",
        reports.len(),
        new_total,
        tagged_total
    );
}
