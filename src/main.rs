//! Result-Relay main entry point
//!
//! This is the command-line interface for the Result-Relay result retriever.

use clap::Parser;
use result_relay::config::{load_config_with_hash, Config};
use result_relay::{Board, Exam, ResultFetcher, ResultQuery};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Result-Relay: a resilient examination result retriever
///
/// Result-Relay looks up a student's result on the education-board website,
/// retrying across several strategies and fallback sources, and prints the
/// normalized record as JSON.
#[derive(Parser, Debug)]
#[command(name = "result-relay")]
#[command(version = "1.0.0")]
#[command(about = "A resilient examination result retriever", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Education board, e.g. dhaka
    #[arg(long)]
    board: Board,

    /// Examination, e.g. ssc
    #[arg(long)]
    exam: Exam,

    /// Roll number
    #[arg(long)]
    roll: String,

    /// Registration number
    #[arg(long)]
    reg: String,

    /// Optional institution identification number
    #[arg(long)]
    eiin: Option<String>,

    /// Print the health report after the lookup
    #[arg(long)]
    report: bool,

    /// Validate config and query without contacting the result server
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

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

    let query = ResultQuery::new(
        cli.board,
        cli.exam,
        &cli.roll,
        &cli.reg,
        cli.eiin.as_deref(),
    )?;

    if cli.dry_run {
        handle_dry_run(&config, &query);
        return Ok(());
    }

    handle_lookup(config, &query, cli.report).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("result_relay=info,warn"),
            1 => EnvFilter::new("result_relay=debug,info"),
            2 => EnvFilter::new("result_relay=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    // Logs go to stderr so stdout carries only the JSON record
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows what would be requested
fn handle_dry_run(config: &Config, query: &ResultQuery) {
    println!("=== Result-Relay Dry Run ===\n");

    println!("Query:");
    println!("  Board: {} ({})", query.board(), query.board().upstream_label());
    println!("  Exam: {} ({})", query.exam(), query.exam().upstream_label());
    println!("  Roll: {}", query.roll());
    println!("  Registration: {}", query.registration());
    println!("  EIIN: {}", query.eiin().unwrap_or("-"));
    println!("  Cache key: {}", query.cache_key());

    println!("\nUpstream:");
    println!("  Form: {}", config.fetcher.form_url());
    println!("  Alternate: {}", config.fetcher.alternate_url());

    println!("\nFallback Sources ({}):", config.fetcher.fallback_urls.len());
    for url in &config.fetcher.fallback_urls {
        println!("  - {}", url);
    }

    println!("\nRetry backoff: {:?} ms", config.retry.backoff_ms);
    println!(
        "Cache: {}h TTL, {} entries max",
        config.cache.ttl_hours, config.cache.max_entries
    );

    println!("\n✓ Configuration is valid");
}

/// Handles a lookup: prints the record, then optionally the health report
async fn handle_lookup(
    config: Config,
    query: &ResultQuery,
    report: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let fetcher = ResultFetcher::new(config)?;
    let outcome = fetcher.fetch_result(query).await;

    match &outcome {
        Ok(record) => println!("{}", serde_json::to_string_pretty(record)?),
        Err(e) => eprintln!("✗ {}", e),
    }

    if report {
        println!("{}", serde_json::to_string_pretty(&fetcher.health_report())?);
    }

    outcome.map(|_| ()).map_err(Into::into)
}
