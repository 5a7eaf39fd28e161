//! swarmload main entry point
//!
//! This is the command-line interface for the swarmload crawler.

use clap::Parser;
use std::path::{Path, PathBuf};
use swarmload::config::{load_config_with_hash, Config};
use swarmload::crawler::{run_crawl, RunOptions};
use swarmload::output::print_statistics;
use tokio::io::AsyncRead;
use tracing_subscriber::EnvFilter;

/// swarmload: a bulk URL crawler and load generator
///
/// swarmload reads a sitemap, a sitemap index, or a plain list of URLs and
/// fetches every URL at a bounded concurrency, following redirects and
/// counting every outcome by status.
#[derive(Parser, Debug)]
#[command(name = "swarmload")]
#[command(version)]
#[command(about = "A bulk URL crawler and load generator", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Sitemap, sitemap index, or URL list; `-` reads stdin
    #[arg(value_name = "INPUT", default_value = "-")]
    input: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output, including the progress line
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show the effective settings without fetching anything
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        handle_dry_run(&config, &cli.input);
        return Ok(());
    }

    let options = RunOptions {
        show_progress: !cli.quiet,
        config_hash: Some(config_hash),
    };
    handle_crawl(config, &cli.input, options, cli.quiet).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("swarmload=info,warn"),
            1 => EnvFilter::new("swarmload=debug,info"),
            2 => EnvFilter::new("swarmload=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: prints the effective configuration
fn handle_dry_run(config: &Config, input: &Path) {
    println!("=== swarmload Dry Run ===\n");

    println!("Input: {}", describe_input(input));

    println!("\nCrawler:");
    println!("  Method: {}", config.crawler.request_method);
    println!("  Concurrency: {}", config.crawler.concurrency);
    println!("  Dispatch interval: {}ms", config.crawler.dispatch_interval_ms);
    println!("  Stat interval: {}ms", config.crawler.stat_interval_ms);
    println!(
        "  Spawn delay: {}..={}us",
        config.crawler.spawn_delay_min_us, config.crawler.spawn_delay_max_us
    );
    println!("  Redirect codes: {:?}", config.crawler.redirect_codes);
    println!("  Bonus respawn: {}%", config.crawler.bonus_respawn);

    println!("\nHTTP:");
    println!("  User agent: {}", config.http.user_agent);
    println!("  Connect timeout: {}s", config.http.connect_timeout_secs);
    println!("  Request timeout: {}s", config.http.request_timeout_secs);
    if let Some(resolver) = &config.http.dns_resolver {
        println!("  DNS resolver: {}", resolver);
    }

    println!("\nOutput:");
    println!("  Mode: {:?}", config.output.mode);
    println!("  Destination: {}", config.output.destination);
    println!("  Broken urls report: {}", config.output.broken_urls);

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: Config,
    input: &Path,
    options: RunOptions,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        "Reading URLs from {} with concurrency {}",
        describe_input(input),
        config.crawler.concurrency
    );

    let reader = open_input(input).await?;

    match run_crawl(config, reader, options).await {
        Ok(summary) => {
            tracing::info!("Run completed successfully");
            if !quiet {
                print_statistics(&summary);
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!("Run failed: {}", e);
            Err(e.into())
        }
    }
}

async fn open_input(input: &Path) -> std::io::Result<Box<dyn AsyncRead + Unpin + Send>> {
    if is_stdin(input) {
        return Ok(Box::new(tokio::io::stdin()));
    }
    let file = tokio::fs::File::open(input).await?;
    Ok(Box::new(file))
}

fn is_stdin(input: &Path) -> bool {
    input.as_os_str() == "-"
}

fn describe_input(input: &Path) -> String {
    if is_stdin(input) {
        "stdin".to_string()
    } else {
        input.display().to_string()
    }
}
