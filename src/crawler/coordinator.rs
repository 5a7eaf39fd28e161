//! Crawl coordinator - wires discovery, scheduler, and output together
//!
//! This module contains the entry point of a run:
//! - Preparing the output directory before anything is fetched
//! - Building the HTTP clients
//! - Starting discovery on its own task
//! - Running the scheduler until the store drains
//! - Writing the broken-urls report

use crate::config::{validate, Config};
use crate::crawler::events::spawn_discovery;
use crate::crawler::fetcher::{build_discovery_client, build_http_client};
use crate::crawler::scheduler::{RunSummary, Scheduler, SchedulerSettings};
use crate::discovery::Discovery;
use crate::output::{write_broken_urls, BodySink};
use crate::target::QueueTargetStore;
use crate::SwarmError;
use std::path::Path;
use tokio::io::AsyncRead;

/// Options of a run that do not come from the configuration file
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Refresh the progress line on stdout
    pub show_progress: bool,

    /// Fingerprint of the configuration, stamped into the report
    pub config_hash: Option<String>,
}

/// Runs a complete crawl over the URLs found in `input`
///
/// This is the main entry point for starting a run. It will:
/// 1. Validate the configuration and create the output directory; failure
///    aborts before any request
/// 2. Build the HTTP clients, pointed at the configured nameserver if any
/// 3. Discover URLs from `input` on a separate task
/// 4. Dispatch, fetch, and classify until nothing is queued or running
/// 5. Write the broken-urls report if requested
///
/// # Arguments
///
/// * `config` - The configuration, validated again here
/// * `input` - Sitemap, sitemap index, or plain-text URL list
/// * `options` - Progress display and config fingerprint
///
/// # Returns
///
/// * `Ok(RunSummary)` - The run drained
/// * `Err(SwarmError)` - The run was aborted
pub async fn run_crawl<R>(
    config: Config,
    input: R,
    options: RunOptions,
) -> Result<RunSummary, SwarmError>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    validate(&config)?;
    let sink = BodySink::prepare(&config.output)?;

    if let Some(resolver) = &config.http.dns_resolver {
        tracing::info!("Resolving hostnames through nameserver {}", resolver);
    }

    let client = build_http_client(&config.http)?;
    let discovery_client = build_discovery_client(&config.http)?;
    let settings = SchedulerSettings::from_config(&config.crawler, options.show_progress)?;
    let store = QueueTargetStore::new(config.crawler.concurrency);

    let scheduler = Scheduler::new(settings, store, client, sink);
    let discovery = spawn_discovery(
        Discovery::new(discovery_client),
        input,
        scheduler.events(),
    );

    let result = scheduler.run().await;
    if result.is_err() {
        discovery.abort();
    }
    let summary = result?;

    if config.output.broken_urls {
        write_broken_urls(
            Path::new(&config.output.destination),
            &summary.stats,
            options.config_hash.as_deref(),
        )?;
    }

    Ok(summary)
}
