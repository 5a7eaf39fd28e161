//! URL discovery: turns a seed source into targets
//!
//! The whole input is buffered first. It is then sniffed as a sitemap index,
//! a sitemap, or a plain-text list of URLs:
//!
//! - sitemap index: every listed sitemap is loaded and its `<loc>` entries
//!   are discovered; nested indexes are expanded, each location at most once
//! - sitemap (`urlset` or `sitemap` root): every `<loc>` is discovered
//! - anything else: every non-blank line is a candidate
//!
//! Candidates that are not absolute URLs are logged and dropped. Accepted
//! URLs go to a [`UrlSink`] and to every subscribed observer.

mod loader;
mod sitemap;
mod text;

pub use loader::load_external;
pub use sitemap::{parse_sitemap, SitemapDocument, SITEMAP_NAMESPACE};
pub use text::{candidate_lines, is_well_formed};

use crate::target::{QueueTargetStore, TargetStore};
use reqwest::Client;
use std::collections::{HashSet, VecDeque};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;

/// Errors raised while reading the seed source or a sub-sitemap
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("failed to read input: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to fetch {location}: {source}")]
    Fetch {
        location: String,
        source: reqwest::Error,
    },

    #[error("{location} answered with HTTP {status}")]
    Status { location: String, status: u16 },

    #[error("failed to read {location}: {source}")]
    ReadLocation {
        location: String,
        source: std::io::Error,
    },

    #[error("unsupported sitemap location scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid sitemap location: {0}")]
    InvalidLocation(String),
}

/// Receiver of accepted URLs
pub trait UrlSink {
    fn add_url(&mut self, url: String);
}

impl UrlSink for QueueTargetStore {
    fn add_url(&mut self, url: String) {
        self.add(url);
    }
}

impl UrlSink for Vec<String> {
    fn add_url(&mut self, url: String) {
        self.push(url);
    }
}

/// How the seed source was interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    SitemapIndex,
    Sitemap,
    PlainText,
}

/// Outcome of a completed discovery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoverySummary {
    /// How the input was read
    pub format: InputFormat,

    /// URLs accepted and forwarded
    pub discovered: u64,

    /// Candidates rejected by the well-formedness check
    pub dropped: u64,
}

/// Reads a seed source and feeds the URLs it finds to a sink
pub struct Discovery {
    client: Client,
    observers: Vec<mpsc::UnboundedSender<String>>,
    number_of_urls: u64,
    dropped_urls: u64,
    initialized: bool,
}

impl Discovery {
    /// Creates a discovery that loads sub-sitemaps with `client`
    pub fn new(client: Client) -> Self {
        Self {
            client,
            observers: Vec::new(),
            number_of_urls: 0,
            dropped_urls: 0,
            initialized: false,
        }
    }

    /// Registers an observer that receives every accepted URL
    ///
    /// Observers whose receiver was dropped are forgotten on the next URL.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.observers.push(tx);
        rx
    }

    /// Number of URLs accepted so far
    pub fn number_of_urls(&self) -> u64 {
        self.number_of_urls
    }

    /// Number of candidates rejected so far
    pub fn dropped_urls(&self) -> u64 {
        self.dropped_urls
    }

    /// True once the whole input has been parsed and every URL forwarded
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Buffers `input` to its end, then discovers every URL it names
    ///
    /// # Returns
    ///
    /// * `Ok(DiscoverySummary)` - Input fully processed, discovery initialized
    /// * `Err(DiscoveryError::Read)` - The input could not be read
    pub async fn ingest<R, S>(
        &mut self,
        mut input: R,
        sink: &mut S,
    ) -> Result<DiscoverySummary, DiscoveryError>
    where
        R: AsyncRead + Unpin,
        S: UrlSink,
    {
        let mut buffer = Vec::new();
        input.read_to_end(&mut buffer).await?;
        tracing::debug!("Buffered {} bytes of input", buffer.len());

        let format = self.process_buffer(&buffer, sink).await;
        self.initialized = true;

        let summary = DiscoverySummary {
            format,
            discovered: self.number_of_urls,
            dropped: self.dropped_urls,
        };
        tracing::info!(
            "Discovered {} URLs ({:?}), dropped {}",
            summary.discovered,
            summary.format,
            summary.dropped
        );
        Ok(summary)
    }

    /// Checks `candidate` and forwards it if it is well formed
    ///
    /// Returns true if the URL was accepted.
    pub fn add_url<S: UrlSink>(&mut self, candidate: &str, sink: &mut S) -> bool {
        if !is_well_formed(candidate) {
            self.dropped_urls += 1;
            tracing::debug!("Skipping invalid URL: {}", candidate);
            return false;
        }

        self.number_of_urls += 1;
        tracing::trace!("Discovered URL: {}", candidate);
        self.observers
            .retain(|observer| observer.send(candidate.to_string()).is_ok());
        sink.add_url(candidate.to_string());
        true
    }

    async fn process_buffer<S: UrlSink>(&mut self, buffer: &[u8], sink: &mut S) -> InputFormat {
        let text = String::from_utf8_lossy(buffer);

        match parse_sitemap(&text) {
            Ok(SitemapDocument::Index(locations)) => {
                tracing::info!("Input is a sitemap index with {} sitemaps", locations.len());
                self.expand_index(locations, sink).await;
                InputFormat::SitemapIndex
            }
            Ok(SitemapDocument::UrlSet(urls)) => {
                tracing::info!("Input is a sitemap with {} entries", urls.len());
                self.add_urls(&urls, sink);
                InputFormat::Sitemap
            }
            Ok(SitemapDocument::Other(root)) => {
                tracing::info!("XML root <{}> is not a sitemap, reading input as text", root);
                self.process_text(&text, sink);
                InputFormat::PlainText
            }
            Err(e) => {
                tracing::debug!("Input is not XML ({}), reading it as text", e);
                self.process_text(&text, sink);
                InputFormat::PlainText
            }
        }
    }

    async fn expand_index<S: UrlSink>(&mut self, locations: Vec<String>, sink: &mut S) {
        let mut pending: VecDeque<String> = locations.into();
        let mut visited = HashSet::new();

        while let Some(location) = pending.pop_front() {
            if !visited.insert(location.clone()) {
                tracing::debug!("Sitemap {} already expanded, skipping", location);
                continue;
            }

            let content = match load_external(&self.client, &location).await {
                Ok(content) => content,
                Err(e) => {
                    tracing::warn!("Skipping sitemap {}: {}", location, e);
                    continue;
                }
            };

            match parse_sitemap(&content) {
                Ok(SitemapDocument::UrlSet(urls)) => self.add_urls(&urls, sink),
                Ok(SitemapDocument::Index(nested)) => {
                    tracing::debug!("Sitemap {} is an index of {}", location, nested.len());
                    pending.extend(nested);
                }
                Ok(SitemapDocument::Other(root)) => {
                    tracing::warn!("Skipping sitemap {}: unexpected root <{}>", location, root);
                }
                Err(e) => {
                    tracing::warn!("Skipping sitemap {}: {}", location, e);
                }
            }

            tracing::info!("Processed {}, #URLs: {}", location, self.number_of_urls);
        }
    }

    fn process_text<S: UrlSink>(&mut self, text: &str, sink: &mut S) {
        let mut lines = 0;
        for line in candidate_lines(text) {
            lines += 1;
            self.add_url(line, sink);
        }
        tracing::debug!("Read {} candidate lines", lines);
    }

    fn add_urls<S: UrlSink>(&mut self, urls: &[String], sink: &mut S) {
        for url in urls {
            self.add_url(url, sink);
        }
    }
}
