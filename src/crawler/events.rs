//! Messages posted to the scheduler
//!
//! The scheduler is the only task that mutates the target store and the run
//! statistics. Discovery and request tasks report to it through one
//! unbounded channel.

use crate::crawler::fetcher::Completion;
use crate::discovery::{Discovery, DiscoveryError, DiscoverySummary, UrlSink};
use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Something the scheduler has to fold into its state
#[derive(Debug)]
pub enum Event {
    /// Discovery accepted a URL
    Discovered(String),

    /// Discovery processed the whole input
    DiscoveryFinished(DiscoverySummary),

    /// The input could not be read
    DiscoveryFailed(DiscoveryError),

    /// A request finished, one way or another
    Completed(Completion),
}

/// Cloneable handle for posting events to the scheduler
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<Event>,
}

impl EventSender {
    pub fn new(tx: mpsc::UnboundedSender<Event>) -> Self {
        Self { tx }
    }

    pub fn complete(&self, completion: Completion) {
        self.send(Event::Completed(completion));
    }

    pub fn finish_discovery(&self, summary: DiscoverySummary) {
        self.send(Event::DiscoveryFinished(summary));
    }

    pub fn fail_discovery(&self, error: DiscoveryError) {
        self.send(Event::DiscoveryFailed(error));
    }

    fn send(&self, event: Event) {
        if self.tx.send(event).is_err() {
            tracing::trace!("Scheduler is gone, dropping event");
        }
    }
}

impl UrlSink for EventSender {
    fn add_url(&mut self, url: String) {
        self.send(Event::Discovered(url));
    }
}

/// Runs `discovery` over `input` on its own task
///
/// Every accepted URL is posted as [`Event::Discovered`]; the task ends with
/// exactly one [`Event::DiscoveryFinished`] or [`Event::DiscoveryFailed`].
pub fn spawn_discovery<R>(mut discovery: Discovery, input: R, events: EventSender) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut sink = events.clone();
        match discovery.ingest(input, &mut sink).await {
            Ok(summary) => events.finish_discovery(summary),
            Err(e) => {
                tracing::error!("Discovery failed: {}", e);
                events.fail_discovery(e);
            }
        }
    })
}
