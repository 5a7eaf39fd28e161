//! Crawler module for dispatching and fetching targets
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with body streaming
//! - Name resolution through a configured nameserver
//! - Response classification, redirects, and bonus respawns
//! - The dispatch loop bounded by the store's capacity
//! - Overall run coordination

mod coordinator;
mod dns;
mod events;
mod fetcher;
mod outcome;
mod scheduler;

pub use coordinator::{run_crawl, RunOptions};
pub use dns::{parse_nameserver, NameserverResolver, DEFAULT_DNS_PORT};
pub use events::{spawn_discovery, Event, EventSender};
pub use fetcher::{
    build_discovery_client, build_http_client, build_request, fetch_target, Completion,
    FetchResult, RequestContext,
};
pub use outcome::{classify, roll_respawn, Disposition};
pub use scheduler::{RunSummary, Scheduler, SchedulerSettings};
