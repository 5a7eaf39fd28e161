//! Scheduler driving the dispatch loop
//!
//! This module handles:
//! - The dispatch tick filling free slots from the target store
//! - The stat tick refreshing the progress line
//! - Folding completed requests back into the store and the statistics
//! - Redirect following and bonus respawns
//!
//! The scheduler owns every piece of mutable run state. Request tasks and the
//! discovery task only talk to it through [`Event`]s.

use crate::config::CrawlerConfig;
use crate::crawler::events::{Event, EventSender};
use crate::crawler::fetcher::{build_request, fetch_target, Completion, FetchResult, RequestContext};
use crate::crawler::outcome::{classify, Disposition};
use crate::discovery::{DiscoverySummary, InputFormat};
use crate::output::{format_progress, BodySink, RunStats};
use crate::target::TargetStore;
use crate::{ConfigError, SwarmError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use reqwest::{Client, Method};
use std::io::Write;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

/// Erases whatever a longer previous progress line left behind
const CLEAR_TO_LINE_END: &str = "\x1b[K";

/// Loop settings derived from the crawler configuration
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub method: Method,
    pub dispatch_interval: Duration,
    pub stat_interval: Duration,
    /// Pause range after each issued request, in microseconds
    pub spawn_delay_us: Option<(u64, u64)>,
    pub redirect_codes: Vec<u16>,
    /// Percentage of 2xx responses replayed as new targets
    pub bonus_respawn: u8,
    /// Refresh the progress line on stdout
    pub show_progress: bool,
}

impl SchedulerSettings {
    pub fn from_config(config: &CrawlerConfig, show_progress: bool) -> Result<Self, ConfigError> {
        let method = Method::from_bytes(config.request_method.as_bytes())
            .map_err(|_| ConfigError::InvalidMethod(config.request_method.clone()))?;

        let spawn_delay_us = if config.spawn_delay_max_us > 0 {
            Some((config.spawn_delay_min_us, config.spawn_delay_max_us))
        } else {
            None
        };

        Ok(Self {
            method,
            dispatch_interval: Duration::from_millis(config.dispatch_interval_ms),
            stat_interval: Duration::from_millis(config.stat_interval_ms),
            spawn_delay_us,
            redirect_codes: config.redirect_codes.clone(),
            bonus_respawn: config.bonus_respawn,
            show_progress,
        })
    }
}

/// Final state of a run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub elapsed: Duration,
    pub queued: usize,
    pub running: usize,
    pub done: u64,
    /// How the input was read, if discovery finished
    pub format: Option<InputFormat>,
    pub discovered: u64,
    pub dropped: u64,
    /// Highest number of targets running at once
    pub peak_running: usize,
    /// Redirects turned into new targets
    pub redirects: u64,
    /// 2xx responses replayed as new targets
    pub respawns: u64,
    pub stats: RunStats,
}

/// Drives targets from queued to done
pub struct Scheduler<S: TargetStore> {
    settings: SchedulerSettings,
    store: S,
    stats: RunStats,
    client: Client,
    sink: BodySink,
    rng: StdRng,
    events: EventSender,
    events_rx: mpsc::UnboundedReceiver<Event>,
    discovery: Option<DiscoverySummary>,
    peak_running: usize,
    redirects: u64,
    respawns: u64,
    started: Instant,
}

impl<S: TargetStore> Scheduler<S> {
    /// Creates a scheduler around `store`
    ///
    /// The store may already hold targets; the run still waits for discovery
    /// to finish before it can drain.
    pub fn new(settings: SchedulerSettings, store: S, client: Client, sink: BodySink) -> Self {
        Self::with_rng(settings, store, client, sink, StdRng::from_entropy())
    }

    /// Like [`new`](Self::new), with a reproducible respawn sequence
    pub fn with_seed(
        settings: SchedulerSettings,
        store: S,
        client: Client,
        sink: BodySink,
        seed: u64,
    ) -> Self {
        Self::with_rng(settings, store, client, sink, StdRng::seed_from_u64(seed))
    }

    fn with_rng(
        settings: SchedulerSettings,
        store: S,
        client: Client,
        sink: BodySink,
        rng: StdRng,
    ) -> Self {
        let (tx, events_rx) = mpsc::unbounded_channel();

        Self {
            settings,
            store,
            stats: RunStats::new(),
            client,
            sink,
            rng,
            events: EventSender::new(tx),
            events_rx,
            discovery: None,
            peak_running: 0,
            redirects: 0,
            respawns: 0,
            started: Instant::now(),
        }
    }

    /// Handle for posting discovered URLs and completions
    pub fn events(&self) -> EventSender {
        self.events.clone()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// True once discovery finished
    pub fn is_initialized(&self) -> bool {
        self.discovery.is_some()
    }

    /// True once discovery finished and nothing is queued or running
    pub fn is_drained(&self) -> bool {
        self.is_initialized() && self.store.count_queued() + self.store.count_running() == 0
    }

    /// Runs the dispatch loop until the store drains
    ///
    /// # Returns
    ///
    /// * `Ok(RunSummary)` - Every target is done
    /// * `Err(SwarmError)` - Discovery failed, a body could not be saved, or
    ///   the store's contract was violated
    pub async fn run(mut self) -> Result<RunSummary, SwarmError> {
        self.started = Instant::now();

        let mut dispatch = tokio::time::interval(self.settings.dispatch_interval);
        dispatch.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut stat = tokio::time::interval(self.settings.stat_interval);
        stat.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            "Dispatch loop started: capacity {}, {} {}ms",
            self.store.capacity(),
            self.settings.method,
            self.settings.dispatch_interval.as_millis()
        );

        loop {
            tokio::select! {
                _ = dispatch.tick() => {
                    if self.is_drained() {
                        break;
                    }
                    self.dispatch().await?;
                }
                _ = stat.tick() => {
                    if self.settings.show_progress {
                        self.print_progress();
                    }
                }
                Some(event) = self.events_rx.recv() => {
                    self.handle_event(event)?;
                }
            }
        }

        if self.settings.show_progress {
            self.print_progress();
            println!();
        }

        tracing::info!(
            "Run drained: {} targets done in {:.2}s",
            self.store.count_done(),
            self.started.elapsed().as_secs_f64()
        );

        Ok(self.into_summary())
    }

    /// Fills every free slot from the queue
    async fn dispatch(&mut self) -> Result<(), SwarmError> {
        let batch = self.store.free_slots().min(self.store.count_queued());

        for _ in 0..batch {
            let (id, url) = self.store.launch_any()?;
            self.peak_running = self.peak_running.max(self.store.count_running());
            self.spawn(RequestContext { id, url }).await?;
        }
        Ok(())
    }

    /// Issues the request for one running target
    async fn spawn(&mut self, context: RequestContext) -> Result<(), SwarmError> {
        match build_request(&self.client, &self.settings.method, &context.url) {
            Ok(request) => {
                tracing::trace!("Spawning target {}: {}", context.id, context.url);
                let client = self.client.clone();
                let writer = self.sink.writer(&context.url, context.id);
                let events = self.events.clone();

                tokio::spawn(async move {
                    let result = fetch_target(&client, request, writer).await;
                    events.complete(Completion { context, result });
                });
            }
            Err(e) => {
                tracing::warn!("Failed to issue request for {}: {}", context.url, e);
                self.record(Completion {
                    context,
                    result: FetchResult::TransportError {
                        error: e.to_string(),
                    },
                })?;
            }
        }

        if let Some(delay) = self.sample_spawn_delay() {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }

    fn sample_spawn_delay(&mut self) -> Option<Duration> {
        let (min, max) = self.settings.spawn_delay_us?;
        let micros = if min >= max {
            max
        } else {
            self.rng.gen_range(min..=max)
        };
        Some(Duration::from_micros(micros))
    }

    fn handle_event(&mut self, event: Event) -> Result<(), SwarmError> {
        match event {
            Event::Discovered(url) => {
                self.store.add(url);
            }
            Event::DiscoveryFinished(summary) => {
                tracing::debug!(
                    "Discovery finished after {:.2}s with {} URLs",
                    self.started.elapsed().as_secs_f64(),
                    summary.discovered
                );
                self.discovery = Some(summary);
            }
            Event::DiscoveryFailed(e) => return Err(e.into()),
            Event::Completed(completion) => self.record(completion)?,
        }
        Ok(())
    }

    /// Folds one finished request into the store and the statistics
    fn record(&mut self, completion: Completion) -> Result<(), SwarmError> {
        let Completion { context, result } = completion;
        self.store.done(context.id)?;

        match result {
            FetchResult::TransportError { error } => {
                tracing::debug!("Request for {} failed: {}", context.url, error);
                self.stats.record_failure(&context.url);
            }
            FetchResult::StreamError {
                status,
                error,
                bytes,
            } => {
                tracing::debug!(
                    "Response {} for {} broke off after {} bytes: {}",
                    status,
                    context.url,
                    bytes,
                    error
                );
                self.stats.add_bytes(bytes);
                self.stats.record_failure(&context.url);
            }
            FetchResult::PersistFailed(e) => {
                tracing::error!("Failed to save body of {}: {}", context.url, e);
                return Err(e.into());
            }
            FetchResult::Completed {
                status,
                location,
                bytes,
            } => {
                self.stats.add_bytes(bytes);
                self.stats.record_status(status);

                match classify(
                    status,
                    location.as_deref(),
                    &self.settings.redirect_codes,
                    self.settings.bonus_respawn,
                    &mut self.rng,
                ) {
                    Disposition::Redirect { location } => {
                        tracing::trace!("{} redirects ({}) to {}", context.url, status, location);
                        self.redirects += 1;
                        self.store.add(location);
                    }
                    Disposition::RedirectWithoutLocation => {
                        tracing::warn!("{} answered {} without a Location", context.url, status);
                        self.stats.record_broken(&context.url, status);
                    }
                    Disposition::Success { respawn } => {
                        if respawn {
                            self.respawns += 1;
                            self.store.add(context.url);
                        }
                    }
                    Disposition::Broken => {
                        tracing::debug!("{} answered {}", context.url, status);
                        self.stats.record_broken(&context.url, status);
                    }
                }
            }
        }
        Ok(())
    }

    fn print_progress(&self) {
        print!("{}", self.progress_frame());
        let _ = std::io::stdout().flush();
    }

    fn progress_frame(&self) -> String {
        let line = format_progress(
            self.started.elapsed(),
            self.store.count_queued(),
            self.store.count_running(),
            self.store.count_done(),
            &self.stats,
        );
        format!("\r{}{}", line, CLEAR_TO_LINE_END)
    }

    fn into_summary(self) -> RunSummary {
        RunSummary {
            elapsed: self.started.elapsed(),
            queued: self.store.count_queued(),
            running: self.store.count_running(),
            done: self.store.count_done(),
            format: self.discovery.map(|d| d.format),
            discovered: self.discovery.map_or(0, |d| d.discovered),
            dropped: self.discovery.map_or(0, |d| d.dropped),
            peak_running: self.peak_running,
            redirects: self.redirects,
            respawns: self.respawns,
            stats: self.stats,
        }
    }
}
