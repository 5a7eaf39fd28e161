//! Run statistics
//!
//! Outcome counters keyed by status code (or `failed`), the broken-url map,
//! and the formatting shared by the progress line and the final printout.

use crate::crawler::RunSummary;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::Duration;

/// Key of the outcome table
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OutcomeKey {
    /// No response, or the response broke off mid-body
    Failed,

    /// A complete response with this status code
    Status(u16),
}

impl fmt::Display for OutcomeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed => write!(f, "failed"),
            Self::Status(code) => write!(f, "{}", code),
        }
    }
}

/// Why a URL ended up in the broken map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokenReason {
    Fail,
    Status(u16),
}

impl fmt::Display for BrokenReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fail => write!(f, "fail"),
            Self::Status(code) => write!(f, "{}", code),
        }
    }
}

/// Counters and the broken-url map of one run
#[derive(Debug, Clone)]
pub struct RunStats {
    outcomes: BTreeMap<OutcomeKey, u64>,
    broken: HashMap<String, BrokenReason>,
    total_bytes: u64,
}

impl Default for RunStats {
    fn default() -> Self {
        Self::new()
    }
}

impl RunStats {
    /// Creates empty statistics; `failed` is always present in the table
    pub fn new() -> Self {
        let mut outcomes = BTreeMap::new();
        outcomes.insert(OutcomeKey::Failed, 0);

        Self {
            outcomes,
            broken: HashMap::new(),
            total_bytes: 0,
        }
    }

    /// Counts one complete response with status `code`
    pub fn record_status(&mut self, code: u16) {
        *self.outcomes.entry(OutcomeKey::Status(code)).or_insert(0) += 1;
    }

    /// Counts one failed request and marks `url` as broken with `fail`
    pub fn record_failure(&mut self, url: &str) {
        *self.outcomes.entry(OutcomeKey::Failed).or_insert(0) += 1;
        self.broken.insert(url.to_string(), BrokenReason::Fail);
    }

    /// Marks `url` as broken with status `code`
    ///
    /// The status itself must be counted separately with [`record_status`](Self::record_status).
    pub fn record_broken(&mut self, url: &str, code: u16) {
        self.broken
            .insert(url.to_string(), BrokenReason::Status(code));
    }

    pub fn add_bytes(&mut self, bytes: u64) {
        self.total_bytes += bytes;
    }

    /// Count recorded under `key`, 0 if never seen
    pub fn outcome(&self, key: OutcomeKey) -> u64 {
        self.outcomes.get(&key).copied().unwrap_or(0)
    }

    /// Shorthand for `outcome(OutcomeKey::Failed)`
    pub fn failed(&self) -> u64 {
        self.outcome(OutcomeKey::Failed)
    }

    /// Sum of every counter in the table
    pub fn total_outcomes(&self) -> u64 {
        self.outcomes.values().sum()
    }

    pub fn outcomes(&self) -> impl Iterator<Item = (OutcomeKey, u64)> + '_ {
        self.outcomes.iter().map(|(key, count)| (*key, *count))
    }

    pub fn broken_reason(&self, url: &str) -> Option<BrokenReason> {
        self.broken.get(url).copied()
    }

    pub fn broken_count(&self) -> usize {
        self.broken.len()
    }

    /// Broken urls sorted by url
    pub fn broken_urls(&self) -> Vec<(&str, BrokenReason)> {
        let mut urls: Vec<_> = self
            .broken
            .iter()
            .map(|(url, reason)| (url.as_str(), *reason))
            .collect();
        urls.sort_unstable_by(|a, b| a.0.cmp(b.0));
        urls
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Renders the outcome table as `failed:0 200:12 404:1`
    pub fn format_outcomes(&self) -> String {
        self.outcomes
            .iter()
            .map(|(key, count)| format!("{}:{}", key, count))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Renders the progress line
pub fn format_progress(
    elapsed: Duration,
    queued: usize,
    running: usize,
    done: u64,
    stats: &RunStats,
) -> String {
    format!(
        "{:6.2} sec. Queued/running/done: {}/{}/{}. Stats: {}",
        elapsed.as_secs_f64(),
        queued,
        running,
        done,
        stats.format_outcomes()
    )
}

/// Prints the final statistics of a run to stdout
pub fn print_statistics(summary: &RunSummary) {
    let stats = &summary.stats;
    let elapsed = summary.elapsed.as_secs_f64();

    println!("=== Run Statistics ===\n");

    println!("Overview:");
    println!("  Elapsed: {:.2} sec", elapsed);
    println!("  URLs discovered: {}", summary.discovered);
    println!("  URLs dropped: {}", summary.dropped);
    println!("  Targets done: {}", summary.done);
    println!("  Redirects followed: {}", summary.redirects);
    println!("  Bonus respawns: {}", summary.respawns);
    println!("  Peak running: {}", summary.peak_running);
    println!("  Bytes received: {}", stats.total_bytes());
    if elapsed > 0.0 {
        println!("  Rate: {:.1} req/sec", summary.done as f64 / elapsed);
    }
    println!();

    println!("Outcomes:");
    let total = stats.total_outcomes();
    for (key, count) in stats.outcomes() {
        let percentage = if total > 0 {
            (count as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", key, count, percentage);
    }
    println!();

    println!("Broken URLs: {}", stats.broken_count());
}
