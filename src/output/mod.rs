//! Output module for run statistics, response bodies, and reports
//!
//! This module handles:
//! - Counting outcomes per status code and tracking broken URLs
//! - Streaming response bodies to disk when saving is enabled
//! - Writing the broken-urls report at the end of a run

mod report;
mod sink;
pub mod stats;

pub use report::{write_broken_urls, BROKEN_URLS_FILE};
pub use sink::{make_filename, BodySink, BodyWriter};
pub use stats::{format_progress, print_statistics, BrokenReason, OutcomeKey, RunStats};

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while persisting output
///
/// Any of these aborts the run.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("failed to create output directory {}: {source}", path.display())]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}
