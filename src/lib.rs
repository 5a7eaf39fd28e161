//! swarmload: a bulk URL crawler and load generator
//!
//! This crate reads a seed list of URLs (a sitemap, a sitemap index, or a
//! plain-text list), fetches them at a bounded concurrency, follows redirects,
//! optionally replays a share of successful requests as extra load, and
//! classifies every outcome by status.

pub mod config;
pub mod crawler;
pub mod discovery;
pub mod output;
pub mod target;

use thiserror::Error;

/// Main error type for swarmload operations
#[derive(Debug, Error)]
pub enum SwarmError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Target store error: {0}")]
    Target(#[from] target::TargetError),

    #[error("Discovery error: {0}")]
    Discovery(#[from] discovery::DiscoveryError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),
}

/// Result type alias for swarmload operations
pub type Result<T> = std::result::Result<T, SwarmError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{run_crawl, RunOptions, RunSummary};
pub use target::{QueueTargetStore, TargetId, TargetState, TargetStore};
