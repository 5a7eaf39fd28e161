//! Configuration module for swarmload
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every key has a default, so an empty file is a valid configuration.
//!
//! # Example
//!
//! ```no_run
//! use swarmload::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("swarmload.toml")).unwrap();
//! println!("Requests in flight: {}", config.crawler.concurrency);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{Config, CrawlerConfig, HttpConfig, OutputConfig, OutputMode};

pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
