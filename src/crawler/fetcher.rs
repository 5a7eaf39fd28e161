//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with the configured user agent and timeouts
//! - Issuing one request per target without following redirects
//! - Streaming the response body to the output sink
//! - Error classification

use crate::config::HttpConfig;
use crate::crawler::dns::{parse_nameserver, NameserverResolver};
use crate::output::{BodyWriter, OutputError};
use crate::target::TargetId;
use crate::{ConfigError, SwarmError};
use reqwest::header::LOCATION;
use reqwest::{redirect::Policy, Client, Method, Request};
use std::sync::Arc;
use std::time::Duration;

/// Redirect hops allowed while loading sub-sitemaps
const DISCOVERY_MAX_REDIRECTS: usize = 10;

/// Identifies the target a request belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub id: TargetId,
    pub url: String,
}

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// The response arrived in full
    Completed {
        /// HTTP status code
        status: u16,
        /// `Location` header value, verbatim
        location: Option<String>,
        /// Body bytes received
        bytes: u64,
    },

    /// No response (DNS, connect, TLS, timeout before headers)
    TransportError {
        /// Error description
        error: String,
    },

    /// Headers arrived but the body broke off
    StreamError {
        status: u16,
        error: String,
        bytes: u64,
    },

    /// The body could not be saved
    PersistFailed(OutputError),
}

/// A finished request and the target it belongs to
#[derive(Debug)]
pub struct Completion {
    pub context: RequestContext,
    pub result: FetchResult,
}

/// Builds the HTTP client used for targets
///
/// Redirects are never followed by the client; the scheduler turns them
/// into new targets.
///
/// # Arguments
///
/// * `config` - The HTTP configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(SwarmError)` - Invalid `dns-resolver` or failed to build client
///
/// # Example
///
/// ```no_run
/// use swarmload::config::HttpConfig;
/// use swarmload::crawler::build_http_client;
///
/// let client = build_http_client(&HttpConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &HttpConfig) -> Result<Client, SwarmError> {
    Ok(base_client(config)?.redirect(Policy::none()).build()?)
}

/// Builds the HTTP client used to load sub-sitemaps
pub fn build_discovery_client(config: &HttpConfig) -> Result<Client, SwarmError> {
    Ok(base_client(config)?
        .redirect(Policy::limited(DISCOVERY_MAX_REDIRECTS))
        .build()?)
}

fn base_client(config: &HttpConfig) -> Result<reqwest::ClientBuilder, SwarmError> {
    let mut builder = Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .gzip(true)
        .brotli(true);

    if let Some(address) = &config.dns_resolver {
        let nameserver = parse_nameserver(address).ok_or_else(|| {
            ConfigError::Validation(format!("invalid dns_resolver '{}'", address))
        })?;
        builder = builder.dns_resolver(Arc::new(NameserverResolver::new(nameserver)));
    }

    Ok(builder)
}

/// Builds the request for one target
///
/// Fails when `url` is not an absolute URL, e.g. a relative redirect target.
pub fn build_request(client: &Client, method: &Method, url: &str) -> Result<Request, reqwest::Error> {
    client.request(method.clone(), url).build()
}

/// Executes `request` and streams its body into `writer`
///
/// Never fails: every outcome is described by the returned [`FetchResult`].
pub async fn fetch_target(client: &Client, request: Request, mut writer: BodyWriter) -> FetchResult {
    let mut response = match client.execute(request).await {
        Ok(response) => response,
        Err(e) => {
            return FetchResult::TransportError {
                error: describe_error(&e),
            }
        }
    };

    let status = response.status().as_u16();
    let location = response
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    loop {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                if let Err(e) = writer.write_chunk(&chunk).await {
                    return FetchResult::PersistFailed(e);
                }
            }
            Ok(None) => break,
            Err(e) => {
                return FetchResult::StreamError {
                    status,
                    error: describe_error(&e),
                    bytes: writer.bytes(),
                }
            }
        }
    }

    if let Err(e) = writer.finish().await {
        return FetchResult::PersistFailed(e);
    }

    FetchResult::Completed {
        status,
        location,
        bytes: writer.bytes(),
    }
}

fn describe_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "Request timeout".to_string()
    } else if e.is_connect() {
        format!("Connection failed: {}", e)
    } else {
        e.to_string()
    }
}
