use serde::Deserialize;

/// Main configuration structure for swarmload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Dispatch loop and load generation settings
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// HTTP method used for every request
    #[serde(rename = "request-method", default = "default_request_method")]
    pub request_method: String,

    /// Maximum number of requests in flight at once
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Period of the dispatch tick (milliseconds)
    #[serde(rename = "dispatch-interval-ms", default = "default_dispatch_interval")]
    pub dispatch_interval_ms: u64,

    /// Period of the progress line refresh (milliseconds)
    #[serde(rename = "stat-interval-ms", default = "default_stat_interval")]
    pub stat_interval_ms: u64,

    /// Lower bound of the pause after issuing a request (microseconds)
    #[serde(rename = "spawn-delay-min-us", default)]
    pub spawn_delay_min_us: u64,

    /// Upper bound of the pause after issuing a request (microseconds), 0 disables it
    #[serde(rename = "spawn-delay-max-us", default)]
    pub spawn_delay_max_us: u64,

    /// Status codes whose `Location` header is followed
    #[serde(rename = "redirect-codes", default = "default_redirect_codes")]
    pub redirect_codes: Vec<u16>,

    /// Percentage of successful responses that get re-enqueued
    #[serde(rename = "bonus-respawn", default)]
    pub bonus_respawn: u8,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            request_method: default_request_method(),
            concurrency: default_concurrency(),
            dispatch_interval_ms: default_dispatch_interval(),
            stat_interval_ms: default_stat_interval(),
            spawn_delay_min_us: 0,
            spawn_delay_max_us: 0,
            redirect_codes: default_redirect_codes(),
            bonus_respawn: 0,
        }
    }
}

/// HTTP client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    #[serde(rename = "connect-timeout-secs", default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(rename = "request-timeout-secs", default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Address of the DNS server to use (IP or IP:port)
    #[serde(rename = "dns-resolver", default)]
    pub dns_resolver: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            connect_timeout_secs: default_connect_timeout(),
            request_timeout_secs: default_request_timeout(),
            dns_resolver: None,
        }
    }
}

/// What happens to response bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Bodies are counted and discarded
    #[default]
    None,
    /// Bodies are appended to one file per request
    Save,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub mode: OutputMode,

    /// Directory receiving saved bodies and the broken-urls report
    #[serde(default = "default_destination")]
    pub destination: String,

    /// Write the broken-urls report at the end of the run
    #[serde(rename = "broken-urls", default)]
    pub broken_urls: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            mode: OutputMode::None,
            destination: default_destination(),
            broken_urls: false,
        }
    }
}

impl OutputConfig {
    /// Returns true if the run needs the output directory
    pub fn needs_directory(&self) -> bool {
        self.mode == OutputMode::Save || self.broken_urls
    }
}

fn default_request_method() -> String {
    "GET".to_string()
}

fn default_concurrency() -> usize {
    10
}

fn default_dispatch_interval() -> u64 {
    10
}

fn default_stat_interval() -> u64 {
    1000
}

fn default_redirect_codes() -> Vec<u16> {
    vec![301, 302, 303, 307, 308]
}

fn default_user_agent() -> String {
    format!("swarmload/{}", env!("CARGO_PKG_VERSION"))
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_request_timeout() -> u64 {
    30
}

fn default_destination() -> String {
    "./output".to_string()
}
