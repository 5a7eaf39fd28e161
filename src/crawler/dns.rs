//! Name resolution through a configured nameserver
//!
//! When `dns-resolver` is set, every hostname the HTTP clients connect to is
//! looked up by asking that single nameserver instead of the system resolver.

use hyper::client::connect::dns::Name;
use reqwest::dns::{Addrs, Resolve, Resolving};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use trust_dns_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};
use trust_dns_resolver::TokioAsyncResolver;

/// Port used when the configured nameserver has none
pub const DEFAULT_DNS_PORT: u16 = 53;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Parses `1.1.1.1`, `1.1.1.1:5353`, `::1` or `[::1]:5353`
pub fn parse_nameserver(address: &str) -> Option<SocketAddr> {
    if let Ok(socket) = address.parse::<SocketAddr>() {
        return Some(socket);
    }
    address
        .parse::<IpAddr>()
        .ok()
        .map(|ip| SocketAddr::new(ip, DEFAULT_DNS_PORT))
}

/// Caching resolver that only asks one nameserver
#[derive(Clone)]
pub struct NameserverResolver {
    nameserver: SocketAddr,
    resolver: Arc<TokioAsyncResolver>,
}

impl NameserverResolver {
    pub fn new(nameserver: SocketAddr) -> Self {
        let servers =
            NameServerConfigGroup::from_ips_clear(&[nameserver.ip()], nameserver.port(), true);
        let config = ResolverConfig::from_parts(None, Vec::new(), servers);
        let resolver = TokioAsyncResolver::tokio(config, ResolverOpts::default());

        Self {
            nameserver,
            resolver: Arc::new(resolver),
        }
    }

    pub fn nameserver(&self) -> SocketAddr {
        self.nameserver
    }
}

impl Resolve for NameserverResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let resolver = Arc::clone(&self.resolver);
        Box::pin(async move {
            let lookup = resolver.lookup_ip(name.as_str()).await?;
            // the connector fills in the port
            let addrs: Vec<SocketAddr> = lookup.iter().map(|ip| SocketAddr::new(ip, 0)).collect();
            Ok::<Addrs, BoxError>(Box::new(addrs.into_iter()))
        })
    }
}

impl std::fmt::Debug for NameserverResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NameserverResolver")
            .field("nameserver", &self.nameserver)
            .finish()
    }
}
