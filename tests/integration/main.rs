//! Integration tests for swarmload
//!
//! These tests use wiremock to stand up mock HTTP servers and drive complete
//! runs end-to-end through `run_crawl`.

mod crawl_tests;
mod sitemap_tests;

use std::io::Cursor;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use swarmload::config::{Config, CrawlerConfig};
use swarmload::crawler::{run_crawl, RunOptions, RunSummary};
use swarmload::SwarmError;
use tokio::net::UdpSocket;

/// Creates a fast-ticking configuration with the given concurrency
pub fn test_config(concurrency: usize) -> Config {
    Config {
        crawler: CrawlerConfig {
            concurrency,
            dispatch_interval_ms: 1,
            stat_interval_ms: 50,
            ..CrawlerConfig::default()
        },
        ..Config::default()
    }
}

/// Runs `config` over `input` without a progress line
pub async fn try_crawl(config: Config, input: String) -> Result<RunSummary, SwarmError> {
    run_crawl(config, Cursor::new(input.into_bytes()), RunOptions::default()).await
}

pub async fn crawl(config: Config, input: String) -> RunSummary {
    try_crawl(config, input).await.expect("run failed")
}

/// Minimal nameserver answering every A query with `answer`
///
/// Returns its address and a counter of the queries it received.
pub async fn serve_dns_answer(answer: Ipv4Addr) -> (SocketAddr, Arc<AtomicUsize>) {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let address = socket.local_addr().unwrap();
    let queries = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&queries);

    tokio::spawn(async move {
        let mut buf = [0u8; 512];
        while let Ok((len, peer)) = socket.recv_from(&mut buf).await {
            counter.fetch_add(1, Ordering::SeqCst);
            if let Some(reply) = dns_reply(&buf[..len], answer) {
                let _ = socket.send_to(&reply, peer).await;
            }
        }
    });

    (address, queries)
}

fn dns_reply(query: &[u8], answer: Ipv4Addr) -> Option<Vec<u8>> {
    let mut end = 12;
    while *query.get(end)? != 0 {
        end += 1 + query[end] as usize;
    }
    let qtype = u16::from_be_bytes([*query.get(end + 1)?, *query.get(end + 2)?]);
    end += 5;
    let is_a = qtype == 1;

    let mut reply = Vec::with_capacity(end + 16);
    reply.extend_from_slice(query.get(..2)?);
    reply.extend_from_slice(&[0x81, 0x80, 0, 1, 0, is_a as u8, 0, 0, 0, 0]);
    reply.extend_from_slice(query.get(12..end)?);
    if is_a {
        reply.extend_from_slice(&[0xc0, 0x0c, 0, 1, 0, 1, 0, 0, 0, 60, 0, 4]);
        reply.extend_from_slice(&answer.octets());
    }
    Some(reply)
}
