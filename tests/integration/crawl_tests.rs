//! End-to-end runs over plain-text URL lists

use crate::{crawl, serve_dns_answer, test_config, try_crawl};
use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use swarmload::config::OutputMode;
use swarmload::output::{BrokenReason, OutcomeKey, BROKEN_URLS_FILE};
use swarmload::SwarmError;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_redirect_is_followed_as_new_target() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("Location", format!("{}/new", base_url).as_str()),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(ResponseTemplate::new(200).set_body_string("moved here"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let summary = crawl(test_config(4), format!("{}/old\n", base_url)).await;

    assert_eq!(summary.done, 2);
    assert_eq!(summary.discovered, 1);
    assert_eq!(summary.redirects, 1);
    assert_eq!(summary.stats.outcome(OutcomeKey::Status(302)), 1);
    assert_eq!(summary.stats.outcome(OutcomeKey::Status(200)), 1);
    assert_eq!(summary.stats.failed(), 0);
    assert_eq!(summary.stats.broken_count(), 0);
    assert_eq!(summary.stats.total_bytes(), "moved here".len() as u64);
}

#[tokio::test]
async fn test_relative_redirect_fails_at_issuance() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/relative"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/elsewhere"))
        .mount(&mock_server)
        .await;

    let summary = crawl(test_config(2), format!("{}/relative\n", base_url)).await;

    assert_eq!(summary.done, 2);
    assert_eq!(summary.stats.outcome(OutcomeKey::Status(301)), 1);
    assert_eq!(summary.stats.failed(), 1);
    assert_eq!(
        summary.stats.broken_reason("/elsewhere"),
        Some(BrokenReason::Fail)
    );
}

#[tokio::test]
async fn test_error_statuses_are_recorded_as_broken() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/ok"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/error"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let input = format!("{0}/ok\n{0}/missing\n{0}/error\n", base_url);
    let summary = crawl(test_config(3), input).await;

    assert_eq!(summary.done, 3);
    assert_eq!(summary.stats.format_outcomes(), "failed:0 200:1 404:1 500:1");
    assert_eq!(summary.stats.broken_reason(&format!("{}/ok", base_url)), None);
    assert_eq!(
        summary.stats.broken_reason(&format!("{}/missing", base_url)),
        Some(BrokenReason::Status(404))
    );
    assert_eq!(
        summary.stats.broken_reason(&format!("{}/error", base_url)),
        Some(BrokenReason::Status(500))
    );
}

#[tokio::test]
async fn test_transport_failure_is_counted_once() {
    let summary = crawl(test_config(1), "http://127.0.0.1:1/\n".to_string()).await;

    assert_eq!(summary.done, 1);
    assert_eq!(summary.stats.failed(), 1);
    assert_eq!(
        summary.stats.broken_reason("http://127.0.0.1:1/"),
        Some(BrokenReason::Fail)
    );
}

/// Serves every request after `delay`, one request per connection, and
/// records the highest number of requests it was handling at once
async fn serve_counting_in_flight(delay: Duration) -> (String, Arc<AtomicUsize>, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let served = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let in_flight = Arc::new(AtomicUsize::new(0));

    let (served_by_server, peak_by_server) = (Arc::clone(&served), Arc::clone(&peak));
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            let served = Arc::clone(&served_by_server);
            let peak = Arc::clone(&peak_by_server);
            let in_flight = Arc::clone(&in_flight);

            tokio::spawn(async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);

                let mut head = Vec::new();
                let mut buf = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => head.extend_from_slice(&buf[..n]),
                    }
                }
                tokio::time::sleep(delay).await;

                // released before replying so the client never sees a freed slot first
                in_flight.fetch_sub(1, Ordering::SeqCst);
                served.fetch_add(1, Ordering::SeqCst);
                let _ = stream
                    .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 2\r\nconnection: close\r\n\r\nok")
                    .await;
                let _ = stream.shutdown().await;
            });
        }
    });

    (base_url, served, peak)
}

#[tokio::test]
async fn test_concurrency_never_exceeds_capacity() {
    let (base_url, served, peak) = serve_counting_in_flight(Duration::from_millis(30)).await;

    let input: String = (0..12)
        .map(|i| format!("{}/slow/{}\n", base_url, i))
        .collect();
    let summary = crawl(test_config(3), input).await;

    assert_eq!(summary.done, 12);
    assert_eq!(summary.stats.outcome(OutcomeKey::Status(200)), 12);
    assert_eq!(served.load(Ordering::SeqCst), 12);

    let server_peak = peak.load(Ordering::SeqCst);
    assert!(server_peak >= 2, "requests never overlapped");
    assert!(server_peak <= 3, "{} requests in flight with capacity 3", server_peak);
    assert!(summary.peak_running <= 3);
    assert_eq!(summary.queued, 0);
    assert_eq!(summary.running, 0);
}

#[tokio::test]
async fn test_hostnames_resolve_through_configured_nameserver() {
    let (nameserver, queries) = serve_dns_answer(Ipv4Addr::LOCALHOST).await;
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/named"))
        .respond_with(ResponseTemplate::new(200).set_body_string("by name"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut config = test_config(1);
    config.http.dns_resolver = Some(nameserver.to_string());
    let url = format!("http://swarmload.test:{}/named", mock_server.address().port());
    let summary = crawl(config, format!("{}\n", url)).await;

    assert_eq!(summary.stats.outcome(OutcomeKey::Status(200)), 1);
    assert_eq!(summary.stats.failed(), 0);
    assert!(queries.load(Ordering::SeqCst) >= 1);
}

#[tokio::test]
async fn test_no_bonus_means_one_request_per_url() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path_regex(r"^/page/\d+$"))
        .respond_with(ResponseTemplate::new(200).set_body_string("page"))
        .expect(10)
        .mount(&mock_server)
        .await;

    let input: String = (0..10)
        .map(|i| format!("{}/page/{}\n", base_url, i))
        .collect();
    let summary = crawl(test_config(4), input).await;

    assert_eq!(summary.done, 10);
    assert_eq!(summary.respawns, 0);
    assert_eq!(summary.stats.outcome(OutcomeKey::Status(200)), 10);
}

#[tokio::test]
async fn test_configured_method_is_used() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("HEAD"))
        .and(path("/probe"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut config = test_config(1);
    config.crawler.request_method = "HEAD".to_string();
    let summary = crawl(config, format!("{}/probe\n", base_url)).await;

    assert_eq!(summary.stats.outcome(OutcomeKey::Status(204)), 1);
}

#[tokio::test]
async fn test_bodies_are_saved_per_request() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/alpha"))
        .respond_with(ResponseTemplate::new(200).set_body_string("alpha body"))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/beta"))
        .respond_with(ResponseTemplate::new(404).set_body_string("beta body"))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let destination = dir.path().join("bodies");
    let mut config = test_config(2);
    config.output.mode = OutputMode::Save;
    config.output.destination = destination.display().to_string();

    let input = format!("{0}/alpha\n{0}/beta\n", base_url);
    let summary = crawl(config, input).await;
    assert_eq!(summary.done, 2);

    let bodies: HashSet<String> = std::fs::read_dir(&destination)
        .unwrap()
        .map(|entry| std::fs::read_to_string(entry.unwrap().path()).unwrap())
        .collect();
    let expected: HashSet<String> = ["alpha body", "beta body"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(bodies, expected);
}

#[tokio::test]
async fn test_broken_urls_report_is_written() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/fine"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let destination = dir.path().join("report");
    let mut config = test_config(2);
    config.output.broken_urls = true;
    config.output.destination = destination.display().to_string();

    crawl(config, format!("{0}/gone\n{0}/fine\n", base_url)).await;

    let report = std::fs::read_to_string(destination.join(BROKEN_URLS_FILE)).unwrap();
    let entries: Vec<&str> = report.lines().filter(|l| !l.starts_with('#')).collect();
    assert_eq!(entries, vec![format!("{}/gone\t410", base_url)]);
}

#[tokio::test]
async fn test_existing_output_directory_is_fatal() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(1);
    config.output.mode = OutputMode::Save;
    config.output.destination = dir.path().display().to_string();

    let result = try_crawl(config, "http://127.0.0.1:1/\n".to_string()).await;
    assert!(matches!(result, Err(SwarmError::Output(_))));
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let mut config = test_config(1);
    config.crawler.concurrency = 0;

    let result = try_crawl(config, String::new()).await;
    assert!(matches!(result, Err(SwarmError::Config(_))));
}

#[tokio::test]
async fn test_degenerate_input_is_an_empty_run() {
    let summary = crawl(test_config(2), "\n   \n\n".to_string()).await;

    assert_eq!(summary.done, 0);
    assert_eq!(summary.discovered, 0);
    assert_eq!(summary.stats.format_outcomes(), "failed:0");
}
