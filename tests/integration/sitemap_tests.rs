//! End-to-end runs seeded from sitemaps and sitemap indexes

use crate::{crawl, test_config};
use swarmload::discovery::{InputFormat, SITEMAP_NAMESPACE};
use swarmload::output::OutcomeKey;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn urlset(urls: &[String]) -> String {
    let entries: String = urls
        .iter()
        .map(|url| format!("<url><loc>{}</loc></url>", url))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><urlset xmlns="{}">{}</urlset>"#,
        SITEMAP_NAMESPACE, entries
    )
}

fn sitemap_index(locations: &[String]) -> String {
    let entries: String = locations
        .iter()
        .map(|location| format!("<sitemap><loc>{}</loc></sitemap>", location))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><sitemapindex xmlns="{}">{}</sitemapindex>"#,
        SITEMAP_NAMESPACE, entries
    )
}

fn pages(base_url: &str, section: &str, count: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("{}/{}/{}", base_url, section, i))
        .collect()
}

async fn mount_sitemap(mock_server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "application/xml")
                .set_body_string(body),
        )
        .expect(1)
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn test_sitemap_index_expands_into_every_page() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_sitemap(&mock_server, "/sitemap-a.xml", urlset(&pages(&base_url, "a", 3))).await;
    mount_sitemap(&mock_server, "/sitemap-b.xml", urlset(&pages(&base_url, "b", 3))).await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/(a|b)/\d$"))
        .respond_with(ResponseTemplate::new(200).set_body_string("page"))
        .expect(6)
        .mount(&mock_server)
        .await;

    let index = sitemap_index(&[
        format!("{}/sitemap-a.xml", base_url),
        format!("{}/sitemap-b.xml", base_url),
    ]);
    let summary = crawl(test_config(4), index).await;

    assert_eq!(summary.format, Some(InputFormat::SitemapIndex));
    assert_eq!(summary.discovered, 6);
    assert_eq!(summary.done, 6);
    assert_eq!(summary.stats.outcome(OutcomeKey::Status(200)), 6);
}

#[tokio::test]
async fn test_unreachable_sub_sitemap_is_skipped() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_sitemap(&mock_server, "/sitemap-ok.xml", urlset(&pages(&base_url, "ok", 3))).await;

    Mock::given(method("GET"))
        .and(path("/sitemap-gone.xml"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/ok/\d$"))
        .respond_with(ResponseTemplate::new(200))
        .expect(3)
        .mount(&mock_server)
        .await;

    let index = sitemap_index(&[
        format!("{}/sitemap-gone.xml", base_url),
        format!("{}/sitemap-ok.xml", base_url),
    ]);
    let summary = crawl(test_config(2), index).await;

    assert_eq!(summary.discovered, 3);
    assert_eq!(summary.done, 3);
    assert_eq!(summary.stats.broken_count(), 0);
}

#[tokio::test]
async fn test_urlset_input_is_crawled_directly() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path_regex(r"^/docs/\d$"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&mock_server)
        .await;

    let mut urls = pages(&base_url, "docs", 2);
    urls.push("not-a-url".to_string());
    let summary = crawl(test_config(2), urlset(&urls)).await;

    assert_eq!(summary.format, Some(InputFormat::Sitemap));
    assert_eq!(summary.discovered, 2);
    assert_eq!(summary.dropped, 1);
    assert_eq!(summary.done, 2);
}

#[tokio::test]
async fn test_plain_text_with_malformed_line() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path_regex(r"^/list/\d$"))
        .respond_with(ResponseTemplate::new(200))
        .expect(4)
        .mount(&mock_server)
        .await;

    let mut lines = pages(&base_url, "list", 4);
    lines.insert(2, "definitely not a url".to_string());
    let summary = crawl(test_config(2), lines.join("\n")).await;

    assert_eq!(summary.format, Some(InputFormat::PlainText));
    assert_eq!(summary.discovered, 4);
    assert_eq!(summary.dropped, 1);
    assert_eq!(summary.done, 4);
}
