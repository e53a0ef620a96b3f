// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Site Mapper Tests
 * Cycle avoidance, depth bounds and failure handling against a mock site
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use lonkero_mapper::crawler::SiteMapper;
use lonkero_mapper::event_bus::{EventBus, EventKind, ScanEvent};
use lonkero_mapper::http_client::HttpClient;
use lonkero_mapper::types::ScanConfig;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("Content-Type", "text/html")
        .set_body_string(format!("<html><body>{}</body></html>", body))
}

async fn page(server: &MockServer, at: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(html(body))
        .mount(server)
        .await;
}

fn mapper(max_depth: usize, max_pages: usize) -> SiteMapper {
    let client = Arc::new(HttpClient::from_config(&ScanConfig::default()).unwrap());
    SiteMapper::new(client, Arc::new(EventBus::new()), max_depth, max_pages).with_discovery(None)
}

#[tokio::test]
async fn test_self_link_visited_once() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(r#"<a href="/">home</a><a href="/#top">top</a>"#))
        .expect(1)
        .mount(&server)
        .await;

    let start = format!("{}/", server.uri());
    let map = mapper(3, 100)
        .map_website(&start, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(map.visited, vec![start.clone()]);
    assert!(map.failures.is_empty());
}

#[tokio::test]
async fn test_cycle_between_pages() {
    let server = MockServer::start().await;
    page(&server, "/", r#"<a href="/a">A</a>"#).await;
    page(&server, "/a", r#"<a href="/b">B</a>"#).await;
    page(&server, "/b", r#"<a href="/a">A</a><a href="/">home</a>"#).await;

    let map = mapper(10, 100)
        .map_website(&format!("{}/", server.uri()), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(map.visited.len(), 3);
    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 3);
}

#[tokio::test]
async fn test_depth_limit() {
    let server = MockServer::start().await;
    page(&server, "/", r#"<a href="/one">1</a>"#).await;
    page(&server, "/one", r#"<a href="/two">2</a>"#).await;
    page(&server, "/two", r#"<a href="/three">3</a>"#).await;
    page(&server, "/three", "end").await;

    let map = mapper(1, 100)
        .map_website(&format!("{}/", server.uri()), &CancellationToken::new())
        .await
        .unwrap();

    let paths: Vec<String> = map
        .visited
        .iter()
        .map(|u| u.trim_start_matches(&server.uri()).to_string())
        .collect();
    assert_eq!(paths, vec!["/", "/one"]);
}

#[tokio::test]
async fn test_max_pages_bounds_fetches() {
    let server = MockServer::start().await;
    page(
        &server,
        "/",
        r#"<a href="/p1">1</a><a href="/p2">2</a><a href="/p3">3</a><a href="/p4">4</a>"#,
    )
    .await;
    for p in ["/p1", "/p2", "/p3", "/p4"] {
        page(&server, p, "leaf").await;
    }

    let map = mapper(3, 2)
        .map_website(&format!("{}/", server.uri()), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(map.visited.len(), 2);
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_failed_page_does_not_stop_crawl() {
    let server = MockServer::start().await;
    page(&server, "/", r#"<a href="/broken">x</a><a href="/fine">y</a>"#).await;
    page(&server, "/fine", r#"<form action="/login" method="post"><input name="user"></form>"#).await;

    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let map = mapper(3, 100)
        .map_website(&format!("{}/", server.uri()), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(map.visited.len(), 3);
    assert_eq!(map.failures.len(), 1);
    assert_eq!(map.failures[0].status_code, 500);
    assert!(map.failures[0].url.ends_with("/broken"));

    assert_eq!(map.structure.forms.len(), 1);
    assert_eq!(map.structure.forms[0].action, format!("{}/login", server.uri()));
    assert_eq!(map.structure.forms[0].method, "POST");
    assert_eq!(map.statistics.total_forms, 1);
}

#[tokio::test]
async fn test_external_links_recorded_not_fetched() {
    let server = MockServer::start().await;
    page(
        &server,
        "/",
        r#"<a href="https://elsewhere.example.org/x">out</a><a href="/docs/manual.pdf">pdf</a>"#,
    )
    .await;
    page(&server, "/docs/manual.pdf", "pdf").await;

    let map = mapper(3, 100)
        .map_website(&format!("{}/", server.uri()), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(map.structure.external_links.len(), 1);
    assert_eq!(map.structure.external_links[0].domain, "elsewhere.example.org");
    assert_eq!(map.structure.links.len(), 1);
    assert_eq!(map.structure.links[0].text, "pdf");
    assert_eq!(map.visited.len(), 2);

    let files = &map.structure.domains["127.0.0.1"].files;
    assert!(files.contains("/docs/manual.pdf"));
}

#[tokio::test]
async fn test_cancelled_crawl_stops() {
    let server = MockServer::start().await;
    page(&server, "/", r#"<a href="/a">A</a>"#).await;

    let cancel = CancellationToken::new();
    cancel.cancel();

    let map = mapper(3, 100)
        .map_website(&format!("{}/", server.uri()), &cancel)
        .await
        .unwrap();

    assert!(map.cancelled);
    assert!(map.visited.is_empty());
}

#[tokio::test]
async fn test_progress_events_published() {
    let server = MockServer::start().await;
    page(&server, "/", r#"<a href="/a">A</a>"#).await;
    page(&server, "/a", "leaf").await;

    let bus = Arc::new(EventBus::new());
    let messages = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&messages);
    bus.subscribe(EventKind::Progress, move |event| {
        if let ScanEvent::Progress { message, .. } = event {
            sink.lock().push(message.clone());
        }
        Ok(())
    });

    let client = Arc::new(HttpClient::from_config(&ScanConfig::default()).unwrap());
    SiteMapper::new(client, bus, 3, 100)
        .with_discovery(None)
        .map_website(&format!("{}/", server.uri()), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(messages.lock().len(), 2);
}

#[tokio::test]
async fn test_invalid_start_url() {
    let result = mapper(3, 100)
        .map_website("not a url", &CancellationToken::new())
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_shared_public_suffix_is_external() {
    let server = MockServer::start().await;
    page(
        &server,
        "/",
        r#"<a href="https://attacker.co.uk/x">a</a><a href="https://shop.example.co.uk/y">b</a><a href="/local">c</a>"#,
    )
    .await;
    page(&server, "/local", "leaf").await;

    let map = mapper(3, 100)
        .map_website(&format!("{}/", server.uri()), &CancellationToken::new())
        .await
        .unwrap();

    let external: Vec<&str> = map
        .structure
        .external_links
        .iter()
        .map(|l| l.domain.as_str())
        .collect();
    assert_eq!(external, vec!["attacker.co.uk", "shop.example.co.uk"]);
    assert_eq!(map.visited.len(), 2);
}
