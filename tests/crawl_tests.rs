//! Integration tests for the crawler
//!
//! These tests use wiremock to serve small fake sites and exercise the
//! fetch -> extract -> paginate loop end-to-end.

use pagetrawl::config::CrawlConfig;
use pagetrawl::crawler::{fetch_table, preview, run_crawl, CrawlEvent, Engine};
use pagetrawl::output::{write_csv, write_json};
use pagetrawl::{CrawlError, FetchError, TrawlError};
use std::time::Duration;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// An HTML response with the given body
fn html(body: impl Into<String>) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body.into())
        .insert_header("content-type", "text/html")
}

/// Creates a test configuration for a crawl starting at `start_url`
fn create_test_config(start_url: String, max_pages: u32) -> CrawlConfig {
    let mut config = CrawlConfig::new(start_url, "li.item");
    config.next_selector = Some("div.pager".to_string());
    config.max_pages = max_pages;
    config.delay_ms = 0;
    config.user_agent = "TestBot/1.0".to_string();
    config.timeout_secs = 5;
    config
}

/// Mounts a three-page site: /p/1 (2 items) -> /p/2 (1 item) -> /p/3 (0 items)
async fn mount_three_page_site(mock_server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/p/1"))
        .respond_with(html(
            r#"<html><body><ul>
                <li class="item">Alpha</li>
                <li class="item">Beta</li>
            </ul><div class="pager"><a href="/p/2">Next</a></div></body></html>"#,
        ))
        .mount(mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/p/2"))
        .respond_with(html(
            r#"<html><body><ul>
                <li class="item">Gamma</li>
            </ul><div class="pager"><span>2</span><a href="/p/3">Next</a></div></body></html>"#,
        ))
        .mount(mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/p/3"))
        .respond_with(html(r#"<html><body><p>No more items</p></body></html>"#))
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn test_three_page_site() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    mount_three_page_site(&mock_server).await;

    let config = create_test_config(format!("{}/p/1", base_url), 5);
    let result = run_crawl(config).await.expect("Crawl failed");

    assert_eq!(result.pages_fetched, 3);
    assert_eq!(result.items_found(), 3);
    assert_eq!(
        result.visited,
        vec![
            format!("{}/p/1", base_url),
            format!("{}/p/2", base_url),
            format!("{}/p/3", base_url),
        ]
    );

    let values: Vec<&str> = result.records.iter().map(|r| r.value.as_str()).collect();
    assert_eq!(values, vec!["Alpha", "Beta", "Gamma"]);
    assert_eq!(result.records[0].page, format!("{}/p/1", base_url));
    assert_eq!(result.records[2].page, format!("{}/p/2", base_url));
    assert_eq!(result.status_line(), "Finished: 3 items from 3 page(s).");
}

#[tokio::test]
async fn test_page_limit_enforced_before_fetch() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/p/1"))
        .respond_with(html(
            r#"<li class="item">Alpha</li><li class="item">Beta</li>
               <div class="pager"><a href="/p/2">Next</a></div>"#,
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/p/2"))
        .respond_with(html(
            r#"<li class="item">Gamma</li><div class="pager"><a href="/p/3">Next</a></div>"#,
        ))
        .mount(&mock_server)
        .await;

    // Page 3 must never be requested with max_pages=2
    Mock::given(method("GET"))
        .and(path("/p/3"))
        .respond_with(html(r#"<li class="item">Delta</li>"#))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = create_test_config(format!("{}/p/1", base_url), 2);
    let result = run_crawl(config).await.expect("Crawl failed");

    assert_eq!(result.pages_fetched, 2);
    assert_eq!(result.items_found(), 3);
}

#[tokio::test]
async fn test_single_page_without_next_selector() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    mount_three_page_site(&mock_server).await;

    let mut config = create_test_config(format!("{}/p/1", base_url), 5);
    config.next_selector = None;
    let result = run_crawl(config).await.expect("Crawl failed");

    assert_eq!(result.pages_fetched, 1);
    assert_eq!(result.items_found(), 2);
}

#[tokio::test]
async fn test_cyclic_next_link_stops() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/p/1"))
        .respond_with(html(
            r#"<li class="item">one</li><div class="pager"><a href="/p/2">Next</a></div>"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/p/2"))
        .respond_with(html(format!(
            r#"<li class="item">two</li><div class="pager"><a href="{}/p/1">Back to start</a></div>"#,
            base_url
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(format!("{}/p/1", base_url), 10);
    let result = run_crawl(config).await.expect("Cycle must end the run, not fail it");

    assert_eq!(result.pages_fetched, 2);
    assert_eq!(result.items_found(), 2);
}

#[tokio::test]
async fn test_fetch_failure_aborts_run() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/p/1"))
        .respond_with(html(
            r#"<li class="item">one</li><div class="pager"><a href="/p/2">Next</a></div>"#,
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/p/2"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/p/3"))
        .respond_with(html(r#"<li class="item">three</li>"#))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = create_test_config(format!("{}/p/1", base_url), 5);
    let err = run_crawl(config).await.expect_err("Run should abort");

    let TrawlError::Crawl(crawl_err) = &err else {
        panic!("Expected CrawlError, got {:?}", err);
    };
    assert_eq!(crawl_err.url(), format!("{}/p/2", base_url));
    assert_eq!(crawl_err.page(), 2);
    assert!(matches!(
        crawl_err,
        CrawlError::Fetch {
            source: FetchError::HttpStatus { status: 500, .. },
            ..
        }
    ));
    assert_eq!(
        err.to_string(),
        format!("Failed to fetch {}/p/2: HTTP 500", base_url)
    );
}

#[tokio::test]
async fn test_unjoinable_next_link_aborts_run() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/p/1"))
        .respond_with(html(
            r#"<li class="item">one</li><div class="pager"><a href="http://[::1">Next</a></div>"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(format!("{}/p/1", base_url), 5);
    let err = run_crawl(config).await.expect_err("Run should abort");

    let TrawlError::Crawl(crawl_err) = &err else {
        panic!("Expected CrawlError, got {:?}", err);
    };
    assert_eq!(crawl_err.url(), format!("{}/p/1", base_url));
    assert_eq!(crawl_err.page(), 1);
    assert!(matches!(
        crawl_err,
        CrawlError::Resolve { href, .. } if href == "http://[::1"
    ));
}

#[tokio::test]
async fn test_zero_items_is_success() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/empty"))
        .respond_with(html(r#"<html><body><p>nothing</p></body></html>"#))
        .mount(&mock_server)
        .await;

    let config = create_test_config(format!("{}/empty", base_url), 3);
    let result = run_crawl(config).await.expect("Empty result is not an error");

    assert!(result.is_empty());
    assert_eq!(result.pages_fetched, 1);
}

#[tokio::test]
async fn test_attribute_extraction_keeps_empty_slots() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/links"))
        .respond_with(html(
            r#"<a class="doc" href="/a.pdf">A</a><a class="doc">B</a><a class="doc" href="https://cdn.example.com/c.pdf">C</a>"#,
        ))
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(format!("{}/links", base_url), 1);
    config.selector = "a.doc".to_string();
    config.attribute = Some("href".to_string());
    let result = run_crawl(config).await.expect("Crawl failed");

    let values: Vec<&str> = result.records.iter().map(|r| r.value.as_str()).collect();
    assert_eq!(values, vec!["/a.pdf", "", "https://cdn.example.com/c.pdf"]);
}

#[tokio::test]
async fn test_session_cookie_and_user_agent_reused() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/p/1"))
        .and(header("user-agent", "TestBot/1.0"))
        .respond_with(
            html(r#"<li class="item">one</li><div class="pager"><a href="/p/2">Next</a></div>"#)
                .insert_header("set-cookie", "session=abc; Path=/"),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/p/2"))
        .and(header("cookie", "session=abc"))
        .respond_with(html(r#"<li class="item">two</li>"#))
        .mount(&mock_server)
        .await;

    // Without the session cookie page 2 is refused
    Mock::given(method("GET"))
        .and(path("/p/2"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&mock_server)
        .await;

    let config = create_test_config(format!("{}/p/1", base_url), 5);
    let result = run_crawl(config).await.expect("Session cookie should be sent");

    assert_eq!(result.items_found(), 2);
}

#[tokio::test]
async fn test_timeout_is_reported() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(html("<li class=\"item\">late</li>").set_delay(Duration::from_secs(3)))
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(format!("{}/slow", base_url), 1);
    config.timeout_secs = 1;
    let err = run_crawl(config).await.expect_err("Request should time out");

    assert!(matches!(
        err,
        TrawlError::Crawl(CrawlError::Fetch {
            source: FetchError::Timeout { .. },
            ..
        })
    ));
    assert!(err.to_string().ends_with(": timeout"));
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    let config = create_test_config("http://127.0.0.1:1/p/1".to_string(), 1);
    let err = run_crawl(config).await.expect_err("Nothing listens on port 1");

    assert!(matches!(
        err,
        TrawlError::Crawl(CrawlError::Fetch {
            source: FetchError::Transport { .. },
            page: 1,
            ..
        })
    ));
}

#[tokio::test]
async fn test_spawned_run_reports_status_then_one_terminal_event() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    mount_three_page_site(&mock_server).await;

    let engine = Engine::new();
    let mut config = create_test_config(format!("{}/p/1", base_url), 5);
    config.delay_ms = 10;
    let mut handle = engine.spawn(config).expect("Engine should be idle");

    let mut events = Vec::new();
    while let Some(event) = handle.next_event().await {
        events.push(event);
    }

    let terminal: Vec<&CrawlEvent> = events.iter().filter(|e| e.is_terminal()).collect();
    assert_eq!(terminal.len(), 1);
    assert!(events.last().map(CrawlEvent::is_terminal).unwrap_or(false));

    let statuses: Vec<&str> = events
        .iter()
        .filter_map(|e| match e {
            CrawlEvent::Status(s) => Some(s.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(statuses.first(), Some(&"Starting scrape..."));
    assert_eq!(
        statuses.iter().filter(|s| s.starts_with("Fetching ")).count(),
        3
    );
    assert_eq!(statuses.iter().filter(|s| s.starts_with("Waiting ")).count(), 2);
    assert_eq!(
        statuses.last(),
        Some(&"Finished: 3 items from 3 page(s).")
    );

    match events.last() {
        Some(CrawlEvent::Finished(result)) => assert_eq!(result.items_found(), 3),
        other => panic!("Expected Finished, got {:?}", other),
    }
    assert!(!engine.is_active());
}

#[tokio::test]
async fn test_second_run_rejected_while_active() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/p/1"))
        .respond_with(html(r#"<li class="item">one</li>"#).set_delay(Duration::from_millis(300)))
        .mount(&mock_server)
        .await;

    let engine = Engine::new();
    let config = create_test_config(format!("{}/p/1", base_url), 1);
    let handle = engine.spawn(config.clone()).expect("Engine should be idle");

    assert!(engine.is_active());
    assert!(matches!(engine.spawn(config.clone()), Err(TrawlError::Busy)));
    assert!(matches!(engine.run(config.clone()).await, Err(TrawlError::Busy)));

    let result = handle.wait().await.expect("First run should finish");
    assert_eq!(result.items_found(), 1);

    assert!(!engine.is_active());
    let again = engine.run(config).await.expect("Engine is free again");
    assert_eq!(again.items_found(), 1);
}

#[tokio::test]
async fn test_cancel_stops_before_next_fetch() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    mount_three_page_site(&mock_server).await;

    let engine = Engine::new();
    let mut config = create_test_config(format!("{}/p/1", base_url), 5);
    config.delay_ms = 200;
    let mut handle = engine.spawn(config).expect("Engine should be idle");

    let result = loop {
        match handle.next_event().await {
            Some(CrawlEvent::Status(status)) if status.starts_with("Waiting ") => handle.cancel(),
            Some(CrawlEvent::Status(_)) => {}
            Some(CrawlEvent::Finished(result)) => break result,
            Some(CrawlEvent::Failed(e)) => panic!("Run failed: {}", e),
            None => panic!("Channel closed without a terminal event"),
        }
    };

    assert_eq!(result.pages_fetched, 1);
    assert_eq!(result.items_found(), 2);
}

#[tokio::test]
async fn test_preview_fetches_only_start_page() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/p/1"))
        .respond_with(html(
            r#"<li class="item"> Alpha </li><div class="pager"><a href="/p/2">Next</a></div>"#,
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/p/2"))
        .respond_with(html(r#"<li class="item">Beta</li>"#))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = create_test_config(format!("{}/p/1", base_url), 5);
    let values = preview(&config).await.expect("Preview failed");
    assert_eq!(values, vec!["Alpha"]);
}

#[tokio::test]
async fn test_form_post_table_extraction() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let form_url = format!("{}/form", base_url);

    Mock::given(method("GET"))
        .and(path("/form"))
        .respond_with(html("<form></form>").insert_header("set-cookie", "ASP.NET_SessionId=xyz; Path=/"))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/form"))
        .and(header("cookie", "ASP.NET_SessionId=xyz"))
        .and(header("referer", form_url.as_str()))
        .and(header("origin", base_url.as_str()))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("District=Ambala"))
        .respond_with(html(
            r#"<table border="1">
                <tr><th>Khewat</th><th>Owner</th></tr>
                <tr><td>12</td><td>Ram</td></tr>
            </table>"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(form_url, 1);
    let fields = vec![
        ("District".to_string(), "Ambala".to_string()),
        ("B1".to_string(), "Submit".to_string()),
    ];
    let table = fetch_table(&config, "table[border='1']", Some(fields.as_slice()))
        .await
        .expect("Form post failed")
        .expect("Table should be present");

    assert_eq!(table.headers, vec!["Khewat", "Owner"]);
    assert_eq!(table.rows, vec![vec!["12".to_string(), "Ram".to_string()]]);
}

#[tokio::test]
async fn test_export_after_successful_run() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    mount_three_page_site(&mock_server).await;

    let config = create_test_config(format!("{}/p/1", base_url), 5);
    let result = run_crawl(config).await.expect("Crawl failed");

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let csv_path = dir.path().join("out.csv");
    let json_path = dir.path().join("out.json");

    write_csv(&result, &csv_path).expect("CSV export failed");
    write_json(&result, &json_path).expect("JSON export failed");

    let csv = std::fs::read_to_string(&csv_path).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "page,value");
    assert_eq!(lines[1], format!("{}/p/1,Alpha", base_url));

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
    let items = json.as_array().expect("JSON export is an array");
    assert_eq!(items.len(), 3);
    assert_eq!(items[2]["value"], "Gamma");
    assert_eq!(items[2]["page"], format!("{}/p/2", base_url));
}
