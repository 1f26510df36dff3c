//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end, including resuming from an existing
//! frontier database.

use tempfile::TempDir;
use vitrine::config::{parse_config, Config};
use vitrine::crawler::{run_crawl, ShutdownFlag};
use vitrine::output::load_progress;
use vitrine::storage::{delete_store, open_frontier, FrontierStore, StorageError};
use vitrine::{CrawlState, VitrineError};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at the mock server, with the
/// database and records file inside `dir`
fn create_test_config(server: &MockServer, dir: &TempDir, records_file: &str) -> Config {
    let toml = format!(
        r#"
[site]
url = "{}"
product-pattern = "%/p"

[crawler]
busy-retry-delay-ms = 20
request-timeout-secs = 5
progress-interval = 2
user-agent = "vitrine-test/1.0"

[output]
database-path = '{}'
records-path = '{}'
"#,
        server.uri(),
        dir.path().join("crawl.db").display(),
        dir.path().join(records_file).display(),
    );

    parse_config(&toml).expect("test config should be valid")
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(format!("<html>{}</html>", body))
        .insert_header("content-type", "text/html")
}

async fn mount_page(server: &MockServer, page: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(html(body))
        .mount(server)
        .await;
}

/// A small shop: home -> category -> products, plus links the crawler
/// must never follow
async fn mount_shop(server: &MockServer) {
    mount_page(
        server,
        "/",
        r##"<head><title>Shop</title></head><body>
           <a href="/category">Category</a>
           <a href="/perfume-x/p">Perfume X</a>
           <a href="mailto:sac@shop.test">Mail us</a>
           <a href="https://other.org/page">Partner</a>
           <a href="/checkout/cart/add?sku=1">Buy</a>
           <a href="#">Top</a>
           </body>"##,
    )
    .await;

    mount_page(
        server,
        "/category",
        r#"<body><a href="/batom-y/p">Batom Y</a><a href="/missing">Old</a></body>"#,
    )
    .await;

    mount_page(
        server,
        "/perfume-x/p",
        r#"<head><title>Perfume X | Loja</title></head>
           <body><h1>Perfume X</h1><a href="/category">Back</a></body>"#,
    )
    .await;

    // Product URL without a heading: a redirect page, not a product
    mount_page(
        server,
        "/batom-y/p",
        r#"<head><title>Redirecting</title></head><body>Moved</body>"#,
    )
    .await;

    // "/missing" is not mounted, so wiremock answers 404
}

#[tokio::test]
async fn test_full_crawl_single_domain() {
    let server = MockServer::start().await;
    mount_shop(&server).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, &dir, "products.csv");

    let report = run_crawl(&config, ShutdownFlag::new()).await.unwrap();

    assert_eq!(report.state, CrawlState::Completed);
    // seed, /perfume-x/p, /category, /batom-y/p, /missing
    assert_eq!(report.pages_visited, 5);
    assert_eq!(report.fetch_failures, 1);
    assert_eq!(report.records_written, 1);
    assert_eq!(report.links_discovered, 4);

    let csv = std::fs::read_to_string(config.records_path()).unwrap();
    assert_eq!(
        csv,
        format!(
            "product_name;title;url\nPerfume X;Perfume X | Loja;{}/perfume-x/p\n",
            server.uri()
        )
    );

    // Cart actions and foreign links are never requested
    let requests = server.received_requests().await.unwrap();
    assert!(requests
        .iter()
        .all(|r| !r.url.path().starts_with("/checkout")));
    assert_eq!(requests.len(), 5);
}

#[tokio::test]
async fn test_product_pages_visited_before_other_pages() {
    let server = MockServer::start().await;
    mount_shop(&server).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, &dir, "products.csv");

    run_crawl(&config, ShutdownFlag::new()).await.unwrap();

    let order: Vec<String> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|r| r.url.path().to_string())
        .collect();

    assert_eq!(
        order,
        vec!["/", "/perfume-x/p", "/category", "/batom-y/p", "/missing"]
    );
}

#[tokio::test]
async fn test_progress_after_crawl() {
    let server = MockServer::start().await;
    mount_shop(&server).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, &dir, "products.csv");
    run_crawl(&config, ShutdownFlag::new()).await.unwrap();

    let target = config.crawl_target().unwrap();
    let store = open_frontier(&config, &target).unwrap();
    let progress = load_progress(&store).unwrap();

    assert_eq!(progress.total, 5);
    assert_eq!(progress.unvisited, 0);
    assert_eq!(progress.products, 2);
    assert_eq!(progress.unvisited_products, 0);
    assert_eq!(progress.percent_visited(), 100.0);
}

#[tokio::test]
async fn test_interrupted_crawl_resumes() {
    let server = MockServer::start().await;
    mount_shop(&server).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, &dir, "products.csv");

    // Stop requested before the first page: only the seed is stored
    let shutdown = ShutdownFlag::new();
    shutdown.request();
    let report = run_crawl(&config, shutdown).await.unwrap();

    assert_eq!(report.state, CrawlState::Interrupted);
    assert_eq!(report.pages_visited, 0);
    assert!(server.received_requests().await.unwrap().is_empty());

    // Same database, same seed: the crawl picks up where it stopped
    let report = run_crawl(&config, ShutdownFlag::new()).await.unwrap();

    assert_eq!(report.state, CrawlState::Completed);
    assert_eq!(report.pages_visited, 5);

    let csv = std::fs::read_to_string(config.records_path()).unwrap();
    assert_eq!(csv.lines().count(), 2);
}

#[tokio::test]
async fn test_resume_skips_visited_urls() {
    let server = MockServer::start().await;
    let base = server.uri();

    // The seed was already visited in an earlier run
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html("<a href=\"/category\">Category</a>"))
        .expect(0)
        .mount(&server)
        .await;
    mount_page(&server, "/category", r#"<a href="/new-item/p">New</a>"#).await;
    mount_page(
        &server,
        "/new-item/p",
        r#"<title>New Item</title><h1>New Item</h1>"#,
    )
    .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, &dir, "products.csv");
    let target = config.crawl_target().unwrap();

    {
        let mut store = open_frontier(&config, &target).unwrap();
        store.insert_if_absent(&base).unwrap();
        store.insert_if_absent(&format!("{}/category", base)).unwrap();
        store.mark_visited(&base).unwrap();
        store.close().unwrap();
    }

    let report = run_crawl(&config, ShutdownFlag::new()).await.unwrap();

    assert_eq!(report.state, CrawlState::Completed);
    assert_eq!(report.pages_visited, 2);
    assert_eq!(report.records_written, 1);
    assert_eq!(report.links_discovered, 1);
}

#[tokio::test]
async fn test_record_sink_failure_fails_crawl() {
    let server = MockServer::start().await;
    mount_shop(&server).await;

    let dir = TempDir::new().unwrap();
    // The records file lives in a directory that does not exist
    let config = create_test_config(&server, &dir, "no-such-dir/products.csv");

    let result = run_crawl(&config, ShutdownFlag::new()).await;
    assert!(matches!(result, Err(VitrineError::Sink(_))));

    // The store was closed cleanly and the product is still pending
    let target = config.crawl_target().unwrap();
    let store = open_frontier(&config, &target).unwrap();
    assert_eq!(
        store.next_unvisited_product().unwrap(),
        format!("{}/perfume-x/p", server.uri())
    );
    assert_eq!(store.count_unvisited().unwrap(), 2);
}

#[tokio::test]
async fn test_locked_database_with_bounded_retries_fails_crawl() {
    let server = MockServer::start().await;
    mount_shop(&server).await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server, &dir, "products.csv");
    config.crawler.max_busy_retries = Some(1);

    // Create the database, then hold its write lock from another connection
    let target = config.crawl_target().unwrap();
    open_frontier(&config, &target).unwrap().close().unwrap();
    let other = rusqlite::Connection::open(config.database_path()).unwrap();
    other.execute_batch("BEGIN EXCLUSIVE").unwrap();

    let result = run_crawl(&config, ShutdownFlag::new()).await;
    assert!(matches!(
        result,
        Err(VitrineError::Storage(StorageError::ContentionExhausted { .. }))
    ));
    assert!(!config.records_path().exists());

    other.execute_batch("COMMIT").unwrap();
    drop(other);

    // Nothing was written and the database reopens cleanly
    let store = open_frontier(&config, &target).unwrap();
    assert_eq!(store.count_total().unwrap(), 0);
    store.close().unwrap();

    let report = run_crawl(&config, ShutdownFlag::new()).await.unwrap();
    assert_eq!(report.state, CrawlState::Completed);
    assert_eq!(report.records_written, 1);
}

#[tokio::test]
async fn test_delete_state_after_crawl() {
    let server = MockServer::start().await;
    mount_shop(&server).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, &dir, "products.csv");
    run_crawl(&config, ShutdownFlag::new()).await.unwrap();

    let database = config.database_path();
    assert!(database.exists());

    assert!(delete_store(&database).unwrap());
    assert!(!database.exists());

    // The records survive; only the frontier is removed
    assert!(config.records_path().exists());
}
