//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loop that ties the frontier store, the
//! fetcher, the extractor, the URL classifier and the record sink together:
//! - Seeding the frontier (a no-op when resuming)
//! - Picking the next URL, products first
//! - Fetching, extracting, and queueing discovered links
//! - Handling interrupts between pages
//! - Closing the store on every exit path

use crate::config::{Config, CrawlTarget};
use crate::crawler::fetcher::{HttpFetcher, PageFetcher};
use crate::crawler::parser::{HtmlExtractor, PageExtractor, ParsedPage};
use crate::output::{load_progress, CsvRecordSink, ProductRecord, RecordSink};
use crate::state::CrawlState;
use crate::storage::{open_frontier, FrontierStore, StorageResult};
use crate::url::{UrlClassifier, UrlKind};
use crate::VitrineError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared stop request, checked between pages
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Sets the flag when the process receives Ctrl-C
    ///
    /// Must be called from within a Tokio runtime.
    pub fn listen_for_ctrl_c(&self) {
        let flag = self.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupt received, stopping after the current page");
                flag.request();
            }
        });
    }
}

/// Picks the next URL to visit: any unvisited product first, else any
/// unvisited URL. Returns None when the frontier is exhausted.
pub fn select_next(store: &dyn FrontierStore) -> StorageResult<Option<(String, UrlKind)>> {
    if store.has_unvisited_product()? {
        return Ok(Some((store.next_unvisited_product()?, UrlKind::Product)));
    }

    if store.has_unvisited()? {
        return Ok(Some((store.next_unvisited()?, UrlKind::Page)));
    }

    Ok(None)
}

/// Summary of one crawl session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrawlReport {
    /// State the session ended in
    pub state: CrawlState,

    /// Pages marked visited during this session
    pub pages_visited: u64,

    /// Pages whose fetch failed (still marked visited)
    pub fetch_failures: u64,

    /// Product records handed to the sink
    pub records_written: u64,

    /// URLs newly added to the frontier
    pub links_discovered: u64,

    pub elapsed: Duration,
}

/// Main crawler coordinator structure
pub struct Coordinator<S, F, X, R> {
    target: CrawlTarget,
    classifier: UrlClassifier,
    seed: String,
    store: S,
    fetcher: F,
    extractor: X,
    sink: R,
    shutdown: ShutdownFlag,
    progress_interval: u64,
    state: CrawlState,
    report: CrawlReport,
}

impl<S, F, X, R> Coordinator<S, F, X, R>
where
    S: FrontierStore,
    F: PageFetcher,
    X: PageExtractor,
    R: RecordSink,
{
    /// Creates a coordinator in the `Idle` state
    pub fn new(
        target: &CrawlTarget,
        seed: impl Into<String>,
        store: S,
        fetcher: F,
        extractor: X,
        sink: R,
        shutdown: ShutdownFlag,
    ) -> Self {
        Self {
            target: target.clone(),
            classifier: UrlClassifier::new(target),
            seed: seed.into(),
            store,
            fetcher,
            extractor,
            sink,
            shutdown,
            progress_interval: 10,
            state: CrawlState::Idle,
            report: CrawlReport::default(),
        }
    }

    /// Logs progress every `interval` visited pages
    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval.max(1);
        self
    }

    pub fn state(&self) -> CrawlState {
        self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn sink(&self) -> &R {
        &self.sink
    }

    /// Gives the store back so the caller can close it
    pub fn into_store(self) -> S {
        self.store
    }

    /// Runs the crawl loop until the frontier is exhausted, a stop is
    /// requested, or a fatal error occurs
    ///
    /// On a fatal error the coordinator ends in `Failed` and the error is
    /// returned; the store is left open for the caller to close.
    ///
    /// Store calls are synchronous and may sleep on the calling thread while
    /// the database is busy. Pages are processed one at a time, so nothing
    /// else on the runtime waits on the crawl.
    pub async fn run(&mut self) -> crate::Result<CrawlReport> {
        let started = Instant::now();
        let result = self.crawl_loop().await;
        self.report.elapsed = started.elapsed();

        match result {
            Ok(()) => {
                self.report.state = self.state;
                tracing::info!(
                    "Crawl {}: {} pages visited, {} records written, {} new links in {:?}",
                    self.state,
                    self.report.pages_visited,
                    self.report.records_written,
                    self.report.links_discovered,
                    self.report.elapsed
                );
                Ok(self.report.clone())
            }
            Err(e) => {
                if let Ok(failed) = self.state.fail() {
                    self.state = failed;
                }
                self.report.state = self.state;
                tracing::error!("Crawl failed: {}", e);
                Err(e)
            }
        }
    }

    async fn crawl_loop(&mut self) -> crate::Result<()> {
        let running = self.state.start()?;

        if self.store.insert_if_absent(&self.seed)? {
            tracing::info!("Seeded frontier with {}", self.seed);
        } else {
            tracing::info!("Resuming crawl, seed {} already known", self.seed);
        }
        self.state = running;

        loop {
            if self.shutdown.is_requested() {
                self.state = self.state.interrupt()?;
                tracing::info!("Crawl interrupted, frontier left resumable");
                return Ok(());
            }

            let Some((url, kind)) = select_next(&self.store)? else {
                self.state = self.state.complete()?;
                tracing::info!("Frontier exhausted, crawl complete");
                return Ok(());
            };

            self.visit(&url, kind).await?;
            self.report.pages_visited += 1;

            if self.report.pages_visited % self.progress_interval == 0 {
                let progress = load_progress(&self.store)?;
                tracing::info!(
                    "Progress: {} pages visited this run, {}",
                    self.report.pages_visited,
                    progress
                );
            }
        }
    }

    /// Processes a single URL
    ///
    /// A fetch failure is logged and the URL is still marked visited.
    /// Discovered links are stored before the product record is appended and
    /// the page is marked visited last. A failure at any step leaves the page
    /// unvisited, and a failed link insert leaves no record behind.
    async fn visit(&mut self, url: &str, kind: UrlKind) -> crate::Result<()> {
        tracing::debug!("Visiting {} page: {}", kind, url);

        match self.fetcher.fetch(url).await {
            Ok(body) => {
                let page = self.extractor.extract(&body);
                self.process_page(url, kind, page)?;
            }
            Err(e) => {
                tracing::warn!("Failed to fetch {}: {}", url, e);
                self.report.fetch_failures += 1;
            }
        }

        self.store.mark_visited(url)?;
        Ok(())
    }

    fn process_page(&mut self, url: &str, kind: UrlKind, page: ParsedPage) -> crate::Result<()> {
        let ParsedPage {
            links,
            title,
            heading,
        } = page;

        let accepted = self
            .classifier
            .classify_all(links.iter().map(Option::as_deref));
        let added = self.store.insert_many(&accepted)?;
        self.report.links_discovered += added as u64;

        tracing::debug!(
            "{}: {} links, {} accepted ({} products), {} new",
            url,
            links.len(),
            accepted.len(),
            accepted.iter().filter(|link| self.target.is_product(link)).count(),
            added
        );

        if kind.is_product() {
            match heading {
                Some(name) => {
                    self.sink
                        .append(&ProductRecord::new(Some(name), title, url))?;
                    self.report.records_written += 1;
                }
                None => {
                    tracing::debug!("No heading on {}, treating it as a non-product page", url);
                }
            }
        }

        Ok(())
    }
}

/// Runs a complete crawl for the configuration
///
/// Wires the production collaborators (SQLite frontier, HTTP fetcher, HTML
/// extractor, CSV sink), runs the coordinator, and closes the store on
/// every exit path before returning the run's outcome.
pub async fn run_crawl(config: &Config, shutdown: ShutdownFlag) -> crate::Result<CrawlReport> {
    let target = config.crawl_target()?;
    let fetcher = HttpFetcher::with_settings(&config.crawler.user_agent, config.request_timeout())?;
    let sink = CsvRecordSink::new(config.records_path());
    let store = open_frontier(config, &target)?;

    tracing::info!(
        "Crawling {} (products: {}) into {}",
        target.base_url,
        target.product_pattern,
        config.database_path().display()
    );

    let mut coordinator = Coordinator::new(
        &target,
        config.seed_url(),
        store,
        fetcher,
        HtmlExtractor::new(),
        sink,
        shutdown,
    )
    .with_progress_interval(config.crawler.progress_interval);

    let result = coordinator.run().await;
    let closed = coordinator.into_store().close();

    match (result, closed) {
        (Ok(report), Ok(())) => Ok(report),
        (Ok(_), Err(e)) => Err(VitrineError::Storage(e)),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(close_error)) => {
            tracing::warn!("Failed to close frontier after error: {}", close_error);
            Err(e)
        }
    }
}
