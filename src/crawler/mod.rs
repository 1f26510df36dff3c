//! Crawler module for page fetching and crawl orchestration
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching behind the `PageFetcher` trait
//! - HTML link and product data extraction
//! - The crawl loop and its state machine

mod coordinator;
mod fetcher;
mod parser;

pub use coordinator::{run_crawl, select_next, Coordinator, CrawlReport, ShutdownFlag};
pub use fetcher::{build_http_client, FetchError, HttpFetcher, PageFetcher};
pub use parser::{HtmlExtractor, PageExtractor, ParsedPage};
