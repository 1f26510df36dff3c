//! State module for tracking crawl progress
//!
//! A crawl session moves through `Idle -> Running` and then ends in one of
//! `Completed`, `Interrupted` or `Failed`. Transitions are explicit so the
//! loop's lifecycle can be tested without any I/O.

mod crawl_state;

pub use crawl_state::CrawlState;
