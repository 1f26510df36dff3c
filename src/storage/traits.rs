//! Storage traits and error types
//!
//! This module defines the trait interface for the frontier store and its
//! error taxonomy.

use thiserror::Error;

/// Errors that can occur during frontier operations
///
/// Transient contention never appears here unless a retry bound was
/// configured and exhausted; everything else is fatal to the crawl.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{operation} failed: {source}")]
    Fatal {
        operation: &'static str,
        source: rusqlite::Error,
    },

    #[error("{operation} still busy after {attempts} attempts")]
    ContentionExhausted {
        operation: &'static str,
        attempts: u32,
    },

    #[error("No unvisited URL left in the frontier (products only: {products_only})")]
    EmptyFrontier { products_only: bool },

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable set of known URLs with a visited flag
///
/// A URL appears at most once; `visited` only ever moves from false to true.
/// Whether a URL is a product is derived from the crawl's product pattern
/// whenever it is read, never stored.
pub trait FrontierStore {
    // ===== Writes =====

    /// Inserts the URL unless it is already known
    ///
    /// Returns true if the URL was new.
    fn insert_if_absent(&mut self, url: &str) -> StorageResult<bool>;

    /// Inserts every URL that is not already known, all or nothing
    ///
    /// Returns the number of URLs that were new.
    fn insert_many(&mut self, urls: &[String]) -> StorageResult<usize>;

    /// Marks a known URL as visited
    ///
    /// Returns false (and changes nothing) when the URL is unknown.
    fn mark_visited(&mut self, url: &str) -> StorageResult<bool>;

    // ===== Aggregates =====

    /// Number of known URLs
    fn count_total(&self) -> StorageResult<u64>;

    /// Number of URLs not yet visited
    fn count_unvisited(&self) -> StorageResult<u64>;

    /// Number of known URLs matching the product pattern
    fn count_total_matching_pattern(&self) -> StorageResult<u64>;

    /// Number of product URLs not yet visited
    fn count_unvisited_matching_pattern(&self) -> StorageResult<u64>;

    fn has_unvisited(&self) -> StorageResult<bool> {
        Ok(self.count_unvisited()? > 0)
    }

    fn has_unvisited_product(&self) -> StorageResult<bool> {
        Ok(self.count_unvisited_matching_pattern()? > 0)
    }

    // ===== Retrieval =====

    /// Returns some unvisited URL
    ///
    /// Fails with `EmptyFrontier` when there is none; callers check
    /// `has_unvisited` first.
    fn next_unvisited(&self) -> StorageResult<String>;

    /// Returns some unvisited product URL
    ///
    /// Fails with `EmptyFrontier` when there is none; callers check
    /// `has_unvisited_product` first.
    fn next_unvisited_product(&self) -> StorageResult<String>;
}
