//! Storage module for the crawl frontier
//!
//! The frontier is the durable set of every URL discovered on the target
//! site, each with a visited flag. It lives in SQLite so a crawl can be
//! interrupted and resumed from the same file.

mod retry;
mod schema;
mod sqlite;
mod traits;

pub use retry::RetryPolicy;
pub use sqlite::SqliteFrontier;
pub use traits::{FrontierStore, StorageError, StorageResult};

use crate::config::{Config, CrawlTarget};
use std::path::Path;

/// Opens the frontier database described by the configuration
pub fn open_frontier(config: &Config, target: &CrawlTarget) -> StorageResult<SqliteFrontier> {
    SqliteFrontier::open(&config.database_path(), target, retry_policy(config))
}

/// Builds the busy-retry policy from the crawler settings
pub fn retry_policy(config: &Config) -> RetryPolicy {
    RetryPolicy {
        delay: config.busy_retry_delay(),
        max_retries: config.crawler.max_busy_retries,
    }
}

/// Removes a frontier database along with its WAL side files
///
/// Returns false if there was nothing to delete.
pub fn delete_store(path: &Path) -> StorageResult<bool> {
    let existed = path.exists();

    for suffix in ["", "-wal", "-shm"] {
        let mut file = path.as_os_str().to_owned();
        file.push(suffix);

        match std::fs::remove_file(&file) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }

    Ok(existed)
}
