//! SQLite frontier implementation
//!
//! Every operation runs through the busy-retry loop, so a database locked by
//! another process delays the crawl instead of failing it.

use crate::config::CrawlTarget;
use crate::storage::retry::{with_busy_retry, RetryPolicy};
use crate::storage::schema::{frontier_columns, initialize_schema, missing_columns};
use crate::storage::traits::{FrontierStore, StorageError, StorageResult};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::path::Path;

/// SQLite-backed frontier store
pub struct SqliteFrontier {
    conn: Connection,
    product_glob: String,
    retry: RetryPolicy,
}

impl SqliteFrontier {
    /// Opens (or creates) the frontier database at `path`
    ///
    /// An existing database is reused as-is, which is what makes a crawl
    /// resumable. A `frontier` table lacking the expected columns is rejected
    /// with `SchemaMismatch`.
    pub fn open(path: &Path, target: &CrawlTarget, retry: RetryPolicy) -> StorageResult<Self> {
        let conn = Connection::open(path).map_err(|source| StorageError::Fatal {
            operation: "open",
            source,
        })?;

        Self::from_connection(conn, target, retry, true)
    }

    /// Creates an in-memory frontier (for testing)
    pub fn open_in_memory(target: &CrawlTarget, retry: RetryPolicy) -> StorageResult<Self> {
        let conn = Connection::open_in_memory().map_err(|source| StorageError::Fatal {
            operation: "open",
            source,
        })?;

        Self::from_connection(conn, target, retry, false)
    }

    fn from_connection(
        conn: Connection,
        target: &CrawlTarget,
        retry: RetryPolicy,
        on_disk: bool,
    ) -> StorageResult<Self> {
        conn.busy_timeout(retry.delay)
            .map_err(|source| StorageError::Fatal {
                operation: "configure",
                source,
            })?;

        if on_disk {
            with_busy_retry(&retry, "configure", || {
                conn.execute_batch(
                    "
                    PRAGMA journal_mode = WAL;
                    PRAGMA synchronous = NORMAL;
                ",
                )
            })?;
        }

        let columns = with_busy_retry(&retry, "verify_schema", || frontier_columns(&conn))?;
        if !columns.is_empty() {
            let missing = missing_columns(&columns);
            if !missing.is_empty() {
                return Err(StorageError::SchemaMismatch(format!(
                    "frontier table is missing column(s): {}",
                    missing.join(", ")
                )));
            }
        }

        with_busy_retry(&retry, "initialize_schema", || initialize_schema(&conn))?;

        Ok(Self {
            conn,
            product_glob: target.product_pattern.to_glob(),
            retry,
        })
    }

    /// Closes the underlying connection, flushing the WAL
    pub fn close(self) -> StorageResult<()> {
        self.conn
            .close()
            .map_err(|(_, source)| StorageError::Fatal {
                operation: "close",
                source,
            })
    }

    fn count(&self, operation: &'static str, sql: &str, glob: Option<&str>) -> StorageResult<u64> {
        let count: i64 = with_busy_retry(&self.retry, operation, || match glob {
            Some(glob) => self.conn.query_row(sql, params![glob], |row| row.get(0)),
            None => self.conn.query_row(sql, [], |row| row.get(0)),
        })?;

        Ok(count.max(0) as u64)
    }
}

impl FrontierStore for SqliteFrontier {
    fn insert_if_absent(&mut self, url: &str) -> StorageResult<bool> {
        let conn = &self.conn;
        let inserted = with_busy_retry(&self.retry, "insert_if_absent", || {
            conn.execute(
                "INSERT OR IGNORE INTO frontier (url, visited) VALUES (?1, 0)",
                params![url],
            )
        })?;

        Ok(inserted > 0)
    }

    fn insert_many(&mut self, urls: &[String]) -> StorageResult<usize> {
        if urls.is_empty() {
            return Ok(0);
        }

        let conn = &mut self.conn;
        with_busy_retry(&self.retry, "insert_many", || {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let mut inserted = 0;
            {
                let mut stmt =
                    tx.prepare_cached("INSERT OR IGNORE INTO frontier (url, visited) VALUES (?1, 0)")?;
                for url in urls {
                    inserted += stmt.execute(params![url])?;
                }
            }
            tx.commit()?;
            Ok(inserted)
        })
    }

    fn mark_visited(&mut self, url: &str) -> StorageResult<bool> {
        let conn = &self.conn;
        let updated = with_busy_retry(&self.retry, "mark_visited", || {
            conn.execute("UPDATE frontier SET visited = 1 WHERE url = ?1", params![url])
        })?;

        if updated == 0 {
            tracing::warn!("Tried to mark unknown URL as visited: {}", url);
        }

        Ok(updated > 0)
    }

    fn count_total(&self) -> StorageResult<u64> {
        self.count("count_total", "SELECT COUNT(*) FROM frontier", None)
    }

    fn count_unvisited(&self) -> StorageResult<u64> {
        self.count(
            "count_unvisited",
            "SELECT COUNT(*) FROM frontier WHERE visited = 0",
            None,
        )
    }

    fn count_total_matching_pattern(&self) -> StorageResult<u64> {
        self.count(
            "count_total_matching_pattern",
            "SELECT COUNT(*) FROM frontier WHERE url GLOB ?1",
            Some(self.product_glob.as_str()),
        )
    }

    fn count_unvisited_matching_pattern(&self) -> StorageResult<u64> {
        self.count(
            "count_unvisited_matching_pattern",
            "SELECT COUNT(*) FROM frontier WHERE visited = 0 AND url GLOB ?1",
            Some(self.product_glob.as_str()),
        )
    }

    fn next_unvisited(&self) -> StorageResult<String> {
        let url: Option<String> = with_busy_retry(&self.retry, "next_unvisited", || {
            self.conn
                .query_row(
                    "SELECT url FROM frontier WHERE visited = 0 ORDER BY id LIMIT 1",
                    [],
                    |row| row.get(0),
                )
                .optional()
        })?;

        url.ok_or(StorageError::EmptyFrontier {
            products_only: false,
        })
    }

    fn next_unvisited_product(&self) -> StorageResult<String> {
        let url: Option<String> = with_busy_retry(&self.retry, "next_unvisited_product", || {
            self.conn
                .query_row(
                    "SELECT url FROM frontier WHERE visited = 0 AND url GLOB ?1 ORDER BY id LIMIT 1",
                    params![self.product_glob],
                    |row| row.get(0),
                )
                .optional()
        })?;

        url.ok_or(StorageError::EmptyFrontier {
            products_only: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::url::ProductPattern;
    use proptest::prelude::*;
    use std::collections::HashSet;
    use std::time::Duration;
    use tempfile::TempDir;

    const BASE: &str = "https://www.epocacosmeticos.com.br";

    fn target() -> CrawlTarget {
        CrawlTarget::new(BASE, "%/p").unwrap()
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy::unbounded(Duration::from_millis(10))
    }

    fn memory_store() -> SqliteFrontier {
        SqliteFrontier::open_in_memory(&target(), fast_retry()).unwrap()
    }

    #[test]
    fn test_create_in_memory() {
        let store = memory_store();
        assert_eq!(store.count_total().unwrap(), 0);
        assert!(!store.has_unvisited().unwrap());
    }

    #[test]
    fn test_frontier_scenario() {
        let mut store = memory_store();

        assert!(store.insert_if_absent(BASE).unwrap());
        let found = vec![
            format!("{}/category", BASE),
            format!("{}/item-x/p", BASE),
        ];
        assert_eq!(store.insert_many(&found).unwrap(), 2);

        assert_eq!(store.count_total().unwrap(), 3);
        assert_eq!(store.count_unvisited().unwrap(), 3);
        assert_eq!(store.count_total_matching_pattern().unwrap(), 1);
        assert_eq!(store.count_unvisited_matching_pattern().unwrap(), 1);

        assert_eq!(
            store.next_unvisited_product().unwrap(),
            format!("{}/item-x/p", BASE)
        );

        assert!(store.mark_visited(&format!("{}/item-x/p", BASE)).unwrap());
        assert_eq!(store.count_unvisited_matching_pattern().unwrap(), 0);
        assert!(!store.has_unvisited_product().unwrap());
        assert_eq!(store.count_unvisited().unwrap(), 2);
    }

    #[test]
    fn test_seed_then_product() {
        let target = CrawlTarget::new("https://example.test", "%/p").unwrap();
        let mut store = SqliteFrontier::open_in_memory(&target, fast_retry()).unwrap();

        store.insert_if_absent("https://example.test").unwrap();
        assert_eq!(store.count_total().unwrap(), 1);
        assert!(store.has_unvisited().unwrap());
        assert!(!store.has_unvisited_product().unwrap());

        store.insert_if_absent("https://example.test/widget/p").unwrap();
        assert_eq!(store.count_total().unwrap(), 2);
        assert!(store.has_unvisited_product().unwrap());
        assert_eq!(
            store.next_unvisited_product().unwrap(),
            "https://example.test/widget/p"
        );

        store.mark_visited("https://example.test").unwrap();
        store.mark_visited("https://example.test/widget/p").unwrap();
        assert!(!store.has_unvisited().unwrap());
        assert_eq!(store.count_total().unwrap(), 2);
    }

    #[test]
    fn test_insert_duplicate_url() {
        let mut store = memory_store();

        assert!(store.insert_if_absent(BASE).unwrap());
        assert!(!store.insert_if_absent(BASE).unwrap());

        let batch = vec![BASE.to_string(), BASE.to_string(), format!("{}/a", BASE)];
        assert_eq!(store.insert_many(&batch).unwrap(), 1);
        assert_eq!(store.count_total().unwrap(), 2);
    }

    #[test]
    fn test_insert_does_not_reset_visited() {
        let mut store = memory_store();

        store.insert_if_absent(BASE).unwrap();
        store.mark_visited(BASE).unwrap();

        store.insert_if_absent(BASE).unwrap();
        store.insert_many(&[BASE.to_string()]).unwrap();

        assert_eq!(store.count_unvisited().unwrap(), 0);
    }

    #[test]
    fn test_insert_many_empty() {
        let mut store = memory_store();
        assert_eq!(store.insert_many(&[]).unwrap(), 0);
    }

    #[test]
    fn test_mark_visited_idempotent() {
        let mut store = memory_store();
        store.insert_if_absent(BASE).unwrap();

        assert!(store.mark_visited(BASE).unwrap());
        assert!(store.mark_visited(BASE).unwrap());
        assert_eq!(store.count_unvisited().unwrap(), 0);
        assert_eq!(store.count_total().unwrap(), 1);
    }

    #[test]
    fn test_mark_unknown_url() {
        let mut store = memory_store();
        store.insert_if_absent(BASE).unwrap();

        assert!(!store.mark_visited("https://www.epocacosmeticos.com.br/nope").unwrap());
        assert_eq!(store.count_total().unwrap(), 1);
        assert_eq!(store.count_unvisited().unwrap(), 1);
    }

    #[test]
    fn test_next_unvisited_is_oldest_first() {
        let mut store = memory_store();
        store.insert_if_absent(&format!("{}/first", BASE)).unwrap();
        store.insert_if_absent(&format!("{}/second", BASE)).unwrap();

        assert_eq!(store.next_unvisited().unwrap(), format!("{}/first", BASE));
        store.mark_visited(&format!("{}/first", BASE)).unwrap();
        assert_eq!(store.next_unvisited().unwrap(), format!("{}/second", BASE));
    }

    #[test]
    fn test_empty_frontier() {
        let store = memory_store();

        assert!(matches!(
            store.next_unvisited(),
            Err(StorageError::EmptyFrontier {
                products_only: false
            })
        ));
        assert!(matches!(
            store.next_unvisited_product(),
            Err(StorageError::EmptyFrontier {
                products_only: true
            })
        ));
    }

    #[test]
    fn test_pattern_is_case_sensitive() {
        let mut store = memory_store();
        store.insert_if_absent(&format!("{}/item/P", BASE)).unwrap();
        store.insert_if_absent(&format!("{}/item/p", BASE)).unwrap();

        assert_eq!(store.count_total_matching_pattern().unwrap(), 1);
    }

    #[test]
    fn test_pattern_treats_glob_characters_literally() {
        let target = CrawlTarget::new(BASE, "%[1]%").unwrap();
        let mut store = SqliteFrontier::open_in_memory(&target, fast_retry()).unwrap();

        store.insert_if_absent(&format!("{}/a[1]b", BASE)).unwrap();
        store.insert_if_absent(&format!("{}/a1b", BASE)).unwrap();

        assert_eq!(store.count_total_matching_pattern().unwrap(), 1);
    }

    #[test]
    fn test_resume_from_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("frontier.db");

        {
            let mut store = SqliteFrontier::open(&path, &target(), fast_retry()).unwrap();
            store.insert_if_absent(BASE).unwrap();
            store.insert_if_absent(&format!("{}/item-x/p", BASE)).unwrap();
            store.mark_visited(BASE).unwrap();
            store.close().unwrap();
        }

        let store = SqliteFrontier::open(&path, &target(), fast_retry()).unwrap();
        assert_eq!(store.count_total().unwrap(), 2);
        assert_eq!(store.count_unvisited().unwrap(), 1);
        assert_eq!(
            store.next_unvisited().unwrap(),
            format!("{}/item-x/p", BASE)
        );
    }

    #[test]
    fn test_schema_mismatch() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("foreign.db");

        let conn = Connection::open(&path).unwrap();
        conn.execute_batch("CREATE TABLE frontier (id INTEGER PRIMARY KEY, link TEXT)")
            .unwrap();
        drop(conn);

        let result = SqliteFrontier::open(&path, &target(), fast_retry());
        assert!(matches!(result, Err(StorageError::SchemaMismatch(_))));
    }

    #[test]
    fn test_waits_out_a_locked_database() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("locked.db");

        let mut store = SqliteFrontier::open(&path, &target(), fast_retry()).unwrap();

        let other = Connection::open(&path).unwrap();
        other.execute_batch("BEGIN EXCLUSIVE").unwrap();
        let holder = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(200));
            other.execute_batch("COMMIT").unwrap();
        });

        assert!(store.insert_if_absent(BASE).unwrap());
        holder.join().unwrap();

        assert_eq!(store.count_total().unwrap(), 1);
    }

    #[test]
    fn test_bounded_retry_gives_up() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("locked.db");

        let policy = RetryPolicy::bounded(Duration::from_millis(10), 1);
        let mut store = SqliteFrontier::open(&path, &target(), policy).unwrap();

        let other = Connection::open(&path).unwrap();
        other.execute_batch("BEGIN EXCLUSIVE").unwrap();

        let result = store.insert_many(&[BASE.to_string()]);
        assert!(matches!(
            result,
            Err(StorageError::ContentionExhausted {
                operation: "insert_many",
                ..
            })
        ));

        other.execute_batch("COMMIT").unwrap();
        assert_eq!(store.insert_many(&[BASE.to_string()]).unwrap(), 1);
    }

    #[test]
    fn test_in_process_matcher_agrees_with_sql_glob() {
        let conn = Connection::open_in_memory().unwrap();

        let patterns = [
            "%/p", "%/item_/p", "_", "__", "%ã%", "%/a_ão/p", "%[1]%", "%*%", "%?%", "%]%", "",
            "%", "%%", "a%b%c", "%/P",
        ];
        let candidates = [
            "https://x.test/widget/p",
            "https://x.test/item1/p",
            "https://x.test/itemé/p",
            "https://x.test/ação/p",
            "https://x.test/widget/P",
            "é",
            "ab",
            "",
            "/p",
            "a[1]b",
            "a1b",
            "a*b",
            "a?b",
            "a]b",
            "axbyc",
            "abc",
            "acb",
        ];

        for pattern in patterns {
            let pattern = ProductPattern::new(pattern);
            for candidate in candidates {
                let in_sql: bool = conn
                    .query_row(
                        "SELECT ?1 GLOB ?2",
                        params![candidate, pattern.to_glob()],
                        |row| row.get(0),
                    )
                    .unwrap();

                assert_eq!(
                    pattern.matches(candidate),
                    in_sql,
                    "pattern {:?} on {:?}",
                    pattern.as_str(),
                    candidate
                );
            }
        }
    }

    fn numbered_url(n: usize) -> String {
        format!("{}/item-{}/p", BASE, n)
    }

    proptest! {
        #[test]
        fn test_frontier_holds_each_url_once(
            batches in prop::collection::vec(prop::collection::vec(0usize..8, 0..6), 0..6),
            singles in prop::collection::vec(0usize..8, 0..6),
            visits in prop::collection::vec(0usize..8, 0..4),
        ) {
            let mut store = memory_store();
            let mut known = HashSet::new();

            for batch in &batches {
                let urls: Vec<String> = batch.iter().copied().map(numbered_url).collect();
                let fresh = batch.iter().filter(|n| known.insert(**n)).count();
                prop_assert_eq!(store.insert_many(&urls).unwrap(), fresh);
            }

            for n in &singles {
                prop_assert_eq!(store.insert_if_absent(&numbered_url(*n)).unwrap(), known.insert(*n));
            }

            let mut visited = HashSet::new();
            for n in &visits {
                prop_assert_eq!(store.mark_visited(&numbered_url(*n)).unwrap(), known.contains(n));
                if known.contains(n) {
                    visited.insert(*n);
                }
            }

            // Re-inserting everything changes nothing
            let all: Vec<String> = known.iter().copied().map(numbered_url).collect();
            prop_assert_eq!(store.insert_many(&all).unwrap(), 0);

            prop_assert_eq!(store.count_total().unwrap(), known.len() as u64);
            prop_assert_eq!(
                store.count_unvisited().unwrap(),
                (known.len() - visited.len()) as u64
            );
        }
    }
}
