//! Retry policy for storage contention
//!
//! A busy or locked database is retried in a loop after a fixed back-off.
//! Any other SQLite error is fatal and surfaces immediately, tagged with the
//! operation that hit it.

use crate::storage::traits::{StorageError, StorageResult};
use rusqlite::ErrorCode;
use std::time::Duration;

/// How long to wait between attempts, and how many retries to allow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Fixed back-off between attempts
    pub delay: Duration,

    /// Maximum number of retries after the first attempt; unbounded when None
    pub max_retries: Option<u32>,
}

impl RetryPolicy {
    /// Retries forever with a fixed back-off
    pub fn unbounded(delay: Duration) -> Self {
        Self {
            delay,
            max_retries: None,
        }
    }

    /// Retries at most `max_retries` times
    pub fn bounded(delay: Duration, max_retries: u32) -> Self {
        Self {
            delay,
            max_retries: Some(max_retries),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::unbounded(Duration::from_millis(300))
    }
}

/// Returns true for the SQLite conditions worth retrying
pub fn is_busy(error: &rusqlite::Error) -> bool {
    matches!(
        error,
        rusqlite::Error::SqliteFailure(err, _)
            if matches!(err.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    )
}

/// Runs `op` until it succeeds, retrying only on contention
///
/// The back-off is a blocking `std::thread::sleep`. When called from async
/// code it holds the runtime worker for the whole wait, so keep the store on
/// a sequential path or behind `tokio::task::spawn_blocking`.
pub fn with_busy_retry<T, F>(
    policy: &RetryPolicy,
    operation: &'static str,
    mut op: F,
) -> StorageResult<T>
where
    F: FnMut() -> Result<T, rusqlite::Error>,
{
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;

        match op() {
            Ok(value) => return Ok(value),
            Err(error) if is_busy(&error) => {
                if let Some(max) = policy.max_retries {
                    if attempts > max {
                        return Err(StorageError::ContentionExhausted {
                            operation,
                            attempts,
                        });
                    }
                }

                tracing::debug!(
                    "Database busy during {} (attempt {}), retrying in {:?}",
                    operation,
                    attempts,
                    policy.delay
                );
                std::thread::sleep(policy.delay);
            }
            Err(source) => return Err(StorageError::Fatal { operation, source }),
        }
    }
}
