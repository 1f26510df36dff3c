//! Product record types and the sink trait
//!
//! A record is built for every product page with a primary heading and handed
//! to a `RecordSink`; the crawler does not keep it afterwards.

use thiserror::Error;

/// Errors that can occur while writing records
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl SinkError {
    /// Returns true for I/O conditions worth retrying
    pub fn is_transient(&self) -> bool {
        let io = match self {
            Self::Io(e) => Some(e),
            Self::Csv(e) => match e.kind() {
                csv::ErrorKind::Io(e) => Some(e),
                _ => None,
            },
        };

        matches!(
            io.map(std::io::Error::kind),
            Some(
                std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::WouldBlock
                    | std::io::ErrorKind::TimedOut
            )
        )
    }
}

/// Result type for sink operations
pub type SinkResult<T> = Result<T, SinkError>;

/// Data extracted from one product page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRecord {
    /// Text of the page's primary heading
    pub product_name: Option<String>,

    /// Text of the page's `<title>`
    pub title: Option<String>,

    /// URL the page was fetched from
    pub url: String,
}

impl ProductRecord {
    pub fn new(product_name: Option<String>, title: Option<String>, url: impl Into<String>) -> Self {
        Self {
            product_name,
            title,
            url: url.into(),
        }
    }
}

/// Destination for product records
pub trait RecordSink {
    /// Appends one record, creating the destination on first use
    ///
    /// Transient failures are retried inside the sink; an error returned
    /// here means the record could not be stored.
    fn append(&mut self, record: &ProductRecord) -> SinkResult<()>;
}

/// Sink that keeps records in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Vec<ProductRecord>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[ProductRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<ProductRecord> {
        self.records
    }
}

impl RecordSink for MemorySink {
    fn append(&mut self, record: &ProductRecord) -> SinkResult<()> {
        self.records.push(record.clone());
        Ok(())
    }
}
