//! Output module for product records and crawl progress
//!
//! This module handles:
//! - Writing product records extracted from product pages
//! - Reporting frontier progress from the store's counts

mod csv_sink;
mod records;
pub mod stats;

pub use csv_sink::{CsvRecordSink, CSV_HEADER};
pub use records::{MemorySink, ProductRecord, RecordSink, SinkError, SinkResult};
pub use stats::{load_progress, print_progress, FrontierProgress};
