//! CSV record sink
//!
//! Records go to a `;`-delimited file with a `product_name;title;url`
//! header. The file is appended to across runs, so a resumed crawl keeps
//! the records of the interrupted one.
//!
//! Each row is encoded in memory and written with a single `write_all`. A
//! write that fails partway is truncated back before it is retried.

use crate::output::records::{ProductRecord, RecordSink, SinkError, SinkResult};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Header row of the records file
pub const CSV_HEADER: [&str; 3] = ["product_name", "title", "url"];

const CSV_DELIMITER: u8 = b';';
const WRITE_ATTEMPTS: u32 = 3;
const WRITE_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Appends product records to a CSV file
pub struct CsvRecordSink {
    path: PathBuf,
    file: Option<File>,
}

impl CsvRecordSink {
    /// Creates a sink for `path`; nothing is opened until the first record
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn file(&mut self) -> SinkResult<&mut File> {
        let file = match self.file.take() {
            Some(file) => file,
            None => open_records_file(&self.path)?,
        };

        Ok(self.file.insert(file))
    }

    fn write(&mut self, row: &[u8]) -> SinkResult<()> {
        let file = self.file()?;
        append_row(file, row)?;
        Ok(())
    }
}

impl RecordSink for CsvRecordSink {
    fn append(&mut self, record: &ProductRecord) -> SinkResult<()> {
        let row = encode_row([
            record.product_name.as_deref().unwrap_or(""),
            record.title.as_deref().unwrap_or(""),
            record.url.as_str(),
        ])?;
        let mut attempt = 1;

        loop {
            match self.write(&row) {
                Ok(()) => {
                    tracing::info!(
                        "Recorded product {:?} ({})",
                        record.product_name.as_deref().unwrap_or(""),
                        record.url
                    );
                    return Ok(());
                }
                Err(e) if e.is_transient() && attempt < WRITE_ATTEMPTS => {
                    tracing::warn!(
                        "Transient error writing {} (attempt {}): {}",
                        self.path.display(),
                        attempt,
                        e
                    );
                    self.file = None;
                    attempt += 1;
                    std::thread::sleep(WRITE_RETRY_DELAY);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Serializes one row, terminator included
fn encode_row<'a>(fields: impl IntoIterator<Item = &'a str>) -> SinkResult<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(CSV_DELIMITER)
        .terminator(csv::Terminator::Any(b'\n'))
        .has_headers(false)
        .from_writer(Vec::new());

    writer.write_record(fields)?;
    writer
        .into_inner()
        .map_err(|e| SinkError::Io(e.into_error()))
}

/// Output that can be cut back to an earlier length
trait RowOutput: Write {
    fn end(&mut self) -> io::Result<u64>;

    fn truncate(&mut self, len: u64) -> io::Result<()>;
}

impl RowOutput for File {
    fn end(&mut self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }
}

/// Writes a whole row, or leaves the output as it was
fn append_row<O: RowOutput>(out: &mut O, row: &[u8]) -> io::Result<()> {
    let len = out.end()?;

    let written = out.write_all(row).and_then(|()| out.flush());
    if let Err(e) = written {
        if let Err(truncate_error) = out.truncate(len) {
            tracing::warn!("Could not remove partial row: {}", truncate_error);
        }
        return Err(e);
    }

    Ok(())
}

/// Opens the file for appending, writing the header if it is empty
fn open_records_file(path: &Path) -> SinkResult<File> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;

    if file.end()? == 0 {
        append_row(&mut file, &encode_row(CSV_HEADER)?)?;
    }

    Ok(file)
}
