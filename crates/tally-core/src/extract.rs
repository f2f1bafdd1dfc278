//! Table extraction from statement documents
//!
//! The extractor owns format recognition and page handling; the actual
//! table/layout detection is a pluggable capability behind [`TableDetector`].
//! The built-in detector handles delimiter-separated text pages, which is
//! the supported tabular-document format. Anything the detector reports as
//! an error is treated as an extraction failure for that document only.

use std::fs;
use std::io::Write;

use csv::ReaderBuilder;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::RawRow;

/// Raw document bytes plus the identifier they arrived under
#[derive(Debug, Clone)]
pub struct StatementDocument {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl StatementDocument {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

/// The external table-detection capability.
///
/// Implementations receive one decoded page of text and return the table
/// rows found on it, outermost rows first. Returning an empty vec is not an
/// error; it means the page holds no detectable table.
pub trait TableDetector: Send + Sync {
    fn detect_tables(&self, page: &str) -> Result<Vec<Vec<String>>>;
}

/// Built-in detector for delimiter-separated statement pages.
///
/// Sniffs the delimiter (comma, semicolon, or tab) from the page content and
/// parses with a flexible, headerless CSV reader. Every non-blank line
/// becomes one row of trimmed cells.
#[derive(Debug, Default, Clone, Copy)]
pub struct DelimitedTextDetector;

impl DelimitedTextDetector {
    fn sniff_delimiter(page: &str) -> u8 {
        let mut counts = [0usize; 3]; // comma, semicolon, tab
        for line in page.lines().take(20) {
            counts[0] += line.matches(',').count();
            counts[1] += line.matches(';').count();
            counts[2] += line.matches('\t').count();
        }
        if counts[2] > 0 && counts[2] >= counts[0] && counts[2] >= counts[1] {
            b'\t'
        } else if counts[1] > counts[0] {
            b';'
        } else {
            b','
        }
    }
}

impl TableDetector for DelimitedTextDetector {
    fn detect_tables(&self, page: &str) -> Result<Vec<Vec<String>>> {
        let delimiter = Self::sniff_delimiter(page);
        let mut rdr = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(page.as_bytes());

        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result?;
            let cells: Vec<String> = record.iter().map(|c| c.trim().to_string()).collect();
            if cells.iter().all(|c| c.is_empty()) {
                continue;
            }
            rows.push(cells);
        }
        Ok(rows)
    }
}

/// Magic bytes of binary containers the pipeline does not read
const BINARY_MAGICS: &[&[u8]] = &[
    b"%PDF-",          // PDF
    b"PK\x03\x04",     // zip/xlsx
    b"\x1f\x8b",       // gzip
    b"\xd0\xcf\x11\xe0", // legacy OLE/xls
];

/// Invokes the table-detection capability per page and flattens the results
/// into one ordered row sequence.
pub struct Extractor {
    detector: Box<dyn TableDetector>,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor {
    /// Extractor with the built-in delimited-text detector
    pub fn new() -> Self {
        Self {
            detector: Box::new(DelimitedTextDetector),
        }
    }

    /// Extractor backed by a caller-supplied detection capability
    pub fn with_detector(detector: Box<dyn TableDetector>) -> Self {
        Self { detector }
    }

    /// Extract all table rows from one document, preserving page order.
    ///
    /// Fails with [`Error::UnsupportedFormat`] when the bytes are a binary
    /// container or not valid UTF-8 text. A recognized document with no
    /// detectable tables yields `Ok(vec![])`. Decoded pages are spilled into
    /// a temp directory that is removed on every exit path.
    pub fn extract(&self, doc: &StatementDocument) -> Result<Vec<RawRow>> {
        for magic in BINARY_MAGICS {
            if doc.bytes.starts_with(magic) {
                return Err(Error::UnsupportedFormat(format!(
                    "{}: binary container, expected delimited text",
                    doc.name
                )));
            }
        }

        let text = std::str::from_utf8(&doc.bytes).map_err(|_| {
            Error::UnsupportedFormat(format!("{}: not valid UTF-8 text", doc.name))
        })?;

        // Scoped decode spill: pages land in a temp dir that Drop removes
        // whether detection succeeds or fails.
        let workdir = tempfile::TempDir::new()?;
        let mut page_paths = Vec::new();
        for (idx, page) in text.split('\u{0c}').enumerate() {
            let path = workdir.path().join(format!("page-{:03}.txt", idx));
            let mut file = fs::File::create(&path)?;
            file.write_all(page.as_bytes())?;
            page_paths.push(path);
        }

        let mut rows = Vec::new();
        for (page_idx, path) in page_paths.iter().enumerate() {
            let page = fs::read_to_string(path)?;
            let detected = self
                .detector
                .detect_tables(&page)
                .map_err(|e| Error::Extraction(format!("{} page {}: {}", doc.name, page_idx, e)))?;
            for cells in detected {
                rows.push(RawRow::new(cells, page_idx));
            }
        }

        debug!(document = %doc.name, rows = rows.len(), "Extracted raw rows");
        Ok(rows)
    }
}
