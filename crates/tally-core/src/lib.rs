//! Tally Core Library
//!
//! The statement-insights pipeline: turn semi-structured bank-statement
//! documents into a canonical transaction ledger and derived statistics.
//!
//! - Table extraction from delimited statement documents, with table
//!   detection behind a pluggable capability trait
//! - Ledger normalization: column-role inference, date and amount
//!   standardization, description cleaning, dropped-row diagnostics
//! - Deterministic keyword categorization from TOML rule config
//! - Summary statistics (decimal arithmetic throughout)
//! - Chart-ready bar and line series for the presentation layer
//! - Batch orchestration with partial-failure semantics
//!
//! Data flows strictly left to right; every stage returns a new structure
//! and the whole run is synchronous. The surrounding serving layer (not
//! part of this crate) runs one independent pipeline per request.

pub mod categorize;
pub mod charts;
pub mod error;
pub mod extract;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod summary;

pub use categorize::{Categorizer, CategoryConfig, CategoryKind, CategoryRule};
pub use charts::{build_bar_series, build_line_series};
pub use error::{Error, Result};
pub use extract::{DelimitedTextDetector, Extractor, StatementDocument, TableDetector};
pub use models::{
    BarPoint, BatchStatus, DocumentOutcome, Ledger, LinePoint, MonthFlow, RawRow, SummaryStats,
    Transaction, YearMonth,
};
pub use normalize::{normalize, NormalizeOutcome};
pub use pipeline::{process_with_defaults, BatchReport, Pipeline};
pub use summary::{summarize, summarize_with_fallback};
