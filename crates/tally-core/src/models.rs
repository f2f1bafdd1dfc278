//! Domain models for Tally

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// An unmapped row of text cells from a detected table, prior to any field
/// assignment. Produced by the extractor, consumed by the normalizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// Trimmed cell text, in page order
    pub cells: Vec<String>,
    /// Zero-based page the row was detected on
    pub page: usize,
}

impl RawRow {
    pub fn new(cells: Vec<String>, page: usize) -> Self {
        Self { cells, page }
    }
}

/// A normalized transaction, the canonical unit of the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Calendar date, already standardized
    pub date: NaiveDate,
    /// Cleaned free-text label; may be empty, case preserved
    pub description: String,
    /// Signed amount: negative = outflow, positive = inflow
    pub amount: Decimal,
    /// Assigned category; None until the categorizer runs
    pub category: Option<String>,
    /// Identifier of the originating document, kept for traceability
    pub source_document: String,
}

impl Transaction {
    pub fn is_income(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    pub fn is_expense(&self) -> bool {
        self.amount < Decimal::ZERO
    }

    pub fn abs_amount(&self) -> Decimal {
        self.amount.abs()
    }

    /// The (year, month) bucket this transaction falls in
    pub fn year_month(&self) -> YearMonth {
        YearMonth {
            year: self.date.year(),
            month: self.date.month(),
        }
    }
}

/// Ordered list of normalized transactions for one analysis run.
/// Insertion order follows extraction order so output is reproducible.
pub type Ledger = Vec<Transaction>;

/// A calendar month key, ordered chronologically.
///
/// Serializes as its `"YYYY-MM"` display string so it can key JSON maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    /// The month immediately after this one
    pub fn next(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl std::str::FromStr for YearMonth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (y, m) = s
            .split_once('-')
            .ok_or_else(|| format!("invalid month key: {s}"))?;
        let year: i32 = y.parse().map_err(|_| format!("invalid month key: {s}"))?;
        let month: u32 = m.parse().map_err(|_| format!("invalid month key: {s}"))?;
        if !(1..=12).contains(&month) {
            return Err(format!("invalid month key: {s}"));
        }
        Ok(Self { year, month })
    }
}

impl Serialize for YearMonth {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Income and expense magnitudes for one month bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MonthFlow {
    /// Sum of positive amounts in the month
    pub income: Decimal,
    /// Sum of absolute values of negative amounts in the month
    pub expense: Decimal,
}

/// Aggregate statistics derived from a categorized ledger.
/// A pure function of the ledger; has no lifecycle of its own.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SummaryStats {
    /// Sum of positive amounts
    pub total_income: Decimal,
    /// Sum of absolute values of negative amounts
    pub total_expenses: Decimal,
    /// total_income - total_expenses
    pub net_flow: Decimal,
    /// Signed net per category; a category holding both inflows and
    /// outflows can net either way
    pub by_category: BTreeMap<String, Decimal>,
    /// Sparse monthly series; months with no transactions are absent
    pub by_month: BTreeMap<YearMonth, MonthFlow>,
    pub transaction_count: usize,
    pub categorized_count: usize,
    pub uncategorized_count: usize,
}

/// One bar in the spending-by-category chart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarPoint {
    pub category: String,
    /// Signed net, rounded to display precision
    pub amount: Decimal,
}

/// One point in the monthly income-vs-expense trend chart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinePoint {
    /// "YYYY-MM" label
    pub month: String,
    pub income: Decimal,
    pub expense: Decimal,
}

/// Per-document result of a batch run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum DocumentOutcome {
    /// Extraction succeeded; the document contributed `rows` raw rows
    /// (possibly zero) to the batch
    Extracted { document: String, rows: usize },
    /// Extraction failed; the rest of the batch was still processed
    Failed {
        document: String,
        /// Machine-readable kind, see [`crate::Error::kind`]
        kind: String,
        message: String,
    },
}

impl DocumentOutcome {
    pub fn document(&self) -> &str {
        match self {
            Self::Extracted { document, .. } | Self::Failed { document, .. } => document,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Overall disposition of a batch run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    /// At least one usable transaction was produced
    Analyzed,
    /// No usable transactions across the whole batch. Distinct from a
    /// per-document failure: every document may have succeeded and still
    /// contributed nothing.
    NothingToAnalyze,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Analyzed => "analyzed",
            Self::NothingToAnalyze => "nothing_to_analyze",
        }
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
