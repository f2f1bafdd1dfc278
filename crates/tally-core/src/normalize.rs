//! Ledger normalization: raw rows in, canonical transactions out
//!
//! Column roles are assigned by profiling the whole row-set: the column
//! with the most date-looking cells anchors the date, money-looking columns
//! anchor the amount (one signed column, or a debit/credit pair). Rows that
//! cannot resolve a date and an amount are dropped and counted, never
//! propagated as errors.
//!
//! Documented policies:
//! - Dates are day-first: "03/04/2023" is 3 April 2023. A month-first
//!   reading is taken only when day-first is impossible (day token > 12).
//! - Two-digit years use a fixed century window: 00-49 -> 2000s,
//!   50-99 -> 1900s.
//! - Split debit/credit columns combine into one signed value: the first
//!   money column is the debit (negative), the second the credit (positive).

use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::OnceLock;
use tracing::{debug, warn};

use crate::models::{Ledger, RawRow, Transaction};

/// Best-effort result of normalizing one document's rows
#[derive(Debug, Clone, Default)]
pub struct NormalizeOutcome {
    pub ledger: Ledger,
    /// Raw rows inspected
    pub rows_seen: usize,
    /// Rows that could not be repaired to a (date, amount) pair
    pub rows_dropped: usize,
}

/// Normalize a document's raw rows into transactions.
///
/// Total by contract: malformed rows are dropped and counted rather than
/// surfaced as errors. `source_id` is recorded on every transaction for
/// traceability and plays no part in aggregation.
pub fn normalize(rows: &[RawRow], source_id: &str) -> NormalizeOutcome {
    let mut outcome = NormalizeOutcome {
        rows_seen: rows.len(),
        ..Default::default()
    };
    if rows.is_empty() {
        return outcome;
    }

    let layout = ColumnLayout::profile(rows);
    let Some(layout) = layout else {
        // No column ever looked like a date; nothing here is a ledger row.
        outcome.rows_dropped = rows.len();
        warn!(
            source = source_id,
            dropped = outcome.rows_dropped,
            "No date column detected; dropping all rows"
        );
        return outcome;
    };

    for row in rows {
        match layout.resolve(row) {
            Some((date, description, amount)) => outcome.ledger.push(Transaction {
                date,
                description,
                amount,
                category: None,
                source_document: source_id.to_string(),
            }),
            None => outcome.rows_dropped += 1,
        }
    }

    debug!(
        source = source_id,
        rows = outcome.ledger.len(),
        dropped = outcome.rows_dropped,
        "Normalized rows"
    );
    if outcome.rows_dropped > 0 {
        warn!(
            source = source_id,
            dropped = outcome.rows_dropped,
            "Dropped rows missing a resolvable date or amount"
        );
    }
    outcome
}

/// Column roles inferred from a row-set
#[derive(Debug, Clone, PartialEq, Eq)]
struct ColumnLayout {
    date_col: usize,
    /// One entry: a signed amount column. Two entries: debit then credit.
    amount_cols: Vec<usize>,
}

impl ColumnLayout {
    /// Profile column roles across the row-set.
    ///
    /// Returns None when no column ever holds a parseable date.
    fn profile(rows: &[RawRow]) -> Option<Self> {
        let width = rows.iter().map(|r| r.cells.len()).max().unwrap_or(0);
        let mut date_hits = vec![0usize; width];
        let mut money_hits = vec![0usize; width];
        let mut plain_hits = vec![0usize; width];

        for row in rows {
            for (idx, cell) in row.cells.iter().enumerate() {
                if cell.is_empty() {
                    continue;
                }
                if parse_date(cell).is_some() {
                    date_hits[idx] += 1;
                } else if let Some(kind) = sniff_money(cell) {
                    match kind {
                        MoneyKind::Marked => money_hits[idx] += 1,
                        MoneyKind::PlainInteger => plain_hits[idx] += 1,
                    }
                }
            }
        }

        let date_col = (0..width).max_by_key(|&i| date_hits[i])?;
        if date_hits[date_col] == 0 {
            return None;
        }

        // Prefer columns whose values carry money markers (decimal point,
        // sign, currency symbol); bare-integer columns are only trusted when
        // nothing better exists, which keeps card-number and reference
        // columns out of the amount slot.
        let mut amount_cols: Vec<usize> = (0..width)
            .filter(|&i| i != date_col && money_hits[i] > 0)
            .collect();
        if amount_cols.is_empty() {
            amount_cols = (0..width)
                .filter(|&i| i != date_col && plain_hits[i] > 0)
                .collect();
        }
        if amount_cols.is_empty() {
            return None;
        }
        amount_cols.truncate(2);

        // Two money columns are only a debit/credit pair when rows populate
        // at most one of them. Columns filled together are amount plus
        // running balance; the first one is the signed amount.
        if let [first_col, second_col] = amount_cols.as_slice() {
            let both_filled = rows
                .iter()
                .filter(|row| {
                    let filled = |idx: usize| {
                        row.cells
                            .get(idx)
                            .map(|c| parse_amount(c).is_some())
                            .unwrap_or(false)
                    };
                    filled(*first_col) && filled(*second_col)
                })
                .count();
            if both_filled * 2 > rows.len() {
                amount_cols.truncate(1);
            }
        }

        Some(Self {
            date_col,
            amount_cols,
        })
    }

    /// Resolve one row to (date, description, amount), or None to drop it
    fn resolve(&self, row: &RawRow) -> Option<(NaiveDate, String, Decimal)> {
        let date = parse_date(row.cells.get(self.date_col)?)?;

        let amount = match self.amount_cols.as_slice() {
            [single] => parse_amount(row.cells.get(*single)?)?,
            [debit, credit] => {
                let debit_val = row
                    .cells
                    .get(*debit)
                    .filter(|c| !c.is_empty())
                    .and_then(|c| parse_amount(c));
                let credit_val = row
                    .cells
                    .get(*credit)
                    .filter(|c| !c.is_empty())
                    .and_then(|c| parse_amount(c));
                match (debit_val, credit_val) {
                    (Some(d), _) if !d.is_zero() => -d.abs(),
                    (_, Some(c)) => c.abs(),
                    (Some(d), None) => -d.abs(),
                    (None, None) => return None,
                }
            }
            _ => return None,
        };

        // Description: the longest cell that is neither the date nor an
        // amount column, and does not itself look like a date or a number
        // (secondary posting-date and reference columns must not win).
        // Missing text is kept as an empty placeholder; a transaction
        // without a description still aggregates correctly.
        let description = row
            .cells
            .iter()
            .enumerate()
            .filter(|(idx, cell)| {
                *idx != self.date_col
                    && !self.amount_cols.contains(idx)
                    && !cell.is_empty()
                    && parse_date(cell).is_none()
                    && parse_amount(cell).is_none()
            })
            .max_by_key(|(_, cell)| cell.chars().count())
            .map(|(_, cell)| clean_description(cell))
            .unwrap_or_default();

        Some((date, description, amount))
    }
}

/// How strongly a cell resembles a monetary value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MoneyKind {
    /// Carries a money marker: decimal separator, sign, currency symbol,
    /// parentheses, or a CR/DR suffix
    Marked,
    /// A bare integer; could be an amount or a reference number
    PlainInteger,
}

fn sniff_money(cell: &str) -> Option<MoneyKind> {
    let value = parse_amount(cell)?;
    let marked = cell.contains(['.', ',', '$', '£', '€', '(', ')', '+', '-'])
        || cell.to_ascii_uppercase().ends_with("CR")
        || cell.to_ascii_uppercase().ends_with("DR");
    if marked {
        Some(MoneyKind::Marked)
    } else if value.abs() < Decimal::from(1_000_000_000u64) {
        Some(MoneyKind::PlainInteger)
    } else {
        // 10+ digit bare integers are card/reference numbers, not money
        None
    }
}

/// Fixed century window for two-digit years: 00-49 -> 2000s, 50-99 -> 1900s
fn expand_two_digit_year(yy: u32) -> i32 {
    if yy <= 49 {
        2000 + yy as i32
    } else {
        1900 + yy as i32
    }
}

fn two_digit_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{1,2})[/\-.](\d{1,2})[/\-.](\d{2})$").unwrap())
}

/// Parse a date cell under the day-first convention.
///
/// Returns None for anything unparseable; callers treat that as "this cell
/// is not a date".
pub(crate) fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    // Two-digit years first, with an explicit century window. chrono's %Y
    // happily matches "49" as year 0049, so these must never reach the
    // format loops below.
    if let Some(caps) = two_digit_date_re().captures(s) {
        let a: u32 = caps[1].parse().ok()?;
        let b: u32 = caps[2].parse().ok()?;
        let year = expand_two_digit_year(caps[3].parse().ok()?);
        // Day-first, falling back to month-first when day-first is invalid
        return NaiveDate::from_ymd_opt(year, b, a).or_else(|| NaiveDate::from_ymd_opt(year, a, b));
    }

    // ISO first, then day-first numeric, then textual months
    const DAY_FIRST: &[&str] = &[
        "%Y-%m-%d",
        "%Y/%m/%d",
        "%d/%m/%Y",
        "%d-%m-%Y",
        "%d.%m.%Y",
        "%d %b %Y",
        "%d %B %Y",
        "%b %d, %Y",
        "%B %d, %Y",
    ];
    for fmt in DAY_FIRST {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }

    // Month-first only when the day-first reading was impossible
    // (e.g. "04/13/2023")
    const MONTH_FIRST: &[&str] = &["%m/%d/%Y", "%m-%d-%Y"];
    for fmt in MONTH_FIRST {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }

    None
}

/// Parse an amount cell into a signed Decimal.
///
/// Handles currency symbols, thousands separators (comma, dot, or space),
/// decimal commas, accounting parentheses, and trailing CR/DR markers.
/// Returns None for anything that is not a number.
pub(crate) fn parse_amount(s: &str) -> Option<Decimal> {
    let mut t = s.trim().to_string();
    if t.is_empty() {
        return None;
    }

    // Trailing CR (credit, inflow) / DR (debit, outflow) markers
    let upper = t.to_ascii_uppercase();
    let mut suffix_sign: Option<i8> = None;
    if let Some(stripped) = upper.strip_suffix("CR") {
        suffix_sign = Some(1);
        t.truncate(stripped.trim_end().len());
    } else if let Some(stripped) = upper.strip_suffix("DR") {
        suffix_sign = Some(-1);
        t.truncate(stripped.trim_end().len());
    }

    // Accounting negatives: (123.45) means -123.45
    let parenthesized = t.starts_with('(') && t.ends_with(')');
    if parenthesized {
        t = t[1..t.len() - 1].to_string();
    }

    t = t.replace(['$', '£', '€', ' ', '\u{a0}'], "");

    // Decimal separator: when both '.' and ',' appear, the later one is the
    // decimal point. A lone ',' followed by exactly two digits is a decimal
    // comma; otherwise commas are thousands separators.
    match (t.rfind('.'), t.rfind(',')) {
        (Some(dot), Some(comma)) if comma > dot => {
            t = t.replace('.', "").replace(',', ".");
        }
        (Some(_), Some(_)) => {
            t = t.replace(',', "");
        }
        (None, Some(comma)) => {
            if t.matches(',').count() == 1 && t.len() - comma == 3 {
                t = t.replace(',', ".");
            } else {
                t = t.replace(',', "");
            }
        }
        _ => {}
    }

    if t.is_empty() || t == "-" || t == "+" {
        return None;
    }

    let mut value = Decimal::from_str(&t).ok()?;
    if parenthesized {
        value = -value.abs();
    }
    match suffix_sign {
        Some(1) => value = value.abs(),
        Some(-1) => value = -value.abs(),
        _ => {}
    }
    Some(value)
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

fn reference_token_res() -> &'static Vec<Regex> {
    static RES: OnceLock<Vec<Regex>> = OnceLock::new();
    RES.get_or_init(|| {
        vec![
            // "REF 12ABC", "TXN:99881", "AUTH#004521"
            Regex::new(r"(?i)\s+(REF|TXN|AUTH)[:#\s]?[A-Z0-9-]+$").unwrap(),
            // trailing bare reference numbers: "... 0044582211"
            Regex::new(r"\s+#?\d{6,}$").unwrap(),
            // masked card suffixes: "... ****1234"
            Regex::new(r"\s+\*{2,}\d+$").unwrap(),
            // a marker left dangling after its token was peeled
            Regex::new(r"(?i)\s+(REF|TXN|AUTH)$").unwrap(),
        ]
    })
}

/// Clean a description cell: strip control characters, collapse whitespace,
/// and trim trailing reference/transaction-code tokens. Case is preserved;
/// the categorizer does its own case-insensitive matching.
pub(crate) fn clean_description(s: &str) -> String {
    let printable: String = s.chars().filter(|c| !c.is_control()).collect();
    let mut cleaned = whitespace_re()
        .replace_all(printable.trim(), " ")
        .to_string();

    // Reference tokens can stack ("... TXN 8841 REF A9"); peel until stable
    loop {
        let before = cleaned.len();
        for re in reference_token_res().iter() {
            cleaned = re.replace(&cleaned, "").to_string();
        }
        if cleaned.len() == before {
            break;
        }
    }
    cleaned
}
