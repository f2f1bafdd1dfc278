//! Chart-ready projections of summary statistics
//!
//! The only place display rounding happens: internal sums stay full
//! precision, chart values are rounded to two decimal places.

use crate::models::{BarPoint, LinePoint, MonthFlow, SummaryStats};

/// Display precision for chart-facing values
const DISPLAY_DP: u32 = 2;

/// Category bar series, largest |amount| first.
///
/// Ties on magnitude break by category name so the ordering is fully
/// deterministic.
pub fn build_bar_series(stats: &SummaryStats) -> Vec<BarPoint> {
    let mut series: Vec<BarPoint> = stats
        .by_category
        .iter()
        .map(|(category, amount)| BarPoint {
            category: category.clone(),
            amount: amount.round_dp(DISPLAY_DP),
        })
        .collect();
    series.sort_by(|a, b| {
        b.amount
            .abs()
            .cmp(&a.amount.abs())
            .then_with(|| a.category.cmp(&b.category))
    });
    series
}

/// Monthly income/expense line series, chronologically ascending.
///
/// With `gap_fill` set, months between the first and last observed month
/// are zero-filled so the axis is continuous; this is the single allowed
/// gap-filling policy. Sparse output otherwise.
pub fn build_line_series(stats: &SummaryStats, gap_fill: bool) -> Vec<LinePoint> {
    let mut series = Vec::new();
    let Some((&first, _)) = stats.by_month.first_key_value() else {
        return series;
    };
    let last = stats
        .by_month
        .last_key_value()
        .map(|(&month, _)| month)
        .unwrap_or(first);

    if gap_fill {
        let mut month = first;
        loop {
            let flow = stats.by_month.get(&month).copied().unwrap_or_default();
            series.push(point(month.to_string(), flow));
            if month == last {
                break;
            }
            month = month.next();
        }
    } else {
        for (month, flow) in &stats.by_month {
            series.push(point(month.to_string(), *flow));
        }
    }
    series
}

fn point(month: String, flow: MonthFlow) -> LinePoint {
    LinePoint {
        month,
        income: flow.income.round_dp(DISPLAY_DP),
        expense: flow.expense.round_dp(DISPLAY_DP),
    }
}
