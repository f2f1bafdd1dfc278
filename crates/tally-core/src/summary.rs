//! Summary statistics over a categorized ledger

use rust_decimal::Decimal;
use tracing::debug;

use crate::models::{Ledger, SummaryStats};

/// Compute aggregate statistics for a ledger.
///
/// Pure and total: an empty ledger yields all-zero totals and empty maps.
/// Income and expense split on the amount sign (the ingestion-time sign
/// convention), not on category. Per-category totals keep their sign, so a
/// category holding both inflows and outflows can net either way. Monthly
/// buckets are sparse; months without transactions simply do not appear.
pub fn summarize(ledger: &Ledger) -> SummaryStats {
    summarize_with_fallback(ledger, "Uncategorized")
}

/// [`summarize`] with an explicit fallback-category name, so the
/// categorized/uncategorized counters stay meaningful under a custom rule
/// set whose fallback is not named "Uncategorized"
pub fn summarize_with_fallback(ledger: &Ledger, fallback: &str) -> SummaryStats {
    let mut stats = SummaryStats {
        transaction_count: ledger.len(),
        ..Default::default()
    };

    for txn in ledger {
        if txn.is_income() {
            stats.total_income += txn.amount;
        } else {
            stats.total_expenses += txn.abs_amount();
        }

        let flow = stats.by_month.entry(txn.year_month()).or_default();
        if txn.is_income() {
            flow.income += txn.amount;
        } else {
            flow.expense += txn.abs_amount();
        }

        match txn.category.as_deref() {
            Some(category) => {
                *stats.by_category.entry(category.to_string()).or_insert(Decimal::ZERO) +=
                    txn.amount;
                // The fallback bucket counts as uncategorized for the
                // quality counters even though it is a real category
                if category == fallback {
                    stats.uncategorized_count += 1;
                } else {
                    stats.categorized_count += 1;
                }
            }
            None => stats.uncategorized_count += 1,
        }
    }

    stats.net_flow = stats.total_income - stats.total_expenses;
    debug!(
        transactions = stats.transaction_count,
        income = %stats.total_income,
        expenses = %stats.total_expenses,
        "Summarized ledger"
    );
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Transaction, YearMonth};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn txn(date: (i32, u32, u32), amount: Decimal, category: &str) -> Transaction {
        Transaction {
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            description: format!("{} txn", category),
            amount,
            category: Some(category.to_string()),
            source_document: "stmt.csv".to_string(),
        }
    }

    #[test]
    fn test_empty_ledger_is_all_zero() {
        let stats = summarize(&vec![]);
        assert_eq!(stats.total_income, Decimal::ZERO);
        assert_eq!(stats.total_expenses, Decimal::ZERO);
        assert_eq!(stats.net_flow, Decimal::ZERO);
        assert!(stats.by_category.is_empty());
        assert!(stats.by_month.is_empty());
        assert_eq!(stats.transaction_count, 0);
    }

    #[test]
    fn test_totals_and_net_flow() {
        let ledger = vec![
            txn((2023, 3, 1), dec!(1000.00), "Income"),
            txn((2023, 3, 10), dec!(-250.50), "Groceries"),
            txn((2023, 3, 20), dec!(-100.25), "Dining"),
        ];
        let stats = summarize(&ledger);
        assert_eq!(stats.total_income, dec!(1000.00));
        assert_eq!(stats.total_expenses, dec!(350.75));
        assert_eq!(stats.net_flow, dec!(649.25));
    }

    #[test]
    fn test_category_totals_keep_sign() {
        // A category with both an outflow and a partial refund inflow
        let ledger = vec![
            txn((2023, 3, 1), dec!(-80.00), "Shopping"),
            txn((2023, 3, 5), dec!(30.00), "Shopping"),
        ];
        let stats = summarize(&ledger);
        assert_eq!(stats.by_category["Shopping"], dec!(-50.00));
    }

    #[test]
    fn test_category_sums_reconcile_with_net_flow() {
        let ledger = vec![
            txn((2023, 1, 5), dec!(2500.00), "Income"),
            txn((2023, 1, 9), dec!(-1200.00), "Housing"),
            txn((2023, 2, 2), dec!(-75.50), "Groceries"),
            txn((2023, 2, 14), dec!(12.00), "Groceries"),
            txn((2023, 2, 20), dec!(-40.00), "Uncategorized"),
        ];
        let stats = summarize(&ledger);
        let category_sum: Decimal = stats.by_category.values().sum();
        assert_eq!(category_sum, stats.total_income - stats.total_expenses);
    }

    #[test]
    fn test_monthly_buckets_are_sparse() {
        let ledger = vec![
            txn((2023, 1, 5), dec!(100.00), "Income"),
            txn((2023, 4, 5), dec!(-20.00), "Dining"),
        ];
        let stats = summarize(&ledger);
        assert_eq!(stats.by_month.len(), 2);
        assert!(stats.by_month.contains_key(&YearMonth::new(2023, 1)));
        assert!(!stats.by_month.contains_key(&YearMonth::new(2023, 2)));
        assert!(stats.by_month.contains_key(&YearMonth::new(2023, 4)));
    }

    #[test]
    fn test_march_income_and_expense_split() {
        let ledger = vec![
            txn((2023, 3, 1), dec!(1000.00), "Income"),
            txn((2023, 3, 15), dec!(-250.50), "Groceries"),
        ];
        let stats = summarize(&ledger);
        let march = &stats.by_month[&YearMonth::new(2023, 3)];
        assert_eq!(march.income, dec!(1000.00));
        assert_eq!(march.expense, dec!(250.50));
    }

    #[test]
    fn test_categorized_counters() {
        let mut uncat = txn((2023, 3, 1), dec!(-5.00), "Uncategorized");
        let mut missing = txn((2023, 3, 2), dec!(-5.00), "x");
        missing.category = None;
        uncat.category = Some("Uncategorized".to_string());
        let ledger = vec![txn((2023, 3, 3), dec!(-9.99), "Dining"), uncat, missing];
        let stats = summarize(&ledger);
        assert_eq!(stats.transaction_count, 3);
        assert_eq!(stats.categorized_count, 1);
        assert_eq!(stats.uncategorized_count, 2);
    }

    #[test]
    fn test_decimal_sums_do_not_drift() {
        // 0.10 added 1000 times must be exactly 100.00
        let ledger: Ledger = (0..1000)
            .map(|i| txn((2023, 3, 1 + (i % 28) as u32), dec!(-0.10), "Dining"))
            .collect();
        let stats = summarize(&ledger);
        assert_eq!(stats.total_expenses, dec!(100.00));
        assert_eq!(stats.by_category["Dining"], dec!(-100.00));
    }
}
