//! Batch orchestration: statement documents in, analysis report out
//!
//! Documents are processed end to end, one at a time: extract, normalize,
//! categorize, then one summarize pass over the merged ledger. A failed
//! document is recorded in the per-document outcomes and never aborts the
//! batch. The report also carries the presentation payload boundary: stats,
//! both chart series, and a bounded ledger sample.

use serde_json::json;
use tracing::{info, warn};

use crate::categorize::{Categorizer, CategoryConfig};
use crate::charts::{build_bar_series, build_line_series};
use crate::extract::{Extractor, StatementDocument, TableDetector};
use crate::models::{BatchStatus, DocumentOutcome, Ledger, SummaryStats, Transaction};
use crate::normalize::normalize;
use crate::summary::summarize_with_fallback;

/// One pipeline instance per batch run; no state is shared across runs
/// beyond the immutable category configuration.
pub struct Pipeline {
    extractor: Extractor,
    categorizer: Categorizer,
}

impl Pipeline {
    /// Pipeline with the built-in delimited-text detector
    pub fn new(config: CategoryConfig) -> Self {
        Self {
            extractor: Extractor::new(),
            categorizer: Categorizer::new(config),
        }
    }

    /// Pipeline backed by a caller-supplied table-detection capability
    pub fn with_detector(config: CategoryConfig, detector: Box<dyn TableDetector>) -> Self {
        Self {
            extractor: Extractor::with_detector(detector),
            categorizer: Categorizer::new(config),
        }
    }

    /// Process one batch of documents.
    ///
    /// Partial-failure semantics: each document that fails extraction is
    /// reported as a [`DocumentOutcome::Failed`] and the batch continues.
    /// Ledger construction is append-only; each document's rows are
    /// normalized and categorized as they arrive.
    pub fn process_batch(&self, docs: &[StatementDocument]) -> BatchReport {
        let mut outcomes = Vec::with_capacity(docs.len());
        let mut ledger = Ledger::new();
        let mut rows_dropped = 0;

        for doc in docs {
            match self.extractor.extract(doc) {
                Ok(rows) => {
                    let extracted = rows.len();
                    let normalized = normalize(&rows, &doc.name);
                    rows_dropped += normalized.rows_dropped;
                    for txn in &normalized.ledger {
                        ledger.push(self.categorizer.categorize(txn));
                    }
                    outcomes.push(DocumentOutcome::Extracted {
                        document: doc.name.clone(),
                        rows: extracted,
                    });
                }
                Err(e) => {
                    warn!(document = %doc.name, error = %e, "Document failed; batch continues");
                    outcomes.push(DocumentOutcome::Failed {
                        document: doc.name.clone(),
                        kind: e.kind().to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }

        let stats = summarize_with_fallback(&ledger, &self.categorizer.config().fallback);
        info!(
            documents = docs.len(),
            failures = outcomes.iter().filter(|o| o.is_failure()).count(),
            transactions = ledger.len(),
            dropped = rows_dropped,
            "Batch processed"
        );

        BatchReport {
            outcomes,
            ledger,
            stats,
            rows_dropped,
        }
    }
}

/// Everything one batch run produced. Owned by the caller; nothing is
/// persisted.
#[derive(Debug, Clone)]
pub struct BatchReport {
    /// Per-document outcomes, in submission order
    pub outcomes: Vec<DocumentOutcome>,
    /// Merged, categorized ledger across all successful documents
    pub ledger: Ledger,
    pub stats: SummaryStats,
    /// Rows dropped during normalization across the whole batch
    pub rows_dropped: usize,
}

impl BatchReport {
    /// Batch-level disposition. A batch with zero usable transactions is
    /// "nothing to analyze" even when every document extracted cleanly.
    pub fn status(&self) -> BatchStatus {
        if self.ledger.is_empty() {
            BatchStatus::NothingToAnalyze
        } else {
            BatchStatus::Analyzed
        }
    }

    pub fn failure_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failure()).count()
    }

    /// Bounded display sample: the first `n` ledger rows
    pub fn ledger_preview(&self, n: usize) -> &[Transaction] {
        &self.ledger[..self.ledger.len().min(n)]
    }

    /// The presentation payload: summary, chart series, and a bounded
    /// ledger sample. This is the whole surface the display layer consumes.
    pub fn to_json(&self, preview_rows: usize) -> serde_json::Value {
        json!({
            "status": self.status(),
            "documents": self.outcomes,
            "rows_dropped": self.rows_dropped,
            "summary": self.stats,
            "charts": {
                "spending_by_category": build_bar_series(&self.stats),
                "monthly_trend": build_line_series(&self.stats, true),
            },
            "ledger_preview": self.ledger_preview(preview_rows),
        })
    }
}

/// Convenience: run one batch with the embedded default rules
pub fn process_with_defaults(docs: &[StatementDocument]) -> crate::error::Result<BatchReport> {
    let config = CategoryConfig::embedded()?;
    Ok(Pipeline::new(config).process_batch(docs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn pipeline() -> Pipeline {
        Pipeline::new(CategoryConfig::embedded().unwrap())
    }

    fn doc(name: &str, body: &str) -> StatementDocument {
        StatementDocument::new(name, body)
    }

    #[test]
    fn test_empty_batch() {
        let report = pipeline().process_batch(&[]);
        assert_eq!(report.status(), BatchStatus::NothingToAnalyze);
        assert!(report.outcomes.is_empty());
        assert!(report.ledger.is_empty());
        assert_eq!(report.stats.total_income, dec!(0));
    }

    #[test]
    fn test_single_document_batch() {
        let report = pipeline().process_batch(&[doc(
            "march.csv",
            "01/03/2023,SALARY DEPOSIT CORP X,2500.00\n\
             10/03/2023,GROCERY MART #4521 PURCHASE,-42.17\n",
        )]);
        assert_eq!(report.status(), BatchStatus::Analyzed);
        assert_eq!(report.ledger.len(), 2);
        assert_eq!(report.ledger[0].category.as_deref(), Some("Income"));
        assert_eq!(report.ledger[1].category.as_deref(), Some("Groceries"));
        assert_eq!(report.stats.total_income, dec!(2500.00));
        assert_eq!(report.stats.total_expenses, dec!(42.17));
    }

    #[test]
    fn test_partial_batch_failure() {
        let docs = [
            doc("good-1.csv", "01/03/2023,SALARY,1000.00\n"),
            StatementDocument::new("bad.pdf", b"%PDF-1.4 binary".to_vec()),
            doc("good-2.csv", "05/03/2023,GROCERY MART,-250.50\n"),
        ];
        let report = pipeline().process_batch(&docs);

        assert_eq!(report.outcomes.len(), 3);
        assert_eq!(report.failure_count(), 1);
        assert!(report.outcomes[1].is_failure());
        assert_eq!(report.outcomes[1].document(), "bad.pdf");

        // Stats still cover the two good documents
        assert_eq!(report.status(), BatchStatus::Analyzed);
        assert_eq!(report.stats.total_income, dec!(1000.00));
        assert_eq!(report.stats.total_expenses, dec!(250.50));
    }

    #[test]
    fn test_nothing_to_analyze_without_failures() {
        // A recognized document with no table rows: success, empty ledger
        let report = pipeline().process_batch(&[doc("blank.csv", "")]);
        assert_eq!(report.failure_count(), 0);
        assert_eq!(report.status(), BatchStatus::NothingToAnalyze);
    }

    #[test]
    fn test_ledger_preview_is_bounded() {
        let body: String = (1..=9)
            .map(|d| format!("{:02}/03/2023,VENDOR {},-1.00\n", d, d))
            .collect();
        let report = pipeline().process_batch(&[doc("many.csv", &body)]);
        assert_eq!(report.ledger.len(), 9);
        assert_eq!(report.ledger_preview(5).len(), 5);
        assert_eq!(report.ledger_preview(100).len(), 9);
    }

    #[test]
    fn test_merge_preserves_document_order() {
        let docs = [
            doc("b-second-by-name.csv", "01/03/2023,FROM FIRST DOC,-1.00\n"),
            doc("a-first-by-name.csv", "01/02/2023,FROM SECOND DOC,-2.00\n"),
        ];
        let report = pipeline().process_batch(&docs);
        assert_eq!(report.ledger[0].description, "FROM FIRST DOC");
        assert_eq!(report.ledger[0].source_document, "b-second-by-name.csv");
        assert_eq!(report.ledger[1].description, "FROM SECOND DOC");
    }

    #[test]
    fn test_json_payload_shape() {
        let report = pipeline().process_batch(&[doc(
            "march.csv",
            "01/03/2023,SALARY,1000.00\n10/03/2023,GROCERY MART,-250.50\n",
        )]);
        let payload = report.to_json(10);

        assert_eq!(payload["status"], "analyzed");
        assert_eq!(payload["documents"][0]["status"], "extracted");
        // Monthly buckets key the summary map by their "YYYY-MM" string
        assert!(payload["summary"]["by_month"]["2023-03"].is_object());
        assert_eq!(
            payload["charts"]["monthly_trend"][0]["month"],
            "2023-03"
        );
        assert_eq!(payload["ledger_preview"].as_array().unwrap().len(), 2);
        // Bar series leads with the largest magnitude
        assert_eq!(
            payload["charts"]["spending_by_category"][0]["category"],
            "Income"
        );
    }
}
