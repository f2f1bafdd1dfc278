//! Deterministic keyword categorization
//!
//! An ordered list of (keyword set, category) rules evaluated in declared
//! order; the first rule with a case-insensitive substring hit on the
//! cleaned description wins, and anything unmatched lands in the fallback
//! category. Rule order is part of the contract: income rules are declared
//! (and validated to be) ahead of expense rules so a refund is never
//! swallowed by an expense keyword.
//!
//! ## Configuration Resolution
//!
//! Config is loaded with a two-layer resolution:
//! 1. A caller-supplied TOML file (`CategoryConfig::from_path`)
//! 2. Embedded defaults, compiled into the binary

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{Ledger, Transaction};

/// Embedded default rules (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/categories.toml");

/// Whether a rule names money coming in or going out.
///
/// Drives rule-order validation only; the aggregator splits income from
/// expense by amount sign, not by category kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryKind {
    Income,
    Expense,
}

impl CategoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

/// A named bucket plus its ordered keyword matchers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub name: String,
    pub kind: CategoryKind,
    /// Case-insensitive substring matchers, checked in order
    pub keywords: Vec<String>,
}

/// Immutable, process-wide category configuration.
///
/// Loaded once at startup and passed explicitly into the categorizer;
/// never mutated at request time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryConfig {
    /// Category assigned when no rule matches
    #[serde(default = "default_fallback")]
    pub fallback: String,
    pub rules: Vec<CategoryRule>,
}

fn default_fallback() -> String {
    "Uncategorized".to_string()
}

impl CategoryConfig {
    /// The embedded default rule set
    pub fn embedded() -> Result<Self> {
        Self::parse(DEFAULT_CONFIG)
    }

    /// Load rules from a TOML file, falling back to the embedded defaults
    /// when the file does not exist
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::parse(&fs::read_to_string(path)?)
        } else {
            Self::embedded()
        }
    }

    fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants the categorizer depends on
    fn validate(&self) -> Result<()> {
        if self.fallback.trim().is_empty() {
            return Err(Error::Config("fallback category name is empty".into()));
        }
        if self.rules.is_empty() {
            return Err(Error::Config("no category rules declared".into()));
        }
        let mut seen_expense = false;
        for rule in &self.rules {
            if rule.name.trim().is_empty() {
                return Err(Error::Config("rule with empty category name".into()));
            }
            if rule.keywords.iter().all(|k| k.trim().is_empty()) {
                return Err(Error::Config(format!(
                    "rule '{}' has no usable keywords",
                    rule.name
                )));
            }
            match rule.kind {
                CategoryKind::Expense => seen_expense = true,
                CategoryKind::Income if seen_expense => {
                    return Err(Error::Config(format!(
                        "income rule '{}' declared after an expense rule; income rules must come first",
                        rule.name
                    )));
                }
                CategoryKind::Income => {}
            }
        }
        Ok(())
    }

    /// All configured category names, in rule order, fallback last
    pub fn category_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.rules.iter().map(|r| r.name.as_str()).collect();
        names.push(self.fallback.as_str());
        names
    }
}

/// First-match keyword classifier over cleaned descriptions
pub struct Categorizer {
    config: CategoryConfig,
    /// Lowercased keyword table, parallel to `config.rules`
    keyword_table: Vec<Vec<String>>,
}

impl Categorizer {
    pub fn new(config: CategoryConfig) -> Self {
        let keyword_table = config
            .rules
            .iter()
            .map(|rule| {
                rule.keywords
                    .iter()
                    .filter(|k| !k.trim().is_empty())
                    .map(|k| k.trim().to_lowercase())
                    .collect()
            })
            .collect();
        debug!(rules = config.rules.len(), "Categorizer ready");
        Self {
            config,
            keyword_table,
        }
    }

    pub fn config(&self) -> &CategoryConfig {
        &self.config
    }

    /// The category a description maps to, by first matching rule
    pub fn category_for(&self, description: &str) -> &str {
        let haystack = description.to_lowercase();
        for (rule, keywords) in self.config.rules.iter().zip(&self.keyword_table) {
            if keywords.iter().any(|k| haystack.contains(k.as_str())) {
                return &rule.name;
            }
        }
        &self.config.fallback
    }

    /// Total function: returns a copy with `category` set.
    ///
    /// Depends only on the description text, so re-categorizing an already
    /// categorized transaction is idempotent.
    pub fn categorize(&self, txn: &Transaction) -> Transaction {
        let mut out = txn.clone();
        out.category = Some(self.category_for(&txn.description).to_string());
        out
    }

    /// Categorize a whole ledger, preserving order
    pub fn categorize_ledger(&self, ledger: &Ledger) -> Ledger {
        ledger.iter().map(|txn| self.categorize(txn)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn txn(description: &str) -> Transaction {
        Transaction {
            date: NaiveDate::from_ymd_opt(2023, 3, 1).unwrap(),
            description: description.to_string(),
            amount: dec!(-42.17),
            category: None,
            source_document: "stmt.csv".to_string(),
        }
    }

    fn categorizer() -> Categorizer {
        Categorizer::new(CategoryConfig::embedded().unwrap())
    }

    #[test]
    fn test_embedded_config_is_valid() {
        let config = CategoryConfig::embedded().unwrap();
        assert_eq!(config.fallback, "Uncategorized");
        assert!(config.rules.len() > 5);
    }

    #[test]
    fn test_grocery_purchase() {
        let c = categorizer();
        let out = c.categorize(&txn("GROCERY MART #4521 PURCHASE"));
        assert_eq!(out.category.as_deref(), Some("Groceries"));
    }

    #[test]
    fn test_unknown_vendor_gets_fallback() {
        let c = categorizer();
        let out = c.categorize(&txn("XYZ UNKNOWN VENDOR"));
        assert_eq!(out.category.as_deref(), Some("Uncategorized"));
    }

    #[test]
    fn test_match_is_case_insensitive() {
        let c = categorizer();
        assert_eq!(c.category_for("monthly netflix charge"), "Subscriptions");
        assert_eq!(c.category_for("NETFLIX.COM"), "Subscriptions");
    }

    #[test]
    fn test_income_rules_win_over_expense_keywords() {
        let c = categorizer();
        // "refund" (income) and "store" (shopping) both match; income rules
        // are declared first and must win
        assert_eq!(c.category_for("ACME STORE REFUND"), "Income");
    }

    #[test]
    fn test_first_declared_rule_wins() {
        let config = CategoryConfig {
            fallback: "Other".to_string(),
            rules: vec![
                CategoryRule {
                    name: "A".to_string(),
                    kind: CategoryKind::Expense,
                    keywords: vec!["shared".to_string()],
                },
                CategoryRule {
                    name: "B".to_string(),
                    kind: CategoryKind::Expense,
                    keywords: vec!["shared".to_string()],
                },
            ],
        };
        let c = Categorizer::new(config);
        assert_eq!(c.category_for("shared keyword"), "A");
    }

    #[test]
    fn test_categorize_is_idempotent() {
        let c = categorizer();
        let once = c.categorize(&txn("COFFEE SHOP DOWNTOWN"));
        let twice = c.categorize(&once);
        assert_eq!(once.category, twice.category);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_category_always_in_configured_set() {
        let c = categorizer();
        let names: Vec<String> = c
            .config()
            .category_names()
            .iter()
            .map(|n| n.to_string())
            .collect();
        for desc in [
            "SALARY DEPOSIT CORP X",
            "GROCERY MART",
            "RANDOM GIBBERISH QQQQ",
            "",
            "NETFLIX",
        ] {
            let out = c.categorize(&txn(desc));
            assert!(names.contains(&out.category.clone().unwrap()));
        }
    }

    #[test]
    fn test_income_after_expense_rejected() {
        let bad = r#"
fallback = "Other"

[[rules]]
name = "Shopping"
kind = "expense"
keywords = ["store"]

[[rules]]
name = "Income"
kind = "income"
keywords = ["salary"]
"#;
        let err = CategoryConfig::parse(bad).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_empty_rules_rejected() {
        let err = CategoryConfig::parse("fallback = \"Other\"\nrules = []").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_from_path_missing_file_uses_embedded() {
        let config = CategoryConfig::from_path("/nonexistent/categories.toml").unwrap();
        assert_eq!(config, CategoryConfig::embedded().unwrap());
    }

    #[test]
    fn test_from_path_override() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
fallback = "Misc"

[[rules]]
name = "Pets"
kind = "expense"
keywords = ["vet", "petco"]
"#
        )
        .unwrap();
        let config = CategoryConfig::from_path(file.path()).unwrap();
        assert_eq!(config.fallback, "Misc");
        let c = Categorizer::new(config);
        assert_eq!(c.category_for("PETCO SUPPLIES"), "Pets");
        assert_eq!(c.category_for("GROCERY MART"), "Misc");
    }
}
