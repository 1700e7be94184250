//! Predicate-based record subsetting.
//!
//! Predicates match case-insensitively against the instance name and full
//! instance path (plus meter category for [`Predicate::MeterCategory`]) and
//! compose with AND/OR for multi-condition queries. Filtering returns a new
//! sequence preserving relative order; input records are never mutated.

use crate::error::{Result, UsageError};
use crate::models::UsageRecord;
use regex::{Regex, RegexBuilder};

#[derive(Debug, Clone)]
pub enum Predicate {
    /// Case-insensitive substring containment on instance name or path.
    Contains(String),
    /// Case-insensitive regex on instance name or path.
    Matches(Regex),
    /// Exact (case-insensitive) meter category match.
    MeterCategory(String),
    /// All sub-predicates must match.
    And(Vec<Predicate>),
    /// Any sub-predicate must match.
    Or(Vec<Predicate>),
}

impl Predicate {
    /// Build a case-insensitive regex predicate.
    pub fn matches(pattern: &str) -> Result<Self> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|err| UsageError::InvalidQuery {
                message: format!("invalid filter pattern `{pattern}`: {err}"),
            })?;
        Ok(Predicate::Matches(regex))
    }

    pub fn contains(needle: &str) -> Self {
        Predicate::Contains(needle.to_lowercase())
    }

    pub fn meter_category(category: &str) -> Self {
        Predicate::MeterCategory(category.to_lowercase())
    }

    pub fn eval(&self, record: &UsageRecord) -> bool {
        match self {
            Predicate::Contains(needle) => {
                record.instance_name.to_lowercase().contains(needle)
                    || record.instance_path.to_lowercase().contains(needle)
            }
            Predicate::Matches(regex) => {
                regex.is_match(&record.instance_name) || regex.is_match(&record.instance_path)
            }
            Predicate::MeterCategory(category) => record
                .meter_category
                .as_deref()
                .is_some_and(|c| c.to_lowercase() == *category),
            Predicate::And(predicates) => predicates.iter().all(|p| p.eval(record)),
            Predicate::Or(predicates) => predicates.iter().any(|p| p.eval(record)),
        }
    }
}

/// Subsequence of `records` matching `predicate`, relative order preserved.
pub fn apply(records: &[UsageRecord], predicate: &Predicate) -> Vec<UsageRecord> {
    records
        .iter()
        .filter(|r| predicate.eval(r))
        .cloned()
        .collect()
}
