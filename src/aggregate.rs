//! Generic group-by/reduce over canonical usage records.
//!
//! The engine is generic over the grouping dimension: a key function maps a
//! record to its group and a [`CostBasis`] selects which of the two
//! independent cost paths is summed. Reduction is plain summation, so the
//! result is invariant under input reordering, and the output carries a total
//! order (descending total, ascending key on ties) so identical input always
//! produces identical reports.
//!
//! The engine operates on a materialized slice rather than the one-shot
//! fetch stream, so chained queries (filter then group by date, group by
//! instance then take top-N) never re-fetch.

use crate::models::{AggregationResult, GroupTotal, UsageRecord};
use std::collections::HashMap;

/// Which computation path supplies a record's value.
///
/// Both paths are first-class: reports are built from `BillingCurrency` and
/// cross-checked against `PriceTimesQuantity` (see [`crate::reports`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CostBasis {
    /// The provider-computed `costInBillingCurrency` field.
    #[default]
    BillingCurrency,
    /// `effectivePrice * quantity`, recomputed locally.
    PriceTimesQuantity,
}

impl CostBasis {
    pub fn value(&self, record: &UsageRecord) -> f64 {
        match self {
            CostBasis::BillingCurrency => record.cost_in_billing_currency,
            CostBasis::PriceTimesQuantity => record.computed_cost(),
        }
    }
}

/// Group records by `key_fn` and sum `basis.value` per group.
///
/// Empty input yields empty groups and a zero grand total. Negative values
/// (credits, refunds) are summed unmodified.
pub fn aggregate<K>(records: &[UsageRecord], key_fn: K, basis: CostBasis) -> AggregationResult
where
    K: Fn(&UsageRecord) -> String,
{
    let mut totals: HashMap<String, f64> = HashMap::new();
    let mut grand_total = 0.0;

    for record in records {
        let value = basis.value(record);
        *totals.entry(key_fn(record)).or_insert(0.0) += value;
        grand_total += value;
    }

    let mut groups: Vec<GroupTotal> = totals
        .into_iter()
        .map(|(key, total)| GroupTotal { key, total })
        .collect();

    // Descending by total, ascending by key on ties. NaN cannot occur:
    // normalization rejects non-finite inputs.
    groups.sort_by(|a, b| {
        b.total
            .partial_cmp(&a.total)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.key.cmp(&b.key))
    });

    AggregationResult {
        groups,
        grand_total,
    }
}

/// Grand total without grouping, used by the dual-total cross-check.
pub fn sum(records: &[UsageRecord], basis: CostBasis) -> f64 {
    records.iter().map(|r| basis.value(r)).sum()
}

/// Grouping key: trailing path segment of the resource identifier.
pub fn by_instance(record: &UsageRecord) -> String {
    record.instance_name.clone()
}

/// Grouping key: usage day, `YYYY-MM-DD`.
pub fn by_date(record: &UsageRecord) -> String {
    record.date.format("%Y-%m-%d").to_string()
}

/// Grouping key: usage month, `YYYY-MM`.
pub fn by_month(record: &UsageRecord) -> String {
    record.date.format("%Y-%m").to_string()
}

/// Grouping key: resource group, lowercased since the provider is not
/// consistent about its casing across records.
pub fn by_resource_group(record: &UsageRecord) -> String {
    record
        .resource_group
        .as_deref()
        .unwrap_or("(none)")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(instance: &str, day: u32, cost: f64) -> UsageRecord {
        UsageRecord {
            instance_path: format!("/subs/s/rg/vms/{instance}"),
            instance_name: instance.to_string(),
            resource_group: Some("RG-Prod".to_string()),
            date: NaiveDate::from_ymd_opt(2025, 3, day).unwrap(),
            quantity: cost / 0.5,
            effective_price: 0.5,
            cost_in_billing_currency: cost,
            meter_category: None,
            meter_name: None,
        }
    }

    #[test]
    fn groups_and_ranks_by_cost() {
        let records = vec![
            record("vm-a", 1, 10.0),
            record("vm-b", 1, 5.0),
            record("vm-a", 2, 3.0),
        ];
        let result = aggregate(&records, by_instance, CostBasis::BillingCurrency);

        assert_eq!(result.groups.len(), 2);
        assert_eq!(result.groups[0].key, "vm-a");
        assert_eq!(result.groups[0].total, 13.0);
        assert_eq!(result.groups[1].key, "vm-b");
        assert_eq!(result.groups[1].total, 5.0);
        assert_eq!(result.grand_total, 18.0);
    }

    #[test]
    fn group_totals_sum_to_grand_total() {
        let records = vec![
            record("a", 1, 1.25),
            record("b", 2, -0.75),
            record("c", 3, 2.5),
            record("a", 4, 0.0),
        ];
        let result = aggregate(&records, by_instance, CostBasis::BillingCurrency);
        let sum_of_groups: f64 = result.groups.iter().map(|g| g.total).sum();
        assert!((sum_of_groups - result.grand_total).abs() < 1e-9);
    }

    #[test]
    fn reordering_input_does_not_change_result() {
        let mut records = vec![
            record("vm-a", 1, 10.0),
            record("vm-b", 1, 5.0),
            record("vm-a", 2, 3.0),
            record("vm-c", 3, 5.0),
        ];
        let before = aggregate(&records, by_instance, CostBasis::BillingCurrency);
        records.reverse();
        records.swap(0, 2);
        let after = aggregate(&records, by_instance, CostBasis::BillingCurrency);
        assert_eq!(before, after);
    }

    #[test]
    fn ties_break_by_ascending_key() {
        let records = vec![record("zeta", 1, 5.0), record("alpha", 1, 5.0)];
        let result = aggregate(&records, by_instance, CostBasis::BillingCurrency);
        assert_eq!(result.groups[0].key, "alpha");
        assert_eq!(result.groups[1].key, "zeta");
    }

    #[test]
    fn empty_input_is_not_an_error() {
        let result = aggregate(&[], by_instance, CostBasis::BillingCurrency);
        assert!(result.groups.is_empty());
        assert_eq!(result.grand_total, 0.0);
    }

    #[test]
    fn negative_costs_are_included() {
        let records = vec![record("vm-a", 1, 10.0), record("vm-a", 2, -4.0)];
        let result = aggregate(&records, by_instance, CostBasis::BillingCurrency);
        assert_eq!(result.groups[0].total, 6.0);
    }

    #[test]
    fn both_bases_agree_on_consistent_records() {
        let records = vec![record("vm-a", 1, 10.0), record("vm-b", 2, 5.0)];
        let cost = sum(&records, CostBasis::BillingCurrency);
        let computed = sum(&records, CostBasis::PriceTimesQuantity);
        assert!((cost - computed).abs() < 1e-9);
    }

    #[test]
    fn date_and_month_keys() {
        let record = record("vm-a", 7, 1.0);
        assert_eq!(by_date(&record), "2025-03-07");
        assert_eq!(by_month(&record), "2025-03");
        assert_eq!(by_resource_group(&record), "rg-prod");
    }
}
