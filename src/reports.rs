//! Report construction.
//!
//! Builds the structured output shapes from canonical records and performs
//! the dual-total consistency check: the grand total computed from the
//! provider's `costInBillingCurrency` must agree with the total recomputed
//! from `effectivePrice * quantity` within tolerance. Billing correctness is
//! the whole point of this system, so a disagreement is a fatal
//! `TotalMismatch`, never a silent choice of one number.

use crate::aggregate::{self, CostBasis};
use crate::error::{Result, UsageError};
use crate::models::{Report, SeriesPoint, UsageRecord};

/// Output style of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportStyle {
    /// Single grand total.
    Flat,
    /// Per-instance rollup, optionally truncated to the N largest groups.
    ByInstance { limit: Option<usize> },
    /// Per-resource-group rollup.
    ByResourceGroup { limit: Option<usize> },
    /// Per-day series, ascending by date.
    Daily,
    /// Per-month series, ascending by month.
    Monthly,
}

/// Build a report over `records`, failing with `TotalMismatch` when the two
/// cost paths disagree beyond `epsilon` per record.
pub fn build_report(
    records: &[UsageRecord],
    style: ReportStyle,
    basis: CostBasis,
    epsilon: f64,
) -> Result<Report> {
    check_total_consistency(records, epsilon)?;

    let report = match style {
        ReportStyle::Flat => Report::Flat {
            grand_total: aggregate::sum(records, basis),
        },
        ReportStyle::ByInstance { limit } => {
            let result = aggregate::aggregate(records, aggregate::by_instance, basis)
                .truncate(limit);
            Report::Grouped {
                groups: result.groups,
                grand_total: result.grand_total,
            }
        }
        ReportStyle::ByResourceGroup { limit } => {
            let result = aggregate::aggregate(records, aggregate::by_resource_group, basis)
                .truncate(limit);
            Report::Grouped {
                groups: result.groups,
                grand_total: result.grand_total,
            }
        }
        ReportStyle::Daily => Report::Series {
            series: series(records, aggregate::by_date, basis),
        },
        ReportStyle::Monthly => Report::Series {
            series: series(records, aggregate::by_month, basis),
        },
    };

    Ok(report)
}

/// The dual-total cross-check. Tolerance scales with the record count since
/// every line contributes its own rounding error.
pub fn check_total_consistency(records: &[UsageRecord], epsilon: f64) -> Result<()> {
    let cost_total = aggregate::sum(records, CostBasis::BillingCurrency);
    let computed_total = aggregate::sum(records, CostBasis::PriceTimesQuantity);
    let tolerance = epsilon * records.len().max(1) as f64;

    if (cost_total - computed_total).abs() > tolerance {
        return Err(UsageError::TotalMismatch {
            cost_total,
            computed_total,
            tolerance,
        });
    }
    Ok(())
}

/// Time-keyed rollup sorted ascending by key. Group keys are zero-padded
/// dates, so lexicographic order is chronological order.
fn series<K>(records: &[UsageRecord], key_fn: K, basis: CostBasis) -> Vec<SeriesPoint>
where
    K: Fn(&UsageRecord) -> String,
{
    let mut points: Vec<SeriesPoint> = aggregate::aggregate(records, key_fn, basis)
        .groups
        .into_iter()
        .map(|g| SeriesPoint {
            date: g.key,
            total: g.total,
        })
        .collect();
    points.sort_by(|a, b| a.date.cmp(&b.date));
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(instance: &str, day: u32, cost: f64) -> UsageRecord {
        UsageRecord {
            instance_path: format!("/vms/{instance}"),
            instance_name: instance.to_string(),
            resource_group: None,
            date: NaiveDate::from_ymd_opt(2025, 3, day).unwrap(),
            quantity: cost * 2.0,
            effective_price: 0.5,
            cost_in_billing_currency: cost,
            meter_category: None,
            meter_name: None,
        }
    }

    #[test]
    fn inconsistent_record_fails_the_report() {
        let mut bad = record("vm-a", 1, 10.0);
        bad.cost_in_billing_currency = 99.0; // price*quantity says 10.0

        let err = build_report(
            &[bad],
            ReportStyle::Flat,
            CostBasis::BillingCurrency,
            1e-4,
        )
        .unwrap_err();
        assert!(matches!(err, UsageError::TotalMismatch { .. }));
    }

    #[test]
    fn consistent_records_pass() {
        let records = vec![record("vm-a", 1, 10.0), record("vm-b", 2, 5.0)];
        let report = build_report(
            &records,
            ReportStyle::Flat,
            CostBasis::BillingCurrency,
            1e-4,
        )
        .unwrap();
        match report {
            Report::Flat { grand_total } => assert!((grand_total - 15.0).abs() < 1e-9),
            other => panic!("unexpected report: {other:?}"),
        }
    }

    #[test]
    fn daily_series_sorts_ascending() {
        let records = vec![
            record("vm-a", 20, 1.0),
            record("vm-a", 5, 2.0),
            record("vm-b", 12, 3.0),
        ];
        let report = build_report(
            &records,
            ReportStyle::Daily,
            CostBasis::BillingCurrency,
            1e-4,
        )
        .unwrap();
        match report {
            Report::Series { series } => {
                let dates: Vec<_> = series.iter().map(|p| p.date.as_str()).collect();
                assert_eq!(dates, ["2025-03-05", "2025-03-12", "2025-03-20"]);
            }
            other => panic!("unexpected report: {other:?}"),
        }
    }

    #[test]
    fn empty_input_builds_an_empty_report() {
        let report = build_report(&[], ReportStyle::Flat, CostBasis::BillingCurrency, 1e-4)
            .unwrap();
        match report {
            Report::Flat { grand_total } => assert_eq!(grand_total, 0.0),
            other => panic!("unexpected report: {other:?}"),
        }
    }

    #[test]
    fn grouped_report_serializes_with_two_keys() {
        let records = vec![record("vm-a", 1, 10.0), record("vm-b", 1, 5.0)];
        let report = build_report(
            &records,
            ReportStyle::ByInstance { limit: None },
            CostBasis::BillingCurrency,
            1e-4,
        )
        .unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("groups").is_some());
        assert!(json.get("grandTotal").is_some());
        assert_eq!(json["groups"][0]["key"], "vm-a");
    }
}
