//! In-memory pipeline tests: normalize -> filter -> aggregate -> report.

use azure_usage::aggregate::{self, CostBasis};
use azure_usage::filter::{self, Predicate};
use azure_usage::models::{RawUsageRecord, Report, UsageRecord};
use azure_usage::normalize::{normalize_all, InvalidRecordPolicy};
use azure_usage::reports::{build_report, ReportStyle};
use serde_json::json;

fn raw(instance: &str, day: &str, cost: f64) -> RawUsageRecord {
    serde_json::from_value(json!({
        "id": "/providers/Microsoft.Consumption/usageDetails/x",
        "properties": {
            "instanceName": format!("/subscriptions/s/resourceGroups/rg/vms/{instance}"),
            "resourceGroup": "rg",
            "date": day,
            "quantity": cost * 4.0,
            "effectivePrice": 0.25,
            "costInBillingCurrency": cost,
            "meterCategory": "Virtual Machines",
        }
    }))
    .unwrap()
}

fn normalized(raws: &[RawUsageRecord]) -> Vec<UsageRecord> {
    normalize_all(raws, InvalidRecordPolicy::Abort).unwrap().0
}

#[test]
fn grouping_example_from_three_records() {
    // vm-a: 10 + 3, vm-b: 5, grand total 18.
    let records = normalized(&[
        raw("vm-a", "2025-03-01", 10.0),
        raw("vm-b", "2025-03-01", 5.0),
        raw("vm-a", "2025-03-02", 3.0),
    ]);

    let report = build_report(
        &records,
        ReportStyle::ByInstance { limit: None },
        CostBasis::BillingCurrency,
        1e-4,
    )
    .unwrap();

    match report {
        Report::Grouped {
            groups,
            grand_total,
        } => {
            assert_eq!(groups.len(), 2);
            assert_eq!(groups[0].key, "vm-a");
            assert!((groups[0].total - 13.0).abs() < 1e-9);
            assert_eq!(groups[1].key, "vm-b");
            assert!((groups[1].total - 5.0).abs() < 1e-9);
            assert!((grand_total - 18.0).abs() < 1e-9);
        }
        other => panic!("unexpected report: {other:?}"),
    }
}

#[test]
fn filter_and_aggregate_commute_for_substring_predicates() {
    let records = normalized(&[
        raw("web-01", "2025-03-01", 4.0),
        raw("db-01", "2025-03-01", 7.0),
        raw("web-02", "2025-03-02", 2.0),
        raw("db-01", "2025-03-03", 1.5),
    ]);
    let predicate = Predicate::contains("web");

    // Filter first, then aggregate.
    let filtered = filter::apply(&records, &predicate);
    let filtered_first =
        aggregate::aggregate(&filtered, aggregate::by_instance, CostBasis::BillingCurrency);

    // Aggregate everything, then drop non-matching groups. Substring
    // predicates only inspect the grouping key, so both orders agree.
    let mut aggregated_first =
        aggregate::aggregate(&records, aggregate::by_instance, CostBasis::BillingCurrency);
    aggregated_first
        .groups
        .retain(|g| g.key.to_lowercase().contains("web"));
    aggregated_first.grand_total = aggregated_first.groups.iter().map(|g| g.total).sum();

    assert_eq!(filtered_first.groups, aggregated_first.groups);
    assert!((filtered_first.grand_total - aggregated_first.grand_total).abs() < 1e-9);
}

#[test]
fn both_cost_bases_agree_end_to_end() {
    let records = normalized(&[
        raw("vm-a", "2025-03-01", 10.0),
        raw("vm-b", "2025-03-02", 5.0),
    ]);

    let by_cost = build_report(
        &records,
        ReportStyle::Flat,
        CostBasis::BillingCurrency,
        1e-4,
    )
    .unwrap();
    let by_price = build_report(
        &records,
        ReportStyle::Flat,
        CostBasis::PriceTimesQuantity,
        1e-4,
    )
    .unwrap();

    match (by_cost, by_price) {
        (Report::Flat { grand_total: a }, Report::Flat { grand_total: b }) => {
            assert!((a - b).abs() < 1e-9);
        }
        other => panic!("unexpected reports: {other:?}"),
    }
}

#[test]
fn monthly_series_spans_months() {
    let records = normalized(&[
        raw("vm-a", "2025-02-27", 1.0),
        raw("vm-a", "2025-03-01", 2.0),
        raw("vm-b", "2025-03-15", 3.0),
    ]);

    let report = build_report(
        &records,
        ReportStyle::Monthly,
        CostBasis::BillingCurrency,
        1e-4,
    )
    .unwrap();

    match report {
        Report::Series { series } => {
            assert_eq!(series.len(), 2);
            assert_eq!(series[0].date, "2025-02");
            assert!((series[0].total - 1.0).abs() < 1e-9);
            assert_eq!(series[1].date, "2025-03");
            assert!((series[1].total - 5.0).abs() < 1e-9);
        }
        other => panic!("unexpected report: {other:?}"),
    }
}

#[test]
fn meter_filter_matches_the_vm_report_use_case() {
    let mut storage = raw("stacct01", "2025-03-01", 9.0);
    storage.properties.meter_category = Some("Storage".to_string());

    let raws = vec![raw("vm-a", "2025-03-01", 10.0), storage];
    let records = normalized(&raws);
    let vms_only = filter::apply(&records, &Predicate::meter_category("virtual machines"));

    assert_eq!(vms_only.len(), 1);
    assert_eq!(vms_only[0].instance_name, "vm-a");
}

#[test]
fn empty_fetch_produces_empty_reports() {
    let records = normalized(&[]);
    for style in [
        ReportStyle::Flat,
        ReportStyle::ByInstance { limit: None },
        ReportStyle::Daily,
    ] {
        let report =
            build_report(&records, style, CostBasis::BillingCurrency, 1e-4).unwrap();
        match report {
            Report::Flat { grand_total } => assert_eq!(grand_total, 0.0),
            Report::Grouped {
                groups,
                grand_total,
            } => {
                assert!(groups.is_empty());
                assert_eq!(grand_total, 0.0);
            }
            Report::Series { series } => assert!(series.is_empty()),
        }
    }
}
