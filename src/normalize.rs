//! Raw record normalization.
//!
//! Maps a provider-delivered [`RawUsageRecord`] into the canonical
//! [`UsageRecord`]. Pure and total over well-formed input; a missing or
//! non-numeric required field fails with `InvalidRecord` naming the field.
//! Case is left untouched so the canonical record stays provider-faithful;
//! case-insensitive comparison happens at the filter and grouping layers.

use crate::error::{Result, UsageError};
use crate::models::{RawUsageRecord, UsageRecord};
use chrono::NaiveDate;
use tracing::warn;

/// What to do with a record that fails normalization.
///
/// Billing totals must not silently omit data, so the default aborts the run
/// on the first bad record. Skipping is opt-in and counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InvalidRecordPolicy {
    #[default]
    Abort,
    Skip,
}

/// Normalize one raw record. `index` is the record's position in the fetch,
/// carried into the error for manual recovery.
pub fn normalize(raw: &RawUsageRecord, index: usize) -> Result<UsageRecord> {
    let props = &raw.properties;

    let instance_path = props
        .instance_name
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or(UsageError::InvalidRecord {
            index,
            field: "instanceName",
        })?
        .to_string();

    let date = parse_usage_date(props.date.as_deref()).ok_or(UsageError::InvalidRecord {
        index,
        field: "date",
    })?;

    let quantity = finite(props.quantity).ok_or(UsageError::InvalidRecord {
        index,
        field: "quantity",
    })?;
    let effective_price = finite(props.effective_price).ok_or(UsageError::InvalidRecord {
        index,
        field: "effectivePrice",
    })?;
    let cost_in_billing_currency =
        finite(props.cost_in_billing_currency).ok_or(UsageError::InvalidRecord {
            index,
            field: "costInBillingCurrency",
        })?;

    Ok(UsageRecord {
        instance_name: leaf_segment(&instance_path).to_string(),
        instance_path,
        resource_group: props.resource_group.clone(),
        date,
        quantity,
        effective_price,
        cost_in_billing_currency,
        meter_category: props.meter_category.clone(),
        meter_name: props.meter_name.clone(),
    })
}

/// Normalize a batch under the configured invalid-record policy. Under
/// `Skip`, returns the surviving records plus the skip count.
pub fn normalize_all(
    raws: &[RawUsageRecord],
    policy: InvalidRecordPolicy,
) -> Result<(Vec<UsageRecord>, usize)> {
    let mut records = Vec::with_capacity(raws.len());
    let mut skipped = 0usize;

    for (index, raw) in raws.iter().enumerate() {
        match normalize(raw, index) {
            Ok(record) => records.push(record),
            Err(err) => match policy {
                InvalidRecordPolicy::Abort => return Err(err),
                InvalidRecordPolicy::Skip => {
                    warn!(index, error = %err, "Skipping invalid usage record");
                    skipped += 1;
                }
            },
        }
    }

    Ok((records, skipped))
}

/// Substring after the last `/`; the whole path when no separator exists.
fn leaf_segment(path: &str) -> &str {
    match path.rsplit_once('/') {
        Some((_, leaf)) if !leaf.is_empty() => leaf,
        _ => path,
    }
}

/// Usage dates arrive either as plain `YYYY-MM-DD` or as an ISO-8601
/// datetime; only the calendar day matters.
fn parse_usage_date(raw: Option<&str>) -> Option<NaiveDate> {
    let raw = raw?;
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    raw.get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}
