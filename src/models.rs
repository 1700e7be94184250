//! Core Data Models
//!
//! This module defines the primary data structures used throughout the Azure
//! usage analysis system, covering the complete pipeline from raw Consumption
//! API pages to aggregated reports.
//!
//! ## Data Flow
//!
//! 1. **Wire format**: [`UsagePage`] / [`RawUsageRecord`] - deserialized
//!    directly from `Microsoft.Consumption/usageDetails` responses
//! 2. **Canonical form**: [`UsageRecord`] - normalized, validated line items
//! 3. **Aggregation**: [`AggregationResult`] / [`GroupTotal`] - ranked
//!    group-by/reduce output with a grand total
//! 4. **Reports**: [`Report`] and its per-style payloads - serializable
//!    shapes consumed by the display layer
//!
//! ## Features
//!
//! - **Serde Integration**: wire types mirror the provider's camelCase field
//!   names; report types serialize to the documented output shapes
//! - **Optional Fields**: raw properties are all optional so a partially
//!   populated page deserializes and normalization can name the missing field
//! - **Type Safety**: canonical records carry a parsed [`chrono::NaiveDate`]
//!   rather than a raw string

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One page of the `usageDetails` list response.
#[derive(Debug, Clone, Deserialize)]
pub struct UsagePage {
    #[serde(default)]
    pub value: Vec<RawUsageRecord>,
    #[serde(rename = "nextLink")]
    pub next_link: Option<String>,
}

/// A single usage-detail entry as delivered by the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawUsageRecord {
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(default)]
    pub properties: RawProperties,
}

/// The `properties` bag of a usage-detail entry. Every field is optional on
/// the wire; the normalizer decides which absences are fatal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProperties {
    pub instance_name: Option<String>,
    pub resource_group: Option<String>,
    pub date: Option<String>,
    pub quantity: Option<f64>,
    pub effective_price: Option<f64>,
    pub cost_in_billing_currency: Option<f64>,
    pub meter_category: Option<String>,
    pub meter_sub_category: Option<String>,
    pub meter_name: Option<String>,
    pub billing_currency: Option<String>,
}

/// Canonical usage record. Immutable once normalized; all downstream stages
/// read it, none mutate it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageRecord {
    /// Full hierarchical resource identifier as returned by the provider.
    #[serde(rename = "instancePath")]
    pub instance_path: String,
    /// Last path segment of `instance_path`; the default grouping key.
    #[serde(rename = "instanceName")]
    pub instance_name: String,
    #[serde(rename = "resourceGroup")]
    pub resource_group: Option<String>,
    /// Usage day, no time component.
    pub date: NaiveDate,
    pub quantity: f64,
    #[serde(rename = "effectivePrice")]
    pub effective_price: f64,
    /// Provider-computed cost for the line, independent of
    /// `quantity * effective_price`.
    #[serde(rename = "costInBillingCurrency")]
    pub cost_in_billing_currency: f64,
    #[serde(rename = "meterCategory")]
    pub meter_category: Option<String>,
    #[serde(rename = "meterName")]
    pub meter_name: Option<String>,
}

impl UsageRecord {
    /// Cost recomputed from unit price and metered quantity, the independent
    /// path cross-checked against `cost_in_billing_currency`.
    pub fn computed_cost(&self) -> f64 {
        self.effective_price * self.quantity
    }
}

/// One ranked group produced by the aggregation engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupTotal {
    pub key: String,
    pub total: f64,
}

/// Ordered group totals plus their grand total. Groups are sorted by
/// descending total, ties broken by ascending key, so identical input always
/// renders identically.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregationResult {
    pub groups: Vec<GroupTotal>,
    #[serde(rename = "grandTotal")]
    pub grand_total: f64,
}

impl AggregationResult {
    pub fn empty() -> Self {
        Self {
            groups: Vec::new(),
            grand_total: 0.0,
        }
    }

    /// Keep only the N largest groups. The grand total still covers the
    /// whole input so truncation never hides cost.
    pub fn truncate(mut self, limit: Option<usize>) -> Self {
        if let Some(n) = limit {
            self.groups.truncate(n);
        }
        self
    }
}

/// One point of a time series report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub date: String,
    pub total: f64,
}

/// A fully built report, one variant per output style.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Report {
    /// `{ "grandTotal": ... }`
    Flat {
        #[serde(rename = "grandTotal")]
        grand_total: f64,
    },
    /// `{ "groups": [...], "grandTotal": ... }`, groups sorted desc by total.
    Grouped {
        groups: Vec<GroupTotal>,
        #[serde(rename = "grandTotal")]
        grand_total: f64,
    },
    /// `{ "series": [...] }`, sorted asc by date.
    Series { series: Vec<SeriesPoint> },
}
