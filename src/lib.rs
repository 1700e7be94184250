//! Azure Usage Library
//!
//! A Rust library for extracting and aggregating Azure Consumption usage
//! details over a subscription and date range, then answering analytical
//! queries against the extracted data: grand totals, per-instance rollups,
//! per-day and per-month series, and filtered subsets.
//!
//! ## Core Features
//!
//! - **Complete pagination**: follows `nextLink` continuations until the
//!   provider reports no more pages, with bounded retry on throttling and
//!   transient failures - a fetch either covers the whole requested period
//!   or fails loudly with the partial count
//! - **Canonical records**: heterogeneous usage-detail payloads normalize
//!   into an immutable [`UsageRecord`] with a parsed usage day and the
//!   trailing resource-path segment as the default grouping key
//! - **Generic aggregation**: group-by/reduce over any injectable key
//!   (instance, day, month, resource group) with deterministic output order
//! - **Dual-total consistency**: every report cross-checks the provider's
//!   billing-currency cost against `effectivePrice * quantity` and fails on
//!   disagreement rather than silently choosing one
//!
//! ## Architecture Overview
//!
//! - [`models`] - wire types, the canonical record, and report shapes
//! - [`fetcher`] - paginated Consumption API client with retry/backoff and
//!   between-page cancellation
//! - [`normalize`] - raw-to-canonical mapping and the invalid-record policy
//! - [`aggregate`] - the group-by/reduce engine and built-in grouping keys
//! - [`filter`] - composable case-insensitive predicates
//! - [`reports`] - report construction plus the dual-total check
//! - [`display`] - colored terminal and JSON rendering
//! - [`analyzer`] - pipeline orchestrator tying the stages together
//! - [`error`] - the [`UsageError`] taxonomy crossing the library boundary
//! - [`config`] - layered configuration (defaults, TOML file, environment)
//! - [`logging`] - tracing subscriber setup
//!
//! ## Main Entry Point
//!
//! ```rust,no_run
//! use azure_usage::aggregate::CostBasis;
//! use azure_usage::analyzer::{ReportOptions, UsageAnalyzer};
//! use azure_usage::reports::ReportStyle;
//! use chrono::NaiveDate;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let analyzer = UsageAnalyzer::new();
//! let options = ReportOptions {
//!     subscription_id: "00000000-0000-0000-0000-000000000000".to_string(),
//!     since: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
//!     until: NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
//!     credential: std::env::var("AZURE_ACCESS_TOKEN")?,
//!     style: ReportStyle::ByInstance { limit: Some(10) },
//!     basis: CostBasis::BillingCurrency,
//!     predicate: None,
//!     json_output: false,
//! };
//! analyzer.run_report(&options).await?;
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod analyzer;
pub mod config;
pub mod display;
pub mod error;
pub mod fetcher;
pub mod filter;
pub mod logging;
pub mod models;
pub mod normalize;
pub mod reports;

pub use analyzer::UsageAnalyzer;
pub use error::UsageError;
pub use models::*;
