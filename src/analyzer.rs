//! Usage Analysis Engine
//!
//! The [`UsageAnalyzer`] coordinates the whole report pipeline: paginated
//! fetch, normalization under the configured invalid-record policy, optional
//! predicate filtering, aggregation into the requested report style, and
//! display. One invocation is one pipeline pass; the analyzer holds no
//! mutable state between runs.

use crate::aggregate::CostBasis;
use crate::config::get_config;
use crate::display::ReportDisplayManager;
use crate::error::Result;
use crate::fetcher::{CancelToken, UsageClient};
use crate::filter::{self, Predicate};
use crate::models::Report;
use crate::normalize::{self, InvalidRecordPolicy};
use crate::reports::{self, ReportStyle};
use chrono::NaiveDate;
use tracing::info;

/// One report request, fully described.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub subscription_id: String,
    pub since: NaiveDate,
    pub until: NaiveDate,
    /// Opaque bearer token; acquisition and refresh are external.
    pub credential: String,
    pub style: ReportStyle,
    pub basis: CostBasis,
    pub predicate: Option<Predicate>,
    pub json_output: bool,
}

pub struct UsageAnalyzer {
    client: UsageClient,
    display_manager: ReportDisplayManager,
}

impl Default for UsageAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl UsageAnalyzer {
    pub fn new() -> Self {
        Self {
            client: UsageClient::new(get_config().fetch.clone()),
            display_manager: ReportDisplayManager::new(),
        }
    }

    /// Run the full pipeline and return the built report without displaying
    /// it. The library-facing entry point.
    pub async fn build_report(
        &self,
        options: &ReportOptions,
        cancel: &CancelToken,
    ) -> Result<Report> {
        let config = get_config();

        let mut pager = self.client.pager(
            &options.subscription_id,
            options.since,
            options.until,
            &options.credential,
        )?;
        let raw_records = pager.fetch_all(cancel).await?;
        info!(
            subscription = %options.subscription_id,
            records = raw_records.len(),
            "Fetch complete"
        );

        let policy = if config.records.skip_invalid {
            InvalidRecordPolicy::Skip
        } else {
            InvalidRecordPolicy::Abort
        };
        let (records, skipped) = normalize::normalize_all(&raw_records, policy)?;
        if skipped > 0 {
            info!(skipped, "Invalid records skipped by policy");
        }

        let records = match &options.predicate {
            Some(predicate) => filter::apply(&records, predicate),
            None => records,
        };

        reports::build_report(&records, options.style, options.basis, config.records.epsilon)
    }

    /// Run the pipeline and render the result.
    pub async fn run_report(&self, options: &ReportOptions) -> Result<()> {
        let report = self.build_report(options, &CancelToken::new()).await?;
        let title = report_title(options);
        self.display_manager
            .display(&report, &title, options.json_output);
        Ok(())
    }
}

fn report_title(options: &ReportOptions) -> String {
    let what = match options.style {
        ReportStyle::Flat => "Total cost",
        ReportStyle::ByInstance { .. } => "Cost by instance",
        ReportStyle::ByResourceGroup { .. } => "Cost by resource group",
        ReportStyle::Daily => "Daily cost",
        ReportStyle::Monthly => "Monthly cost",
    };
    format!(
        "Azure Usage Report - {} ({} to {})",
        what, options.since, options.until
    )
}
