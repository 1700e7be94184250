use anyhow::Result;
use azure_usage::aggregate::CostBasis;
use azure_usage::analyzer::{ReportOptions, UsageAnalyzer};
use azure_usage::filter::Predicate;
use azure_usage::logging::init_logging;
use azure_usage::reports::ReportStyle;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::process;

#[derive(Parser)]
#[command(name = "azure-usage")]
#[command(about = "Fast Rust CLI for Azure Consumption usage analysis and cost reporting")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the grand total for the date range
    Total(QueryArgs),
    /// Show per-instance cost rollup, largest first
    Instances {
        #[command(flatten)]
        query: QueryArgs,
        /// Show only the top N instances
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show per-resource-group cost rollup, largest first
    Groups {
        #[command(flatten)]
        query: QueryArgs,
        /// Show only the top N resource groups
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show per-day cost series
    Daily(QueryArgs),
    /// Show per-month cost series
    Monthly(QueryArgs),
}

#[derive(Args)]
struct QueryArgs {
    /// Azure subscription ID
    subscription_id: String,
    /// Start date (YYYY-MM-DD, inclusive)
    #[arg(long)]
    since: String,
    /// End date (YYYY-MM-DD, inclusive)
    #[arg(long)]
    until: String,
    /// Bearer token; falls back to AZURE_ACCESS_TOKEN
    #[arg(long)]
    token: Option<String>,
    /// Keep only records whose instance name/path contains this substring
    /// (case-insensitive)
    #[arg(long)]
    contains: Option<String>,
    /// Keep only records whose instance name/path matches this regex
    /// (case-insensitive)
    #[arg(long)]
    regex: Option<String>,
    /// Keep only records with this meter category (e.g. "Virtual Machines")
    #[arg(long)]
    meter: Option<String>,
    /// Cost basis for the report
    #[arg(long, value_enum, default_value_t = Basis::Cost)]
    basis: Basis,
    /// Output in JSON format
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Basis {
    /// Provider-supplied costInBillingCurrency
    Cost,
    /// effectivePrice * quantity, recomputed locally
    Price,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();
    let (query, style) = match cli.command {
        Commands::Total(query) => (query, ReportStyle::Flat),
        Commands::Instances { query, limit } => (query, ReportStyle::ByInstance { limit }),
        Commands::Groups { query, limit } => (query, ReportStyle::ByResourceGroup { limit }),
        Commands::Daily(query) => (query, ReportStyle::Daily),
        Commands::Monthly(query) => (query, ReportStyle::Monthly),
    };

    let json = query.json;
    let options = match build_options(query, style) {
        Ok(options) => options,
        Err(message) => {
            eprintln!("Error: {message}");
            process::exit(2);
        }
    };

    let analyzer = UsageAnalyzer::new();
    match analyzer.run_report(&options).await {
        Ok(()) => Ok(()),
        Err(e) => handle_error(e, json),
    }
}

fn build_options(query: QueryArgs, style: ReportStyle) -> Result<ReportOptions, String> {
    let since = parse_date(&query.since)?;
    let until = parse_date(&query.until)?;

    let credential = query
        .token
        .or_else(|| std::env::var("AZURE_ACCESS_TOKEN").ok())
        .ok_or("no credential: pass --token or set AZURE_ACCESS_TOKEN")?;

    let mut predicates = Vec::new();
    if let Some(needle) = &query.contains {
        predicates.push(Predicate::contains(needle));
    }
    if let Some(pattern) = &query.regex {
        predicates.push(Predicate::matches(pattern).map_err(|e| e.to_string())?);
    }
    if let Some(category) = &query.meter {
        predicates.push(Predicate::meter_category(category));
    }
    let predicate = match predicates.len() {
        0 => None,
        1 => predicates.pop(),
        _ => Some(Predicate::And(predicates)),
    };

    Ok(ReportOptions {
        subscription_id: query.subscription_id,
        since,
        until,
        credential,
        style,
        basis: match query.basis {
            Basis::Cost => CostBasis::BillingCurrency,
            Basis::Price => CostBasis::PriceTimesQuantity,
        },
        predicate,
        json_output: query.json,
    })
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| format!("invalid date `{raw}`, expected YYYY-MM-DD"))
}

fn handle_error(e: azure_usage::UsageError, json: bool) -> Result<()> {
    if json {
        let mut payload = serde_json::json!({ "error": e.to_string() });
        if let Some(count) = e.records_fetched() {
            payload["recordsFetched"] = serde_json::json!(count);
        }
        println!("{payload}");
    } else {
        eprintln!("Error: {e}");
        if let Some(count) = e.records_fetched() {
            eprintln!("({count} records were fetched before the failure)");
        }
    }
    process::exit(1);
}
