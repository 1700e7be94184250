//! Output Formatting and Display Management
//!
//! Renders built reports either as human-readable colored terminal output or
//! as structured JSON for programmatic consumption. All numeric content comes
//! straight from the report layer; nothing is recomputed here.

use crate::config::get_config;
use crate::models::Report;
use colored::Colorize;

pub struct ReportDisplayManager;

impl Default for ReportDisplayManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportDisplayManager {
    pub fn new() -> Self {
        Self
    }

    pub fn display(&self, report: &Report, title: &str, json_output: bool) {
        if json_output {
            self.display_json(report);
            return;
        }

        println!("\n{}", "=".repeat(72).bright_cyan());
        println!("{}", title.bright_white().bold());
        println!("{}", "=".repeat(72).bright_cyan());

        match report {
            Report::Flat { grand_total } => {
                println!(
                    "\n{} {}\n",
                    "Grand total:".bright_white(),
                    self.money(*grand_total).bold()
                );
            }
            Report::Grouped {
                groups,
                grand_total,
            } => {
                if groups.is_empty() {
                    println!("\n{}\n", "No usage records in range.".bright_black());
                    return;
                }
                let width = groups.iter().map(|g| g.key.len()).max().unwrap_or(0);
                println!();
                for group in groups {
                    let share = if *grand_total != 0.0 {
                        format!("{:5.1}%", group.total / grand_total * 100.0)
                    } else {
                        "    -".to_string()
                    };
                    println!(
                        "  {:width$}  {:>12}  {}",
                        group.key.bright_white(),
                        self.money(group.total),
                        share.bright_black(),
                        width = width
                    );
                }
                println!(
                    "\n  {:width$}  {:>12}\n",
                    "TOTAL".bright_yellow().bold(),
                    self.money(*grand_total).bold(),
                    width = width
                );
            }
            Report::Series { series } => {
                if series.is_empty() {
                    println!("\n{}\n", "No usage records in range.".bright_black());
                    return;
                }
                let total: f64 = series.iter().map(|p| p.total).sum();
                println!();
                for point in series {
                    println!(
                        "  {}  {:>12}",
                        point.date.bright_cyan(),
                        self.money(point.total)
                    );
                }
                println!(
                    "\n  {} {} periods • {} total\n",
                    "Σ".bright_yellow(),
                    series.len().to_string().bright_white().bold(),
                    self.money(total).bold()
                );
            }
        }
    }

    fn display_json(&self, report: &Report) {
        let rendered = if get_config().output.json_pretty {
            serde_json::to_string_pretty(report)
        } else {
            serde_json::to_string(report)
        };
        match rendered {
            Ok(json) => println!("{json}"),
            Err(err) => eprintln!("Error serializing report to JSON: {err}"),
        }
    }

    fn money(&self, amount: f64) -> colored::ColoredString {
        let decimals = get_config().output.currency_decimals;
        let formatted = format!("${amount:.decimals$}");
        if amount < 0.0 {
            formatted.bright_red()
        } else {
            formatted.bright_green()
        }
    }
}
