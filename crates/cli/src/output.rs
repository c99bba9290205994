//! Output formatting for CLI

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use pagecheck_core::runner::CheckOutcome;
use pagecheck_core::SuiteReport;
use serde::Serialize;

/// Output format
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
    /// Plain text format
    Plain,
}

/// Trait for items that can be displayed in a table
pub trait TableDisplay {
    fn headers() -> Vec<&'static str>;
    fn row(&self) -> Vec<String>;
}

impl TableDisplay for CheckOutcome {
    fn headers() -> Vec<&'static str> {
        vec!["Check", "Status", "Diagnostics", "Time (ms)"]
    }

    fn row(&self) -> Vec<String> {
        let status = match (&self.error, self.passed) {
            (Some(_), _) => "ERROR",
            (None, true) => "PASS",
            (None, false) => "FAIL",
        };
        let details = match &self.error {
            Some(e) => e.clone(),
            None => self
                .diagnostics
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\n"),
        };
        vec![
            self.check.clone(),
            status.to_string(),
            details,
            self.duration_ms.to_string(),
        ]
    }
}

/// Print a list of items
pub fn print_list<T: Serialize + TableDisplay>(items: &[T], format: OutputFormat) {
    if items.is_empty() {
        println!("No items found.");
        return;
    }

    match format {
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic);

            table.set_header(T::headers());
            for item in items {
                table.add_row(item.row());
            }

            println!("{table}");
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(items).unwrap_or_default());
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(items).unwrap_or_default());
        }
        OutputFormat::Plain => {
            for item in items {
                let row = item.row();
                for (header, value) in T::headers().iter().zip(row.iter()) {
                    println!("{}: {}", header, value);
                }
                println!();
            }
        }
    }
}

/// Print suite reports with a summary line per suite
pub fn print_reports(reports: &[SuiteReport], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(reports).unwrap_or_default());
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(reports).unwrap_or_default());
        }
        OutputFormat::Table | OutputFormat::Plain => {
            for report in reports {
                println!("{} ({})", report.name, report.url);
                print_list(&report.results, format);
                println!(
                    "{} passed, {} failed, {} errored ({} ms)",
                    report.passed, report.failed, report.errored, report.duration_ms
                );
            }
        }
    }
}
