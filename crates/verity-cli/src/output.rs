// crates/verity-cli/src/output.rs
//
// Output formatting utilities for the Verity CLI.
// Supports table and JSON output modes.

use serde::Serialize;
use tabled::{Table, Tabled};

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Pretty-printed table output (default).
    Table,
    /// JSON output for machine consumption.
    Json,
}

impl OutputFormat {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            OutputFormat::Json
        } else {
            OutputFormat::Table
        }
    }
}

/// A two-column summary row.
#[derive(Tabled)]
pub struct FieldRow {
    #[tabled(rename = "Field")]
    pub field: &'static str,
    #[tabled(rename = "Value")]
    pub value: String,
}

impl FieldRow {
    pub fn new(field: &'static str, value: impl ToString) -> Self {
        Self {
            field,
            value: value.to_string(),
        }
    }
}

/// Format a slice of Tabled items as a table string.
pub fn format_table<T: Tabled>(data: &[T]) -> String {
    Table::new(data).to_string()
}

/// Format a serializable value as a pretty-printed JSON string.
pub fn format_json<T: Serialize>(data: &T) -> String {
    serde_json::to_string_pretty(data).unwrap_or_else(|e| format!("JSON serialization error: {}", e))
}

/// Print `value` as JSON, or print `summary` (and `detail`, when non-empty)
/// as tables.
pub fn emit<T: Serialize, D: Tabled>(
    format: OutputFormat,
    value: &T,
    summary: &[FieldRow],
    detail: &[D],
) {
    match format {
        OutputFormat::Json => println!("{}", format_json(value)),
        OutputFormat::Table => {
            println!("{}", format_table(summary));
            if !detail.is_empty() {
                println!();
                println!("{}", format_table(detail));
            }
        }
    }
}
