//! Output formatting for CLI commands
//!
//! Provides utilities for formatting command output in human-readable
//! or JSON formats. Supports colored output (respects NO_COLOR env var).

use crate::cli::OutputFormat;
use crate::core::types::SearchEngineResult;
use serde::Serialize;

/// Color scheme for CLI output
pub mod colors {
    use colored::{ColoredString, Colorize};

    /// Style for labels/headers
    pub fn label(s: &str) -> ColoredString {
        s.bold()
    }

    /// Style for index names and tenant ids
    pub fn index_name(s: &str) -> ColoredString {
        s.cyan()
    }

    /// Style for numbers/counts
    pub fn number(s: &str) -> ColoredString {
        s.yellow()
    }

    /// Style for success messages
    pub fn success(s: &str) -> ColoredString {
        s.green()
    }

    /// Style for warning messages
    pub fn warning(s: &str) -> ColoredString {
        s.yellow()
    }

    /// Style for error messages
    pub fn error(s: &str) -> ColoredString {
        s.red().bold()
    }

    /// Style for dim/secondary text
    pub fn dim(s: &str) -> ColoredString {
        s.dimmed()
    }

    /// Style for rank numbers
    pub fn rank(s: &str) -> ColoredString {
        s.green().bold()
    }
}

/// Format bytes into human-readable size
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

/// Format relative time (e.g., "2h ago", "3d ago")
pub fn format_relative_time(timestamp: &chrono::DateTime<chrono::Utc>) -> String {
    let duration = chrono::Utc::now().signed_duration_since(*timestamp);

    if duration.num_seconds() < 0 {
        return "in the future".to_string();
    }

    let days = duration.num_days();
    let hours = duration.num_hours();
    let mins = duration.num_minutes();

    if days > 0 {
        format!("{days}d ago")
    } else if hours > 0 {
        format!("{hours}h ago")
    } else if mins > 0 {
        format!("{mins}m ago")
    } else {
        "just now".to_string()
    }
}

/// One ranked hit as printed by `search` and `related`
#[derive(Debug, Serialize)]
pub struct ResultItem {
    pub rank: usize,
    #[serde(flatten)]
    pub result: SearchEngineResult,
}

pub fn ranked(results: Vec<SearchEngineResult>) -> Vec<ResultItem> {
    results
        .into_iter()
        .enumerate()
        .map(|(i, result)| ResultItem { rank: i + 1, result })
        .collect()
}

/// Print ranked results in human format
pub fn print_results(items: &[ResultItem]) {
    for item in items {
        let r = &item.result;
        println!(
            "[{}] {} {}",
            colors::rank(&item.rank.to_string()),
            colors::label(&r.title),
            colors::dim(&format!("(score: {:.2})", r.score))
        );
        let name = if r.entry_name.is_empty() {
            "-"
        } else {
            r.entry_name.as_str()
        };
        println!(
            "    entry {} / {} / {} / {}",
            colors::number(&r.entry_id.to_string()),
            name,
            r.tenant_name,
            colors::dim(&format_relative_time(&r.publish_date))
        );
    }
}

/// Print output as JSON; human output is handled by each command
pub fn print_json<T: Serialize>(data: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(data)?);
    Ok(())
}

/// Print `data` as JSON or run the human printer
pub fn emit<T: Serialize>(
    data: &T,
    format: OutputFormat,
    human: impl FnOnce(&T),
) -> Result<(), serde_json::Error> {
    match format {
        OutputFormat::Human => {
            human(data);
            Ok(())
        }
        OutputFormat::Json => print_json(data),
    }
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{}", colors::success(message));
}

/// Print a warning message
pub fn print_warning(message: &str) {
    eprintln!("{}: {}", colors::warning("Warning"), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{}: {}", colors::error("Error"), message);
}
