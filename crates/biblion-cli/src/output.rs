//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use std::path::PathBuf;

use serde::Serialize;

use biblion_core::{BibEntry, ImportReport, UpdateReport};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// A generated key next to the key the entry came with
#[derive(Debug, Clone, Serialize)]
pub struct KeyRow {
    pub source_key: String,
    pub key: String,
}

/// One formatted citation
#[derive(Debug, Clone, Serialize)]
pub struct CitationRow {
    pub key: String,
    pub citation: String,
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Print parsed entries
    pub fn print_entries(&self, entries: &[BibEntry]) {
        match self.format {
            OutputFormat::Human => {
                if entries.is_empty() {
                    println!("No entries found.");
                    return;
                }
                for entry in entries {
                    println!(
                        "{} | {} | {} | {}",
                        truncate(&entry.citation_key, 20),
                        entry.entry_type,
                        entry.year.as_deref().unwrap_or("n.d."),
                        truncate(entry.title.as_deref().unwrap_or("(untitled)"), 50)
                    );
                }
                println!("\n{} entr{}", entries.len(), plural(entries.len(), "y", "ies"));
            }
            OutputFormat::Json => print_json(&entries),
            OutputFormat::Quiet => {
                for entry in entries {
                    println!("{}", entry.citation_key);
                }
            }
        }
    }

    /// Print generated citation keys
    pub fn print_keys(&self, rows: &[KeyRow]) {
        match self.format {
            OutputFormat::Human => {
                for row in rows {
                    println!("{} -> {}", row.source_key, row.key);
                }
            }
            OutputFormat::Json => print_json(&rows),
            OutputFormat::Quiet => {
                for row in rows {
                    println!("{}", row.key);
                }
            }
        }
    }

    /// Print formatted citations
    pub fn print_citations(&self, rows: &[CitationRow]) {
        match self.format {
            OutputFormat::Json => print_json(&rows),
            OutputFormat::Human | OutputFormat::Quiet => {
                for row in rows {
                    println!("{}", row.citation);
                }
            }
        }
    }

    /// Print a single named value
    pub fn print_value(&self, name: &str, value: &str) {
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::json!({ name: value })),
            OutputFormat::Human | OutputFormat::Quiet => println!("{}", value),
        }
    }

    /// Print files written by a command
    pub fn print_paths(&self, paths: &[PathBuf]) {
        match self.format {
            OutputFormat::Human => {
                for path in paths {
                    println!("✓ {}", path.display());
                }
                println!("\n{} file(s) written", paths.len());
            }
            OutputFormat::Json => print_json(&paths),
            OutputFormat::Quiet => {
                for path in paths {
                    println!("{}", path.display());
                }
            }
        }
    }

    /// Print the outcome of an import run
    pub fn print_import_report(&self, report: &ImportReport) {
        match self.format {
            OutputFormat::Human => {
                for item in &report.imported {
                    let enriched = if item.enriched { " (enriched)" } else { "" };
                    println!("✓ {} <- {}{}", item.key, item.source.display(), enriched);
                }
                for item in &report.failed {
                    match &item.key {
                        Some(key) => {
                            println!("✗ {} ({}): {}", item.path.display(), key, item.error)
                        }
                        None => println!("✗ {}: {}", item.path.display(), item.error),
                    }
                }
                println!(
                    "\n{} imported, {} failed",
                    report.imported.len(),
                    report.failed.len()
                );
            }
            OutputFormat::Json => print_json(report),
            OutputFormat::Quiet => {
                for item in &report.imported {
                    println!("{}", item.key);
                }
            }
        }
    }

    /// Print the outcome of a note update run
    pub fn print_update_report(&self, report: &UpdateReport) {
        match self.format {
            OutputFormat::Human => {
                for path in &report.updated {
                    println!("✓ {}", path.display());
                }
                for item in &report.failed {
                    println!("✗ {}: {}", item.path.display(), item.error);
                }
                println!(
                    "\n{} updated, {} skipped, {} failed",
                    report.updated.len(),
                    report.skipped.len(),
                    report.failed.len()
                );
            }
            OutputFormat::Json => print_json(report),
            OutputFormat::Quiet => {
                for path in &report.updated {
                    println!("{}", path.display());
                }
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print a hint on stderr (suppressed in quiet mode)
    pub fn hint(&self, msg: &str) {
        if !self.is_quiet() {
            eprintln!("hint: {}", msg);
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!("Failed to serialize output: {}", e),
    }
}

fn plural(count: usize, one: &'static str, many: &'static str) -> &'static str {
    if count == 1 {
        one
    } else {
        many
    }
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
