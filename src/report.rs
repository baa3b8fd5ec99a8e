//! Output formatting for generation runs.
//!
//! Supports two output formats:
//! - Pretty: colored terminal summary
//! - JSON: structured output for scripts and CI

use colored::*;
use serde::Serialize;
use std::path::Path;

use crate::generate::GenerationReport;

// =============================================================================
// JSON Format
// =============================================================================

/// JSON envelope around the run report.
#[derive(Serialize)]
pub struct JsonReport<'a> {
    pub version: &'static str,
    pub success: bool,
    #[serde(flatten)]
    pub report: &'a GenerationReport,
}

pub fn json_report(report: &GenerationReport) -> JsonReport<'_> {
    JsonReport {
        version: env!("CARGO_PKG_VERSION"),
        success: true,
        report,
    }
}

/// Write the report as pretty-printed JSON to stdout.
pub fn write_json(report: &GenerationReport) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(&json_report(report))?;
    println!("{}", json);
    Ok(())
}

// =============================================================================
// Pretty Format
// =============================================================================

/// Write a colored summary to stdout.
pub fn write_pretty(report: &GenerationReport) {
    println!();
    print!("  ");
    print!("{}", "gen-proxy".cyan().bold());
    println!(" v{}", env!("CARGO_PKG_VERSION"));
    println!();

    print!("  {}", "Package: ".dimmed());
    println!("{} ({})", report.import_path, report.package);
    print!("  {}", "Mode:    ".dimmed());
    println!("{}", report.mode);
    print!("  {}", "Alias:   ".dimmed());
    println!("{}", report.alias);
    print!("  {}", "Output:  ".dimmed());
    println!("{}", report.output_dir.display());
    println!();

    if !report.written.is_empty() {
        println!("  {}", "Written".bold());
        for path in &report.written {
            println!("    {} {}", "+".green(), display_name(path, &report.output_dir));
        }
        println!();
    }

    if !report.skipped_files.is_empty() {
        println!("  {}", "Skipped".bold());
        for skipped in &report.skipped_files {
            println!("    {} {} {}", "-".dimmed(), skipped.file, skipped.reason.dimmed());
        }
        println!();
    }

    if !report.exclusions.is_empty() {
        println!("  {}", "Excluded symbols".bold());
        for exclusion in &report.exclusions {
            println!(
                "    {} {}:{} {}",
                "!".yellow(),
                exclusion.file,
                exclusion.symbol.yellow(),
                exclusion.reason.to_string().dimmed()
            );
        }
        println!();
    }

    if !report.unresolved_imports.is_empty() {
        println!("  {}", "Unresolved imports (dropped)".bold());
        for path in &report.unresolved_imports {
            println!("    {} {}", "?".yellow(), path);
        }
        println!();
    }

    write_final_status(report);
    println!();
}

fn write_final_status(report: &GenerationReport) {
    let status = format!(
        "{} file(s) written, {} symbol(s) excluded",
        report.written.len(),
        report.exclusions.len()
    );
    if report.exclusions.is_empty() {
        println!("  {} {}", "✓".green(), status);
    } else {
        println!("  {} {}", "✓".yellow(), status);
    }
}

fn display_name(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|_| path.to_string_lossy().to_string())
}
