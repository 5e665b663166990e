//! CLI output formatting.
//!
//! Output is organized around generated names: each photo line leads with the
//! name it got in the destination, with the source file as indented context.
//!
//! # Output Format
//!
//! ## Config (`check`, or `run --verbose`)
//!
//! ```text
//! Config
//!     Collection: wedding
//!     Description: Summer party
//!     Source: /photos/raw
//!     Destination: /photos/wedding
//!     Force reprocess: no
//! ```
//!
//! ## Photos (`run --verbose`)
//!
//! ```text
//! wedding-20241005T143045-r5a.jpg
//!     Source: /photos/raw/IMG_0002.JPG
//! wedding-20241005T143046-r5a.jpg (unchanged)
//!     Source: /photos/raw/IMG_0003.jpg
//! notes.txt skipped (unsupported_format)
//! wedding-20241004T101010-r5a.jpg removed
//! ```
//!
//! ## Run summary
//!
//! ```text
//! Errors
//!     filesystem_error: IMG_0009.jpg (permission denied)
//! Warnings
//!     exif_error: scan.jpg (no DateTimeOriginal), using filename order
//!
//! Processed 3 pics, 1 warnings, 1 errors
//! Files: 2 reused, 1 processed (3 total)
//! Manifest: /photos/wedding/manifest.json
//! ```
//!
//! # Architecture
//!
//! Each view has a `format_*` function returning lines for testability and a
//! `print_*` wrapper that writes to stdout.

use crate::config::Config;
use crate::issues::{Issue, ProcessingSummary, Severity};
use crate::manifest::Manifest;
use crate::organize::{PhotoEvent, RunReport};

fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

// ============================================================================
// Config
// ============================================================================

pub fn format_config(config: &Config) -> Vec<String> {
    let mut lines = vec!["Config".to_string()];
    lines.push(format!("{}Collection: {}", indent(1), config.collection_name));
    if let Some(desc) = &config.collection_description {
        lines.push(format!("{}Description: {}", indent(1), desc));
    }
    lines.push(format!("{}Source: {}", indent(1), config.source_dir.display()));
    lines.push(format!(
        "{}Destination: {}",
        indent(1),
        config.dest_dir.display()
    ));
    lines.push(format!(
        "{}Force reprocess: {}",
        indent(1),
        yes_no(config.force_reprocess)
    ));
    lines
}

pub fn print_config(config: &Config) {
    for line in format_config(config) {
        println!("{}", line);
    }
}

// ============================================================================
// Per-photo events
// ============================================================================

pub fn format_photo_event(event: &PhotoEvent) -> Vec<String> {
    let named = |dest: &str, note: &str, source: &str| {
        vec![
            format!("{dest}{note}"),
            format!("{}Source: {}", indent(1), source),
        ]
    };
    match event {
        PhotoEvent::Linked { source, dest } => named(dest, "", source),
        PhotoEvent::Reused { source, dest } => named(dest, " (unchanged)", source),
        PhotoEvent::Planned { source, dest } => named(dest, " (planned)", source),
        PhotoEvent::Skipped { source, kind } => vec![format!("{source} skipped ({kind})")],
        PhotoEvent::Removed { dest } => vec![format!("{dest} removed")],
    }
}

// ============================================================================
// Run summary
// ============================================================================

/// `Processed N pics, W warnings, E errors`
pub fn format_summary(summary: &ProcessingSummary) -> String {
    format!(
        "Processed {} pics, {} warnings, {} errors",
        summary.processed_successfully, summary.warnings_count, summary.errors_count
    )
}

/// Every recorded issue, grouped into errors and warnings. Info-level issues
/// are only listed when `verbose`.
pub fn format_issues(manifest: &Manifest, verbose: bool) -> Vec<String> {
    let all: Vec<&Issue> = manifest
        .errors
        .iter()
        .chain(&manifest.warnings)
        .chain(manifest.pics.iter().flat_map(|p| &p.errors))
        .collect();

    let mut lines = Vec::new();
    let sections = [
        ("Errors", Severity::Error),
        ("Warnings", Severity::Warning),
        ("Info", Severity::Info),
    ];
    for (title, severity) in sections {
        if severity == Severity::Info && !verbose {
            continue;
        }
        let matching: Vec<_> = all.iter().filter(|i| i.severity == severity).collect();
        if matching.is_empty() {
            continue;
        }
        lines.push(title.to_string());
        for issue in matching {
            lines.push(format!("{}{}", indent(1), issue));
        }
    }
    lines
}

pub fn format_run_output(report: &RunReport, verbose: bool) -> Vec<String> {
    let mut lines = format_issues(&report.manifest, verbose);
    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(format_summary(&report.summary));
    lines.push(format!("Files: {}", report.stats));
    lines.push(format!("Manifest: {}", report.manifest_path.display()));
    lines
}

pub fn print_run_output(report: &RunReport, verbose: bool) {
    for line in format_run_output(report, verbose) {
        println!("{}", line);
    }
}
