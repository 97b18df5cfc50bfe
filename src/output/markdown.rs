//! Markdown summary generation
//!
//! This module generates human-readable markdown summaries of crawl and
//! processing runs.

use crate::crawler::CrawlReport;
use crate::output::traits::OutputResult;
use crate::processing::ProcessingReport;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Rejections listed individually before the rest are only counted
const MAX_LISTED_REJECTIONS: usize = 50;

/// Writes a markdown summary of a crawl session
pub fn write_crawl_summary(report: &CrawlReport, output_path: &Path) -> OutputResult<()> {
    write_markdown(&format_crawl_summary(report), output_path)
}

/// Writes a markdown summary of a processing run
pub fn write_processing_summary(
    report: &ProcessingReport,
    output_path: &Path,
) -> OutputResult<()> {
    write_markdown(&format_processing_summary(report), output_path)
}

fn write_markdown(markdown: &str, output_path: &Path) -> OutputResult<()> {
    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;
    Ok(())
}

/// Formats a crawl report as markdown
pub fn format_crawl_summary(report: &CrawlReport) -> String {
    let mut md = String::new();

    md.push_str("# Listing-Ripple Crawl Summary\n\n");

    md.push_str("## Session\n\n");
    md.push_str(&format!("- **Source**: {}\n", report.source));
    md.push_str(&format!("- **Strategy**: {}\n", report.strategy));
    md.push_str(&format!(
        "- **Duration**: {:.1} seconds\n",
        report.elapsed.as_secs_f64()
    ));
    let status = if report.aborted.is_some() {
        "aborted"
    } else if report.cancelled {
        "cancelled"
    } else {
        "completed"
    };
    md.push_str(&format!("- **Status**: {}\n", status));
    if let Some(reason) = &report.aborted {
        md.push_str(&format!("- **Aborted by**: {}\n", reason));
    }
    if let Some(hash) = &report.config_hash {
        md.push_str(&format!("- **Config Hash**: {}\n", hash));
    }
    md.push('\n');

    md.push_str("## Traversal\n\n");
    md.push_str("| Counter | Value |\n");
    md.push_str("|---------|-------|\n");
    md.push_str(&format!("| Visited | {} |\n", report.visited));
    md.push_str(&format!("| Stored | {} |\n", report.stored));
    md.push_str(&format!("| Failed | {} |\n", report.failed));
    md.push_str(&format!("| Retries | {} |\n", report.retries));
    md.push_str(&format!("| Enqueued | {} |\n", report.enqueued));
    md.push_str(&format!(
        "| Skipped (duplicate) | {} |\n",
        report.skipped_duplicate
    ));
    md.push_str(&format!(
        "| Skipped (category) | {} |\n",
        report.skipped_by_category
    ));
    md.push_str(&format!("| Left in frontier | {} |\n\n", report.remaining));
    md.push_str(&format!(
        "Success rate: {:.1}%\n\n",
        report.success_rate()
    ));

    if !report.failures.is_empty() {
        md.push_str("## Failed Listings\n\n");
        md.push_str("| Listing | State | Attempts | Error |\n");
        md.push_str("|---------|-------|----------|-------|\n");
        for failure in &report.failures {
            md.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                failure.listing_id, failure.state, failure.attempts, failure.error
            ));
        }
        md.push('\n');
    }

    md
}

/// Formats a processing report as markdown
pub fn format_processing_summary(report: &ProcessingReport) -> String {
    let mut md = String::new();

    md.push_str("# Listing-Ripple Processing Summary\n\n");

    md.push_str("## Dataset\n\n");
    if let Some(source) = report.source {
        md.push_str(&format!("- **Source**: {}\n", source));
    }
    md.push_str(&format!("- **Snapshot files**: {}\n", report.files));
    md.push_str(&format!("- **Records normalized**: {}\n", report.normalized));
    md.push_str(&format!("- **Unique listings**: {}\n", report.unique));
    md.push_str(&format!("- **Duplicates collapsed**: {}\n", report.duplicates));
    md.push_str(&format!("- **Filtered by category**: {}\n", report.filtered));
    md.push_str(&format!("- **Rejected records**: {}\n", report.rejected()));
    md.push_str(&format!(
        "- **Duration**: {:.1} seconds\n\n",
        report.elapsed.as_secs_f64()
    ));

    if !report.outputs.is_empty() {
        md.push_str("## Files\n\n");
        for path in &report.outputs {
            md.push_str(&format!("- `{}`\n", path.display()));
        }
        md.push('\n');
    }

    if !report.rejections.is_empty() {
        let mut by_reason: BTreeMap<String, usize> = BTreeMap::new();
        for rejection in &report.rejections {
            *by_reason.entry(reason_kind(&rejection.reason)).or_default() += 1;
        }

        md.push_str("## Rejections\n\n");
        md.push_str("| Reason | Count |\n");
        md.push_str("|--------|-------|\n");
        for (reason, count) in &by_reason {
            md.push_str(&format!("| {} | {} |\n", reason, count));
        }
        md.push('\n');

        for rejection in report.rejections.iter().take(MAX_LISTED_REJECTIONS) {
            md.push_str(&format!("- `{}`: {}\n", rejection.snapshot, rejection.reason));
        }
        if report.rejections.len() > MAX_LISTED_REJECTIONS {
            md.push_str(&format!(
                "\n... and {} more\n",
                report.rejections.len() - MAX_LISTED_REJECTIONS
            ));
        }
        md.push('\n');
    }

    md
}

fn reason_kind(reason: &crate::processing::RejectReason) -> String {
    use crate::processing::RejectReason::*;
    match reason {
        MalformedBody(..) => "malformed body",
        Unreadable(_) => "unreadable snapshot",
        NotARecord(_) => "not a listing object",
        MissingListingId => "missing listing id",
        InvalidListingId(_) => "invalid listing id",
        MissingTimestamp => "missing timestamp",
        InvalidTimestamp(_) => "invalid timestamp",
    }
    .to_string()
}
