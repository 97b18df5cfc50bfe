//! Run reports printed to stdout

use crate::crawler::CrawlReport;
use crate::processing::ProcessingReport;

/// Prints a crawl report to stdout in a formatted manner
pub fn print_crawl_report(report: &CrawlReport) {
    println!("=== Crawl Report ===\n");

    println!("Session:");
    println!("  Source: {}", report.source);
    println!("  Strategy: {}", report.strategy);
    println!("  Elapsed: {:.1}s", report.elapsed.as_secs_f64());
    if let Some(reason) = &report.aborted {
        println!("  Status: aborted ({})", reason);
    } else if report.cancelled {
        println!("  Status: cancelled");
    }
    println!();

    println!("Listings:");
    println!("  Visited: {}", report.visited);
    println!("  Stored: {}", report.stored);
    println!("  Failed: {}", report.failed);
    println!("  Retries: {}", report.retries);
    println!("  Enqueued: {}", report.enqueued);
    println!("  Skipped as duplicate: {}", report.skipped_duplicate);
    println!("  Skipped by category: {}", report.skipped_by_category);
    println!("  Left in frontier: {}", report.remaining);
    println!();

    if !report.failures.is_empty() {
        println!("Failures ({}):", report.failures.len());
        for failure in &report.failures {
            println!(
                "  - {} [{}] after {} attempt(s): {}",
                failure.listing_id, failure.state, failure.attempts, failure.error
            );
        }
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} / {} listings stored)",
        report.success_rate(),
        report.stored,
        report.visited
    );
}

/// Prints a processing report to stdout in a formatted manner
pub fn print_processing_report(report: &ProcessingReport) {
    println!("=== Processing Report ===\n");

    if let Some(source) = report.source {
        println!("Source: {}", source);
    }

    println!("Snapshots read: {}", report.files);
    println!("Records normalized: {}", report.normalized);
    println!("Unique listings: {}", report.unique);
    println!("Duplicates collapsed: {}", report.duplicates);
    println!("Filtered by category: {}", report.filtered);
    println!("Rejected records: {}", report.rejected());
    println!("Elapsed: {:.1}s", report.elapsed.as_secs_f64());

    if !report.outputs.is_empty() {
        println!("\nWritten:");
        for path in &report.outputs {
            println!("  - {}", path.display());
        }
    }
}
