//! End-of-run summary lines

use std::time::Duration;

use shoebox_archiver::{ArchiveReport, CostEstimator, RetrieveReport};
use shoebox_core::{CostPrices, DownloadOutcome};

const SEPARATOR: &str = "----------------------------------------------------------------";

/// Format a duration as `HH:MM:SS.mmm`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let total_secs = elapsed.as_secs();
    format!(
        "{:02}:{:02}:{:02}.{:03}",
        total_secs / 3600,
        (total_secs / 60) % 60,
        total_secs % 60,
        elapsed.subsec_millis()
    )
}

pub fn archive_summary(report: &ArchiveReport, elapsed: Duration) -> Vec<String> {
    let succeeded = report.succeeded().count();
    let failed: Vec<_> = report.failed().collect();

    let mut lines = vec![
        SEPARATOR.to_string(),
        format!("Summary: {} succeeded, {} failed", succeeded, failed.len()),
        format!("Time elapsed: {}", format_elapsed(elapsed)),
    ];
    if report.cancelled {
        lines.push("Run was cancelled before every file was processed".to_string());
    }
    if !failed.is_empty() {
        lines.push("Failed:".to_string());
        for result in failed {
            let error = result
                .error
                .as_ref()
                .map(|e| e.to_string())
                .unwrap_or_default();
            lines.push(format!(
                "{}\t{}\t{}",
                result.outcome,
                result.path.display(),
                error
            ));
        }
    }
    lines
}

pub fn retrieve_summary(report: &RetrieveReport, elapsed: Duration) -> Vec<String> {
    let mut lines = vec![
        SEPARATOR.to_string(),
        format!(
            "Summary: {} succeeded, {} pending, {} failed",
            report.count(DownloadOutcome::Succeeded),
            report.count(DownloadOutcome::Pending),
            report.count(DownloadOutcome::Failed)
        ),
        format!("Time elapsed: {}", format_elapsed(elapsed)),
    ];
    if report.cancelled {
        lines.push("Run was cancelled before every blob was processed".to_string());
    }
    let failed: Vec<_> = report
        .failed()
        .filter(|r| r.outcome != DownloadOutcome::Pending)
        .collect();
    if !failed.is_empty() {
        lines.push("Failed:".to_string());
        for result in failed {
            let error = result
                .error
                .as_ref()
                .map(|e| e.to_string())
                .unwrap_or_default();
            lines.push(format!(
                "{}\t{}\t{}",
                result.outcome, result.blob_identifier, error
            ));
        }
    }
    lines
}

/// Usage counters and, when any price is configured, the estimated costs.
pub fn cost_summary(costs: &CostEstimator, prices: &CostPrices) -> Vec<String> {
    let mut lines = Vec::new();

    let usage = costs.summarize_usage();
    if !usage.is_empty() {
        lines.push("Usage summary:".to_string());
        lines.extend(
            usage
                .into_iter()
                .map(|(item, amount)| format!("{:<48}\t{}", item, amount)),
        );
    }

    let estimates = costs.summarize_costs(prices);
    if !estimates.is_empty() {
        lines.push("Estimated costs:".to_string());
        lines.extend(estimates.into_iter().map(|(item, cost)| {
            format!("{:<48}\t{} {:.8}", item, prices.currency, cost)
        }));
    }
    lines
}
