use std::time::Instant;

use chrono::Utc;

use crate::error::TextModError;
use crate::prompts::FormatResponse;
use crate::services::diff::ApplyReport;
use crate::services::proposal::BatchProposals;
use crate::shared::{AppliedChange, ModificationResult};

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

/// Structured failure for a term that no project file contains.
pub fn no_candidate_files(search_term: &str, scanned: usize, started: Instant) -> ModificationResult {
    tracing::warn!(
        "{}",
        TextModError::NoCandidateFiles {
            search_term: search_term.to_string()
        }
    );
    failure(FormatResponse::no_candidate_files(search_term, scanned), started)
}

/// Structured failure for candidate files without a qualifying text node.
pub fn no_nodes_extracted(search_term: &str, files: usize, started: Instant) -> ModificationResult {
    tracing::warn!(
        "{}",
        TextModError::NoNodesExtracted {
            search_term: search_term.to_string(),
            files,
        }
    );
    failure(FormatResponse::no_nodes_extracted(search_term, files), started)
}

pub fn failure(error: String, started: Instant) -> ModificationResult {
    ModificationResult {
        success: false,
        error: Some(error),
        strategy_summary: FormatResponse::strategy_summary(&[], false),
        processing_time_ms: elapsed_ms(started),
        ..ModificationResult::default()
    }
}

/// Rolls batch and apply outcomes into the final result.
pub fn aggregate(
    batches: &[BatchProposals],
    report: &ApplyReport,
    fragmented: bool,
    started: Instant,
) -> ModificationResult {
    let batch_results = report.batch_results(batches);
    let failed_batches = batch_results.iter().filter(|b| b.failed()).count();
    let total_replacements = report.total_replacements();

    let average_confidence = report.average_confidence();

    let counts: Vec<(String, usize)> = report
        .strategy_counts()
        .iter()
        .map(|(kind, count)| (kind.as_str().to_string(), *count))
        .collect();

    let applied_at = Utc::now();
    let mut result = ModificationResult {
        success: total_replacements > 0,
        total_replacements,
        batches: batch_results,
        average_confidence,
        strategy_summary: FormatResponse::strategy_summary(&counts, fragmented),
        diagnostics: report.diagnostics.clone(),
        ..ModificationResult::default()
    };

    for file in report.committed_files() {
        let mut strategies: Vec<&str> = file.strategies.iter().map(|s| s.as_str()).collect();
        strategies.dedup();

        result.modified_files.push(file.path.clone());
        if let Some(diff) = &file.diff {
            result.diffs.push(diff.clone());
        }
        result.applied_changes.push(AppliedChange {
            path: file.path.clone(),
            strategy: strategies.join("+"),
            replacement_count: file.replacements,
            diff: file.diff.clone().unwrap_or_default(),
            applied_at,
        });
        result
            .updated_files
            .insert(file.path.clone(), file.updated.clone());
    }

    if !result.success {
        result.error = Some(FormatResponse::nothing_applied(&report.diagnostics, failed_batches));
    }
    result.processing_time_ms = elapsed_ms(started);

    tracing::info!(
        "{} replacement(s) in {} file(s), {} of {} batch(es) failed",
        result.total_replacements,
        result.modified_files.len(),
        failed_batches,
        result.batches.len()
    );
    result
}
