use crate::shared::{get_scope_definition, ApplyDiagnostics, ModificationScope};

/// Human-readable explanations carried in results.
pub struct FormatResponse;

impl FormatResponse {
    pub fn no_candidate_files(search_term: &str, scanned: usize) -> String {
        format!(
            "Could not find \"{}\" in any of the {} project file(s). Check the exact wording shown in the UI and try again.",
            search_term, scanned
        )
    }

    pub fn no_nodes_extracted(search_term: &str, files: usize) -> String {
        format!(
            "\"{}\" appears in {} file(s) but not as visible text (it may only occur in code, comments or identifiers). No changes were made.",
            search_term, files
        )
    }

    pub fn nothing_applied(diagnostics: &ApplyDiagnostics, failed_batches: usize) -> String {
        let mut reasons = Vec::new();
        if failed_batches > 0 {
            reasons.push(format!("{} batch(es) failed", failed_batches));
        }
        if diagnostics.rejected_proposals > 0 {
            reasons.push(format!("{} proposal(s) declined", diagnostics.rejected_proposals));
        }
        if diagnostics.invalid_proposals > 0 {
            reasons.push(format!("{} proposal(s) invalid", diagnostics.invalid_proposals));
        }
        if diagnostics.apply_misses > 0 {
            reasons.push(format!("{} proposal(s) could not be placed", diagnostics.apply_misses));
        }
        if diagnostics.already_applied > 0 {
            reasons.push(format!("{} already applied", diagnostics.already_applied));
        }
        if !diagnostics.write_errors.is_empty() {
            reasons.push(format!("{} write error(s)", diagnostics.write_errors.len()));
        }

        if reasons.is_empty() {
            "No replacements were applied.".to_string()
        } else {
            format!("No replacements were applied: {}.", reasons.join(", "))
        }
    }

    pub fn missing_terms() -> String {
        "The request looks like a text change, but the current and new wording could not be determined. Quote both, e.g. change 'Old text' to 'New text'.".to_string()
    }

    pub fn delegated(scope: ModificationScope) -> String {
        format!(
            "Request routed to the {} strategy.",
            get_scope_definition(scope).name.to_lowercase()
        )
    }

    pub fn strategy_summary(counts: &[(String, usize)], fragmented: bool) -> String {
        if counts.is_empty() {
            return "no edits applied".to_string();
        }
        let parts: Vec<String> = counts
            .iter()
            .map(|(strategy, count)| format!("{} x{}", strategy, count))
            .collect();
        let mode = if fragmented { "fragmented match" } else { "exact match" };
        format!("{}; {}", mode, parts.join(", "))
    }
}
