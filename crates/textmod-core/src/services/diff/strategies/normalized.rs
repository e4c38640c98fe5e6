use regex::Regex;

use super::{line_of, splice};
use crate::services::diff::types::{ApplyStrategy, ApplyStrategyKind, PatchResult, PatchTarget};

/// Snippet replace that tolerates any difference in whitespace runs.
#[derive(Debug, Default)]
pub struct NormalizedWhitespaceStrategy;

impl NormalizedWhitespaceStrategy {
    pub fn pattern(snippet: &str) -> Option<Regex> {
        let tokens: Vec<String> = snippet.split_whitespace().map(regex::escape).collect();
        if tokens.is_empty() {
            return None;
        }
        Regex::new(&tokens.join(r"\s+")).ok()
    }
}

impl ApplyStrategy for NormalizedWhitespaceStrategy {
    fn kind(&self) -> ApplyStrategyKind {
        ApplyStrategyKind::NormalizedWhitespace
    }

    fn apply(&self, content: &str, target: &PatchTarget<'_>) -> PatchResult {
        let pattern = Self::pattern(&target.proposal.original_snippet)
            .ok_or_else(|| "original snippet has no searchable text".to_string())?;
        let anchor = target.anchor_line();

        let found = pattern
            .find_iter(content)
            .min_by_key(|m| line_of(content, m.start()).abs_diff(anchor))
            .ok_or_else(|| "no whitespace-normalized match".to_string())?;
        Ok(splice(content, (found.start(), found.end()), &target.proposal.modified_snippet))
    }
}
