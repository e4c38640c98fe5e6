use super::{nearest_occurrence, splice};
use crate::services::diff::types::{ApplyStrategy, ApplyStrategyKind, PatchResult, PatchTarget};

/// Verbatim snippet replace at the occurrence nearest the node.
#[derive(Debug, Default)]
pub struct ExactSnippetStrategy;

impl ApplyStrategy for ExactSnippetStrategy {
    fn kind(&self) -> ApplyStrategyKind {
        ApplyStrategyKind::ExactSnippet
    }

    fn apply(&self, content: &str, target: &PatchTarget<'_>) -> PatchResult {
        let range = nearest_occurrence(content, &target.proposal.original_snippet, target.anchor_line())
            .ok_or_else(|| "original snippet not found verbatim".to_string())?;
        Ok(splice(content, range, &target.proposal.modified_snippet))
    }
}
