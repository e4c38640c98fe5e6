use super::{modified_node_content, nearest_occurrence, splice};
use crate::services::diff::types::{ApplyStrategy, ApplyStrategyKind, PatchResult, PatchTarget};

/// Replaces the node's raw text with its edited form wherever it occurs.
#[derive(Debug, Default)]
pub struct DirectContentStrategy;

impl ApplyStrategy for DirectContentStrategy {
    fn kind(&self) -> ApplyStrategyKind {
        ApplyStrategyKind::DirectContent
    }

    fn apply(&self, content: &str, target: &PatchTarget<'_>) -> PatchResult {
        let replacement = modified_node_content(target)
            .ok_or_else(|| "edit does not fall inside the node text".to_string())?;
        let range = nearest_occurrence(content, &target.node.content, target.node.span.start_line)
            .ok_or_else(|| "node text not found".to_string())?;
        Ok(splice(content, range, &replacement))
    }
}
