use regex::RegexBuilder;

use super::{modified_node_content, splice};
use crate::services::diff::types::{ApplyStrategy, ApplyStrategyKind, PatchResult, PatchTarget};

/// Last resort: a case-insensitive, whitespace-flexible search confined to
/// a few lines around the node's recorded position.
#[derive(Debug)]
pub struct LineAnchoredStrategy {
    window: usize,
}

impl LineAnchoredStrategy {
    pub fn new(window: usize) -> Self {
        Self { window }
    }

    /// Byte range covered by lines `line - window ..= line + window`.
    fn window_range(&self, content: &str, line: usize) -> (usize, usize) {
        let first = line.saturating_sub(self.window).max(1);
        let last = line + self.window;

        let mut start = content.len();
        let mut end = content.len();
        let mut offset = 0;
        for (idx, raw) in content.split_inclusive('\n').enumerate() {
            let number = idx + 1;
            if number == first {
                start = offset;
            }
            offset += raw.len();
            if number == last {
                end = offset;
                break;
            }
        }
        (start.min(end), end)
    }

    fn find(&self, content: &str, needle: &str, window: (usize, usize)) -> Option<(usize, usize)> {
        let tokens: Vec<String> = needle.split_whitespace().map(regex::escape).collect();
        if tokens.is_empty() {
            return None;
        }
        let pattern = RegexBuilder::new(&tokens.join(r"\s+"))
            .case_insensitive(true)
            .build()
            .ok()?;
        pattern
            .find(&content[window.0..window.1])
            .map(|m| (window.0 + m.start(), window.0 + m.end()))
    }
}

impl ApplyStrategy for LineAnchoredStrategy {
    fn kind(&self) -> ApplyStrategyKind {
        ApplyStrategyKind::LineAnchored
    }

    fn apply(&self, content: &str, target: &PatchTarget<'_>) -> PatchResult {
        let window = self.window_range(content, target.node.span.start_line);

        if let Some(range) = self.find(content, &target.proposal.original_snippet, window) {
            return Ok(splice(content, range, &target.proposal.modified_snippet));
        }

        let replacement = modified_node_content(target)
            .ok_or_else(|| "edit does not fall inside the node text".to_string())?;
        let range = self
            .find(content, &target.node.content, window)
            .ok_or_else(|| format!("nothing matched within {} line(s) of the node", self.window))?;
        Ok(splice(content, range, &replacement))
    }
}
