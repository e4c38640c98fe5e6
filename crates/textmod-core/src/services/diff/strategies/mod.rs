mod direct;
mod exact;
mod fragmented;
mod line_anchored;
mod normalized;

pub use direct::DirectContentStrategy;
pub use exact::ExactSnippetStrategy;
pub use fragmented::FragmentRedistributionStrategy;
pub use line_anchored::LineAnchoredStrategy;
pub use normalized::NormalizedWhitespaceStrategy;

use crate::services::diff::types::{ApplyStrategy, PatchTarget};

/// The cascade, most precise first.
pub fn default_cascade(line_anchor_window: usize) -> Vec<Box<dyn ApplyStrategy>> {
    vec![
        Box::new(ExactSnippetStrategy),
        Box::new(NormalizedWhitespaceStrategy),
        Box::new(FragmentRedistributionStrategy),
        Box::new(DirectContentStrategy),
        Box::new(LineAnchoredStrategy::new(line_anchor_window)),
    ]
}

/// 1-based line number of a byte offset.
pub(crate) fn line_of(content: &str, byte: usize) -> usize {
    content.as_bytes()[..byte.min(content.len())]
        .iter()
        .filter(|b| **b == b'\n')
        .count()
        + 1
}

/// Byte range of the occurrence of `needle` closest to `line`.
pub(crate) fn nearest_occurrence(content: &str, needle: &str, line: usize) -> Option<(usize, usize)> {
    if needle.is_empty() {
        return None;
    }
    content
        .match_indices(needle)
        .map(|(start, _)| (start, start + needle.len()))
        .min_by_key(|(start, _)| line_of(content, *start).abs_diff(line))
}

pub(crate) fn splice(content: &str, range: (usize, usize), replacement: &str) -> String {
    let mut updated = String::with_capacity(content.len() + replacement.len());
    updated.push_str(&content[..range.0]);
    updated.push_str(replacement);
    updated.push_str(&content[range.1..]);
    updated
}

/// The differing middle of two strings once their common prefix and suffix
/// are removed.
pub(crate) fn changed_middle<'a, 'b>(a: &'a str, b: &'b str) -> (&'a str, &'b str) {
    let prefix = a
        .char_indices()
        .zip(b.chars())
        .take_while(|((_, x), y)| x == y)
        .last()
        .map(|((i, c), _)| i + c.len_utf8())
        .unwrap_or(0);

    let (a_rest, b_rest) = (&a[prefix..], &b[prefix..]);
    let suffix: usize = a_rest
        .chars()
        .rev()
        .zip(b_rest.chars().rev())
        .take_while(|(x, y)| x == y)
        .map(|(x, _)| x.len_utf8())
        .sum();

    (
        &a_rest[..a_rest.len() - suffix],
        &b_rest[..b_rest.len() - suffix],
    )
}

/// The node's own text after the snippet-level edit, when the edit falls
/// inside it.
pub(crate) fn modified_node_content(target: &PatchTarget<'_>) -> Option<String> {
    let (removed, inserted) =
        changed_middle(&target.proposal.original_snippet, &target.proposal.modified_snippet);
    let content = &target.node.content;

    if removed.is_empty() {
        return None;
    }
    let at = content.find(removed)?;
    let updated = splice(content, (at, at + removed.len()), inserted);
    (updated != *content).then_some(updated)
}
