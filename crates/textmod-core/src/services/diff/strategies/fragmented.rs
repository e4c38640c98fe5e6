use super::{nearest_occurrence, splice};
use crate::services::diff::types::{ApplyStrategy, ApplyStrategyKind, PatchResult, PatchTarget};
use crate::services::matching::strip_markup;
use crate::shared::Fragment;

/// Writes the replacement words back into the fragment spans the edit
/// touches, in order, leaving the markup and every untouched fragment as is.
#[derive(Debug, Default)]
pub struct FragmentRedistributionStrategy;

/// Visible-word difference between an original and a modified snippet.
#[derive(Debug, Clone, PartialEq)]
struct WordEdit {
    /// Visible words of the original snippet.
    before: Vec<String>,
    /// Half-open range of `before` the edit replaces.
    changed: (usize, usize),
    replacement: Vec<String>,
}

impl FragmentRedistributionStrategy {
    fn word_edit(original: &str, modified: &str) -> Option<WordEdit> {
        let original = strip_markup(original);
        let modified = strip_markup(modified);
        let before: Vec<String> = original.split_whitespace().map(String::from).collect();
        let after: Vec<&str> = modified.split_whitespace().collect();

        let prefix = before
            .iter()
            .zip(&after)
            .take_while(|(a, b)| a.as_str() == **b)
            .count();
        let suffix = before[prefix..]
            .iter()
            .rev()
            .zip(after[prefix..].iter().rev())
            .take_while(|(a, b)| a.as_str() == **b)
            .count();

        let end = before.len() - suffix;
        if end == prefix {
            return None;
        }
        let replacement = after[prefix..after.len() - suffix]
            .iter()
            .map(|w| w.to_string())
            .collect();
        Some(WordEdit {
            before,
            changed: (prefix, end),
            replacement,
        })
    }

    /// Word range each fragment occupies in `words`, matched in order.
    fn align(words: &[String], fragments: &[Fragment]) -> Option<Vec<(usize, usize)>> {
        let mut cursor = 0;
        fragments
            .iter()
            .map(|fragment| {
                let own: Vec<&str> = fragment.content.split_whitespace().collect();
                if own.is_empty() || own.len() > words.len() {
                    return None;
                }
                let start = (cursor..=words.len() - own.len()).find(|&i| {
                    words[i..i + own.len()]
                        .iter()
                        .zip(&own)
                        .all(|(a, b)| a.as_str() == *b)
                })?;
                cursor = start + own.len();
                Some((start, cursor))
            })
            .collect()
    }

    /// Splits `words` across slots in proportion to each slot's word count.
    pub fn distribute(words: &[String], weights: &[usize]) -> Vec<Vec<String>> {
        let total: usize = weights.iter().sum::<usize>().max(1);
        let mut assigned = Vec::with_capacity(weights.len());
        let mut cumulative = 0;
        let mut taken = 0;

        for (i, weight) in weights.iter().enumerate() {
            cumulative += weight;
            let boundary = if i + 1 == weights.len() {
                words.len()
            } else {
                ((words.len() * cumulative) as f64 / total as f64).round() as usize
            };
            let boundary = boundary.clamp(taken, words.len());
            assigned.push(words[taken..boundary].to_vec());
            taken = boundary;
        }
        assigned
    }
}

impl ApplyStrategy for FragmentRedistributionStrategy {
    fn kind(&self) -> ApplyStrategyKind {
        ApplyStrategyKind::FragmentRedistribution
    }

    fn apply(&self, content: &str, target: &PatchTarget<'_>) -> PatchResult {
        let sequence = target
            .node
            .fragments
            .as_ref()
            .ok_or_else(|| "node is not fragmented".to_string())?;
        let edit = Self::word_edit(
            &target.proposal.original_snippet,
            &target.proposal.modified_snippet,
        )
        .ok_or_else(|| "proposal changes no visible words".to_string())?;
        let ranges = Self::align(&edit.before, &sequence.fragments)
            .ok_or_else(|| "fragments do not line up with the original snippet".to_string())?;

        let (first, last) = edit.changed;
        let inside_fragments =
            (first..last).all(|w| ranges.iter().any(|(s, e)| (*s..*e).contains(&w)));
        if !inside_fragments {
            return Err("edit reaches text outside the fragments".to_string());
        }

        let touched: Vec<usize> = ranges
            .iter()
            .enumerate()
            .filter(|(_, (s, e))| *s < last && first < *e)
            .map(|(i, _)| i)
            .collect();
        let weights: Vec<usize> = touched
            .iter()
            .map(|i| {
                let (s, e) = ranges[*i];
                e.min(last) - s.max(first)
            })
            .collect();
        let assignments = Self::distribute(&edit.replacement, &weights);

        let mut updated = content.to_string();
        for (index, assigned) in touched.iter().zip(assignments).rev() {
            let fragment = &sequence.fragments[*index];
            let (s, e) = ranges[*index];

            let kept_before = &edit.before[s..s.max(first)];
            let kept_after = &edit.before[e.min(last)..e];
            let text = kept_before
                .iter()
                .chain(assigned.iter())
                .chain(kept_after.iter())
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(" ");

            let span = (fragment.span.start_byte, fragment.span.end_byte);
            let range = if updated.get(span.0..span.1) == Some(fragment.content.as_str()) {
                span
            } else {
                nearest_occurrence(&updated, &fragment.content, fragment.span.start_line)
                    .ok_or_else(|| format!("fragment \"{}\" no longer present", fragment.content))?
            };
            updated = splice(&updated, range, &text);
        }
        Ok(updated)
    }
}
