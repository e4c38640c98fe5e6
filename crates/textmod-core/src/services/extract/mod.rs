mod fragments;
mod lines;
mod tree;

use std::collections::HashSet;

pub use fragments::{find_runs, FragmentRun};
pub use lines::{context_lines, scan_lines, LineIndex};
pub use tree::{collect_units, parse_source, Grammar};

use crate::config::EngineConfig;
use crate::services::matching::normalize_for_match;
use crate::shared::{CandidateFile, Fragment, FragmentSequence, NodeKind, Span, TextNode, TextReplaceTerms};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractionOutcome {
    pub nodes: Vec<TextNode>,
    /// The term (or variation) that produced the nodes.
    pub matched_term: Option<String>,
    pub parsed_files: usize,
    pub line_scanned_files: usize,
    pub fragmented: bool,
}

struct FileUnits<'a> {
    path: &'a str,
    source: &'a str,
    units: Vec<Fragment>,
}

/// Turns candidate files into deduplicated text nodes for one search term.
#[derive(Debug, Clone)]
pub struct StructuralExtractor {
    config: EngineConfig,
}

impl StructuralExtractor {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Extracts with the search term, then with each variation in turn until
    /// one of them yields nodes.
    pub fn extract(&self, candidates: &[CandidateFile], terms: &TextReplaceTerms) -> ExtractionOutcome {
        let attempts = std::iter::once(&terms.search_term).chain(terms.search_variations.iter());

        let mut last = ExtractionOutcome::default();
        for term in attempts {
            let outcome = self.extract_term(candidates, term);
            if !outcome.nodes.is_empty() {
                if term != &terms.search_term {
                    tracing::info!("extraction matched variation \"{}\"", term);
                }
                return outcome;
            }
            last = outcome;
        }

        tracing::warn!(
            "no text nodes matched \"{}\" in {} candidate file(s)",
            terms.search_term,
            candidates.len()
        );
        last
    }

    pub fn extract_term(&self, candidates: &[CandidateFile], term: &str) -> ExtractionOutcome {
        let mut outcome = ExtractionOutcome::default();
        if term.trim().is_empty() {
            return outcome;
        }

        let files: Vec<FileUnits> = candidates
            .iter()
            .map(|candidate| {
                let units = match parse_source(&candidate.path, &candidate.content) {
                    Some(tree) => {
                        outcome.parsed_files += 1;
                        collect_units(&tree, &candidate.content)
                    }
                    None => {
                        outcome.line_scanned_files += 1;
                        scan_lines(&candidate.content, term, &self.config)
                    }
                };
                FileUnits {
                    path: &candidate.path,
                    source: &candidate.content,
                    units,
                }
            })
            .collect();

        let mut nodes = self.exact_pass(&files, term);
        if nodes.is_empty() {
            nodes = self.fragment_pass(&files, term);
            outcome.fragmented = nodes.iter().any(TextNode::is_fragmented);
        }

        outcome.nodes = dedupe(nodes);
        if !outcome.nodes.is_empty() {
            outcome.matched_term = Some(term.to_string());
        }
        tracing::info!(
            "extracted {} node(s) for \"{}\" (parsed {}, line-scanned {}, fragmented {})",
            outcome.nodes.len(),
            term,
            outcome.parsed_files,
            outcome.line_scanned_files,
            outcome.fragmented
        );
        outcome
    }

    fn exact_pass(&self, files: &[FileUnits], term: &str) -> Vec<TextNode> {
        let needle = normalize_for_match(term);
        let mut nodes = Vec::new();

        for file in files {
            for unit in &file.units {
                let haystack = normalize_for_match(&unit.content);
                if !haystack.contains(&needle) {
                    continue;
                }
                let relevance = 0.5 + 0.5 * (needle.len() as f64 / haystack.len().max(1) as f64);
                nodes.push(self.node(
                    file,
                    unit.content.clone(),
                    unit.kind,
                    unit.span,
                    None,
                    relevance.min(1.0),
                ));
            }
        }
        nodes
    }

    fn fragment_pass(&self, files: &[FileUnits], term: &str) -> Vec<TextNode> {
        let mut nodes = Vec::new();

        for file in files {
            for run in find_runs(&file.units, term, &self.config) {
                let members: Vec<Fragment> =
                    run.members.iter().map(|i| file.units[*i].clone()).collect();
                let (Some(first), Some(last)) = (members.first(), members.last()) else {
                    continue;
                };

                let span = Span {
                    start_line: first.span.start_line,
                    start_column: first.span.start_column,
                    end_line: last.span.end_line,
                    end_column: last.span.end_column,
                    start_byte: first.span.start_byte,
                    end_byte: last.span.end_byte,
                };
                let content = members
                    .iter()
                    .map(|m| m.content.as_str())
                    .collect::<Vec<_>>()
                    .join(" ");
                let kind = first.kind;

                nodes.push(self.node(
                    file,
                    content,
                    kind,
                    span,
                    Some(FragmentSequence {
                        fragments: members,
                        coverage: run.coverage,
                    }),
                    run.coverage * 0.8,
                ));
            }
        }
        nodes
    }

    fn node(
        &self,
        file: &FileUnits,
        content: String,
        kind: NodeKind,
        span: Span,
        fragments: Option<FragmentSequence>,
        relevance: f64,
    ) -> TextNode {
        let (context_before, context_after) =
            context_lines(file.source, &span, self.config.context_lines);
        TextNode {
            path: file.path.to_string(),
            content,
            kind,
            span,
            context_before,
            context_after,
            fragments,
            relevance,
        }
    }
}

/// Drops repeats of (path, line span, content) and orders by file position.
fn dedupe(nodes: Vec<TextNode>) -> Vec<TextNode> {
    let mut seen = HashSet::new();
    let mut unique: Vec<TextNode> = nodes
        .into_iter()
        .filter(|n| {
            seen.insert((
                n.path.clone(),
                n.span.start_line,
                n.span.end_line,
                n.content.clone(),
            ))
        })
        .collect();
    unique.sort_by(|a, b| {
        a.path
            .cmp(&b.path)
            .then(a.span.start_byte.cmp(&b.span.start_byte))
    });
    unique
}
