use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;
use tree_sitter::{Node, Tree};

use crate::config::EngineConfig;
use crate::services::extract::parse_source;
use crate::shared::{FileMap, TextNode};

lazy_static! {
    static ref TAG: Regex = Regex::new(r"<(/?)([A-Za-z][\w.:-]*)(?:\s[^<>]*?)?(/?)>").unwrap();
}

/// Structural markers of a snippet: tag names in order plus bracket counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Markers {
    /// `name` for opening tags, `/name` for closing, `name/` for self-closing.
    pub tags: Vec<String>,
    pub braces: (usize, usize),
    pub parens: (usize, usize),
    pub brackets: (usize, usize),
}

impl Markers {
    pub fn of(text: &str) -> Self {
        let tags = TAG
            .captures_iter(text)
            .map(|c| {
                let name = &c[2];
                if !c[1].is_empty() {
                    format!("/{}", name)
                } else if !c[3].is_empty() {
                    format!("{}/", name)
                } else {
                    name.to_string()
                }
            })
            .collect();

        let count = |open: char, close: char| {
            (
                text.chars().filter(|c| *c == open).count(),
                text.chars().filter(|c| *c == close).count(),
            )
        };

        Self {
            tags,
            braces: count('{', '}'),
            parens: count('(', ')'),
            brackets: count('[', ']'),
        }
    }

    pub fn balanced(&self) -> bool {
        let opens = self
            .tags
            .iter()
            .filter(|t| !t.starts_with('/') && !t.ends_with('/'))
            .count();
        let closes = self.tags.iter().filter(|t| t.starts_with('/')).count();

        opens == closes
            && self.braces.0 == self.braces.1
            && self.parens.0 == self.parens.1
            && self.brackets.0 == self.brackets.1
    }
}

/// The source excerpt shown to the oracle for one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snippet {
    pub text: String,
    pub start_byte: usize,
    pub end_byte: usize,
    pub start_line: usize,
}

/// Reconstructs enclosing snippets, parsing each file at most once.
pub struct SnippetBuilder<'a> {
    sources: &'a FileMap,
    config: &'a EngineConfig,
    trees: HashMap<String, Option<Tree>>,
}

impl<'a> SnippetBuilder<'a> {
    pub fn new(sources: &'a FileMap, config: &'a EngineConfig) -> Self {
        Self {
            sources,
            config,
            trees: HashMap::new(),
        }
    }

    pub fn snippet_for(&mut self, node: &TextNode) -> Snippet {
        let sources = self.sources;
        let Some(source) = sources.get(&node.path) else {
            return Snippet {
                text: node.content.clone(),
                start_byte: node.span.start_byte,
                end_byte: node.span.end_byte,
                start_line: node.span.start_line,
            };
        };

        let tree = self
            .trees
            .entry(node.path.clone())
            .or_insert_with(|| parse_source(&node.path, source));

        match tree {
            Some(tree) => enclosing_node_snippet(tree, source, node, self.config.snippet_max_lines),
            None => line_window_snippet(source, node, self.config.snippet_max_widen),
        }
    }
}

fn is_enclosing(node: Node) -> bool {
    matches!(
        node.kind(),
        "jsx_element" | "jsx_self_closing_element" | "jsx_fragment"
    ) || node.kind().ends_with("statement")
        || node.kind().ends_with("declaration")
}

fn line_extent(node: Node) -> usize {
    node.end_position().row - node.start_position().row + 1
}

/// Smallest element or statement around the node, capped at `max_lines`.
fn enclosing_node_snippet(tree: &Tree, source: &str, node: &TextNode, max_lines: usize) -> Snippet {
    let root = tree.root_node();
    let leaf = root
        .descendant_for_byte_range(node.span.start_byte, node.span.end_byte)
        .unwrap_or(root);

    let mut chosen = leaf;
    let mut current = leaf;
    loop {
        if line_extent(current) > max_lines && current.id() != leaf.id() {
            break;
        }
        chosen = current;
        if is_enclosing(current) {
            break;
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => break,
        }
    }

    Snippet {
        text: source[chosen.start_byte()..chosen.end_byte()].to_string(),
        start_byte: chosen.start_byte(),
        end_byte: chosen.end_byte(),
        start_line: chosen.start_position().row + 1,
    }
}

/// Grows a line window around the node until its markers balance.
fn line_window_snippet(source: &str, node: &TextNode, max_widen: usize) -> Snippet {
    let mut line_starts = vec![0];
    line_starts.extend(
        source
            .bytes()
            .enumerate()
            .filter(|(_, b)| *b == b'\n')
            .map(|(i, _)| i + 1),
    );
    let line_count = line_starts.len();

    let extent = |first: usize, last: usize| {
        let start = line_starts[first];
        let end = line_starts
            .get(last + 1)
            .map(|next| next - 1)
            .unwrap_or(source.len());
        let end = if end > start && source.as_bytes()[end - 1] == b'\r' {
            end - 1
        } else {
            end
        };
        (start, end.max(start))
    };

    let mut first = node.span.start_line.saturating_sub(1).min(line_count - 1);
    let mut last = node.span.end_line.saturating_sub(1).clamp(first, line_count - 1);

    for _ in 0..max_widen {
        let (start, end) = extent(first, last);
        if Markers::of(&source[start..end]).balanced() {
            break;
        }
        first = first.saturating_sub(1);
        last = (last + 1).min(line_count - 1);
    }

    let (start, end) = extent(first, last);
    Snippet {
        text: source[start..end].to_string(),
        start_byte: start,
        end_byte: end,
        start_line: first + 1,
    }
}
