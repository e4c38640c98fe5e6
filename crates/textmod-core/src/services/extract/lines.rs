use crate::config::EngineConfig;
use crate::services::matching::{match_ladder, strip_markup, tokenize, word_matches};
use crate::shared::{Fragment, NodeKind, Span};

/// Byte offset to line/column lookup for one source text.
#[derive(Debug, Clone)]
pub struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(
            source
                .bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self { starts }
    }

    /// 1-based line and 0-based byte column of `byte`.
    pub fn position(&self, byte: usize) -> (usize, usize) {
        let line = match self.starts.binary_search(&byte) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };
        (line + 1, byte - self.starts[line])
    }

    pub fn span(&self, start_byte: usize, end_byte: usize) -> Span {
        let (start_line, start_column) = self.position(start_byte);
        let (end_line, end_column) = self.position(end_byte);
        Span {
            start_line,
            start_column,
            end_line,
            end_column,
            start_byte,
            end_byte,
        }
    }
}

/// Up to `n` lines before and after a span.
pub fn context_lines(source: &str, span: &Span, n: usize) -> (Vec<String>, Vec<String>) {
    let lines: Vec<&str> = source.lines().collect();
    let first = span.start_line.saturating_sub(1).min(lines.len());
    let last = span.end_line.min(lines.len()).max(first);

    let before = lines[first.saturating_sub(n)..first]
        .iter()
        .map(|l| l.to_string())
        .collect();
    let after = lines[last..(last + n).min(lines.len())]
        .iter()
        .map(|l| l.to_string())
        .collect();

    (before, after)
}

/// Line-oriented fallback for files without a usable tree. A line becomes a
/// unit when its visible text matches the term through the locator ladder or
/// holds at least one of the term's words.
pub fn scan_lines(source: &str, term: &str, config: &EngineConfig) -> Vec<Fragment> {
    let term_words = tokenize(term);
    let mut units = Vec::new();
    let mut offset = 0;

    for (idx, raw) in source.split_inclusive('\n').enumerate() {
        let line_start = offset;
        offset += raw.len();

        let line = raw.trim_end_matches(['\n', '\r']);
        let visible = strip_markup(line);
        if visible.is_empty() {
            continue;
        }

        let qualifies = match_ladder(&visible, term, config).is_some()
            || tokenize(&visible)
                .iter()
                .any(|w| term_words.iter().any(|t| word_matches(t, w)));
        if !qualifies {
            continue;
        }

        let lead = line.len() - line.trim_start().len();
        let trimmed = line.trim();
        let start_byte = line_start + lead;
        units.push(Fragment {
            content: visible,
            kind: NodeKind::RawLine,
            span: Span {
                start_line: idx + 1,
                start_column: lead,
                end_line: idx + 1,
                end_column: lead + trimmed.len(),
                start_byte,
                end_byte: start_byte + trimmed.len(),
            },
        });
    }

    units
}
