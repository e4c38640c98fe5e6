use std::path::Path;

use tree_sitter::{Language, Node, Parser, Tree};

use super::lines::LineIndex;
use crate::shared::{Fragment, NodeKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grammar {
    Tsx,
    TypeScript,
}

impl Grammar {
    pub fn for_path(path: &str) -> Option<Self> {
        let ext = Path::new(path).extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "tsx" | "jsx" | "js" | "mjs" => Some(Grammar::Tsx),
            "ts" => Some(Grammar::TypeScript),
            _ => None,
        }
    }

    fn language(self) -> Language {
        match self {
            Grammar::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
            Grammar::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        }
    }
}

/// Parses a source file when its type has a grammar. A tree containing
/// syntax errors is treated as a parse failure.
pub fn parse_source(path: &str, source: &str) -> Option<Tree> {
    let grammar = Grammar::for_path(path)?;
    let mut parser = Parser::new();
    if let Err(e) = parser.set_language(&grammar.language()) {
        tracing::warn!("failed to load grammar for {}: {}", path, e);
        return None;
    }

    let tree = parser.parse(source, None)?;
    if tree.root_node().has_error() {
        tracing::debug!("syntax errors in {}, falling back to line scan", path);
        return None;
    }
    Some(tree)
}

/// Text-bearing units of a parsed file in document order.
pub fn collect_units(tree: &Tree, source: &str) -> Vec<Fragment> {
    let index = LineIndex::new(source);
    let mut units = Vec::new();
    let mut stack = vec![tree.root_node()];

    while let Some(node) = stack.pop() {
        match node.kind() {
            "jsx_text" => {
                push_unit(
                    &mut units,
                    &index,
                    source,
                    node.start_byte(),
                    node.end_byte(),
                    NodeKind::ElementText,
                );
                continue;
            }
            "string" | "template_string" => {
                if !is_module_specifier(node, source) {
                    // both delimiters are a single byte
                    push_unit(
                        &mut units,
                        &index,
                        source,
                        node.start_byte() + 1,
                        node.end_byte().saturating_sub(1),
                        literal_kind(node),
                    );
                }
                continue;
            }
            "comment" => continue,
            _ => {}
        }

        let mut cursor = node.walk();
        let children: Vec<Node> = node.children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }

    units
}

fn push_unit(
    units: &mut Vec<Fragment>,
    index: &LineIndex,
    source: &str,
    start: usize,
    end: usize,
    kind: NodeKind,
) {
    if start >= end {
        return;
    }
    let Some(raw) = source.get(start..end) else {
        return;
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() || !trimmed.chars().any(char::is_alphanumeric) {
        return;
    }

    let lead = raw.len() - raw.trim_start().len();
    let start_byte = start + lead;
    units.push(Fragment {
        content: trimmed.to_string(),
        kind,
        span: index.span(start_byte, start_byte + trimmed.len()),
    });
}

fn literal_kind(node: Node) -> NodeKind {
    let mut current = node.parent();
    while let Some(parent) = current {
        match parent.kind() {
            "jsx_expression" => return NodeKind::ExpressionLiteral,
            "jsx_element" | "jsx_self_closing_element" | "jsx_attribute" | "program" => break,
            kind if kind.ends_with("statement") || kind.ends_with("declaration") => break,
            _ => current = parent.parent(),
        }
    }
    NodeKind::StringLiteral
}

/// Import/export sources and `require(...)` / `import(...)` arguments.
fn is_module_specifier(node: Node, source: &str) -> bool {
    let Some(parent) = node.parent() else {
        return false;
    };
    match parent.kind() {
        "import_statement" | "export_statement" => true,
        "arguments" => parent
            .parent()
            .filter(|call| call.kind() == "call_expression")
            .and_then(|call| call.child_by_field_name("function"))
            .is_some_and(|f| {
                f.kind() == "import" || f.utf8_text(source.as_bytes()).ok() == Some("require")
            }),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn units_of(path: &str, source: &str) -> Vec<(String, NodeKind)> {
        let tree = parse_source(path, source).unwrap();
        collect_units(&tree, source)
            .into_iter()
            .map(|u| (u.content, u.kind))
            .collect()
    }

    #[test]
    fn test_collects_three_text_kinds() {
        let source = r#"import React from "react";

export function Hero() {
  const subtitle = "Fast builds";
  return (
    <section className="hero">
      <h1>Welcome to our site</h1>
      <p>{"Start today"}</p>
    </section>
  );
}
"#;
        assert_eq!(
            units_of("src/Hero.tsx", source),
            vec![
                ("Fast builds".to_string(), NodeKind::StringLiteral),
                ("hero".to_string(), NodeKind::StringLiteral),
                ("Welcome to our site".to_string(), NodeKind::ElementText),
                ("Start today".to_string(), NodeKind::ExpressionLiteral),
            ]
        );
    }

    #[test]
    fn test_unit_spans_point_at_source() {
        let source = "const App = () => (\n  <h2>\n    Contact   \n  </h2>\n);\n";
        let tree = parse_source("App.jsx", source).unwrap();
        let units = collect_units(&tree, source);

        assert_eq!(units.len(), 1);
        let span = units[0].span;
        assert_eq!(&source[span.start_byte..span.end_byte], "Contact");
        assert_eq!((span.start_line, span.start_column), (3, 4));
    }

    #[test]
    fn test_parse_failure_and_unknown_types() {
        assert!(parse_source("index.html", "<p>hi</p>").is_none());
        assert!(parse_source("broken.tsx", "const x = <div>;").is_none());
        assert_eq!(Grammar::for_path("lib/util.ts"), Some(Grammar::TypeScript));
    }
}
