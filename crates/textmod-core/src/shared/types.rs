use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::scopes::ModificationScope;

/// Project files keyed by root-relative path.
pub type FileMap = BTreeMap<String, String>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModificationRequest {
    pub prompt: String,
    pub files: FileMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl ModificationRequest {
    pub fn new(prompt: impl Into<String>, files: FileMap) -> Self {
        Self {
            prompt: prompt.into(),
            files,
            context_summary: None,
            session_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextReplaceTerms {
    pub search_term: String,
    pub replacement_term: String,
    #[serde(default)]
    pub search_variations: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DecisionSource {
    Heuristic,
    Oracle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeDecision {
    pub scope: ModificationScope,
    pub reasoning: String,
    pub confidence: f64,
    pub source: DecisionSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_replace: Option<TextReplaceTerms>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LocatorStrategy {
    ExactSubstring,
    CaseInsensitive,
    KeyPhrase,
    TokenOverlap,
    Variation,
}

impl LocatorStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocatorStrategy::ExactSubstring => "exact-substring",
            LocatorStrategy::CaseInsensitive => "case-insensitive",
            LocatorStrategy::KeyPhrase => "key-phrase",
            LocatorStrategy::TokenOverlap => "token-overlap",
            LocatorStrategy::Variation => "variation",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateFile {
    pub path: String,
    pub content: String,
    pub strategy: LocatorStrategy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    /// Body text between element tags.
    ElementText,
    /// A string or template literal inside a `{...}` expression.
    ExpressionLiteral,
    /// Any other string literal, attribute values included.
    StringLiteral,
    /// Markup-stripped text of a raw line (line-scan fallback).
    RawLine,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::ElementText => "element-text",
            NodeKind::ExpressionLiteral => "expression-literal",
            NodeKind::StringLiteral => "string-literal",
            NodeKind::RawLine => "raw-line",
        }
    }
}

/// Location of a text unit. Lines are 1-based, columns are 0-based byte offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    pub start_line: usize,
    pub start_column: usize,
    pub end_line: usize,
    pub end_column: usize,
    pub start_byte: usize,
    pub end_byte: usize,
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start_line == self.end_line {
            write!(f, "line {}", self.start_line)
        } else {
            write!(f, "lines {}-{}", self.start_line, self.end_line)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fragment {
    pub content: String,
    pub kind: NodeKind,
    pub span: Span,
}

/// Ordered run of sibling units whose combined text reconstructs a split search term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FragmentSequence {
    pub fragments: Vec<Fragment>,
    pub coverage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextNode {
    pub path: String,
    pub content: String,
    pub kind: NodeKind,
    pub span: Span,
    pub context_before: Vec<String>,
    pub context_after: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fragments: Option<FragmentSequence>,
    pub relevance: f64,
}

impl TextNode {
    pub fn is_fragmented(&self) -> bool {
        self.fragments.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModificationBatch {
    pub id: String,
    pub index: usize,
    pub nodes: Vec<TextNode>,
}

/// How the oracle says it changed a snippet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EditApproach {
    LiteralSwap,
    MarkerRedistribution,
    SemanticRedistribution,
    Other(String),
}

impl EditApproach {
    pub fn from_label(label: &str) -> Self {
        let normalized: String = label
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "literalswap" | "samenode" | "directreplace" | "exactreplace" => EditApproach::LiteralSwap,
            "markerredistribution" | "redistribution" | "termredistribution" => {
                EditApproach::MarkerRedistribution
            }
            "semanticredistribution" | "semantic" => EditApproach::SemanticRedistribution,
            _ => EditApproach::Other(label.trim().to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModificationProposal {
    pub node_index: usize,
    pub original_snippet: String,
    pub modified_snippet: String,
    pub confidence: f64,
    pub should_apply: bool,
    pub reasoning: String,
    pub strategy: EditApproach,
    pub warnings: Vec<String>,
}

/// An oracle proposal after schema validation.
#[derive(Debug, Clone, PartialEq)]
pub enum ProposalCheck {
    Valid(ModificationProposal),
    Invalid {
        node_index: Option<usize>,
        reason: String,
    },
}

impl ProposalCheck {
    pub fn valid(&self) -> Option<&ModificationProposal> {
        match self {
            ProposalCheck::Valid(p) => Some(p),
            ProposalCheck::Invalid { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub batch_id: String,
    pub node_count: usize,
    pub proposals_received: usize,
    pub successful_modifications: usize,
    pub rejected_proposals: usize,
    pub invalid_proposals: usize,
    pub apply_misses: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_strategy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchResult {
    pub fn failed(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyDiagnostics {
    pub invalid_proposals: usize,
    pub rejected_proposals: usize,
    pub apply_misses: usize,
    pub already_applied: usize,
    pub write_errors: Vec<String>,
}
