use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::services::proposal::Snippet;
use crate::shared::{ModificationProposal, TextNode};

/// New file content, or why the strategy could not place the edit.
pub type PatchResult = Result<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ApplyStrategyKind {
    ExactSnippet,
    NormalizedWhitespace,
    FragmentRedistribution,
    DirectContent,
    LineAnchored,
}

impl ApplyStrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplyStrategyKind::ExactSnippet => "exact-snippet",
            ApplyStrategyKind::NormalizedWhitespace => "normalized-whitespace",
            ApplyStrategyKind::FragmentRedistribution => "fragment-redistribution",
            ApplyStrategyKind::DirectContent => "direct-content",
            ApplyStrategyKind::LineAnchored => "line-anchored",
        }
    }
}

/// Everything a strategy may consult for one proposal.
#[derive(Debug, Clone, Copy)]
pub struct PatchTarget<'a> {
    pub node: &'a TextNode,
    pub snippet: &'a Snippet,
    pub proposal: &'a ModificationProposal,
}

impl PatchTarget<'_> {
    /// Line the snippet started on when it was built.
    pub fn anchor_line(&self) -> usize {
        self.snippet.start_line.max(1)
    }
}

pub trait ApplyStrategy: Debug + Send + Sync {
    fn kind(&self) -> ApplyStrategyKind;
    fn apply(&self, content: &str, target: &PatchTarget<'_>) -> PatchResult;
}
