use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::scopes::ModificationScope;
use super::types::{ApplyDiagnostics, BatchResult, FileMap, ScopeDecision};

/// One modified file, as handed to the caller's session log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedChange {
    pub path: String,
    pub strategy: String,
    pub replacement_count: usize,
    pub diff: String,
    pub applied_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModificationResult {
    pub success: bool,
    pub modified_files: Vec<String>,
    pub total_replacements: usize,
    pub batches: Vec<BatchResult>,
    pub diffs: Vec<String>,
    pub average_confidence: f64,
    pub processing_time_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub strategy_summary: String,
    pub applied_changes: Vec<AppliedChange>,
    pub diagnostics: ApplyDiagnostics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<ScopeDecision>,
    /// Post-edit contents of every modified file.
    #[serde(skip)]
    pub updated_files: FileMap,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum RequestOutcome {
    /// The text replacement engine ran.
    TextReplaced { result: ModificationResult },
    /// Another editing strategy owns this request.
    Delegated {
        scope: ModificationScope,
        decision: ScopeDecision,
    },
}

impl RequestOutcome {
    pub fn result(&self) -> Option<&ModificationResult> {
        match self {
            RequestOutcome::TextReplaced { result } => Some(result),
            RequestOutcome::Delegated { .. } => None,
        }
    }
}
