use std::collections::HashSet;

use serde::Deserialize;
use serde_json::Value;

use super::snippet::Markers;
use crate::services::ai::extract_json_payload;
use crate::shared::{EditApproach, ModificationProposal, ProposalCheck};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchResponse {
    modifications: Vec<Value>,
    #[serde(default)]
    overall_strategy: Option<String>,
    #[serde(default)]
    batch_confidence: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProposalEntry {
    node_index: usize,
    original_snippet: String,
    modified_snippet: String,
    confidence: f64,
    should_apply: bool,
    #[serde(default)]
    reasoning: String,
    #[serde(default)]
    strategy: String,
    #[serde(default)]
    warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedBatch {
    pub checks: Vec<ProposalCheck>,
    pub overall_strategy: Option<String>,
    pub batch_confidence: Option<f64>,
}

/// Parses one batch response. The envelope must be well-formed; each entry
/// inside it is validated on its own so one bad proposal never sinks the rest.
pub fn parse_batch_response(text: &str, node_count: usize) -> Result<ParsedBatch, String> {
    let payload = extract_json_payload(text).ok_or_else(|| "no JSON object in response".to_string())?;
    let response: BatchResponse =
        serde_json::from_str(payload).map_err(|e| format!("malformed response: {}", e))?;

    let mut seen = HashSet::new();
    let checks = response
        .modifications
        .into_iter()
        .map(|entry| validate_entry(entry, node_count, &mut seen))
        .collect();

    Ok(ParsedBatch {
        checks,
        overall_strategy: response.overall_strategy,
        batch_confidence: response
            .batch_confidence
            .filter(|c| c.is_finite())
            .map(|c| c.clamp(0.0, 1.0)),
    })
}

fn validate_entry(entry: Value, node_count: usize, seen: &mut HashSet<usize>) -> ProposalCheck {
    let hinted_index = entry
        .get("nodeIndex")
        .and_then(Value::as_u64)
        .map(|i| i as usize);
    let invalid = |reason: String| ProposalCheck::Invalid {
        node_index: hinted_index,
        reason,
    };

    let entry: ProposalEntry = match serde_json::from_value(entry) {
        Ok(entry) => entry,
        Err(e) => return invalid(format!("schema violation: {}", e)),
    };

    if entry.node_index >= node_count {
        return invalid(format!(
            "nodeIndex {} out of range for {} node(s)",
            entry.node_index, node_count
        ));
    }
    if !entry.confidence.is_finite() || !(0.0..=1.0).contains(&entry.confidence) {
        return invalid(format!("confidence {} outside [0, 1]", entry.confidence));
    }
    if entry.original_snippet.trim().is_empty() {
        return invalid("empty originalSnippet".to_string());
    }
    if entry.should_apply {
        if entry.modified_snippet.trim().is_empty() {
            return invalid("empty modifiedSnippet".to_string());
        }
        if Markers::of(&entry.original_snippet) != Markers::of(&entry.modified_snippet) {
            return invalid("structural markers changed".to_string());
        }
    }
    if !seen.insert(entry.node_index) {
        return invalid(format!("duplicate proposal for node {}", entry.node_index));
    }

    ProposalCheck::Valid(ModificationProposal {
        node_index: entry.node_index,
        original_snippet: entry.original_snippet,
        modified_snippet: entry.modified_snippet,
        confidence: entry.confidence,
        should_apply: entry.should_apply,
        reasoning: entry.reasoning,
        strategy: EditApproach::from_label(&entry.strategy),
        warnings: entry.warnings,
    })
}
