use crate::services::classifier::HeuristicSuggestion;
use crate::shared::{ModificationRequest, SCOPES};

pub fn classification_system_prompt() -> String {
    let scopes = SCOPES
        .iter()
        .map(|d| format!("- {}: {}", d.scope, d.description))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You decide the modification scope of a change request against an existing UI project. Pick exactly one of:
{}

When two scopes fit, prefer the more specific one in this order: TEXT_REPLACE, THEME_CHANGE, TARGETED_NODES, COMPONENT_ADDITION, FULL_FILE.

Respond with a single JSON object:
{{
  "scope": "<one of the scopes above>",
  "reasoning": "<one sentence>",
  "confidence": <0.0-1.0>,
  "searchTerm": "<TEXT_REPLACE only: exact text currently in the UI>",
  "replacementTerm": "<TEXT_REPLACE only: exact new text>",
  "searchVariations": ["<TEXT_REPLACE only: case forms, punctuation-free and partial forms>"]
}}"#,
        scopes
    )
}

pub fn classification_prompt(request: &ModificationRequest, hint: &HeuristicSuggestion) -> String {
    let mut prompt = format!("Request: {}\n", request.prompt.trim());
    if let Some(summary) = &request.context_summary {
        prompt.push_str(&format!("Project context: {}\n", summary.trim()));
    }
    if !request.files.is_empty() {
        let listing: Vec<&str> = request.files.keys().map(String::as_str).take(50).collect();
        prompt.push_str(&format!("Project files:\n{}\n", listing.join("\n")));
    }
    prompt.push_str(&format!(
        "Keyword analysis suggests {} (confidence {:.2}): {}\n",
        hint.scope, hint.confidence, hint.reasoning
    ));
    prompt
}
