mod heuristic;

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

pub use heuristic::{extract_quoted_terms, suggest_scope, HeuristicSuggestion};

use crate::config::EngineConfig;
use crate::error::{Result, TextModError};
use crate::prompts::{classification_prompt, classification_system_prompt};
use crate::services::ai::{extract_json_payload, Oracle};
use crate::services::matching::search_variations;
use crate::shared::{DecisionSource, ModificationRequest, ModificationScope, ScopeDecision, TextReplaceTerms};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OracleDecision {
    scope: String,
    #[serde(default)]
    reasoning: String,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    search_term: Option<String>,
    #[serde(default)]
    replacement_term: Option<String>,
    #[serde(default)]
    search_variations: Vec<String>,
}

/// Keyword scoring confirmed by the oracle. Never fails: any oracle problem
/// falls back to the keyword suggestion.
pub struct ScopeClassifier {
    oracle: Arc<dyn Oracle>,
    timeout: Duration,
}

impl ScopeClassifier {
    pub fn new(oracle: Arc<dyn Oracle>, config: &EngineConfig) -> Self {
        Self {
            oracle,
            timeout: config.oracle_timeout(),
        }
    }

    pub async fn classify(&self, request: &ModificationRequest) -> ScopeDecision {
        let hint = suggest_scope(&request.prompt);
        tracing::debug!("keyword suggestion: {} ({:.2})", hint.scope, hint.confidence);

        match self.confirm(request, &hint).await {
            Ok(decision) => {
                tracing::info!("classified as {} by oracle", decision.scope);
                decision
            }
            Err(e) => {
                tracing::warn!("{}; falling back to keyword suggestion {}", e, hint.scope);
                hint.into_decision()
            }
        }
    }

    async fn confirm(
        &self,
        request: &ModificationRequest,
        hint: &HeuristicSuggestion,
    ) -> Result<ScopeDecision> {
        let system = classification_system_prompt();
        let prompt = classification_prompt(request, hint);

        let response = tokio::time::timeout(self.timeout, self.oracle.complete(&system, &prompt))
            .await
            .map_err(|_| TextModError::Classification("oracle timed out".to_string()))?
            .map_err(|e| TextModError::Classification(e.to_string()))?;

        let payload = extract_json_payload(&response)
            .ok_or_else(|| TextModError::Classification("no JSON object in response".to_string()))?;
        let raw: OracleDecision = serde_json::from_str(payload)
            .map_err(|e| TextModError::Classification(format!("malformed decision: {}", e)))?;
        let scope: ModificationScope = raw.scope.parse().map_err(TextModError::Classification)?;

        let text_replace = if scope == ModificationScope::TextReplace {
            Some(Self::terms_from(&raw).ok_or_else(|| {
                TextModError::Classification(TextModError::MissingTerms.to_string())
            })?)
        } else {
            None
        };

        Ok(ScopeDecision {
            scope,
            reasoning: raw.reasoning,
            confidence: raw
                .confidence
                .filter(|c| c.is_finite())
                .map(|c| c.clamp(0.0, 1.0))
                .unwrap_or(0.8),
            source: DecisionSource::Oracle,
            text_replace,
        })
    }

    fn terms_from(raw: &OracleDecision) -> Option<TextReplaceTerms> {
        let search_term = raw.search_term.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        let replacement_term = raw.replacement_term.as_deref().map(str::trim)?;
        if search_term == replacement_term {
            return None;
        }

        let mut variations: Vec<String> = Vec::new();
        for variation in raw
            .search_variations
            .iter()
            .map(|v| v.trim().to_string())
            .chain(search_variations(search_term))
        {
            if !variation.is_empty() && variation != search_term && !variations.contains(&variation) {
                variations.push(variation);
            }
        }

        Some(TextReplaceTerms {
            search_term: search_term.to_string(),
            replacement_term: replacement_term.to_string(),
            search_variations: variations,
        })
    }
}
