mod schema;
mod snippet;

use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

pub use schema::{parse_batch_response, ParsedBatch};
pub use snippet::{Markers, Snippet, SnippetBuilder};

use crate::config::EngineConfig;
use crate::error::TextModError;
use crate::prompts::{modification_batch_prompt, modification_system_prompt};
use crate::services::ai::Oracle;
use crate::shared::{
    BatchResult, FileMap, ModificationBatch, ProposalCheck, TextNode, TextReplaceTerms,
};

/// One batch after its oracle round trip.
#[derive(Debug, Clone)]
pub struct BatchProposals {
    pub batch: ModificationBatch,
    pub snippets: Vec<Snippet>,
    pub checks: Vec<ProposalCheck>,
    pub result: BatchResult,
}

/// Splits nodes into fixed-size batches in extraction order.
pub fn form_batches(nodes: Vec<TextNode>, batch_size: usize) -> Vec<ModificationBatch> {
    let batch_size = batch_size.max(1);
    let mut batches = Vec::new();
    let mut nodes = nodes.into_iter().peekable();

    while nodes.peek().is_some() {
        let index = batches.len();
        batches.push(ModificationBatch {
            id: format!("batch-{}", index + 1),
            index,
            nodes: nodes.by_ref().take(batch_size).collect(),
        });
    }
    batches
}

pub struct ProposalEngine {
    oracle: Arc<dyn Oracle>,
    config: EngineConfig,
}

impl ProposalEngine {
    pub fn new(oracle: Arc<dyn Oracle>, config: &EngineConfig) -> Self {
        Self {
            oracle,
            config: config.clone(),
        }
    }

    /// Asks the oracle for proposals, at most `max_concurrent_batches` calls
    /// in flight. Results come back in batch order whatever order they
    /// arrive in.
    pub async fn propose(
        &self,
        nodes: Vec<TextNode>,
        sources: &FileMap,
        terms: &TextReplaceTerms,
        request: &str,
        cancel: &CancellationToken,
        deadline: Option<Instant>,
    ) -> Vec<BatchProposals> {
        let batches = form_batches(nodes, self.config.batch_size);
        tracing::info!(
            "requesting proposals for {} batch(es), {} at a time",
            batches.len(),
            self.config.max_concurrent_batches
        );

        let mut builder = SnippetBuilder::new(sources, &self.config);
        let jobs: Vec<_> = batches
            .into_iter()
            .map(|batch| {
                let snippets: Vec<Snippet> =
                    batch.nodes.iter().map(|n| builder.snippet_for(n)).collect();
                self.run_batch(batch, snippets, terms, request, cancel, deadline)
            })
            .collect();

        let mut results: Vec<BatchProposals> = stream::iter(jobs)
            .buffer_unordered(self.config.max_concurrent_batches.max(1))
            .collect()
            .await;
        results.sort_by_key(|r| r.batch.index);
        results
    }

    async fn run_batch(
        &self,
        batch: ModificationBatch,
        snippets: Vec<Snippet>,
        terms: &TextReplaceTerms,
        request: &str,
        cancel: &CancellationToken,
        deadline: Option<Instant>,
    ) -> BatchProposals {
        let mut result = BatchResult {
            batch_id: batch.id.clone(),
            node_count: batch.nodes.len(),
            ..BatchResult::default()
        };

        let texts: Vec<String> = snippets.iter().map(|s| s.text.clone()).collect();
        let system = modification_system_prompt();
        let prompt = modification_batch_prompt(&batch, &texts, terms, request);

        let parsed = self
            .call_oracle(&system, &prompt, cancel, deadline)
            .await
            .and_then(|text| parse_batch_response(&text, batch.nodes.len()));

        let checks = match parsed {
            Ok(parsed) => {
                result.proposals_received = parsed.checks.len();
                result.invalid_proposals = parsed
                    .checks
                    .iter()
                    .filter(|c| c.valid().is_none())
                    .count();
                result.overall_strategy = parsed.overall_strategy;
                result.batch_confidence = parsed.batch_confidence;
                tracing::debug!(
                    "{}: {} proposal(s), {} invalid",
                    batch.id,
                    result.proposals_received,
                    result.invalid_proposals
                );
                parsed.checks
            }
            Err(reason) => {
                let error = TextModError::BatchOracle {
                    batch_id: batch.id.clone(),
                    reason,
                };
                tracing::warn!("{}", error);
                result.error = Some(error.to_string());
                Vec::new()
            }
        };

        BatchProposals {
            batch,
            snippets,
            checks,
            result,
        }
    }

    async fn call_oracle(
        &self,
        system: &str,
        prompt: &str,
        cancel: &CancellationToken,
        deadline: Option<Instant>,
    ) -> Result<String, String> {
        if cancel.is_cancelled() {
            return Err("cancelled".to_string());
        }

        let per_call = Instant::now() + self.config.oracle_timeout();
        let (limit, timeout_reason) = match deadline {
            Some(deadline) if deadline < per_call => (deadline, "request deadline exceeded"),
            _ => (per_call, "oracle timed out"),
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err("cancelled".to_string()),
            outcome = tokio::time::timeout_at(limit, self.oracle.complete(system, prompt)) => match outcome {
                Ok(Ok(text)) => Ok(text),
                Ok(Err(e)) => Err(format!("oracle error: {}", e)),
                Err(_) => Err(timeout_reason.to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ai::MockOracle;
    use crate::shared::{NodeKind, Span};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn node(path: &str, content: &str) -> TextNode {
        TextNode {
            path: path.to_string(),
            content: content.to_string(),
            kind: NodeKind::ElementText,
            span: Span::default(),
            context_before: Vec::new(),
            context_after: Vec::new(),
            fragments: None,
            relevance: 1.0,
        }
    }

    fn terms() -> TextReplaceTerms {
        TextReplaceTerms {
            search_term: "Old".to_string(),
            replacement_term: "New".to_string(),
            search_variations: Vec::new(),
        }
    }

    const ONE_PROPOSAL: &str = r#"{"modifications": [{"nodeIndex": 0, "originalSnippet": "Old", "modifiedSnippet": "New", "confidence": 0.8, "shouldApply": true, "strategy": "literal-swap"}], "batchConfidence": 0.7}"#;

    #[test]
    fn test_form_batches() {
        let nodes: Vec<TextNode> = (0..12).map(|i| node(&format!("f{}.tsx", i), "Old")).collect();
        let batches = form_batches(nodes, 5);

        assert_eq!(
            batches
                .iter()
                .map(|b| (b.id.as_str(), b.nodes.len()))
                .collect::<Vec<_>>(),
            vec![("batch-1", 5), ("batch-2", 5), ("batch-3", 2)]
        );
        assert_eq!(batches[2].nodes[0].path, "f10.tsx");
    }

    #[tokio::test]
    async fn test_failed_batch_is_isolated() {
        let mut oracle = MockOracle::new();
        oracle.expect_complete().times(2).returning(|_, prompt| {
            if prompt.contains("File: bad.tsx") {
                Ok("I could not do that".to_string())
            } else {
                Ok(ONE_PROPOSAL.to_string())
            }
        });

        let config = EngineConfig {
            batch_size: 1,
            ..EngineConfig::default()
        };
        let engine = ProposalEngine::new(Arc::new(oracle), &config);
        let results = engine
            .propose(
                vec![node("bad.tsx", "Old"), node("good.tsx", "Old")],
                &FileMap::new(),
                &terms(),
                "change 'Old' to 'New'",
                &CancellationToken::new(),
                None,
            )
            .await;

        assert_eq!(results.len(), 2);
        assert!(results[0].result.failed());
        assert!(results[0]
            .result
            .error
            .as_deref()
            .unwrap()
            .starts_with("batch batch-1 failed"));
        assert!(!results[1].result.failed());
        assert_eq!(results[1].result.proposals_received, 1);
        assert_eq!(results[1].result.batch_confidence, Some(0.7));
        assert_eq!(results[1].snippets[0].text, "Old");
    }

    #[tokio::test]
    async fn test_cancelled_before_issue() {
        let mut oracle = MockOracle::new();
        oracle.expect_complete().never();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let engine = ProposalEngine::new(Arc::new(oracle), &EngineConfig::default());
        let results = engine
            .propose(vec![node("a.tsx", "Old")], &FileMap::new(), &terms(), "", &cancel, None)
            .await;

        assert_eq!(results.len(), 1);
        assert!(results[0].result.error.as_deref().unwrap().contains("cancelled"));
    }

    struct SlowOracle;

    #[async_trait]
    impl Oracle for SlowOracle {
        async fn complete(&self, _system: &str, _prompt: &str) -> anyhow::Result<String> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(ONE_PROPOSAL.to_string())
        }
    }

    #[tokio::test]
    async fn test_deadline_fails_pending_batches() {
        let engine = ProposalEngine::new(Arc::new(SlowOracle), &EngineConfig::default());
        let deadline = Instant::now() + Duration::from_millis(50);
        let results = engine
            .propose(
                vec![node("a.tsx", "Old")],
                &FileMap::new(),
                &terms(),
                "",
                &CancellationToken::new(),
                Some(deadline),
            )
            .await;

        assert!(results[0]
            .result
            .error
            .as_deref()
            .unwrap()
            .contains("request deadline exceeded"));
    }
}
