use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::prompts::FormatResponse;
use crate::services::aggregate::{self, aggregate};
use crate::services::ai::Oracle;
use crate::services::classifier::ScopeClassifier;
use crate::services::diff::{ApplyReport, PatchApplier};
use crate::services::extract::StructuralExtractor;
use crate::services::locator::CandidateLocator;
use crate::services::proposal::ProposalEngine;
use crate::services::session::{snapshot_key, SessionStore};
use crate::services::workspace::ProjectRoot;
use crate::shared::{
    FileMap, ModificationRequest, ModificationResult, ModificationScope, RequestOutcome,
    ScopeDecision, TextReplaceTerms,
};

/// Runs classification and, for text changes, the locate → extract →
/// propose → apply → aggregate pipeline.
///
/// Without a workspace the engine works purely in memory and the edited
/// contents are only available through `ModificationResult::updated_files`.
pub struct TextModEngine {
    oracle: Arc<dyn Oracle>,
    config: EngineConfig,
    workspace: Option<ProjectRoot>,
    sessions: Option<Arc<dyn SessionStore>>,
}

impl TextModEngine {
    pub fn new(oracle: Arc<dyn Oracle>, config: EngineConfig) -> Self {
        Self {
            oracle,
            config: config.normalized(),
            workspace: None,
            sessions: None,
        }
    }

    pub fn with_workspace(mut self, workspace: ProjectRoot) -> Self {
        self.workspace = Some(workspace);
        self
    }

    pub fn with_session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.sessions = Some(store);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub async fn classify(&self, request: &ModificationRequest) -> ScopeDecision {
        ScopeClassifier::new(self.oracle.clone(), &self.config)
            .classify(request)
            .await
    }

    /// Classifies the request and runs the text engine when it owns the
    /// scope; any other scope is handed back as `Delegated`.
    pub async fn handle_request(&self, request: &ModificationRequest) -> RequestOutcome {
        let decision = self.classify(request).await;
        if decision.scope != ModificationScope::TextReplace {
            tracing::info!("{}", FormatResponse::delegated(decision.scope));
            return RequestOutcome::Delegated {
                scope: decision.scope,
                decision,
            };
        }

        let mut result = match &decision.text_replace {
            Some(terms) => self.run_text_replace(request, terms).await,
            None => aggregate::failure(FormatResponse::missing_terms(), Instant::now()),
        };
        result.scope = Some(decision);
        RequestOutcome::TextReplaced { result }
    }

    pub async fn run_text_replace(
        &self,
        request: &ModificationRequest,
        terms: &TextReplaceTerms,
    ) -> ModificationResult {
        self.run_text_replace_with_cancel(request, terms, CancellationToken::new())
            .await
    }

    /// Like `run_text_replace`, but batches still waiting on the oracle when
    /// `cancel` fires are marked failed. Proposals already gathered are
    /// still applied.
    pub async fn run_text_replace_with_cancel(
        &self,
        request: &ModificationRequest,
        terms: &TextReplaceTerms,
        cancel: CancellationToken,
    ) -> ModificationResult {
        let started = Instant::now();
        let run_id = Uuid::new_v4();
        tracing::info!(
            "text replace {}: \"{}\" -> \"{}\" over {} file(s)",
            run_id,
            terms.search_term,
            terms.replacement_term,
            request.files.len()
        );

        if terms.search_term.trim().is_empty() {
            return aggregate::failure(FormatResponse::missing_terms(), started);
        }
        let deadline = self
            .config
            .request_timeout()
            .map(|timeout| tokio::time::Instant::now() + timeout);

        let candidates = CandidateLocator::new(&self.config).locate(&request.files, terms);
        if candidates.is_empty() {
            return aggregate::no_candidate_files(&terms.search_term, request.files.len(), started);
        }

        let extraction = StructuralExtractor::new(&self.config).extract(&candidates, terms);
        if extraction.nodes.is_empty() {
            return aggregate::no_nodes_extracted(&terms.search_term, candidates.len(), started);
        }

        let sources: FileMap = candidates
            .iter()
            .map(|c| (c.path.clone(), c.content.clone()))
            .collect();
        let batches = ProposalEngine::new(self.oracle.clone(), &self.config)
            .propose(
                extraction.nodes,
                &sources,
                terms,
                &request.prompt,
                &cancel,
                deadline,
            )
            .await;

        let applier = PatchApplier::new(&self.config);
        let mut report = applier.apply_all(&batches, &sources);
        if let Some(workspace) = &self.workspace {
            applier.persist(&mut report, workspace).await;
        }

        let result = aggregate(&batches, &report, extraction.fragmented, started);
        self.record_session(request, &report, &result).await;
        tracing::info!("text replace {} finished in {} ms", run_id, result.processing_time_ms);
        result
    }

    /// Stores pre-change snapshots and appends one change record per file.
    async fn record_session(
        &self,
        request: &ModificationRequest,
        report: &ApplyReport,
        result: &ModificationResult,
    ) {
        let (Some(store), Some(session_id)) = (&self.sessions, &request.session_id) else {
            return;
        };
        if self.config.dry_run {
            return;
        }

        for file in report.committed_files() {
            store
                .set(session_id, &snapshot_key(&file.path), file.original.clone())
                .await;
        }
        for change in &result.applied_changes {
            store.append_change(session_id, change.clone()).await;
        }
        tracing::debug!(
            "session {}: logged {} change(s)",
            session_id,
            result.applied_changes.len()
        );
    }
}
