pub mod strategies;
pub mod types;
pub mod unified;

use std::collections::BTreeMap;

pub use types::{ApplyStrategy, ApplyStrategyKind, PatchResult, PatchTarget};
pub use unified::{changed_lines, unified_diff};

use crate::config::EngineConfig;
use crate::services::proposal::BatchProposals;
use crate::services::workspace::ProjectRoot;
use crate::shared::{ApplyDiagnostics, BatchResult, FileMap, ProposalCheck};
use strategies::{default_cascade, line_of, nearest_occurrence};

#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutcome {
    Applied {
        strategy: ApplyStrategyKind,
        content: String,
    },
    AlreadyApplied,
    Missed,
}

/// Final state of one modified file.
#[derive(Debug, Clone, PartialEq)]
pub struct FilePatch {
    pub path: String,
    pub original: String,
    pub updated: String,
    pub replacements: usize,
    pub strategies: Vec<ApplyStrategyKind>,
    /// Proposal confidence of each applied edit, aligned with `strategies`.
    pub confidences: Vec<f64>,
    pub diff: Option<String>,
    pub write_error: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchApplyStats {
    pub successful: usize,
    pub rejected: usize,
    pub misses: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplyReport {
    pub files: Vec<FilePatch>,
    pub diagnostics: ApplyDiagnostics,
    /// Aligned with the batches passed to `apply_all`.
    pub batch_stats: Vec<BatchApplyStats>,
}

impl ApplyReport {
    /// Files whose edits reached their destination (or would have, in a dry run).
    pub fn committed_files(&self) -> impl Iterator<Item = &FilePatch> {
        self.files.iter().filter(|f| f.write_error.is_none())
    }

    pub fn total_replacements(&self) -> usize {
        self.committed_files().map(|f| f.replacements).sum()
    }

    /// Mean proposal confidence over committed edits, 0.0 when there are none.
    pub fn average_confidence(&self) -> f64 {
        let confidences: Vec<f64> = self
            .committed_files()
            .flat_map(|f| f.confidences.iter().copied())
            .collect();
        if confidences.is_empty() {
            0.0
        } else {
            confidences.iter().sum::<f64>() / confidences.len() as f64
        }
    }

    pub fn strategy_counts(&self) -> BTreeMap<ApplyStrategyKind, usize> {
        let mut counts = BTreeMap::new();
        for strategy in self.committed_files().flat_map(|f| f.strategies.iter()) {
            *counts.entry(*strategy).or_default() += 1;
        }
        counts
    }

    /// Batch results with apply-phase counters filled in.
    pub fn batch_results(&self, batches: &[BatchProposals]) -> Vec<BatchResult> {
        batches
            .iter()
            .enumerate()
            .map(|(pos, proposals)| {
                let stats = self.batch_stats.get(pos).copied().unwrap_or_default();
                BatchResult {
                    successful_modifications: stats.successful,
                    rejected_proposals: stats.rejected,
                    apply_misses: stats.misses,
                    ..proposals.result.clone()
                }
            })
            .collect()
    }
}

/// Applies validated proposals through the strategy cascade.
#[derive(Debug)]
pub struct PatchApplier {
    config: EngineConfig,
    strategies: Vec<Box<dyn ApplyStrategy>>,
}

impl PatchApplier {
    pub fn new(config: &EngineConfig) -> Self {
        Self::with_strategies(config, default_cascade(config.line_anchor_window))
    }

    pub fn with_strategies(config: &EngineConfig, strategies: Vec<Box<dyn ApplyStrategy>>) -> Self {
        Self {
            config: config.clone(),
            strategies,
        }
    }

    /// Runs one proposal against `content`. The first strategy that changes
    /// the content wins.
    pub fn apply_one(&self, content: &str, target: &PatchTarget<'_>) -> ApplyOutcome {
        if self.already_applied(content, target) {
            return ApplyOutcome::AlreadyApplied;
        }

        for strategy in &self.strategies {
            match strategy.apply(content, target) {
                Ok(updated) if updated != content => {
                    tracing::debug!(
                        "{}: applied via {}",
                        target.node.path,
                        strategy.kind().as_str()
                    );
                    return ApplyOutcome::Applied {
                        strategy: strategy.kind(),
                        content: updated,
                    };
                }
                Ok(_) => {}
                Err(reason) => tracing::debug!(
                    "{}: {} skipped: {}",
                    target.node.path,
                    strategy.kind().as_str(),
                    reason
                ),
            }
        }

        let proposal = target.proposal;
        if !content.contains(&proposal.original_snippet)
            && self.present_near(content, &proposal.modified_snippet, target.anchor_line())
        {
            return ApplyOutcome::AlreadyApplied;
        }
        ApplyOutcome::Missed
    }

    fn already_applied(&self, content: &str, target: &PatchTarget<'_>) -> bool {
        let proposal = target.proposal;
        proposal.modified_snippet == proposal.original_snippet
            || (proposal.modified_snippet.contains(&proposal.original_snippet)
                && self.present_near(content, &proposal.modified_snippet, target.anchor_line()))
    }

    fn present_near(&self, content: &str, needle: &str, line: usize) -> bool {
        nearest_occurrence(content, needle, line)
            .is_some_and(|(start, _)| line_of(content, start).abs_diff(line) <= self.config.line_anchor_window)
    }

    /// Applies every accepted proposal in memory. Proposals are grouped by
    /// file and applied bottom-up so earlier edits never shift later ones.
    pub fn apply_all(&self, batches: &[BatchProposals], sources: &FileMap) -> ApplyReport {
        let mut report = ApplyReport {
            batch_stats: vec![BatchApplyStats::default(); batches.len()],
            ..ApplyReport::default()
        };
        let mut by_file: BTreeMap<&str, Vec<(usize, PatchTarget<'_>)>> = BTreeMap::new();

        for (pos, proposals) in batches.iter().enumerate() {
            for check in &proposals.checks {
                match check {
                    ProposalCheck::Invalid { node_index, reason } => {
                        report.diagnostics.invalid_proposals += 1;
                        tracing::debug!(
                            "{}: invalid proposal for node {:?}: {}",
                            proposals.batch.id,
                            node_index,
                            reason
                        );
                    }
                    ProposalCheck::Valid(proposal) if !proposal.should_apply => {
                        report.diagnostics.rejected_proposals += 1;
                        report.batch_stats[pos].rejected += 1;
                    }
                    ProposalCheck::Valid(proposal) => {
                        let node = proposals.batch.nodes.get(proposal.node_index);
                        let snippet = proposals.snippets.get(proposal.node_index);
                        let (Some(node), Some(snippet)) = (node, snippet) else {
                            report.diagnostics.invalid_proposals += 1;
                            continue;
                        };
                        by_file.entry(node.path.as_str()).or_default().push((
                            pos,
                            PatchTarget {
                                node,
                                snippet,
                                proposal,
                            },
                        ));
                    }
                }
            }
        }

        for (path, mut targets) in by_file {
            targets.sort_by(|(_, a), (_, b)| {
                (b.node.span.start_line, b.node.span.start_byte)
                    .cmp(&(a.node.span.start_line, a.node.span.start_byte))
            });

            let Some(original) = sources.get(path) else {
                tracing::warn!("{}: no source content, skipping {} proposal(s)", path, targets.len());
                for (pos, _) in &targets {
                    report.batch_stats[*pos].misses += 1;
                    report.diagnostics.apply_misses += 1;
                }
                continue;
            };

            let mut content = original.clone();
            let mut applied = Vec::new();
            let mut confidences = Vec::new();
            for (pos, target) in &targets {
                match self.apply_one(&content, target) {
                    ApplyOutcome::Applied {
                        strategy,
                        content: updated,
                    } => {
                        content = updated;
                        applied.push(strategy);
                        confidences.push(target.proposal.confidence);
                        report.batch_stats[*pos].successful += 1;
                    }
                    ApplyOutcome::AlreadyApplied => {
                        report.diagnostics.already_applied += 1;
                        tracing::debug!("{}: proposal at {} already applied", path, target.node.span);
                    }
                    ApplyOutcome::Missed => {
                        report.diagnostics.apply_misses += 1;
                        report.batch_stats[*pos].misses += 1;
                        tracing::warn!(
                            "{}: no strategy could place the edit at {}",
                            path,
                            target.node.span
                        );
                    }
                }
            }

            if applied.is_empty() || content == *original {
                continue;
            }
            let diff = self
                .config
                .generate_diffs
                .then(|| unified_diff(path, original, &content));
            report.files.push(FilePatch {
                path: path.to_string(),
                original: original.clone(),
                updated: content,
                replacements: applied.len(),
                strategies: applied,
                confidences,
                diff,
                write_error: None,
            });
        }

        report
    }

    /// Writes modified files under the project root. Dry runs write nothing.
    pub async fn persist(&self, report: &mut ApplyReport, workspace: &ProjectRoot) {
        if self.config.dry_run {
            tracing::info!("dry run: {} file(s) left untouched", report.files.len());
            return;
        }

        for file in report.files.iter_mut() {
            match workspace.write(&file.path, &file.updated).await {
                Ok(()) => tracing::info!("wrote {} ({} replacement(s))", file.path, file.replacements),
                Err(e) => {
                    tracing::warn!("failed to write {}: {}", file.path, e);
                    let message = format!("{}: {}", file.path, e);
                    report.diagnostics.write_errors.push(message.clone());
                    file.write_error = Some(message);
                }
            }
        }
    }
}
