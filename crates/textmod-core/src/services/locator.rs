use crate::config::EngineConfig;
use crate::services::matching::{match_ladder, matches_variation};
use crate::services::workspace::is_scannable_path;
use crate::shared::{CandidateFile, FileMap, LocatorStrategy, TextReplaceTerms};

/// Finds the project files that plausibly contain a search term.
#[derive(Debug, Clone)]
pub struct CandidateLocator {
    config: EngineConfig,
}

impl CandidateLocator {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Every scannable file that matches the term, or one of its variations
    /// when the term itself misses. Order follows the file map (by path).
    pub fn locate(&self, files: &FileMap, terms: &TextReplaceTerms) -> Vec<CandidateFile> {
        let mut candidates = Vec::new();

        for (path, content) in files {
            if !is_scannable_path(path, &self.config) {
                continue;
            }

            let strategy = match_ladder(content, &terms.search_term, &self.config).or_else(|| {
                terms
                    .search_variations
                    .iter()
                    .any(|v| matches_variation(content, v))
                    .then_some(LocatorStrategy::Variation)
            });

            if let Some(strategy) = strategy {
                tracing::debug!("candidate {} via {}", path, strategy.as_str());
                candidates.push(CandidateFile {
                    path: path.clone(),
                    content: content.clone(),
                    strategy,
                });
            }
        }

        tracing::info!(
            "located {} candidate file(s) for \"{}\" among {} file(s)",
            candidates.len(),
            terms.search_term,
            files.len()
        );
        candidates
    }
}
