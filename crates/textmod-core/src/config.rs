use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::Result;

const DEFAULT_SOURCE_EXTENSIONS: &[&str] = &[
    "tsx", "jsx", "ts", "js", "mjs", "html", "htm", "vue", "svelte", "astro", "mdx", "md",
];

const DEFAULT_EXCLUDED_DIRS: &[&str] = &[
    "node_modules",
    ".git",
    "dist",
    "build",
    ".next",
    "out",
    "coverage",
    ".turbo",
    ".cache",
    "vendor",
    "target",
];

/// Tunables for one engine instance. Every field has a default, so a JSON
/// override only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    pub batch_size: usize,
    pub max_concurrent_batches: usize,
    pub context_lines: usize,
    pub fragment_coverage_threshold: f64,
    pub fragment_lookahead: usize,
    pub key_phrase_threshold: f64,
    pub token_overlap_threshold: f64,
    pub line_anchor_window: usize,
    pub snippet_max_lines: usize,
    pub snippet_max_widen: usize,
    pub oracle_timeout_secs: u64,
    pub request_timeout_secs: Option<u64>,
    pub generate_diffs: bool,
    pub dry_run: bool,
    pub max_file_bytes: usize,
    pub source_extensions: Vec<String>,
    pub excluded_dirs: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            max_concurrent_batches: 3,
            context_lines: 3,
            fragment_coverage_threshold: 0.6,
            fragment_lookahead: 5,
            key_phrase_threshold: 0.4,
            token_overlap_threshold: 0.6,
            line_anchor_window: 3,
            snippet_max_lines: 12,
            snippet_max_widen: 6,
            oracle_timeout_secs: 60,
            request_timeout_secs: None,
            generate_diffs: true,
            dry_run: false,
            max_file_bytes: 512 * 1024,
            source_extensions: DEFAULT_SOURCE_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            excluded_dirs: DEFAULT_EXCLUDED_DIRS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&raw)?;
        Ok(config.normalized())
    }

    /// Clamps values that would stall or break the pipeline.
    pub fn normalized(mut self) -> Self {
        self.batch_size = self.batch_size.max(1);
        self.max_concurrent_batches = self.max_concurrent_batches.max(1);
        self.fragment_lookahead = self.fragment_lookahead.max(1);
        self.snippet_max_lines = self.snippet_max_lines.max(1);
        self.fragment_coverage_threshold = self.fragment_coverage_threshold.clamp(0.0, 1.0);
        self.key_phrase_threshold = self.key_phrase_threshold.clamp(0.0, 1.0);
        self.token_overlap_threshold = self.token_overlap_threshold.clamp(0.0, 1.0);
        self
    }

    pub fn oracle_timeout(&self) -> Duration {
        Duration::from_secs(self.oracle_timeout_secs.max(1))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn is_source_extension(&self, ext: &str) -> bool {
        self.source_extensions
            .iter()
            .any(|e| e.eq_ignore_ascii_case(ext))
    }

    pub fn is_excluded_dir(&self, name: &str) -> bool {
        self.excluded_dirs.iter().any(|d| d == name)
    }
}
