use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Value};
use textmod_core::Oracle;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// Deterministic stand-in for the model.
///
/// Classification calls return the scripted decision. Batch calls rewrite
/// every snippet in the prompt: a verbatim search term is swapped whole,
/// otherwise the replacement words are placed over the search words one by
/// one so split text keeps its markup.
#[derive(Debug, Default)]
pub struct ScriptedOracle {
    classification: Option<String>,
    malformed_for: Vec<String>,
    stall: Option<(String, CancellationToken)>,
    answered: Notify,
    calls: AtomicUsize,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_classification(mut self, decision: Value) -> Self {
        self.classification = Some(decision.to_string());
        self
    }

    /// Batches mentioning `path` get a reply with no JSON in it.
    pub fn malformed_for(mut self, path: &str) -> Self {
        self.malformed_for.push(path.to_string());
        self
    }

    /// Batches mentioning `path` wait until another batch has been answered,
    /// cancel `token` and then never reply.
    pub fn stalls_for(mut self, path: &str, token: CancellationToken) -> Self {
        self.stall = Some((path.to_string(), token));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if system.contains("modification scope") {
            return self
                .classification
                .clone()
                .ok_or_else(|| anyhow!("no classification scripted"));
        }

        if self
            .malformed_for
            .iter()
            .any(|path| prompt.contains(&format!("File: {} (", path)))
        {
            return Ok("Sorry, I could not work out these edits.".to_string());
        }

        if let Some((path, token)) = &self.stall {
            if prompt.contains(&format!("File: {} (", path)) {
                self.answered.notified().await;
                token.cancel();
                return std::future::pending().await;
            }
        }

        let search = quoted_line(prompt, "Search term")?;
        let replacement = quoted_line(prompt, "Replacement term")?;
        let snippet_re = Regex::new(r#"(?s)<snippet index="(\d+)">\n(.*?)\n</snippet>"#)?;

        let modifications: Vec<Value> = snippet_re
            .captures_iter(prompt)
            .map(|c| {
                let index: usize = c[1].parse().unwrap_or_default();
                let original = c[2].to_string();
                let modified = rewrite(&original, &search, &replacement);
                json!({
                    "nodeIndex": index,
                    "originalSnippet": original,
                    "modifiedSnippet": modified,
                    "confidence": 0.9,
                    "shouldApply": modified != original,
                    "reasoning": "scripted",
                    "strategy": if original.contains(&search) { "literal-swap" } else { "marker-redistribution" },
                })
            })
            .collect();

        self.answered.notify_one();
        Ok(format!(
            "```json\n{}\n```",
            json!({
                "modifications": modifications,
                "overallStrategy": "scripted",
                "batchConfidence": 0.9,
            })
        ))
    }
}

fn quoted_line(prompt: &str, label: &str) -> Result<String> {
    let re = Regex::new(&format!(r#"{}: "(.*)""#, regex::escape(label)))?;
    re.captures(prompt)
        .map(|c| c[1].to_string())
        .ok_or_else(|| anyhow!("prompt has no {}", label))
}

fn rewrite(snippet: &str, search: &str, replacement: &str) -> String {
    if snippet.contains(search) {
        return snippet.replace(search, replacement);
    }

    let from: Vec<&str> = search.split_whitespace().collect();
    let to: Vec<&str> = replacement.split_whitespace().collect();
    if from.len() != to.len() {
        return snippet.to_string();
    }

    let mut out = String::with_capacity(snippet.len());
    let mut rest = snippet;
    for (word, new_word) in from.iter().zip(&to) {
        let Some(pos) = rest.find(word) else {
            return snippet.to_string();
        };
        out.push_str(&rest[..pos]);
        out.push_str(new_word);
        rest = &rest[pos + word.len()..];
    }
    out.push_str(rest);
    out
}
