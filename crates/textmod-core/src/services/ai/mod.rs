use anyhow::Result;
use async_trait::async_trait;

/// The external judgment service consulted for classification and proposals.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Oracle: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String>;
}

/// Pulls the JSON object out of a model response that may wrap it in prose
/// or markdown fences.
pub fn extract_json_payload(text: &str) -> Option<&str> {
    let text = text.trim();

    if let Some(start) = text.find("```json") {
        let rest = &text[start + "```json".len()..];
        let end = rest.find("```").unwrap_or(rest.len());
        let candidate = rest[..end].trim();
        if candidate.starts_with('{') {
            return Some(candidate);
        }
    }

    if let Some(start) = text.find("```") {
        let rest = &text[start + 3..];
        let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphabetic());
        let end = rest.find("```").unwrap_or(rest.len());
        let candidate = rest[..end].trim();
        if candidate.starts_with('{') {
            return Some(candidate);
        }
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(text[start..=end].trim())
}
