use crate::shared::{ModificationBatch, TextReplaceTerms};

pub fn modification_system_prompt() -> String {
    r#"You edit text inside UI component source code. You receive numbered snippets taken verbatim from project files, a search term and a replacement term. For every snippet decide whether it shows the search term as user-visible text and, if so, rewrite the snippet so the visible text reads with the replacement term.

Rules:
- Change visible text only. Every tag, attribute, expression brace, bracket and identifier must stay exactly as it is, in the same order.
- Handle three cases:
  1. literal-swap: the search term sits in one text node or string literal; swap it in place.
  2. marker-redistribution: the term is split across sibling nodes separated by markup; place the replacement words into the same nodes, in order, keeping the markup between them.
  3. semantic-redistribution: the replacement has a different number of words; distribute it across the related nodes using their names and roles as hints.
- originalSnippet must be copied exactly from the snippet you were given. modifiedSnippet is the full rewritten snippet.
- Set shouldApply to false when the snippet does not really contain the term (for example an identifier, a URL or an unrelated sentence).

Respond with a single JSON object and nothing else:
{
  "modifications": [
    {
      "nodeIndex": <snippet index>,
      "originalSnippet": "<exact snippet>",
      "modifiedSnippet": "<rewritten snippet>",
      "confidence": <0.0-1.0>,
      "shouldApply": <true|false>,
      "reasoning": "<one sentence>",
      "strategy": "literal-swap" | "marker-redistribution" | "semantic-redistribution",
      "warnings": ["<optional>"]
    }
  ],
  "overallStrategy": "<short label>",
  "batchConfidence": <0.0-1.0>
}"#
    .to_string()
}

/// The user message for one batch. Each snippet is wrapped in a
/// `<snippet index="N">` block whose body is the exact source excerpt.
pub fn modification_batch_prompt(
    batch: &ModificationBatch,
    snippets: &[String],
    terms: &TextReplaceTerms,
    request: &str,
) -> String {
    let mut prompt = format!(
        "User request: {}\nSearch term: \"{}\"\nReplacement term: \"{}\"\n\n",
        request.trim(),
        terms.search_term,
        terms.replacement_term
    );

    for (index, (node, snippet)) in batch.nodes.iter().zip(snippets).enumerate() {
        prompt.push_str(&format!(
            "File: {} ({}, {})\nMatched text: {}\n",
            node.path,
            node.span,
            node.kind.as_str(),
            node.content
        ));
        if let Some(sequence) = &node.fragments {
            let parts: Vec<String> = sequence
                .fragments
                .iter()
                .map(|f| format!("\"{}\"", f.content))
                .collect();
            prompt.push_str(&format!(
                "Split across {} nodes: {}\n",
                parts.len(),
                parts.join(" / ")
            ));
        }
        if !node.context_before.is_empty() {
            prompt.push_str(&format!("Context before:\n{}\n", node.context_before.join("\n")));
        }
        prompt.push_str(&format!(
            "<snippet index=\"{}\">\n{}\n</snippet>\n",
            index, snippet
        ));
        if !node.context_after.is_empty() {
            prompt.push_str(&format!("Context after:\n{}\n", node.context_after.join("\n")));
        }
        prompt.push('\n');
    }

    prompt.push_str(&format!(
        "Return one entry per snippet ({} total).",
        batch.nodes.len()
    ));
    prompt
}
