use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::services::matching::search_variations;
use crate::shared::{DecisionSource, ModificationScope, ScopeDecision, TextReplaceTerms};

lazy_static! {
    // Each quote style closes with its own mark. Apostrophes are allowed
    // inside single-quoted terms when a letter follows them ("Don't").
    static ref QUOTED_PAIR: Regex = Regex::new(concat!(
        r#"(?:^|[^\w'’])"#,
        r#"(?:"(?P<f1>[^"]+)"|“(?P<f2>[^”]+)”|'(?P<f3>[^']+(?:'\w[^']*)*)'|‘(?P<f4>[^’]+(?:’\w[^’]*)*)’|`(?P<f5>[^`]+)`)"#,
        r#"\s*(?:to|with|into|->|=>|→)\s*"#,
        r#"(?:"(?P<t1>[^"]*)"|“(?P<t2>[^”]*)”|'(?P<t3>[^']*(?:'\w[^']*)*)'|‘(?P<t4>[^’]*(?:’\w[^’]*)*)’|`(?P<t5>[^`]*)`)"#,
    ))
    .unwrap();
    static ref CHANGE_VERB: Regex =
        Regex::new(r"(?i)\b(change|replace|update|rename|edit|modify|swap|switch|reword|make)\b")
            .unwrap();
    static ref TEXT_WORDS: Regex = Regex::new(
        r"(?i)\b(text|heading|headline|title|label|wording|copy|caption|says|phrase|words?|typo|spelling)\b"
    )
    .unwrap();
    static ref THEME_WORDS: Regex = Regex::new(
        r"(?i)\b(theme|colou?r scheme|palette|dark mode|light mode|brand colou?rs?|primary colou?r|accent colou?r|colou?rs?)\b"
    )
    .unwrap();
    static ref GLOBAL_WORDS: Regex = Regex::new(
        r"(?i)\b(all|entire|whole|every|everything|site-?wide|globally|global|overall)\b"
    )
    .unwrap();
    static ref TARGETED: Regex = Regex::new(
        r"(?i)\b(?:this|that|the)\s+(?:\w+\s+)?(button|header|heading|title|card|link|image|icon|navbar|nav|footer|section|paragraph|input|form|logo|hero|banner|element|menu)\b"
    )
    .unwrap();
    static ref STYLE_WORDS: Regex = Regex::new(
        r"(?i)\b(padding|margin|font|bold|italic|bigger|smaller|larger|rounded|border|shadow|align|center|width|height|size|spacing|underline)\b"
    )
    .unwrap();
    static ref CREATION_VERB: Regex =
        Regex::new(r"(?i)\b(add|create|build|insert|include|generate)\b").unwrap();
    static ref COMPONENT_NOUNS: Regex = Regex::new(
        r"(?i)\b(new|component|section|page|form|modal|dialog|sidebar|widget|card|carousel|testimonials?|gallery|pricing)\b"
    )
    .unwrap();
    static ref BREADTH_WORDS: Regex = Regex::new(
        r"(?i)\b(redesign|rewrite|overhaul|restructure|revamp|rebuild|layout|completely|from scratch|entire|whole|everything)\b"
    )
    .unwrap();
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeuristicSuggestion {
    pub scope: ModificationScope,
    pub confidence: f64,
    pub reasoning: String,
    pub scores: Vec<(ModificationScope, i32)>,
    pub text_replace: Option<TextReplaceTerms>,
}

impl HeuristicSuggestion {
    pub fn into_decision(self) -> ScopeDecision {
        ScopeDecision {
            scope: self.scope,
            reasoning: self.reasoning,
            confidence: self.confidence,
            source: DecisionSource::Heuristic,
            text_replace: if self.scope == ModificationScope::TextReplace {
                self.text_replace
            } else {
                None
            },
        }
    }
}

#[derive(Debug, Default)]
struct Scores {
    text_replace: i32,
    theme_change: i32,
    targeted_nodes: i32,
    component_addition: i32,
    full_file: i32,
    signals: Vec<String>,
}

impl Scores {
    fn get(&self, scope: ModificationScope) -> i32 {
        match scope {
            ModificationScope::TextReplace => self.text_replace,
            ModificationScope::ThemeChange => self.theme_change,
            ModificationScope::TargetedNodes => self.targeted_nodes,
            ModificationScope::ComponentAddition => self.component_addition,
            ModificationScope::FullFile => self.full_file,
        }
    }
}

fn count(re: &Regex, text: &str, cap: usize) -> i32 {
    re.find_iter(text).take(cap).count() as i32
}

/// Extracts an explicit `"X" to "Y"` pair from a prompt.
pub fn extract_quoted_terms(prompt: &str) -> Option<TextReplaceTerms> {
    let captures = QUOTED_PAIR.captures(prompt)?;
    let group = |names: [&str; 5]| {
        names
            .iter()
            .find_map(|n| captures.name(n))
            .map(|m| m.as_str().trim())
    };
    let from = group(["f1", "f2", "f3", "f4", "f5"])?;
    let to = group(["t1", "t2", "t3", "t4", "t5"])?;
    if from.is_empty() || from == to {
        return None;
    }

    Some(TextReplaceTerms {
        search_term: from.to_string(),
        replacement_term: to.to_string(),
        search_variations: search_variations(from),
    })
}

/// Pure keyword/pattern scoring over the five scopes.
pub fn suggest_scope(prompt: &str) -> HeuristicSuggestion {
    let mut scores = Scores::default();
    let terms = extract_quoted_terms(prompt);
    let has_change_verb = CHANGE_VERB.is_match(prompt);

    if terms.is_some() {
        if has_change_verb {
            scores.text_replace += 6;
            scores.signals.push("explicit quoted change X to Y".to_string());
        } else {
            scores.text_replace += 4;
            scores.signals.push("quoted X to Y pair".to_string());
        }
    }
    let text_words = count(&TEXT_WORDS, prompt, 2);
    if text_words > 0 {
        scores.text_replace += text_words;
        scores.signals.push("wording keywords".to_string());
    }

    let theme_words = count(&THEME_WORDS, prompt, 2);
    let targeted = count(&TARGETED, prompt, 2);
    if theme_words > 0 {
        scores.theme_change += 2 + theme_words;
        if GLOBAL_WORDS.is_match(prompt) {
            scores.theme_change += 1;
        }
        if targeted > 0 {
            scores.theme_change -= 2;
        }
        scores.signals.push("color/theme keywords".to_string());
    }

    if targeted > 0 {
        scores.targeted_nodes += 3;
        scores.targeted_nodes += count(&STYLE_WORDS, prompt, 2);
        scores.signals.push("single-element qualifier".to_string());
    }

    if CREATION_VERB.is_match(prompt) {
        scores.component_addition += 2 + count(&COMPONENT_NOUNS, prompt, 2);
        scores.signals.push("creation verb".to_string());
    }

    let breadth = count(&BREADTH_WORDS, prompt, 3);
    if breadth > 0 {
        scores.full_file += 2 * breadth;
        scores.signals.push("structural/breadth words".to_string());
    }

    resolve(scores, terms)
}

fn resolve(scores: Scores, terms: Option<TextReplaceTerms>) -> HeuristicSuggestion {
    let ranked: Vec<(ModificationScope, i32)> = ModificationScope::ALL
        .iter()
        .map(|scope| (*scope, scores.get(*scope)))
        .collect();

    let top = ranked.iter().map(|(_, s)| *s).max().unwrap_or(0);
    if top <= 0 {
        return HeuristicSuggestion {
            scope: ModificationScope::FullFile,
            confidence: 0.3,
            reasoning: "no strong signal; defaulting to full-file edit".to_string(),
            scores: ranked,
            text_replace: None,
        };
    }

    // ALL is in priority order, so the first contender is the most specific.
    let scope = ranked
        .iter()
        .find(|(_, s)| *s > 0 && *s >= top - 1)
        .map(|(scope, _)| *scope)
        .unwrap_or(ModificationScope::FullFile);

    let total: i32 = ranked.iter().map(|(_, s)| (*s).max(0)).sum();
    let mut confidence = (scores.get(scope).max(0) as f64 / total.max(1) as f64).clamp(0.3, 0.95);
    if scope == ModificationScope::TextReplace && terms.is_some() {
        confidence = confidence.max(0.9);
    }

    HeuristicSuggestion {
        scope,
        confidence,
        reasoning: format!("heuristic: {}", scores.signals.join("; ")),
        scores: ranked,
        text_replace: terms,
    }
}
