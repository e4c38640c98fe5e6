use lazy_static::lazy_static;
use regex::Regex;
use strsim::normalized_levenshtein;

use crate::config::EngineConfig;
use crate::shared::LocatorStrategy;

const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "of", "to", "in", "on", "for", "with", "at", "by", "is", "are",
    "be", "it", "this", "that",
];

const FUZZY_WORD_SIMILARITY: f64 = 0.85;

lazy_static! {
    static ref MARKUP_TAG: Regex = Regex::new(r"<[^<>]*>").unwrap();
}

/// Lowercased alphanumeric words. Apostrophes inside a word are dropped
/// rather than splitting it.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();

    for c in text.chars() {
        if c.is_alphanumeric() {
            current.extend(c.to_lowercase());
        } else if (c == '\'' || c == '\u{2019}') && !current.is_empty() {
            continue;
        } else if !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        words.push(current);
    }

    words
}

/// Words that carry meaning on their own; falls back to every token when the
/// term is made only of short or stop words.
pub fn significant_words(term: &str) -> Vec<String> {
    let tokens = tokenize(term);
    let significant: Vec<String> = tokens
        .iter()
        .filter(|t| t.chars().count() > 2 && !STOP_WORDS.contains(&t.as_str()))
        .cloned()
        .collect();

    if significant.is_empty() {
        tokens
    } else {
        significant
    }
}

/// Single significant words plus every bi- and tri-word phrase of the term.
pub fn key_phrases(term: &str) -> Vec<String> {
    let tokens = tokenize(term);
    let mut phrases: Vec<String> = Vec::new();

    let mut push = |phrase: String| {
        if !phrases.contains(&phrase) {
            phrases.push(phrase);
        }
    };

    for word in significant_words(term) {
        push(word);
    }
    for size in 2..=3 {
        for window in tokens.windows(size) {
            push(window.join(" "));
        }
    }

    phrases
}

pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn normalize_for_match(text: &str) -> String {
    normalize_whitespace(text).to_lowercase()
}

/// Removes markup tags and expression braces, leaving the visible words.
pub fn strip_markup(text: &str) -> String {
    let without_tags = MARKUP_TAG.replace_all(text, " ");
    let without_braces: String = without_tags
        .chars()
        .map(|c| if c == '{' || c == '}' { ' ' } else { c })
        .collect();
    normalize_whitespace(&without_braces)
}

/// Word equality tolerant of partial words and small typos.
pub fn word_matches(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    let (shorter, longer) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };
    let shorter_len = shorter.chars().count();

    if shorter_len >= 3 && longer.contains(shorter) {
        return true;
    }
    shorter_len >= 4 && normalized_levenshtein(a, b) >= FUZZY_WORD_SIMILARITY
}

/// Length of the longest in-order run of `term_words` found in `words`.
pub fn ordered_coverage(term_words: &[String], words: &[String]) -> usize {
    if term_words.is_empty() || words.is_empty() {
        return 0;
    }

    let mut previous = vec![0usize; words.len() + 1];
    let mut current = vec![0usize; words.len() + 1];

    for term_word in term_words {
        for (j, word) in words.iter().enumerate() {
            current[j + 1] = if word_matches(term_word, word) {
                previous[j] + 1
            } else {
                previous[j + 1].max(current[j])
            };
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[words.len()]
}

pub fn fraction_present(haystack_normalized: &str, needles: &[String]) -> f64 {
    if needles.is_empty() {
        return 0.0;
    }
    let present = needles
        .iter()
        .filter(|n| haystack_normalized.contains(n.as_str()))
        .count();
    present as f64 / needles.len() as f64
}

/// Applies the locator strategies cheapest first and reports the first hit.
pub fn match_ladder(content: &str, term: &str, config: &EngineConfig) -> Option<LocatorStrategy> {
    if term.trim().is_empty() {
        return None;
    }
    if content.contains(term) {
        return Some(LocatorStrategy::ExactSubstring);
    }

    let content_normalized = normalize_for_match(content);
    if content_normalized.contains(&normalize_for_match(term)) {
        return Some(LocatorStrategy::CaseInsensitive);
    }

    let phrases = key_phrases(term);
    if phrases.len() > 1
        && fraction_present(&content_normalized, &phrases) >= config.key_phrase_threshold
    {
        return Some(LocatorStrategy::KeyPhrase);
    }

    let words = significant_words(term);
    if words.len() > 1
        && fraction_present(&content_normalized, &words) >= config.token_overlap_threshold
    {
        return Some(LocatorStrategy::TokenOverlap);
    }

    None
}

/// Cheap rungs only, used for classifier-supplied variations.
pub fn matches_variation(content: &str, variation: &str) -> bool {
    !variation.trim().is_empty()
        && (content.contains(variation)
            || normalize_for_match(content).contains(&normalize_for_match(variation)))
}

/// Case forms, a de-punctuated form and partial-word forms of a term.
pub fn search_variations(term: &str) -> Vec<String> {
    let term = normalize_whitespace(term);
    if term.is_empty() {
        return Vec::new();
    }

    let words: Vec<&str> = term.split(' ').collect();
    let title_case = words
        .iter()
        .map(|w| capitalize(&w.to_lowercase()))
        .collect::<Vec<_>>()
        .join(" ");
    let sentence_case = capitalize(&term.to_lowercase());
    let depunctuated = normalize_whitespace(
        &term
            .chars()
            .filter(|c| c.is_alphanumeric() || c.is_whitespace())
            .collect::<String>(),
    );

    let mut candidates = vec![
        term.to_lowercase(),
        term.to_uppercase(),
        title_case,
        sentence_case,
        depunctuated,
    ];
    if words.len() >= 3 {
        candidates.push(words[..words.len() - 1].join(" "));
        candidates.push(words[1..].join(" "));
    }

    let mut variations: Vec<String> = Vec::new();
    for candidate in candidates {
        if !candidate.is_empty() && candidate != term && !variations.contains(&candidate) {
            variations.push(candidate);
        }
    }
    variations
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn words(s: &str) -> Vec<String> {
        tokenize(s)
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(tokenize("Contact Us, Today!"), vec!["contact", "us", "today"]);
        assert_eq!(tokenize("Don't stop"), vec!["dont", "stop"]);
        assert_eq!(tokenize("  "), Vec::<String>::new());
    }

    #[test]
    fn test_significant_words() {
        assert_eq!(significant_words("Contact Us Today"), vec!["contact", "today"]);
        assert_eq!(significant_words("to be"), vec!["to", "be"]);
    }

    #[test]
    fn test_key_phrases() {
        assert_eq!(
            key_phrases("Contact Us Today"),
            vec!["contact", "today", "contact us", "us today", "contact us today"]
        );
    }

    #[test]
    fn test_word_matches() {
        assert!(word_matches("contact", "contact"));
        assert!(word_matches("contact", "contacts"));
        assert!(word_matches("welcome", "welcom"));
        assert!(!word_matches("us", "use"));
        assert!(!word_matches("today", "tomorrow"));
    }

    #[test]
    fn test_ordered_coverage_respects_order() {
        let term = words("contact us today");
        assert_eq!(ordered_coverage(&term, &words("contact us today")), 3);
        assert_eq!(ordered_coverage(&term, &words("today us contact")), 1);
        assert_eq!(ordered_coverage(&term, &words("please contact our team today")), 2);
        assert_eq!(ordered_coverage(&term, &[]), 0);
    }

    #[test]
    fn test_match_ladder_rungs() {
        let config = EngineConfig::default();
        let test_cases = vec![
            ("<h1>Welcome to our site</h1>", Some(LocatorStrategy::ExactSubstring)),
            ("<h1>WELCOME TO   OUR SITE</h1>", Some(LocatorStrategy::CaseInsensitive)),
            ("<h1>Welcome to <b>our site</b></h1>", Some(LocatorStrategy::KeyPhrase)),
            ("<p>welcome</p><p>site</p>", Some(LocatorStrategy::TokenOverlap)),
            ("<p>Goodbye</p>", None),
        ];

        for (content, expected) in test_cases {
            assert_eq!(
                match_ladder(content, "Welcome to our site", &config),
                expected,
                "content: {}",
                content
            );
        }
    }

    #[test]
    fn test_strip_markup() {
        assert_eq!(
            strip_markup(r#"<h2 className="cta"><span>Contact</span> {"Us"} <b>Today</b></h2>"#),
            r#"Contact "Us" Today"#
        );
    }

    #[test]
    fn test_search_variations() {
        let variations = search_variations("Contact us today!");
        assert!(variations.contains(&"contact us today!".to_string()));
        assert!(variations.contains(&"CONTACT US TODAY!".to_string()));
        assert!(variations.contains(&"Contact Us Today!".to_string()));
        assert!(variations.contains(&"Contact us today".to_string()));
        assert!(variations.contains(&"Contact us".to_string()));
        assert!(variations.contains(&"us today!".to_string()));
        assert!(!variations.contains(&"Contact us today!".to_string()));
    }
}
