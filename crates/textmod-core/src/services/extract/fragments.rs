use crate::config::EngineConfig;
use crate::services::matching::{ordered_coverage, tokenize, word_matches};
use crate::shared::Fragment;

/// Indices of consecutive units that together spell out most of a term.
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentRun {
    pub members: Vec<usize>,
    pub coverage: f64,
}

/// Greedy scan for split occurrences of `term` across consecutive units.
///
/// A run starts at any unit holding a term word and absorbs up to
/// `fragment_lookahead` following units while each one supplies a word not
/// yet matched. Runs of two or more units whose in-order coverage reaches
/// `fragment_coverage_threshold` are accepted, and scanning resumes after the
/// last member.
pub fn find_runs(units: &[Fragment], term: &str, config: &EngineConfig) -> Vec<FragmentRun> {
    let term_words = tokenize(term);
    if term_words.len() < 2 {
        return Vec::new();
    }

    let unit_words: Vec<Vec<String>> = units.iter().map(|u| tokenize(&u.content)).collect();
    let mut runs = Vec::new();
    let mut i = 0;

    while i < units.len() {
        let mut matched = vec![false; term_words.len()];
        if !absorb(&unit_words[i], &term_words, &mut matched) {
            i += 1;
            continue;
        }

        let mut members = vec![i];
        let mut next = i + 1;
        while next < units.len()
            && members.len() <= config.fragment_lookahead
            && !matched.iter().all(|m| *m)
        {
            if !absorb(&unit_words[next], &term_words, &mut matched) {
                break;
            }
            members.push(next);
            next += 1;
        }

        if members.len() >= 2 {
            let words: Vec<String> = members
                .iter()
                .flat_map(|m| unit_words[*m].iter().cloned())
                .collect();
            let coverage = ordered_coverage(&term_words, &words) as f64 / term_words.len() as f64;
            if coverage >= config.fragment_coverage_threshold {
                tracing::debug!(
                    "fragment run of {} unit(s) covers {:.2} of \"{}\"",
                    members.len(),
                    coverage,
                    term
                );
                runs.push(FragmentRun { members, coverage });
                i = next;
                continue;
            }
        }
        i += 1;
    }

    runs
}

/// Marks the term words this unit supplies; false when it adds nothing new.
fn absorb(words: &[String], term_words: &[String], matched: &mut [bool]) -> bool {
    let mut contributed = false;
    for (k, term_word) in term_words.iter().enumerate() {
        if !matched[k] && words.iter().any(|w| word_matches(term_word, w)) {
            matched[k] = true;
            contributed = true;
        }
    }
    contributed
}
