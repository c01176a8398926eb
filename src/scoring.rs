use crate::candidate::has_letter;
use crate::config::DetectionConfig;

const CONTEXT_WEIGHT: i32 = 2;
const SUBJECT_WEIGHT: i32 = 1;
const LETTER_BONUS: i32 = 1;

/// Score contribution of a single pattern hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchScore {
    pub score: i32,
    /// Trimmed text window the keywords were searched in.
    pub context: String,
}

/// Keyword-based scoring against the configured positive/negative lists.
pub struct KeywordScorer<'c> {
    config: &'c DetectionConfig,
}

impl<'c> KeywordScorer<'c> {
    pub fn new(config: &'c DetectionConfig) -> Self {
        Self { config }
    }

    /// Score a text at the given weight: positive hits add, negative hits subtract.
    fn keyword_balance(&self, text: &str, weight: i32) -> i32 {
        let lower = text.to_lowercase();
        let keywords = &self.config.positive_keywords;
        count_hits(text, &keywords.zh, false) * weight
            + count_hits(&lower, &keywords.en, true) * weight
            - count_hits(&lower, &self.config.negative_keywords, true) * weight
    }

    /// Subject-level signal, added once to every candidate of an email.
    pub fn subject_score(&self, subject: &str) -> i32 {
        self.keyword_balance(subject, SUBJECT_WEIGHT)
    }

    /// Score one hit whose match starts at byte offset `start` of `text` and
    /// whose raw candidate is `span` characters long.
    pub fn score_match(&self, text: &str, start: usize, span: usize, code: &str) -> MatchScore {
        let (lo, hi) = context_bounds(text, start, span, self.config.context_window);
        let context = &text[lo..hi];

        let mut score = self.keyword_balance(context, CONTEXT_WEIGHT);
        if has_letter(code) {
            score += LETTER_BONUS;
        }

        MatchScore {
            score,
            context: context.trim().to_string(),
        }
    }
}

/// Count keywords contained in `haystack`. With `fold_case` the haystack is
/// expected to be lower-cased already and each keyword is lower-cased too.
pub fn count_hits(haystack: &str, keywords: &[String], fold_case: bool) -> i32 {
    if haystack.is_empty() {
        return 0;
    }
    keywords
        .iter()
        .filter(|k| !k.is_empty())
        .filter(|k| {
            if fold_case {
                haystack.contains(k.to_lowercase().as_str())
            } else {
                haystack.contains(k.as_str())
            }
        })
        .count() as i32
}

/// Byte range from `window` characters before `start` to `span + window`
/// characters after it.
fn context_bounds(text: &str, start: usize, span: usize, window: usize) -> (usize, usize) {
    let lo = text[..start]
        .char_indices()
        .rev()
        .take(window)
        .last()
        .map_or(start, |(i, _)| i);
    let hi = text[start..]
        .char_indices()
        .nth(span + window)
        .map_or(text.len(), |(i, _)| start + i);
    (lo, hi)
}
