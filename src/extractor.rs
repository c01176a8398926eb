use crate::candidate::{candidate_key, display_code, normalize_candidate};
use crate::config::DetectionConfig;
use crate::normalization::normalize_content;
use crate::patterns::PatternSet;
use crate::scoring::KeywordScorer;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

lazy_static! {
    static ref DEFAULT_EXTRACTOR: CodeExtractor = CodeExtractor::new(DetectionConfig::default());
}

/// A distinct code found in one email, with the evidence behind it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub code: String,
    pub normalized_key: String,
    pub display_code: String,
    pub score: i32,
    pub contexts: Vec<String>,
    pub matched_patterns: Vec<String>,
}

impl Candidate {
    fn new(code: String, key: String) -> Self {
        Self {
            display_code: display_code(&code),
            code,
            normalized_key: key,
            score: 0,
            contexts: Vec::new(),
            matched_patterns: Vec::new(),
        }
    }

    fn record_hit(&mut self, pattern: &str, score: i32, context: String) {
        self.score += score;
        if !self.contexts.contains(&context) {
            self.contexts.push(context);
        }
        if !self.matched_patterns.iter().any(|p| p == pattern) {
            self.matched_patterns.push(pattern.to_string());
        }
    }
}

/// Per-candidate detail kept for troubleshooting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateDebug {
    pub code: String,
    pub score: i32,
    pub patterns: Vec<String>,
    pub contexts: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub high_confidence: Vec<String>,
    pub low_confidence: Vec<String>,
    pub debug: Vec<CandidateDebug>,
}

impl ExtractionResult {
    pub fn is_empty(&self) -> bool {
        self.high_confidence.is_empty() && self.low_confidence.is_empty()
    }
}

/// Verification-code extractor with its rules compiled once.
///
/// Holds no mutable state, so a single instance can serve concurrent callers.
#[derive(Debug, Clone)]
pub struct CodeExtractor {
    config: DetectionConfig,
    patterns: PatternSet,
}

impl Default for CodeExtractor {
    fn default() -> Self {
        Self::new(DetectionConfig::default())
    }
}

impl CodeExtractor {
    pub fn new(config: DetectionConfig) -> Self {
        let patterns = PatternSet::compile(&config.patterns);
        Self { config, patterns }
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    pub fn extract(&self, subject: &str, raw_body: &str) -> ExtractionResult {
        run_extraction(&self.config, &self.patterns, subject, raw_body)
    }
}

/// Extract verification codes using an explicit configuration.
pub fn extract(subject: &str, raw_body: &str, config: &DetectionConfig) -> ExtractionResult {
    let patterns = PatternSet::compile(&config.patterns);
    run_extraction(config, &patterns, subject, raw_body)
}

/// Extract verification codes using the built-in configuration.
pub fn extract_with_defaults(subject: &str, raw_body: &str) -> ExtractionResult {
    DEFAULT_EXTRACTOR.extract(subject, raw_body)
}

fn run_extraction(
    config: &DetectionConfig,
    patterns: &PatternSet,
    subject: &str,
    raw_body: &str,
) -> ExtractionResult {
    let content = normalize_content(raw_body);
    let scorer = KeywordScorer::new(config);
    let subject_score = scorer.subject_score(subject);

    // candidates keep first-seen order; the index maps key -> position
    let mut candidates: Vec<Candidate> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for pattern in patterns.iter() {
        for hit in pattern.matches(&content.text) {
            let Some(code) = normalize_candidate(hit.text, config.min_length, config.max_length)
            else {
                continue;
            };

            let key = candidate_key(&code);
            let span = hit.text.chars().count();
            let scored = scorer.score_match(&content.text, hit.start, span, &code);
            log::debug!(
                "pattern '{}' matched '{}' -> {} (score {})",
                pattern.name(),
                hit.text,
                code,
                scored.score
            );

            let slot = *index.entry(key.clone()).or_insert_with(|| {
                candidates.push(Candidate::new(code, key));
                candidates.len() - 1
            });
            candidates[slot].record_hit(pattern.name(), scored.score, scored.context);
        }
    }

    for candidate in &mut candidates {
        candidate.score += subject_score;
    }
    // stable: equal scores stay in first-seen order
    candidates.sort_by(|a, b| b.score.cmp(&a.score));

    classify(candidates, config.score_threshold)
}

fn classify(candidates: Vec<Candidate>, threshold: i32) -> ExtractionResult {
    let mut result = ExtractionResult::default();

    for candidate in candidates {
        if !candidate.display_code.is_empty() {
            if candidate.score >= threshold {
                result.high_confidence.push(candidate.display_code.clone());
            } else {
                result.low_confidence.push(candidate.display_code.clone());
            }
        }
        result.debug.push(CandidateDebug {
            code: candidate.display_code,
            score: candidate.score,
            patterns: candidate.matched_patterns,
            contexts: candidate.contexts,
        });
    }

    log::debug!(
        "extracted {} high / {} low confidence codes",
        result.high_confidence.len(),
        result.low_confidence.len()
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PatternRule;

    #[test]
    fn test_chinese_verification_mail() {
        let result = extract_with_defaults("", "您的验证码是 123456，请在10分钟内使用");
        assert_eq!(result.high_confidence, vec!["123456"]);
        assert!(result.low_confidence.is_empty());
        assert_eq!(result.debug.len(), 1);
        assert_eq!(
            result.debug[0].patterns,
            vec!["numeric", "alphanumUpper", "alphanumMixed"]
        );
        // three hits at +2 each
        assert_eq!(result.debug[0].score, 6);
        assert_eq!(result.debug[0].contexts.len(), 1);
    }

    #[test]
    fn test_order_number_is_low_confidence() {
        let result = extract_with_defaults("Order confirmation", "Your order #987654 has shipped");
        assert!(!result.high_confidence.contains(&"987654".to_string()));
        assert_eq!(result.low_confidence, vec!["987654"]);
        assert!(result.debug[0].score < 0);
    }

    #[test]
    fn test_mixed_code_displayed_upper() {
        let result = extract_with_defaults("", "<b>Code:</b> AB12-CD");
        assert_eq!(result.high_confidence, vec!["AB12CD"]);
        // "code" in context plus the letter bonus, once per rule that hit
        let debug = &result.debug[0];
        assert_eq!(debug.score, 3 * debug.patterns.len() as i32);
    }

    #[test]
    fn test_empty_input() {
        let result = extract_with_defaults("", "");
        assert_eq!(result, ExtractionResult::default());
        assert!(result.is_empty());
    }

    #[test]
    fn test_dedup_across_rules() {
        let config = DetectionConfig {
            patterns: vec![
                PatternRule::new(
                    "numeric",
                    r"(?:^|[^0-9A-Za-z])((?:[0-9][\s-]?){4,8})(?:[^0-9A-Za-z]|$)",
                    Some(1),
                ),
                PatternRule::new(
                    "wrapped",
                    r"[【(\[{]([A-Za-z0-9][A-Za-z0-9\s-]{3,9}[A-Za-z0-9])[】)\]}]",
                    Some(1),
                ),
            ],
            ..DetectionConfig::default()
        };
        let result = extract("", "验证码 556677 【556677】", &config);
        assert_eq!(result.debug.len(), 1);
        assert_eq!(result.debug[0].patterns, vec!["numeric", "wrapped"]);
        assert_eq!(result.high_confidence, vec!["556677"]);
    }

    #[test]
    fn test_case_variants_share_a_candidate() {
        let result = extract_with_defaults("Login code", "use ab12cd34 or AB12CD34");
        assert_eq!(result.debug.len(), 1);
        assert_eq!(result.debug[0].code, "AB12CD34");
        assert_eq!(result.high_confidence, vec!["AB12CD34"]);
    }

    #[test]
    fn test_glued_units_are_not_codes() {
        let result =
            extract_with_defaults("", "Your verification code is 482913, valid for 10mins");
        assert_eq!(result.high_confidence, vec!["482913"]);
        assert!(result.low_confidence.is_empty());

        let result = extract_with_defaults("", "size 123456px");
        assert_eq!(result.low_confidence, vec!["123456"]);
        assert_eq!(result.debug[0].score, 0);
    }

    #[test]
    fn test_context_window_edge() {
        let numeric_only = |window| DetectionConfig {
            patterns: vec![PatternRule::new(
                "numeric",
                r"(?:^|[^0-9A-Za-z])((?:[0-9][\s-]?){4,8})(?:[^0-9A-Za-z]|$)",
                Some(1),
            )],
            context_window: window,
            ..DetectionConfig::default()
        };
        let result = extract("", "x 1234 code", &numeric_only(5));
        assert_eq!(result.debug[0].score, 0);
        assert_eq!(result.debug[0].contexts, vec!["x 1234 cod"]);

        let result = extract("", "x 1234 code", &numeric_only(6));
        assert_eq!(result.debug[0].score, 2);
    }

    #[test]
    fn test_subject_score_added_once() {
        let body = "1234 and 5678";
        let plain = extract_with_defaults("", body);
        let boosted = extract_with_defaults("verification", body);
        for (a, b) in plain.debug.iter().zip(boosted.debug.iter()) {
            assert_eq!(a.code, b.code);
            assert_eq!(b.score, a.score + 1);
        }
    }

    #[test]
    fn test_ties_keep_first_seen_order() {
        let result = extract_with_defaults("", "1111 then 2222 then 3333");
        assert_eq!(result.low_confidence, vec!["1111", "2222", "3333"]);
    }

    #[test]
    fn test_sorted_by_score() {
        let body = "Your verification code is 5566. Thanks for using our service, \
                    have a nice day and see you soon. Order 11112222";
        let result = extract_with_defaults("", body);
        assert_eq!(result.high_confidence, vec!["5566"]);
        assert_eq!(result.low_confidence, vec!["11112222"]);
        let scores: Vec<i32> = result.debug.iter().map(|d| d.score).collect();
        let mut sorted = scores.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(scores, sorted);
        assert_eq!(result.debug[0].code, "5566");
    }

    #[test]
    fn test_threshold_partition() {
        let config = DetectionConfig::default();
        let body = "您的验证码是 123456。订单号 20240101 电话 13800138000";
        let result = extract("验证码", body, &config);
        for debug in &result.debug {
            if debug.score >= config.score_threshold {
                assert!(result.high_confidence.contains(&debug.code));
            } else {
                assert!(result.low_confidence.contains(&debug.code));
            }
        }
    }

    #[test]
    fn test_broken_pattern_skipped() {
        let mut config = DetectionConfig::default();
        config
            .patterns
            .insert(0, PatternRule::new("broken", r"([0-9]", Some(1)));
        let result = extract("", "验证码 123456", &config);
        assert_eq!(result.high_confidence, vec!["123456"]);
    }

    #[test]
    fn test_extractor_is_idempotent() {
        let extractor = CodeExtractor::default();
        let body = "<p>Your login code: <strong>739 201</strong></p>";
        assert_eq!(extractor.extract("Sign in", body), extractor.extract("Sign in", body));
    }
}
