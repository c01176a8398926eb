use crate::config::PatternRule;
use regex::Regex;

/// A pattern rule whose regex has been compiled.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    name: String,
    regex: Regex,
    capture_group: Option<usize>,
}

/// One raw hit of a pattern rule against normalized text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternMatch<'t> {
    /// The candidate substring (capture group content when one is declared).
    pub text: &'t str,
    /// Byte offset where the whole regex match starts.
    pub start: usize,
    /// Byte offset where the candidate substring ends.
    pub end: usize,
}

impl CompiledPattern {
    pub fn compile(rule: &PatternRule) -> Result<Self, regex::Error> {
        Ok(Self {
            name: rule.name.clone(),
            regex: Regex::new(&rule.regex)?,
            capture_group: rule.capture_group,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn matches<'p, 't>(&'p self, text: &'t str) -> PatternMatches<'p, 't> {
        PatternMatches {
            pattern: self,
            text,
            position: 0,
        }
    }
}

/// Left-to-right scan of one pattern over a text.
///
/// After each hit the scan resumes where the candidate substring ends, so
/// whatever the regex matched after the capture group acts as a lookahead
/// and can serve as the leading delimiter of the next hit.
pub struct PatternMatches<'p, 't> {
    pattern: &'p CompiledPattern,
    text: &'t str,
    position: usize,
}

impl<'p, 't> Iterator for PatternMatches<'p, 't> {
    type Item = PatternMatch<'t>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.position <= self.text.len() {
            let caps = self.pattern.regex.captures_at(self.text, self.position)?;
            let whole = caps.get(0)?;
            let candidate = match self.pattern.capture_group {
                Some(group) => caps.get(group),
                None => Some(whole),
            };

            let resume = candidate.map_or(whole.end(), |m| m.end());
            self.position = if resume > whole.start() {
                resume
            } else {
                next_char_boundary(self.text, whole.start())
            };

            match candidate {
                Some(m) if !m.as_str().is_empty() => {
                    return Some(PatternMatch {
                        text: m.as_str(),
                        start: whole.start(),
                        end: m.end(),
                    });
                }
                _ => continue,
            }
        }
        None
    }
}

fn next_char_boundary(text: &str, at: usize) -> usize {
    text[at..]
        .chars()
        .next()
        .map_or(text.len() + 1, |ch| at + ch.len_utf8())
}

/// The compiled rule set used by one extractor.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<CompiledPattern>,
}

impl PatternSet {
    /// Compile every rule, skipping (and logging) those that fail.
    pub fn compile(rules: &[PatternRule]) -> Self {
        let patterns = rules
            .iter()
            .filter_map(|rule| match CompiledPattern::compile(rule) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    log::warn!("Skipping pattern '{}': {}", rule.name, e);
                    None
                }
            })
            .collect();
        Self { patterns }
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompiledPattern> {
        self.patterns.iter()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
