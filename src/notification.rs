use crate::extractor::{CodeExtractor, ExtractionResult};
use crate::normalization::normalize_content;
use serde::{Deserialize, Serialize};

const DEFAULT_SUBJECT: &str = "无主题";
const DEFAULT_SENDER: &str = "未知发件人";
const IMPORTANT_WORDS: [&str; 5] = ["验证码", "verification", "code", "登录", "login"];
const MAX_LISTED_CODES: usize = 3;

/// How much body text a summary carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewLimit {
    /// New-mail push notification.
    Notification,
    /// Single message detail view.
    Detail,
}

impl PreviewLimit {
    pub fn chars(self) -> usize {
        match self {
            PreviewLimit::Notification => 150,
            PreviewLimit::Detail => 1000,
        }
    }
}

/// Everything a chat front end needs to announce one incoming message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationSummary {
    pub to_address: String,
    pub from_address: String,
    pub subject: String,
    pub important: bool,
    pub preview: String,
    pub codes: Vec<String>,
    pub uncertain_codes: Vec<String>,
}

impl NotificationSummary {
    pub fn build(
        to_address: &str,
        from_address: &str,
        subject: &str,
        raw_body: &str,
        extractor: &CodeExtractor,
        limit: PreviewLimit,
    ) -> Self {
        let subject = non_empty_or(subject, DEFAULT_SUBJECT);
        let extraction = extractor.extract(&subject, raw_body);
        let content = normalize_content(raw_body);

        Self {
            to_address: to_address.to_string(),
            from_address: non_empty_or(from_address, DEFAULT_SENDER),
            important: is_important(&subject, raw_body),
            preview: truncate_preview(&content.text, limit.chars()),
            codes: listed_codes(&extraction),
            uncertain_codes: uncertain_codes(&extraction),
            subject,
        }
    }

    pub fn has_codes(&self) -> bool {
        !self.codes.is_empty() || !self.uncertain_codes.is_empty()
    }
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

/// Mail that looks like a login or verification message gets flagged.
pub fn is_important(subject: &str, raw_body: &str) -> bool {
    let subject = subject.to_lowercase();
    let body = raw_body.to_lowercase();
    IMPORTANT_WORDS
        .iter()
        .any(|word| subject.contains(word) || body.contains(word))
}

pub fn truncate_preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

fn listed_codes(extraction: &ExtractionResult) -> Vec<String> {
    extraction
        .high_confidence
        .iter()
        .take(MAX_LISTED_CODES)
        .cloned()
        .collect()
}

fn uncertain_codes(extraction: &ExtractionResult) -> Vec<String> {
    extraction
        .low_confidence
        .iter()
        .filter(|code| !extraction.high_confidence.contains(*code))
        .take(MAX_LISTED_CODES)
        .cloned()
        .collect()
}
