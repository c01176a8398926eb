use lazy_static::lazy_static;
use regex::{Captures, Regex};

lazy_static! {
    static ref LINE_BREAK_TAG: Regex = Regex::new(r"(?i)<br\s*/?>").unwrap();
    static ref PARAGRAPH_END_TAG: Regex = Regex::new(r"(?i)</p>").unwrap();
    static ref STYLE_BLOCK: Regex = Regex::new(r"(?is)<style.*?</style>").unwrap();
    static ref SCRIPT_BLOCK: Regex = Regex::new(r"(?is)<script.*?</script>").unwrap();
    static ref ANY_TAG: Regex = Regex::new(r"<[^>]*?>").unwrap();
    static ref HTML_ENTITY: Regex = Regex::new(r"&(#x?[0-9a-fA-F]+|[a-zA-Z]+);").unwrap();
    static ref WHITESPACE_RUN: Regex = Regex::new(r"[\s\u{00A0}]+").unwrap();
}

/// Plain-text view of an email body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedContent {
    pub text: String,
    pub lower_text: String,
}

impl NormalizedContent {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Strip markup from a raw (possibly HTML) body and collapse whitespace.
///
/// Line and paragraph breaks survive as separators until the final
/// whitespace collapse. Style and script blocks are dropped together with
/// their content. Never fails; an empty body yields empty strings.
pub fn normalize_content(raw: &str) -> NormalizedContent {
    if raw.is_empty() {
        return NormalizedContent::default();
    }

    let text = LINE_BREAK_TAG.replace_all(raw, "\n");
    let text = PARAGRAPH_END_TAG.replace_all(&text, "\n");
    let text = STYLE_BLOCK.replace_all(&text, " ");
    let text = SCRIPT_BLOCK.replace_all(&text, " ");
    let text = ANY_TAG.replace_all(&text, " ");
    let text = decode_html_entities(&text);
    let text = WHITESPACE_RUN.replace_all(&text, " ").trim().to_string();

    let lower_text = text.to_lowercase();
    NormalizedContent { text, lower_text }
}

/// Decode numeric and common named HTML entities.
///
/// Unknown named entities and code points that are not valid scalar values
/// decode to the empty string.
pub fn decode_html_entities(input: &str) -> String {
    if input.is_empty() {
        return String::new();
    }

    HTML_ENTITY
        .replace_all(input, |caps: &Captures| {
            let entity = caps[1].to_lowercase();
            if let Some(decoded) = named_entity(&entity) {
                return decoded.to_string();
            }
            let code_point = if let Some(hex) = entity.strip_prefix("#x") {
                u32::from_str_radix(hex, 16).ok()
            } else if let Some(decimal) = entity.strip_prefix('#') {
                leading_decimal(decimal)
            } else {
                None
            };
            code_point
                .and_then(char::from_u32)
                .map(|ch| ch.to_string())
                .unwrap_or_default()
        })
        .into_owned()
}

fn named_entity(entity: &str) -> Option<&'static str> {
    match entity {
        "nbsp" => Some(" "),
        "lt" => Some("<"),
        "gt" => Some(">"),
        "amp" => Some("&"),
        "quot" => Some("\""),
        "#39" => Some("'"),
        _ => None,
    }
}

// "12ab" decodes as 12, matching how browsers read loose decimal references
fn leading_decimal(digits: &str) -> Option<u32> {
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse().ok()
}
