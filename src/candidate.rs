/// Reduce a raw pattern hit to an alphanumeric code.
///
/// The pattern rules tolerate spaces and hyphens inside a code, so a hit can
/// drag in a neighbouring word ("Ref 482913", "482913 is"). Those are cut off
/// before all remaining separators are removed, as is a unit glued straight
/// onto the last digit ("10mins", "123456px"). A letter group joined to the
/// last digit by a hyphen ("AB12-CD") stays part of the code. Returns `None`
/// when the result falls outside `min_length..=max_length` or contains no digit.
pub fn normalize_candidate(raw: &str, min_length: usize, max_length: usize) -> Option<String> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut candidate = collapsed.as_str();

    // leading word glued on before the first digit
    if let Some(first_digit) = candidate.find(|c: char| c.is_ascii_digit()) {
        if first_digit > 0 {
            if let Some(space) = candidate[..first_digit].rfind(' ') {
                candidate = &candidate[space + 1..];
            }
        }
    }

    candidate = candidate.trim_end_matches(|c: char| !c.is_ascii_alphanumeric());

    // trailing word or unit after the last digit
    if let Some(last_digit) = candidate.rfind(|c: char| c.is_ascii_digit()) {
        let suffix = &candidate[last_digit + 1..];
        if suffix.contains(' ') || !(suffix.is_empty() || suffix.starts_with('-')) {
            candidate = &candidate[..last_digit + 1];
        }
    }

    let normalized: String = candidate
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();

    if normalized.len() < min_length || normalized.len() > max_length {
        return None;
    }
    if !normalized.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(normalized)
}

/// Grouping key: the same code in any letter case is one candidate.
pub fn candidate_key(code: &str) -> String {
    code.to_ascii_uppercase()
}

/// Rendering shown to the user: upper-cased when the code has letters.
pub fn display_code(code: &str) -> String {
    if has_letter(code) {
        code.to_ascii_uppercase()
    } else {
        code.to_string()
    }
}

pub fn has_letter(code: &str) -> bool {
    code.chars().any(|c| c.is_ascii_alphabetic())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalize(raw: &str) -> Option<String> {
        normalize_candidate(raw, 4, 10)
    }

    #[test]
    fn test_plain_digits() {
        assert_eq!(normalize("123456").as_deref(), Some("123456"));
        assert_eq!(normalize("  123456 ").as_deref(), Some("123456"));
    }

    #[test]
    fn test_separators_removed() {
        assert_eq!(normalize("123-456").as_deref(), Some("123456"));
        assert_eq!(normalize("12  34\t56").as_deref(), Some("123456"));
        assert_eq!(normalize("AB12-CD").as_deref(), Some("AB12CD"));
    }

    #[test]
    fn test_leading_word_dropped() {
        assert_eq!(normalize("Ref 482913").as_deref(), Some("482913"));
        assert_eq!(normalize("your code 77aa91").as_deref(), Some("77aa91"));
    }

    #[test]
    fn test_trailing_word_dropped() {
        assert_eq!(normalize("482913 is").as_deref(), Some("482913"));
        assert_eq!(normalize("987654 has").as_deref(), Some("987654"));
        assert_eq!(normalize("4829-13 -").as_deref(), Some("482913"));
    }

    #[test]
    fn test_glued_unit_dropped() {
        assert_eq!(normalize("10mins"), None);
        assert_eq!(normalize("123456px").as_deref(), Some("123456"));
        assert_eq!(normalize("A1B2C3D").as_deref(), Some("A1B2C3"));
        assert_eq!(normalize("AB12-CD").as_deref(), Some("AB12CD"));
        assert_eq!(normalize("AB12-CD ok").as_deref(), Some("AB12"));
    }

    #[test]
    fn test_length_bounds() {
        assert_eq!(normalize("123"), None);
        assert_eq!(normalize("12345678901"), None);
        assert_eq!(normalize("1234").as_deref(), Some("1234"));
        assert_eq!(normalize("1234567890").as_deref(), Some("1234567890"));
        assert_eq!(normalize_candidate("123456", 6, 6).as_deref(), Some("123456"));
        assert_eq!(normalize_candidate("12345", 6, 6), None);
    }

    #[test]
    fn test_requires_digit() {
        assert_eq!(normalize("ABCDE"), None);
        assert_eq!(normalize("hello world"), None);
    }

    #[test]
    fn test_key_and_display() {
        assert_eq!(candidate_key("ab12cd"), "AB12CD");
        assert_eq!(display_code("ab12cd"), "AB12CD");
        assert_eq!(display_code("123456"), "123456");
        assert!(has_letter("12a4"));
        assert!(!has_letter("1234"));
    }
}
