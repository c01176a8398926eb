use anyhow::{bail, Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Tuning knobs for the verification-code extractor.
///
/// A value of this type is never mutated by the extractor. Overrides coming
/// from the environment or a config file are folded into a fresh copy by
/// [`crate::config_loader::ConfigLoader`] before extraction starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DetectionConfig {
    pub min_length: usize,
    pub max_length: usize,
    pub context_window: usize,
    pub score_threshold: i32,
    pub positive_keywords: PositiveKeywords,
    pub negative_keywords: Vec<String>,
    pub patterns: Vec<PatternRule>,
}

/// Positive keywords per language register.
///
/// `zh` entries are matched case-sensitively, `en` entries case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PositiveKeywords {
    pub zh: Vec<String>,
    pub en: Vec<String>,
}

/// A named regex rule producing raw code candidates.
///
/// When `capture_group` is set, only that group is taken as the candidate and
/// anything matched after the group is treated as trailing context that the
/// next scan may reuse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatternRule {
    pub name: String,
    pub regex: String,
    #[serde(default)]
    pub capture_group: Option<usize>,
}

impl PatternRule {
    pub fn new(name: &str, regex: &str, capture_group: Option<usize>) -> Self {
        Self {
            name: name.to_string(),
            regex: regex.to_string(),
            capture_group,
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for PositiveKeywords {
    fn default() -> Self {
        Self {
            zh: strings(&["验证码", "动态码", "登录", "安全验证", "校验码", "一次性密码"]),
            en: strings(&[
                "verification",
                "verify",
                "code",
                "otp",
                "passcode",
                "2fa",
                "login",
                "security",
                "auth",
                "authentication",
            ]),
        }
    }
}

pub fn default_patterns() -> Vec<PatternRule> {
    vec![
        PatternRule::new(
            "numeric",
            r"(?:^|[^0-9A-Za-z])((?:[0-9][\s-]?){4,8})(?:[^0-9A-Za-z]|$)",
            Some(1),
        ),
        PatternRule::new(
            "alphanumUpper",
            r"(?:^|[^0-9A-Za-z])([A-Z0-9][A-Z0-9\s-]{3,9}[A-Z0-9])(?:[^0-9A-Za-z]|$)",
            Some(1),
        ),
        PatternRule::new(
            "alphanumMixed",
            r"(?:^|[^0-9A-Za-z])([A-Za-z0-9][A-Za-z0-9\s-]{3,9}[A-Za-z0-9])(?:[^0-9A-Za-z]|$)",
            Some(1),
        ),
        PatternRule::new(
            "wrapped",
            r"[【(\[{]([A-Za-z0-9][A-Za-z0-9\s-]{3,9}[A-Za-z0-9])[】)\]}]",
            Some(1),
        ),
    ]
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            min_length: 4,
            max_length: 10,
            context_window: 40,
            score_threshold: 2,
            positive_keywords: PositiveKeywords::default(),
            negative_keywords: strings(&[
                "订单", "金额", "电话", "phone", "customer", "invoice", "order", "tracking",
                "amount", "tel",
            ]),
            patterns: default_patterns(),
        }
    }
}

impl DetectionConfig {
    /// Check the structural invariants the extractor relies on.
    pub fn validate(&self) -> Result<()> {
        if self.min_length > self.max_length {
            bail!(
                "min_length ({}) must not exceed max_length ({})",
                self.min_length,
                self.max_length
            );
        }

        check_keywords("positive_keywords.zh", &self.positive_keywords.zh)?;
        check_keywords("positive_keywords.en", &self.positive_keywords.en)?;
        check_keywords("negative_keywords", &self.negative_keywords)?;

        for rule in &self.patterns {
            if rule.name.trim().is_empty() {
                bail!("pattern '{}' has an empty name", rule.regex);
            }
            let regex = Regex::new(&rule.regex)
                .with_context(|| format!("Invalid regex in pattern '{}'", rule.name))?;
            if let Some(group) = rule.capture_group {
                // captures_len counts the implicit whole-match group 0
                if group >= regex.captures_len() {
                    bail!(
                        "pattern '{}' declares capture group {} but the regex has only {}",
                        rule.name,
                        group,
                        regex.captures_len() - 1
                    );
                }
            }
        }

        Ok(())
    }
}

fn check_keywords(field: &str, keywords: &[String]) -> Result<()> {
    if keywords.is_empty() {
        bail!("{} must not be empty", field);
    }
    if keywords.iter().any(|k| k.is_empty()) {
        bail!("{} contains an empty keyword", field);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = DetectionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.patterns.len(), 4);
        assert_eq!(config.min_length, 4);
        assert_eq!(config.max_length, 10);
        assert_eq!(config.context_window, 40);
        assert_eq!(config.score_threshold, 2);
    }

    #[test]
    fn test_inverted_length_bounds_rejected() {
        let config = DetectionConfig {
            min_length: 8,
            max_length: 6,
            ..DetectionConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("min_length"));
    }

    #[test]
    fn test_empty_keyword_rejected() {
        let mut config = DetectionConfig::default();
        config.negative_keywords.push(String::new());
        assert!(config.validate().is_err());

        let mut config = DetectionConfig::default();
        config.positive_keywords.en.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_capture_group_out_of_range() {
        let config = DetectionConfig {
            patterns: vec![PatternRule::new("digits", r"(\d+)", Some(2))],
            ..DetectionConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("capture group 2"));
    }

    #[test]
    fn test_invalid_regex_rejected() {
        let config = DetectionConfig {
            patterns: vec![PatternRule::new("broken", r"([0-9]", Some(1))],
            ..DetectionConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: DetectionConfig =
            serde_yaml::from_str("min_length: 6\nscore_threshold: 3\n").unwrap();
        assert_eq!(config.min_length, 6);
        assert_eq!(config.score_threshold, 3);
        assert_eq!(config.max_length, 10);
        assert_eq!(config.patterns, default_patterns());
    }
}
