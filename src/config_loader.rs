use crate::config::DetectionConfig;
use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub const CONFIG_JSON_VAR: &str = "CODE_DETECTION_CONFIG_JSON";
pub const MIN_LENGTH_VAR: &str = "CODE_MIN_LENGTH";
pub const MAX_LENGTH_VAR: &str = "CODE_MAX_LENGTH";
pub const CONTEXT_WINDOW_VAR: &str = "CODE_CONTEXT_WINDOW";
pub const SCORE_THRESHOLD_VAR: &str = "CODE_SCORE_THRESHOLD";
pub const POSITIVE_ZH_VAR: &str = "CODE_POSITIVE_KEYWORDS_ZH";
pub const POSITIVE_EN_VAR: &str = "CODE_POSITIVE_KEYWORDS_EN";
pub const NEGATIVE_VAR: &str = "CODE_NEGATIVE_KEYWORDS";

/// Builds a [`DetectionConfig`] from files and environment-style overrides.
///
/// Overrides are loosely typed; anything that does not coerce cleanly is
/// logged and ignored so a bad variable never disables extraction.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Defaults with the `CODE_*` variables of the running process applied.
    pub fn from_process_env() -> DetectionConfig {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_env_map(&vars)
    }

    /// Defaults with the given `CODE_*` overrides applied.
    pub fn from_env_map(vars: &HashMap<String, String>) -> DetectionConfig {
        Self::apply_overrides(DetectionConfig::default(), vars)
    }

    /// Fold overrides into `base`, returning the new configuration.
    ///
    /// The JSON blob is applied first, then the scalar variables, then the
    /// comma-separated keyword lists.
    pub fn apply_overrides(
        base: DetectionConfig,
        vars: &HashMap<String, String>,
    ) -> DetectionConfig {
        let mut config = base;

        if let Some(raw) = vars.get(CONFIG_JSON_VAR) {
            match serde_json::from_str::<Value>(raw) {
                Ok(Value::Object(overrides)) => apply_json_overrides(&mut config, &overrides),
                Ok(_) => log::warn!("{} is not a JSON object, ignoring", CONFIG_JSON_VAR),
                Err(e) => log::warn!("Failed to parse {}: {}", CONFIG_JSON_VAR, e),
            }
        }

        if let Some(min_length) = int_var(vars, MIN_LENGTH_VAR) {
            if min_length > 0 {
                config.min_length = min_length as usize;
            } else {
                log::warn!("{} must be positive, got {}", MIN_LENGTH_VAR, min_length);
            }
        }

        if let Some(max_length) = int_var(vars, MAX_LENGTH_VAR) {
            if max_length >= 0 && max_length as usize >= config.min_length {
                config.max_length = max_length as usize;
            } else {
                log::warn!(
                    "{} ({}) is below the minimum length {}, ignoring",
                    MAX_LENGTH_VAR,
                    max_length,
                    config.min_length
                );
            }
        }

        if let Some(window) = int_var(vars, CONTEXT_WINDOW_VAR) {
            if window >= 0 {
                config.context_window = window as usize;
            } else {
                log::warn!("{} must not be negative, got {}", CONTEXT_WINDOW_VAR, window);
            }
        }

        if let Some(threshold) = int_var(vars, SCORE_THRESHOLD_VAR) {
            match i32::try_from(threshold) {
                Ok(threshold) => config.score_threshold = threshold,
                Err(_) => log::warn!("{} out of range: {}", SCORE_THRESHOLD_VAR, threshold),
            }
        }

        if let Some(zh) = vars.get(POSITIVE_ZH_VAR).and_then(|v| parse_keyword_list(v)) {
            config.positive_keywords.zh = zh;
        }
        if let Some(en) = vars.get(POSITIVE_EN_VAR).and_then(|v| parse_keyword_list(v)) {
            config.positive_keywords.en = en;
        }
        if let Some(negative) = vars.get(NEGATIVE_VAR).and_then(|v| parse_keyword_list(v)) {
            config.negative_keywords = negative;
        }

        config
    }

    /// Load a complete configuration from a YAML file and validate it.
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<DetectionConfig> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: DetectionConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid detection config: {}", path.display()))?;
        log::info!("Loaded detection config from: {}", path.display());
        Ok(config)
    }

    /// Like [`ConfigLoader::load_file`], falling back to defaults on error.
    pub fn load_file_or_default<P: AsRef<Path>>(path: P) -> DetectionConfig {
        match Self::load_file(&path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Failed to load detection config ({:#}), using defaults", e);
                DetectionConfig::default()
            }
        }
    }

    /// Write the built-in configuration as YAML.
    pub fn write_default<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        let yaml = serde_yaml::to_string(&DetectionConfig::default())
            .context("Failed to serialize default config")?;
        fs::write(path, yaml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }
}

fn apply_json_overrides(config: &mut DetectionConfig, overrides: &serde_json::Map<String, Value>) {
    if let Some(min_length) = json_usize(overrides, "minLength") {
        config.min_length = min_length;
    }
    if let Some(max_length) = json_usize(overrides, "maxLength") {
        config.max_length = max_length;
    }
    if let Some(window) = json_usize(overrides, "contextWindow") {
        config.context_window = window;
    }
    if let Some(threshold) = overrides.get("scoreThreshold") {
        match json_integer(threshold).and_then(|t| i32::try_from(t).ok()) {
            Some(t) => config.score_threshold = t,
            None => log::warn!("scoreThreshold override is not an integer: {}", threshold),
        }
    }

    if let Some(Value::Object(positive)) = overrides.get("positiveKeywords") {
        if let Some(zh) = positive.get("zh").and_then(json_keyword_list) {
            config.positive_keywords.zh = zh;
        }
        if let Some(en) = positive.get("en").and_then(json_keyword_list) {
            config.positive_keywords.en = en;
        }
    }
    if let Some(negative) = overrides.get("negativeKeywords").and_then(json_keyword_list) {
        config.negative_keywords = negative;
    }

    if config.min_length > config.max_length {
        log::warn!(
            "{} sets minLength {} above maxLength {}, clamping maxLength",
            CONFIG_JSON_VAR,
            config.min_length,
            config.max_length
        );
        config.max_length = config.min_length;
    }
}

fn json_usize(overrides: &serde_json::Map<String, Value>, key: &str) -> Option<usize> {
    let value = overrides.get(key)?;
    match json_integer(value).and_then(|v| usize::try_from(v).ok()) {
        Some(v) => Some(v),
        None => {
            log::warn!("{} override is not a non-negative integer: {}", key, value);
            None
        }
    }
}

/// Integral JSON number; `6` and `6.0` are both accepted, `6.5` is not.
fn json_integer(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    let f = value.as_f64()?;
    (f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64).then_some(f as i64)
}

fn json_keyword_list(value: &Value) -> Option<Vec<String>> {
    let items = value.as_array()?;
    let keywords: Vec<String> = items
        .iter()
        .filter_map(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    (!keywords.is_empty()).then_some(keywords)
}

fn int_var(vars: &HashMap<String, String>, name: &str) -> Option<i64> {
    let raw = vars.get(name)?;
    let parsed = parse_leading_int(raw);
    if parsed.is_none() {
        log::warn!("{} is not an integer: '{}'", name, raw);
    }
    parsed
}

/// Parse the leading integer of a string: `" 12px"` gives 12, `"px"` gives None.
pub fn parse_leading_int(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (sign, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (-1, &trimmed[1..]),
        Some(b'+') => (1, &trimmed[1..]),
        _ => (1, trimmed),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().ok().map(|n| sign * n)
}

/// Split a comma-separated list, trimming items and dropping empties.
pub fn parse_keyword_list(raw: &str) -> Option<Vec<String>> {
    let list: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    (!list.is_empty()).then_some(list)
}
