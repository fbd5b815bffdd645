//! Subtitle track language detection against the bundled ISO 639-2 table.

use serde::Deserialize;
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::warn;

/// Markers that sit next to a language tag but are not languages.
const NON_LANGUAGE_TAGS: &[&str] = &["forced", "sdh", "cc", "hi"];

#[derive(Debug, Deserialize)]
struct LanguageInfo {
    name: String,
}

#[derive(Debug, Deserialize)]
struct LanguageTable {
    codes: HashMap<String, LanguageInfo>,
    common_two_letter_codes: HashMap<String, String>,
}

static LANGUAGES: LazyLock<LanguageTable> = LazyLock::new(|| {
    serde_json::from_str(include_str!("../../data/language_codes.json"))
        .expect("Invalid bundled language table")
});

/// Three-letter code for `code`, accepting either a three- or two-letter form.
pub fn normalize_language_code(code: &str) -> Option<String> {
    let code = code.trim().to_lowercase();
    if code.is_empty() {
        return None;
    }
    if LANGUAGES.codes.contains_key(&code) {
        return Some(code);
    }
    LANGUAGES.common_two_letter_codes.get(&code).cloned()
}

pub fn language_name(code: &str) -> Option<&'static str> {
    LANGUAGES.codes.get(code).map(|info| info.name.as_str())
}

/// Looks at the last three dot-separated parts of the name before the
/// extension, nearest first.
pub fn detect_language_from_filename(filename: &str) -> Option<String> {
    let stem = filename.rsplit_once('.').map_or(filename, |(stem, _)| stem);
    let parts: Vec<&str> = stem.split('.').collect();
    parts
        .iter()
        .rev()
        .take(3)
        .map(|part| part.trim().to_lowercase())
        .filter(|part| !NON_LANGUAGE_TAGS.contains(&part.as_str()))
        .find_map(|part| normalize_language_code(&part))
}

/// Filename first, then the configured code, else no language.
pub fn detect_language(filename: &str, configured: Option<&str>) -> Option<String> {
    if let Some(code) = detect_language_from_filename(filename) {
        return Some(code);
    }
    let configured = configured?;
    let normalized = normalize_language_code(configured);
    if normalized.is_none() {
        warn!(code = configured, "ignoring invalid language code from config");
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_language_code() {
        assert_eq!(normalize_language_code("ARA").as_deref(), Some("ara"));
        assert_eq!(normalize_language_code("ar").as_deref(), Some("ara"));
        assert_eq!(normalize_language_code("de").as_deref(), Some("ger"));
        assert_eq!(normalize_language_code("xx"), None);
        assert_eq!(normalize_language_code(""), None);
        assert_eq!(language_name("eng"), Some("English"));
    }

    #[test]
    fn test_detect_from_filename() {
        assert_eq!(detect_language_from_filename("Show.S01E01.ar.srt").as_deref(), Some("ara"));
        assert_eq!(
            detect_language_from_filename("Show.S01E01.en.forced.srt").as_deref(),
            Some("eng")
        );
        assert_eq!(detect_language_from_filename("Show.S01E01.fre.sdh.ass").as_deref(), Some("fre"));
        assert_eq!(detect_language_from_filename("Show.S01E01.srt"), None);
    }

    #[test]
    fn test_only_last_three_parts_are_checked() {
        assert_eq!(detect_language_from_filename("ar.Show.S01E01.x264.srt"), None);
    }

    #[test]
    fn test_config_fallback() {
        assert_eq!(detect_language("Show.S01E01.srt", Some("ar")).as_deref(), Some("ara"));
        assert_eq!(detect_language("Show.S01E01.en.srt", Some("ar")).as_deref(), Some("eng"));
        assert_eq!(detect_language("Show.S01E01.srt", Some("klingon")), None);
        assert_eq!(detect_language("Show.S01E01.srt", None), None);
    }
}
