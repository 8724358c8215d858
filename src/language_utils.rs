use anyhow::{Result, anyhow};
use isolang::Language;

/// Language utilities for ISO language code handling
///
/// Catalog coverage, language-group rules, threshold keys and requests may
/// spell the same language as `es`, `spa` or `ES`; everything is compared in
/// the canonical form produced by [`canonical_code`].

/// ISO 639-2/B codes that differ from their ISO 639-2/T counterpart
const BIBLIOGRAPHIC_CODES: &[(&str, &str)] = &[
    ("fre", "fra"),
    ("ger", "deu"),
    ("dut", "nld"),
    ("gre", "ell"),
    ("chi", "zho"),
    ("cze", "ces"),
    ("ice", "isl"),
    ("alb", "sqi"),
    ("arm", "hye"),
    ("baq", "eus"),
    ("bur", "mya"),
    ("per", "fas"),
    ("geo", "kat"),
    ("may", "msa"),
    ("mac", "mkd"),
    ("rum", "ron"),
    ("slo", "slk"),
    ("wel", "cym"),
];

fn terminological(code: &str) -> &str {
    BIBLIOGRAPHIC_CODES
        .iter()
        .find(|(bibliographic, _)| *bibliographic == code)
        .map(|(_, terminological)| *terminological)
        .unwrap_or(code)
}

/// Resolve a 2- or 3-letter code to a language
fn lookup(code: &str) -> Option<Language> {
    let normalized_code = code.trim().to_lowercase();
    match normalized_code.len() {
        2 => Language::from_639_1(&normalized_code),
        3 => Language::from_639_3(terminological(&normalized_code)),
        _ => None,
    }
}

/// Validate that a code is a known ISO 639-1 or ISO 639-2 language code
pub fn validate_language_code(code: &str) -> Result<()> {
    lookup(code)
        .map(|_| ())
        .ok_or_else(|| anyhow!("Invalid language code: {}", code))
}

/// Normalize a language code to ISO 639-1 (2-letter) format if possible
/// Falls back to ISO 639-2/T if no ISO 639-1 code exists
pub fn normalize_to_part1_or_part2t(code: &str) -> Result<String> {
    let lang = lookup(code).ok_or_else(|| anyhow!("Cannot normalize invalid language code: {}", code))?;

    match lang.to_639_1() {
        Some(part1) => Ok(part1.to_string()),
        None => Ok(lang.to_639_3().to_string()),
    }
}

/// Canonical form used for every comparison inside the router.
///
/// Unknown codes are kept (trimmed, lowercased) so that private-use tags
/// configured by operators still compare equal to themselves.
pub fn canonical_code(code: &str) -> String {
    normalize_to_part1_or_part2t(code).unwrap_or_else(|_| code.trim().to_lowercase())
}

/// Check if two language codes match (represent the same language)
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    match (lookup(code1), lookup(code2)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Get the English language name from a code, or the code itself if unknown
pub fn display_name(code: &str) -> String {
    lookup(code)
        .map(|lang| lang.to_name().to_string())
        .unwrap_or_else(|| code.trim().to_string())
}

/// Storage key of a language pair (`en-es`)
pub fn pair_key(source_language: &str, target_language: &str) -> String {
    format!("{}-{}", canonical_code(source_language), canonical_code(target_language))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalCode_withThreeLetterCodes_shouldPreferPart1() {
        assert_eq!(canonical_code("spa"), "es");
        assert_eq!(canonical_code("fre"), "fr");
        assert_eq!(canonical_code(" EN "), "en");
    }

    #[test]
    fn test_canonicalCode_withUnknownCode_shouldKeepLowercased() {
        assert_eq!(canonical_code("X-Custom"), "x-custom");
    }

    #[test]
    fn test_languageCodesMatch_acrossForms_shouldMatch() {
        assert!(language_codes_match("de", "ger"));
        assert!(language_codes_match("deu", "DE"));
        assert!(!language_codes_match("de", "fr"));
        assert!(!language_codes_match("zz", "zz"));
    }

    #[test]
    fn test_pairKey_shouldUseCanonicalCodes() {
        assert_eq!(pair_key("eng", "SPA"), "en-es");
    }

    #[test]
    fn test_displayName_shouldReturnEnglishName() {
        assert_eq!(display_name("ja"), "Japanese");
        assert_eq!(display_name("qq"), "qq");
    }

    #[test]
    fn test_validateLanguageCode_shouldRejectGarbage() {
        assert!(validate_language_code("en").is_ok());
        assert!(validate_language_code("chi").is_ok());
        assert!(validate_language_code("english").is_err());
    }
}
