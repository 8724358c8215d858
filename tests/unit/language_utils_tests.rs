/*!
 * Tests for language utility functions
 */

use medroute::language_utils::{canonical_code, normalize_to_part1_or_part2t, pair_key, validate_language_code};
use medroute::routing::ResolutionRequest;
use medroute::thresholds::ThresholdKey;

use crate::common;

/// Test normalization of language codes without an ISO 639-1 form
#[test]
fn test_normalize_withPart2OnlyLanguage_shouldKeepThreeLetters() {
    assert_eq!(normalize_to_part1_or_part2t("haw").unwrap(), "haw");
    assert_eq!(normalize_to_part1_or_part2t("ger").unwrap(), "de");
    assert!(normalize_to_part1_or_part2t("xx").is_err());
}

/// Every supported spelling of a language should land on the same key
#[test]
fn test_canonicalForms_shouldAgreeAcrossComponents() {
    let request = ResolutionRequest::new("ENG", "spa", "Cardiology");
    assert_eq!(request.source_language, "en");
    assert_eq!(request.target_language, "es");
    assert_eq!(request.domain, "cardiology");

    assert_eq!(ThresholdKey::pair("eng", "spa"), ThresholdKey::pair("en", "es"));
    assert_eq!(pair_key("zho", "eng"), "zh-en");
}

#[test]
fn test_resolve_withThreeLetterCodes_shouldMatchTwoLetterCatalog() {
    let controller = common::memory_controller();
    let short = controller.resolve(&ResolutionRequest::new("en", "fr", "cardiology"));
    let long = controller.resolve(&ResolutionRequest::new("eng", "fre", "cardiology"));
    assert_eq!(short.backend_ids(), long.backend_ids());
}

#[test]
fn test_defaultCatalogLanguages_shouldAllValidate() {
    let config = medroute::Config::default();
    for backend in &config.catalog {
        for code in &backend.languages {
            assert!(validate_language_code(code).is_ok(), "{} lists {}", backend.id, code);
            assert_eq!(&canonical_code(code), code);
        }
    }
}
