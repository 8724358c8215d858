/*!
 * Tests for confidence scoring through the controller
 */

use medroute::confidence::FactorImpact;
use medroute::thresholds::{ConfidenceLevel, ThresholdContext, ThresholdSet};

use crate::common::{self, CARDIOLOGY_FAITHFUL, CARDIOLOGY_LOSSY, CARDIOLOGY_SOURCE};

#[test]
fn test_assess_withTwoOfThreeCriticalTermsLost_shouldScoreStrictlyLower() {
    let controller = common::memory_controller();

    let faithful = controller.assess(
        CARDIOLOGY_SOURCE,
        CARDIOLOGY_FAITHFUL,
        "en",
        "es",
        "cardiology",
        "claude-3-sonnet",
    );
    let lossy = controller.assess(CARDIOLOGY_SOURCE, CARDIOLOGY_LOSSY, "en", "es", "cardiology", "claude-3-sonnet");

    assert!(lossy.score < faithful.score);
    let critical = lossy.factor("critical_terms_preservation").unwrap();
    assert_eq!(critical.impact, FactorImpact::Negative);
    assert!(critical.adjustment < 0.0);
    assert!(critical.adjustment >= -0.15);
}

#[test]
fn test_assess_shouldCarryTheThresholdsUsed() {
    let controller = common::memory_controller();
    let assessment = controller.assess(
        CARDIOLOGY_SOURCE,
        CARDIOLOGY_FAITHFUL,
        "en",
        "es",
        "cardiology",
        "claude-3-sonnet",
    );

    assert!(assessment.thresholds.is_ordered());
    assert_eq!(assessment.level, assessment.thresholds.level_for(assessment.score));
    assert!((0.0..=1.0).contains(&assessment.score));
}

#[test]
fn test_assess_withIdenticalInputs_shouldBeDeterministic() {
    let controller = common::memory_controller();
    let first = controller.assess(CARDIOLOGY_SOURCE, CARDIOLOGY_LOSSY, "en", "es", "cardiology", "llama-3-70b");
    let second = controller.assess(CARDIOLOGY_SOURCE, CARDIOLOGY_LOSSY, "en", "es", "cardiology", "llama-3-70b");
    assert_eq!(first, second);
}

#[test]
fn test_computeThresholds_forUninitializedGeneralDomain_shouldReturnGlobalDefault() {
    let controller = common::memory_controller();
    // 50..=500 characters falls in the neutral length bucket
    let text = "Please take the prescribed tablets with a full glass of water every morning.";

    let thresholds = controller
        .compute_thresholds("general", "en", "es", text, &ThresholdContext::default())
        .unwrap();

    assert_eq!(thresholds, ThresholdSet::new(0.90, 0.75, 0.60));
}

#[test]
fn test_computeThresholds_calledTwice_shouldBeIdempotent() {
    let controller = common::memory_controller();
    let context = ThresholdContext {
        terminology_complexity: Some(1.6),
        terminology_density: Some(0.3),
        critical_terms_count: 2,
        previous_accuracy: Some(0.7),
    };

    let first = controller
        .compute_thresholds("oncology", "en", "zh", CARDIOLOGY_SOURCE, &context)
        .unwrap();
    let second = controller
        .compute_thresholds("oncology", "en", "zh", CARDIOLOGY_SOURCE, &context)
        .unwrap();

    assert_eq!(first, second);
    assert!(first.high > 0.93);
}

#[test]
fn test_assess_withWeakFamilyInComplexDomain_shouldDropLevel() {
    let controller = common::memory_controller();
    let text = "Schedule the next chemotherapy cycle after the blood tests.";
    let output = "Programe el próximo ciclo de quimioterapia después de los análisis de sangre.";

    let glossary = controller.assess(text, output, "en", "es", "oncology", "glossary-offline");
    assert_ne!(glossary.level, ConfidenceLevel::High);
}

#[test]
fn test_assess_withCustomCriticalTermKeptVerbatim_shouldNotPenalize() {
    let mut config = medroute::Config::default();
    config
        .domains
        .get_mut("cardiology")
        .unwrap()
        .critical_terms
        .push("stent".to_string());
    let controller = medroute::Controller::in_memory(config).unwrap();

    let kept = controller.assess("A stent was placed.", "Se colocó un stent.", "en", "es", "cardiology", "claude-3-sonnet");
    assert!(kept.factor("critical_terms_preservation").is_none());

    let dropped = controller.assess(
        "A stent was placed.",
        "Se colocó un dispositivo.",
        "en",
        "es",
        "cardiology",
        "claude-3-sonnet",
    );
    let critical = dropped.factor("critical_terms_preservation").unwrap();
    assert_eq!(critical.impact, FactorImpact::Negative);
}
