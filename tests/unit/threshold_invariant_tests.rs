/*!
 * Randomized checks of the threshold ordering invariant
 */

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

use medroute::app_config::Config;
use medroute::thresholds::{
    AdaptiveThresholds, ConfidenceLevel, FeedbackIssue, FeedbackLoop, InMemoryThresholdStore, ThresholdContext,
    ThresholdKey, ThresholdSet, ThresholdStore, UserFeedback,
};

const LEVELS: [ConfidenceLevel; 4] = [
    ConfidenceLevel::High,
    ConfidenceLevel::Medium,
    ConfidenceLevel::Low,
    ConfidenceLevel::Insufficient,
];

const ISSUES: [FeedbackIssue; 3] = [FeedbackIssue::Terminology, FeedbackIssue::Meaning, FeedbackIssue::Fluency];

fn assert_valid(set: &ThresholdSet) {
    assert!(set.is_ordered(), "unordered thresholds: {}", set);
    for value in [set.high, set.medium, set.low] {
        assert!((0.0..=1.0).contains(&value), "out of range: {}", set);
    }
}

fn random_text(rng: &mut StdRng) -> String {
    let words = rng.random_range(0..150);
    (0..words).map(|_| "edema").collect::<Vec<_>>().join(" ")
}

#[test]
fn test_normalized_withRandomTriples_shouldAlwaysBeOrdered() {
    let mut rng = StdRng::seed_from_u64(17);
    for _ in 0..5_000 {
        let raw = ThresholdSet::new(
            rng.random_range(-0.5..1.5),
            rng.random_range(-0.5..1.5),
            rng.random_range(-0.5..1.5),
        );
        assert_valid(&raw.normalized());
    }
}

#[test]
fn test_compute_withRandomContexts_shouldAlwaysBeOrdered() {
    let mut rng = StdRng::seed_from_u64(42);
    let config = Arc::new(Config::default());
    let store = Arc::new(InMemoryThresholdStore::new());
    let thresholds = AdaptiveThresholds::new(store.clone(), config.clone());
    let domains: Vec<String> = config.domains.keys().cloned().collect();

    for round in 0..2_000 {
        if round % 50 == 0 {
            let stored = ThresholdSet::new(rng.random(), rng.random(), rng.random()).normalized();
            store.put(ThresholdKey::pair("en", "zh"), stored);
        }

        let domain = &domains[rng.random_range(0..domains.len())];
        let target = if rng.random_bool(0.5) { "zh" } else { "es" };
        let context = ThresholdContext {
            terminology_complexity: rng.random_bool(0.7).then(|| rng.random_range(0.0..4.0)),
            terminology_density: rng.random_bool(0.7).then(|| rng.random_range(0.0..1.0)),
            critical_terms_count: rng.random_range(0..10),
            previous_accuracy: rng.random_bool(0.5).then(|| rng.random_range(0.0..1.0)),
        };

        let set = thresholds
            .compute(domain, "en", target, &random_text(&mut rng), &context)
            .unwrap();
        assert_valid(&set);
    }
}

#[test]
fn test_feedbackSequence_shouldKeepStoredSetsOrdered() {
    let mut rng = StdRng::seed_from_u64(7);
    let config = Arc::new(Config::default());
    let store = Arc::new(InMemoryThresholdStore::new());
    let thresholds = Arc::new(AdaptiveThresholds::new(store.clone(), config));
    let feedback_loop = FeedbackLoop::new(store.clone(), thresholds.clone());

    for _ in 0..1_000 {
        let mut feedback = UserFeedback::new(rng.random_range(1..=5));
        for issue in ISSUES {
            if rng.random_bool(0.3) {
                feedback = feedback.with_issue(issue);
            }
        }
        let level = LEVELS[rng.random_range(0..LEVELS.len())];
        let domain = if rng.random_bool(0.5) { "cardiology" } else { "general" };

        let outcome = feedback_loop.apply(domain, "en", "ja", level, &feedback).unwrap();
        assert_valid(&outcome.domain_thresholds);
        assert_valid(&outcome.pair_thresholds);
    }

    for (_, set) in store.list().unwrap() {
        assert_valid(&set);
    }

    let computed = thresholds
        .compute("cardiology", "en", "ja", "Chest pain.", &ThresholdContext::default())
        .unwrap();
    assert_valid(&computed);
}
