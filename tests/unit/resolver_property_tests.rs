/*!
 * Properties of the fallback chain resolver over every language pair and domain
 */

use std::collections::HashSet;
use std::sync::Arc;

use medroute::app_config::Config;
use medroute::performance::{MetricSample, PerformanceTracker};
use medroute::providers::{BackendFamily, ProviderCatalog};
use medroute::routing::{FallbackChainResolver, ResolutionRequest};

use crate::common::{self, LANGUAGES};

fn resolver_for(config: Config) -> (Arc<ProviderCatalog>, FallbackChainResolver) {
    let catalog = Arc::new(ProviderCatalog::from_config(&config).unwrap());
    let tracker = Arc::new(PerformanceTracker::new());
    // enough traffic for performance ordering to engage when enabled
    for (index, backend) in catalog.iter().enumerate() {
        for _ in 0..5 {
            tracker.record(&backend.id, MetricSample::success(500.0 * (index + 1) as f64));
        }
    }
    let resolver = FallbackChainResolver::new(catalog.clone(), Arc::new(config), tracker);
    (catalog, resolver)
}

fn policies() -> Vec<(&'static str, Config)> {
    let mut cost = Config::default();
    cost.routing.cost_optimization = true;

    let mut performance = Config::default();
    performance.routing.performance_optimization = true;

    let mut single = Config::default();
    single.routing.enable_fallback = false;

    let mut wide = Config::default();
    wide.routing.max_attempts = 5;

    vec![
        ("default", Config::default()),
        ("cost", cost),
        ("performance", performance),
        ("single", single),
        ("wide", wide),
    ]
}

#[test]
fn test_resolve_forEveryRequest_shouldRespectLengthAndCoverage() {
    for (name, config) in policies() {
        let max_attempts = config.routing.max_attempts;
        let domains = common::domains(&config);
        let (catalog, resolver) = resolver_for(config);

        for source in LANGUAGES {
            for target in LANGUAGES {
                for domain in &domains {
                    let request = ResolutionRequest::new(source, target, domain);
                    let candidates = resolver.resolve(&request);

                    assert!(!candidates.is_empty());
                    assert!(candidates.len() <= max_attempts, "{}: {:?}", name, candidates.backend_ids());
                    assert!(candidates.primary().is_primary());

                    let covered = catalog.iter().any(|b| b.supports_pair(source, target));
                    if covered {
                        for candidate in &candidates {
                            assert!(
                                candidate.backend.supports_pair(source, target),
                                "{} {}->{} {}: {} lacks the pair",
                                name,
                                source,
                                target,
                                domain,
                                candidate.backend.id
                            );
                        }
                    } else {
                        assert_eq!(candidates.len(), 1, "{} {}->{}", name, source, target);
                    }

                    let families: HashSet<BackendFamily> = candidates.iter().map(|c| c.backend.family).collect();
                    assert_eq!(families.len(), candidates.len(), "a family appears twice");
                }
            }
        }
    }
}

#[test]
fn test_resolve_shouldBeDeterministic() {
    let (_, resolver) = resolver_for(Config::default());
    for domain in ["cardiology", "general", "astrology"] {
        let request = ResolutionRequest::new("en", "de", domain).with_term_hints(&["stent"]);
        assert_eq!(resolver.resolve(&request), resolver.resolve(&request));
    }
}

#[test]
fn test_resolve_withEachPreferredFamily_shouldPutItFirstWhenItCoversThePair() {
    let (catalog, resolver) = resolver_for(Config::default());
    for family in BackendFamily::ALL {
        let request = ResolutionRequest::new("en", "es", "cardiology").with_preferred_family(family.as_str());
        let candidates = resolver.resolve(&request);

        if catalog.family_supports_pair(family, "en", "es") {
            assert_eq!(candidates.primary().backend.family, family);
        }
    }
}

#[test]
fn test_resolve_withPreferredFamilyLackingPair_shouldUseHeuristic() {
    let (_, resolver) = resolver_for(Config::default());
    let request = ResolutionRequest::new("en", "ja", "cardiology").with_preferred_family("glossary");
    assert_eq!(resolver.resolve(&request).primary().backend.id, "claude-3-sonnet");
}
