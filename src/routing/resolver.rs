/*!
 * Fallback chain resolution.
 *
 * Picks a primary backend for a request and orders one representative of
 * each other family behind it. Resolution never fails: unknown families and
 * domains degrade to the configured defaults, and a request no backend
 * covers still gets a single best-guess candidate.
 */

use log::{debug, warn};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::{CandidateList, ResolutionRequest};
use crate::app_config::Config;
use crate::performance::PerformanceTracker;
use crate::providers::{BackendDescriptor, BackendFamily, ProviderCatalog};

/// Builds ordered candidate lists
#[derive(Debug, Clone)]
pub struct FallbackChainResolver {
    catalog: Arc<ProviderCatalog>,
    config: Arc<Config>,
    tracker: Arc<PerformanceTracker>,
}

impl FallbackChainResolver {
    pub fn new(catalog: Arc<ProviderCatalog>, config: Arc<Config>, tracker: Arc<PerformanceTracker>) -> Self {
        Self {
            catalog,
            config,
            tracker,
        }
    }

    /// Ordered backends to attempt for a request
    ///
    /// # Arguments
    /// * `request` - Languages, domain and optional preferences
    ///
    /// # Returns
    /// * `CandidateList` - Never empty, at most `routing.max_attempts` long
    pub fn resolve(&self, request: &ResolutionRequest) -> CandidateList {
        let policy = &self.config.routing;
        let order = self.fallback_order(request);
        let primary = self.select_primary(request, &order);
        let mut candidates = CandidateList::new(Arc::clone(&primary));

        if !policy.enable_fallback {
            debug!("Fallback disabled; routing {} to {} only", request.domain, primary.id);
            return candidates;
        }

        for family in order {
            if candidates.len() >= policy.max_attempts {
                break;
            }
            if family == primary.family {
                continue;
            }
            match self.representative(family, request) {
                Some(backend) => candidates.push_fallback(backend),
                None => debug!(
                    "Skipping {}: no member covers {}->{}",
                    family, request.source_language, request.target_language
                ),
            }
        }
        candidates.truncate(policy.max_attempts);

        debug!(
            "Resolved {} {}->{} to {:?}",
            request.domain,
            request.source_language,
            request.target_language,
            candidates.backend_ids()
        );
        candidates
    }

    fn representative(&self, family: BackendFamily, request: &ResolutionRequest) -> Option<Arc<BackendDescriptor>> {
        self.catalog
            .representative(family, &request.source_language, &request.target_language)
    }

    fn select_primary(&self, request: &ResolutionRequest, order: &[BackendFamily]) -> Arc<BackendDescriptor> {
        if let Some(name) = &request.preferred_family {
            match name.parse::<BackendFamily>() {
                Ok(family) => match self.representative(family, request) {
                    Some(backend) => return backend,
                    None => debug!(
                        "Preferred family {} has no member covering {}->{}",
                        family, request.source_language, request.target_language
                    ),
                },
                Err(e) => warn!("{}; ignoring the preference", e),
            }
        }

        let heuristic = self.heuristic_family(request);
        if let Some(backend) = self.representative(heuristic, request) {
            return backend;
        }

        // every backend belongs to one of ALL, so this finds any covering backend
        for family in order.iter().copied().chain(BackendFamily::ALL) {
            if let Some(backend) = self.representative(family, request) {
                return backend;
            }
        }

        warn!(
            "No backend covers {}->{}; falling back to a best guess",
            request.source_language, request.target_language
        );
        self.catalog
            .first_member(heuristic)
            .unwrap_or_else(|| self.catalog.default_backend())
    }

    /// Domain override, then language group, then the default family
    fn heuristic_family(&self, request: &ResolutionRequest) -> BackendFamily {
        match self.config.domain_profile(&request.domain) {
            Some(profile) => {
                if let Some(family) = profile.preferred_family {
                    return family;
                }
            }
            None => warn!("Unknown domain {}; using generic routing", request.domain),
        }

        self.config
            .language_group_for(&request.source_language, &request.target_language)
            .and_then(|group| group.preferred_family)
            .unwrap_or(self.config.routing.default_family)
    }

    /// Fallback family order; each applicable rule replaces the previous one
    fn fallback_order(&self, request: &ResolutionRequest) -> Vec<BackendFamily> {
        let policy = &self.config.routing;
        let mut order = policy.default_fallback_order.clone();

        if let Some(domain_order) = self
            .config
            .domain_profile(&request.domain)
            .and_then(|profile| profile.fallback_order.as_ref())
        {
            order = domain_order.clone();
        }

        if let Some(group_order) = self
            .config
            .language_group_for(&request.source_language, &request.target_language)
            .and_then(|group| group.fallback_order.as_ref())
        {
            order = group_order.clone();
        }

        if policy.cost_optimization {
            order = self.cost_optimized_order(request);
        }

        if policy.performance_optimization {
            if let Some(performance_order) = self.performance_optimized_order(request) {
                order = performance_order;
            }
        }

        dedup_families(order)
    }

    /// Families covering the pair, cheapest representative first
    fn cost_optimized_order(&self, request: &ResolutionRequest) -> Vec<BackendFamily> {
        let mut priced: Vec<(BackendFamily, _)> = BackendFamily::ALL
            .into_iter()
            .filter_map(|family| {
                self.representative(family, request)
                    .map(|backend| (family, backend.cost_tier))
            })
            .collect();
        priced.sort_by_key(|(_, tier)| *tier);
        priced.into_iter().map(|(family, _)| family).collect()
    }

    /// Families covering the pair, best-rated representative first.
    ///
    /// `None` until the tracker has seen enough calls to the catalog.
    fn performance_optimized_order(&self, request: &ResolutionRequest) -> Option<Vec<BackendFamily>> {
        let ratings: HashMap<String, (usize, Option<f64>)> = self
            .tracker
            .snapshot()
            .into_iter()
            .map(|summary| (summary.backend_id, (summary.calls, summary.performance_rating)))
            .collect();

        let observed: usize = self
            .catalog
            .iter()
            .filter_map(|backend| ratings.get(&backend.id))
            .map(|(calls, _)| calls)
            .sum();
        if observed < self.config.routing.min_performance_samples {
            debug!(
                "Only {} calls observed; performance ordering needs {}",
                observed, self.config.routing.min_performance_samples
            );
            return None;
        }

        let mut rated: Vec<(BackendFamily, f64)> = BackendFamily::ALL
            .into_iter()
            .filter_map(|family| {
                self.representative(family, request).map(|backend| {
                    // unrated backends sort last
                    let rating = ratings
                        .get(&backend.id)
                        .and_then(|(_, rating)| *rating)
                        .unwrap_or(f64::NEG_INFINITY);
                    (family, rating)
                })
            })
            .collect();
        rated.sort_by(|a, b| b.1.total_cmp(&a.1));
        Some(rated.into_iter().map(|(family, _)| family).collect())
    }
}

fn dedup_families(order: Vec<BackendFamily>) -> Vec<BackendFamily> {
    let mut seen = HashSet::new();
    order.into_iter().filter(|family| seen.insert(*family)).collect()
}
