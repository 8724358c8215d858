/*!
 * Per-request threshold adaptation.
 *
 * The base set comes from storage (pair record, then domain record, then
 * the domain's configured seed, then the global default). Each request
 * characteristic then shifts all three thresholds upwards or downwards by a
 * bounded amount, and the result is normalized. Computing never writes.
 */

use log::debug;
use std::sync::Arc;

use super::store::ThresholdStore;
use super::{ThresholdKey, ThresholdSet};
use crate::app_config::Config;
use crate::errors::{AnalysisError, PersistenceError};

/// Texts shorter than this (in characters) count as short
const SHORT_TEXT_CHARS: usize = 50;
/// Texts longer than this (in characters) count as long
const LONG_TEXT_CHARS: usize = 500;
const SHORT_TEXT_ADJUSTMENT: f64 = 0.02;
const LONG_TEXT_ADJUSTMENT: f64 = 0.03;

/// Terminology complexity above which thresholds rise
const COMPLEXITY_PIVOT: f64 = 1.2;
/// Terminology density above which thresholds rise
const DENSITY_PIVOT: f64 = 0.2;
/// Cap on any single terminology adjustment
const TERMINOLOGY_CAP: f64 = 0.05;

const CRITICAL_TERMS_ADJUSTMENT: f64 = 0.03;
/// Critical-term count at which the full adjustment applies
const CRITICAL_TERMS_SATURATION: f64 = 3.0;

const DOMAIN_COMPLEXITY_WEIGHT: f64 = 0.05;
const COMPLEX_PAIR_ADJUSTMENT: f64 = 0.03;

/// Historical accuracy that leaves thresholds unchanged
const ACCURACY_PIVOT: f64 = 0.8;
const ACCURACY_WEIGHT: f64 = 0.1;

/// Optional signals that refine the thresholds of one request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThresholdContext {
    /// Average term length relative to a typical term (1.0 = typical)
    pub terminology_complexity: Option<f64>,
    /// Domain terms per word
    pub terminology_density: Option<f64>,
    /// Distinct critical terms in the source
    pub critical_terms_count: usize,
    /// Recent accuracy of the backend for this kind of request, in [0, 1]
    pub previous_accuracy: Option<f64>,
}

/// Computes the thresholds that apply to one request
#[derive(Debug, Clone)]
pub struct AdaptiveThresholds {
    store: Arc<dyn ThresholdStore>,
    config: Arc<Config>,
}

impl AdaptiveThresholds {
    pub fn new(store: Arc<dyn ThresholdStore>, config: Arc<Config>) -> Self {
        Self { store, config }
    }

    /// Global default thresholds
    pub fn global_default(&self) -> ThresholdSet {
        self.config.thresholds.global_default
    }

    /// Seed for a domain record that has never been written
    pub fn domain_seed(&self, domain: &str) -> ThresholdSet {
        self.config
            .domain_profile(domain)
            .and_then(|profile| profile.thresholds)
            .unwrap_or_else(|| self.global_default())
            .normalized()
    }

    /// Stored (or seeded) thresholds before per-request adjustments
    pub fn base_thresholds(
        &self,
        domain: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<ThresholdSet, PersistenceError> {
        if let Some(pair) = self.store.load(&ThresholdKey::pair(source_language, target_language))? {
            return Ok(pair);
        }
        if let Some(stored) = self.store.load(&ThresholdKey::domain(domain))? {
            return Ok(stored);
        }
        Ok(self.domain_seed(domain))
    }

    /// Thresholds for one request
    ///
    /// # Arguments
    /// * `domain` - Subject-matter domain of the text
    /// * `source_language` - Source language code
    /// * `target_language` - Target language code
    /// * `source_text` - The text being translated
    /// * `context` - Optional terminology and history signals
    ///
    /// # Returns
    /// * `Result<ThresholdSet, AnalysisError>` - A normalized set, or an error if storage could not be read
    pub fn compute(
        &self,
        domain: &str,
        source_language: &str,
        target_language: &str,
        source_text: &str,
        context: &ThresholdContext,
    ) -> Result<ThresholdSet, AnalysisError> {
        let base = self
            .base_thresholds(domain, source_language, target_language)
            .map_err(|e| AnalysisError::Thresholds(e.to_string()))?;

        let adjustment = self.total_adjustment(domain, source_language, target_language, source_text, context);
        let computed = base.shifted(adjustment).normalized();

        debug!(
            "Thresholds for {} {}->{}: base [{}] adjusted by {:+.4} -> [{}]",
            domain, source_language, target_language, base, adjustment, computed
        );

        Ok(computed)
    }

    fn total_adjustment(
        &self,
        domain: &str,
        source_language: &str,
        target_language: &str,
        source_text: &str,
        context: &ThresholdContext,
    ) -> f64 {
        let mut adjustment = length_adjustment(source_text.chars().count());

        if let Some(complexity) = context.terminology_complexity {
            if complexity > COMPLEXITY_PIVOT {
                adjustment += ((complexity - COMPLEXITY_PIVOT) * 0.05).min(TERMINOLOGY_CAP);
            }
        }

        if let Some(density) = context.terminology_density {
            if density > DENSITY_PIVOT {
                adjustment += ((density - DENSITY_PIVOT) * 0.1).min(TERMINOLOGY_CAP);
            }
        }

        if context.critical_terms_count > 0 {
            let saturation = (context.critical_terms_count as f64 / CRITICAL_TERMS_SATURATION).min(1.0);
            adjustment += CRITICAL_TERMS_ADJUSTMENT * saturation;
        }

        adjustment += (self.config.domain_complexity(domain) - 1.0) * DOMAIN_COMPLEXITY_WEIGHT;

        if self.config.is_complex_pair(source_language, target_language) {
            adjustment += COMPLEX_PAIR_ADJUSTMENT;
        }

        if let Some(accuracy) = context.previous_accuracy {
            adjustment += (ACCURACY_PIVOT - accuracy.clamp(0.0, 1.0)) * ACCURACY_WEIGHT;
        }

        adjustment
    }
}

fn length_adjustment(chars: usize) -> f64 {
    if chars < SHORT_TEXT_CHARS {
        SHORT_TEXT_ADJUSTMENT
    } else if chars > LONG_TEXT_CHARS {
        LONG_TEXT_ADJUSTMENT
    } else {
        0.0
    }
}
