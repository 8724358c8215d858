/*!
 * Confidence analyzer.
 *
 * Scores a produced translation against its source. The score is the
 * producing family's prior plus the sum of every signal's adjustment,
 * clamped to [0, 1] only at the end. The level comes from the adaptive
 * thresholds for the request. If any signal fails, the assessment fails
 * open to a high-confidence default rather than blocking the translation.
 */

use log::{debug, warn};
use std::sync::Arc;

use super::terms::{TermExtractor, TermStats};
use super::{ConfidenceAssessment, ConfidenceFactor};
use crate::app_config::Config;
use crate::errors::AnalysisError;
use crate::providers::{BackendFamily, ProviderCatalog};
use crate::thresholds::{AdaptiveThresholds, ThresholdContext};

/// Prior for a backend the catalog does not know
const UNKNOWN_BACKEND_BASELINE: f64 = 0.70;

/// Output must keep at least this share of the source's term count
const TERM_RETENTION_FLOOR: f64 = 0.7;
const TERMINOLOGY_WEIGHT: f64 = 0.10;

const CRITICAL_TERMS_WEIGHT: f64 = 0.15;

const MIN_LENGTH_RATIO: f64 = 0.7;
const MAX_LENGTH_RATIO: f64 = 1.5;
const LENGTH_RATIO_WEIGHT: f64 = 0.10;

/// Domain complexity above which the family's strength matters
const COMPLEX_DOMAIN_PIVOT: f64 = 1.2;
const COMPLEX_DOMAIN_BONUS: f64 = 0.05;
const COMPLEX_DOMAIN_WEIGHT: f64 = 0.05;

/// Typical medical term length in characters, used to express complexity
const REFERENCE_TERM_LENGTH: f64 = 8.0;

/// Scores translations and assigns confidence levels
#[derive(Debug, Clone)]
pub struct ConfidenceAnalyzer {
    catalog: Arc<ProviderCatalog>,
    thresholds: Arc<AdaptiveThresholds>,
    extractor: Arc<dyn TermExtractor>,
    config: Arc<Config>,
}

impl ConfidenceAnalyzer {
    pub fn new(
        catalog: Arc<ProviderCatalog>,
        thresholds: Arc<AdaptiveThresholds>,
        extractor: Arc<dyn TermExtractor>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            catalog,
            thresholds,
            extractor,
            config,
        }
    }

    /// Assess one translation; never fails
    ///
    /// # Arguments
    /// * `source_text` - Text that was translated
    /// * `produced_text` - Translation returned by the backend
    /// * `source_language` - Source language code
    /// * `target_language` - Target language code
    /// * `domain` - Subject-matter domain
    /// * `backend_id` - Backend that produced the translation
    ///
    /// # Returns
    /// * `ConfidenceAssessment` - Score, level, factors and the thresholds used
    pub fn assess(
        &self,
        source_text: &str,
        produced_text: &str,
        source_language: &str,
        target_language: &str,
        domain: &str,
        backend_id: &str,
    ) -> ConfidenceAssessment {
        match self.try_assess(
            source_text,
            produced_text,
            source_language,
            target_language,
            domain,
            backend_id,
        ) {
            Ok(assessment) => assessment,
            Err(e) => {
                warn!(
                    "Confidence analysis for {} ({} {}->{}) failed open: {}",
                    backend_id, domain, source_language, target_language, e
                );
                ConfidenceAssessment::analysis_error(&e.to_string(), self.thresholds.global_default())
            }
        }
    }

    /// Assess one translation, reporting signal failures to the caller
    pub fn try_assess(
        &self,
        source_text: &str,
        produced_text: &str,
        source_language: &str,
        target_language: &str,
        domain: &str,
        backend_id: &str,
    ) -> Result<ConfidenceAssessment, AnalysisError> {
        let family = match self.catalog.describe(backend_id) {
            Ok(backend) => Some(backend.family),
            Err(e) => {
                warn!("{}; using the generic baseline", e);
                None
            }
        };

        let mut factors = vec![baseline_factor(family)];

        let source_terms = if self.extractor.supports_language(source_language)
            && self.extractor.supports_language(target_language)
        {
            let source_terms = self.extractor.extract_terms(source_text, source_language, domain)?;
            let output_terms = self.extractor.extract_terms(produced_text, target_language, domain)?;
            factors.extend(terminology_factor(&source_terms, &output_terms));
            factors.extend(critical_terms_factor(&source_terms, &output_terms));
            Some(source_terms)
        } else {
            factors.push(ConfidenceFactor::neutral(
                "terminology_unchecked",
                format!(
                    "No terminology vocabulary for {}->{}",
                    source_language, target_language
                ),
            ));
            None
        };

        factors.extend(length_ratio_factor(source_text, produced_text));
        factors.extend(domain_complexity_factor(
            self.config.domain_complexity(domain),
            family.is_some_and(|f| f.handles_complex_domains()),
        ));

        let raw: f64 = factors.iter().map(|factor| factor.adjustment).sum();
        let score = raw.clamp(0.0, 1.0);

        let context = threshold_context(source_terms.as_ref());
        let thresholds =
            self.thresholds
                .compute(domain, source_language, target_language, source_text, &context)?;
        let level = thresholds.level_for(score);

        debug!(
            "Assessed {} output for {} {}->{}: score {:.3} ({}), {} factors",
            backend_id,
            domain,
            source_language,
            target_language,
            score,
            level,
            factors.len()
        );

        Ok(ConfidenceAssessment {
            score,
            level,
            factors,
            thresholds,
        })
    }
}

fn baseline_factor(family: Option<BackendFamily>) -> ConfidenceFactor {
    match family {
        Some(family) => ConfidenceFactor::new(
            "model_baseline",
            family.baseline_confidence(),
            format!("Prior confidence of the {} family", family),
        ),
        None => ConfidenceFactor::new(
            "model_baseline",
            UNKNOWN_BACKEND_BASELINE,
            "Prior confidence of an unknown backend".to_string(),
        ),
    }
}

fn terminology_factor(source: &TermStats, output: &TermStats) -> Option<ConfidenceFactor> {
    if source.count == 0 {
        return None;
    }
    let retention = output.count as f64 / source.count as f64;
    if retention >= TERM_RETENTION_FLOOR {
        return None;
    }
    let shortfall = (TERM_RETENTION_FLOOR - retention) / TERM_RETENTION_FLOOR;
    Some(ConfidenceFactor::new(
        "terminology_preservation",
        -TERMINOLOGY_WEIGHT * shortfall,
        format!(
            "Output keeps {} of {} domain terms ({:.0}%)",
            output.count,
            source.count,
            retention * 100.0
        ),
    ))
}

fn critical_terms_factor(source: &TermStats, output: &TermStats) -> Option<ConfidenceFactor> {
    if source.critical_terms.is_empty() {
        return None;
    }
    let missing: Vec<&str> = source
        .critical_terms
        .difference(&output.critical_terms)
        .map(String::as_str)
        .collect();
    if missing.is_empty() {
        return None;
    }
    let lost_fraction = missing.len() as f64 / source.critical_count() as f64;
    Some(ConfidenceFactor::new(
        "critical_terms_preservation",
        -CRITICAL_TERMS_WEIGHT * (0.5 + 0.5 * lost_fraction),
        format!("Critical terms missing from output: {}", missing.join(", ")),
    ))
}

fn length_ratio_factor(source_text: &str, produced_text: &str) -> Option<ConfidenceFactor> {
    let source_words = source_text.split_whitespace().count();
    if source_words == 0 {
        return None;
    }
    let ratio = produced_text.split_whitespace().count() as f64 / source_words as f64;

    let severity = if ratio < MIN_LENGTH_RATIO {
        ((MIN_LENGTH_RATIO - ratio) / MIN_LENGTH_RATIO).min(1.0)
    } else if ratio > MAX_LENGTH_RATIO {
        ((ratio - MAX_LENGTH_RATIO) / MAX_LENGTH_RATIO).min(1.0)
    } else {
        return None;
    };

    Some(ConfidenceFactor::new(
        "length_ratio",
        -LENGTH_RATIO_WEIGHT * severity,
        format!("Output/source word ratio {:.2} is outside [0.70, 1.50]", ratio),
    ))
}

fn domain_complexity_factor(complexity: f64, handles_complex: bool) -> Option<ConfidenceFactor> {
    if complexity <= COMPLEX_DOMAIN_PIVOT {
        return None;
    }
    if handles_complex {
        Some(ConfidenceFactor::new(
            "domain_complexity",
            COMPLEX_DOMAIN_BONUS,
            format!("Backend handles complex domains (complexity {:.1})", complexity),
        ))
    } else {
        Some(ConfidenceFactor::new(
            "domain_complexity",
            -COMPLEX_DOMAIN_WEIGHT * (complexity - 1.0),
            format!("Backend is weaker on complex domains (complexity {:.1})", complexity),
        ))
    }
}

fn threshold_context(source_terms: Option<&TermStats>) -> ThresholdContext {
    match source_terms {
        Some(terms) if terms.count > 0 => ThresholdContext {
            terminology_complexity: Some(terms.avg_length / REFERENCE_TERM_LENGTH),
            terminology_density: Some(terms.density),
            critical_terms_count: terms.critical_count(),
            previous_accuracy: None,
        },
        _ => ThresholdContext::default(),
    }
}
