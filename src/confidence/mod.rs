/*!
 * Confidence assessment of produced translations.
 *
 * An assessment starts from the producing family's prior and applies one
 * bounded adjustment per quality signal. Every adjustment is kept as a
 * `ConfidenceFactor` so callers can see why a score is what it is.
 */

use serde::Serialize;

use crate::thresholds::{ConfidenceLevel, ThresholdSet};

pub mod analyzer;
pub mod terms;

pub use analyzer::ConfidenceAnalyzer;
pub use terms::{GlossaryTermExtractor, TermExtractor, TermStats};

/// Direction of a factor's effect on the score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FactorImpact {
    Positive,
    Negative,
    Neutral,
}

/// One named contribution to a confidence score
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfidenceFactor {
    /// Machine-readable signal name, e.g. "critical_terms_preservation"
    pub factor: String,
    pub impact: FactorImpact,
    pub description: String,
    /// Signed contribution to the score
    pub adjustment: f64,
}

impl ConfidenceFactor {
    pub fn new(factor: &str, adjustment: f64, description: String) -> Self {
        let impact = if adjustment > 0.0 {
            FactorImpact::Positive
        } else if adjustment < 0.0 {
            FactorImpact::Negative
        } else {
            FactorImpact::Neutral
        };
        Self {
            factor: factor.to_string(),
            impact,
            description,
            adjustment,
        }
    }

    /// A factor that documents a condition without moving the score
    pub fn neutral(factor: &str, description: String) -> Self {
        Self::new(factor, 0.0, description)
    }
}

/// Result of assessing one translation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfidenceAssessment {
    /// Final score in [0, 1]
    pub score: f64,
    pub level: ConfidenceLevel,
    /// Baseline first, then one entry per applied signal
    pub factors: Vec<ConfidenceFactor>,
    /// Thresholds the level was derived from
    pub thresholds: ThresholdSet,
}

/// Score reported when the analysis itself failed
pub const FAIL_OPEN_SCORE: f64 = 0.9;

impl ConfidenceAssessment {
    /// Permissive result used when a signal could not be computed
    pub fn analysis_error(message: &str, thresholds: ThresholdSet) -> Self {
        Self {
            score: FAIL_OPEN_SCORE,
            level: ConfidenceLevel::High,
            factors: vec![ConfidenceFactor::neutral(
                "analysis_error",
                format!("Confidence analysis failed: {}", message),
            )],
            thresholds,
        }
    }

    pub fn factor(&self, name: &str) -> Option<&ConfidenceFactor> {
        self.factors.iter().find(|factor| factor.factor == name)
    }
}
