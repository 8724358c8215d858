/*!
 * Confidence thresholds.
 *
 * A `ThresholdSet` holds the three cut points that map a confidence score to
 * a `ConfidenceLevel`. Sets are stored per domain and per language pair,
 * adjusted per request by `adaptive`, and nudged by user feedback in
 * `feedback`. Every set that leaves this module is normalized:
 *
 * - all values lie in [0, 1]
 * - high >= medium + 0.05
 * - medium >= low + 0.05
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::ConfigurationError;
use crate::language_utils::pair_key;

pub mod adaptive;
pub mod feedback;
pub mod store;

pub use adaptive::{AdaptiveThresholds, ThresholdContext};
pub use feedback::{FeedbackIssue, FeedbackLoop, FeedbackOutcome, FeedbackRecord, UserFeedback};
pub use store::{InMemoryThresholdStore, ThresholdStore};

/// Minimum distance between two adjacent thresholds
pub const MIN_GAP: f64 = 0.05;

/// Tolerance used when checking the ordering of computed sets
const ORDER_EPSILON: f64 = 1e-9;

/// Ordered confidence levels, best first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
    Insufficient,
}

impl ConfidenceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLevel::High => "high",
            ConfidenceLevel::Medium => "medium",
            ConfidenceLevel::Low => "low",
            ConfidenceLevel::Insufficient => "insufficient",
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfidenceLevel {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "high" => Ok(ConfidenceLevel::High),
            "medium" => Ok(ConfidenceLevel::Medium),
            "low" => Ok(ConfidenceLevel::Low),
            "insufficient" => Ok(ConfidenceLevel::Insufficient),
            _ => Err(ConfigurationError::UnknownLevel(s.to_string())),
        }
    }
}

/// Three ordered cut points in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSet {
    pub high: f64,
    pub medium: f64,
    pub low: f64,
}

impl ThresholdSet {
    pub const fn new(high: f64, medium: f64, low: f64) -> Self {
        Self { high, medium, low }
    }

    /// Add the same delta to every threshold (not normalized)
    pub fn shifted(&self, delta: f64) -> Self {
        Self::new(self.high + delta, self.medium + delta, self.low + delta)
    }

    /// Clamp into [0, 1], then restore the minimum gaps.
    ///
    /// Gaps are first opened upwards from `low`; if that pushes `high` past
    /// 1.0 the set is capped and the gaps are re-opened downwards.
    pub fn normalized(&self) -> Self {
        let mut low = self.low.clamp(0.0, 1.0);
        let mut medium = self.medium.clamp(0.0, 1.0).max(low + MIN_GAP);
        let mut high = self.high.clamp(0.0, 1.0).max(medium + MIN_GAP);

        if high > 1.0 {
            high = 1.0;
            medium = medium.min(high - MIN_GAP);
            low = low.min(medium - MIN_GAP);
        }

        Self::new(high, medium, low)
    }

    /// Whether the set satisfies the range and gap invariants
    pub fn is_ordered(&self) -> bool {
        let in_range = |value: f64| (-ORDER_EPSILON..=1.0 + ORDER_EPSILON).contains(&value);

        in_range(self.high)
            && in_range(self.medium)
            && in_range(self.low)
            && self.high + ORDER_EPSILON >= self.medium + MIN_GAP
            && self.medium + ORDER_EPSILON >= self.low + MIN_GAP
    }

    /// Map a score onto a level
    pub fn level_for(&self, score: f64) -> ConfidenceLevel {
        if score >= self.high {
            ConfidenceLevel::High
        } else if score >= self.medium {
            ConfidenceLevel::Medium
        } else if score >= self.low {
            ConfidenceLevel::Low
        } else {
            ConfidenceLevel::Insufficient
        }
    }

    /// Mutable access to the threshold guarding a level
    pub fn threshold_mut(&mut self, level: ConfidenceLevel) -> Option<&mut f64> {
        match level {
            ConfidenceLevel::High => Some(&mut self.high),
            ConfidenceLevel::Medium => Some(&mut self.medium),
            ConfidenceLevel::Low => Some(&mut self.low),
            ConfidenceLevel::Insufficient => None,
        }
    }
}

impl fmt::Display for ThresholdSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "high={:.3} medium={:.3} low={:.3}", self.high, self.medium, self.low)
    }
}

/// Key of a persisted threshold record
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ThresholdKey {
    /// Per-domain record, e.g. "cardiology"
    Domain(String),
    /// Per-language-pair record, e.g. "en-es"
    LanguagePair(String),
}

impl ThresholdKey {
    pub fn domain(domain: &str) -> Self {
        ThresholdKey::Domain(domain.trim().to_lowercase())
    }

    pub fn pair(source_language: &str, target_language: &str) -> Self {
        ThresholdKey::LanguagePair(pair_key(source_language, target_language))
    }

    /// Stable string used as the primary key in storage
    pub fn storage_key(&self) -> String {
        match self {
            ThresholdKey::Domain(domain) => format!("domain:{}", domain),
            ThresholdKey::LanguagePair(pair) => format!("pair:{}", pair),
        }
    }

    /// Inverse of `storage_key`
    pub fn from_storage_key(key: &str) -> Option<Self> {
        match key.split_once(':') {
            Some(("domain", domain)) => Some(ThresholdKey::Domain(domain.to_string())),
            Some(("pair", pair)) => Some(ThresholdKey::LanguagePair(pair.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for ThresholdKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.storage_key())
    }
}
