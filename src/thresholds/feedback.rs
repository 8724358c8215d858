/*!
 * User feedback loop.
 *
 * A rating of a delivered translation moves the stored thresholds of its
 * domain and (by half as much) of its language pair:
 * - an inaccurate translation that was rated high/medium raises that level
 * - an accurate translation that was rated low/medium lowers that level
 *
 * Each event is also appended to the audit trail and, when the backend is
 * known, fed into the performance tracker.
 */

use chrono::Utc;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use super::adaptive::AdaptiveThresholds;
use super::store::ThresholdStore;
use super::{ConfidenceLevel, ThresholdKey, ThresholdSet};
use crate::errors::PersistenceError;
use crate::language_utils::canonical_code;
use crate::performance::{MetricSample, PerformanceTracker};

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

/// Ratings at or above this count as an accurate translation
const ACCURATE_RATING: u8 = 4;

const POOR_RATING_ADJUSTMENT: f64 = 0.03;
const NEUTRAL_RATING_ADJUSTMENT: f64 = 0.01;
const GOOD_RATING_STEP: f64 = 0.01;

const TERMINOLOGY_MULTIPLIER: f64 = 1.5;
const MEANING_MULTIPLIER: f64 = 1.3;

/// Share of the adjustment applied to the language-pair record
const PAIR_SHARE: f64 = 0.5;

/// Kind of problem the user reported
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackIssue {
    Terminology,
    Meaning,
    Omission,
    Fluency,
    Formatting,
    Other,
}

impl fmt::Display for FeedbackIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FeedbackIssue::Terminology => "terminology",
            FeedbackIssue::Meaning => "meaning",
            FeedbackIssue::Omission => "omission",
            FeedbackIssue::Fluency => "fluency",
            FeedbackIssue::Formatting => "formatting",
            FeedbackIssue::Other => "other",
        };
        f.write_str(name)
    }
}

impl FromStr for FeedbackIssue {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "terminology" | "term" | "terms" => FeedbackIssue::Terminology,
            "meaning" | "accuracy" => FeedbackIssue::Meaning,
            "omission" | "missing" => FeedbackIssue::Omission,
            "fluency" | "grammar" => FeedbackIssue::Fluency,
            "formatting" | "format" => FeedbackIssue::Formatting,
            _ => FeedbackIssue::Other,
        })
    }
}

/// One user rating of a delivered translation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserFeedback {
    /// 1 (unusable) to 5 (perfect)
    pub rating: u8,
    #[serde(default)]
    pub issues: Vec<FeedbackIssue>,
    #[serde(default)]
    pub comment: Option<String>,
    /// Backend that produced the translation, if known
    #[serde(default)]
    pub backend_id: Option<String>,
}

impl UserFeedback {
    pub fn new(rating: u8) -> Self {
        Self {
            rating,
            issues: Vec::new(),
            comment: None,
            backend_id: None,
        }
    }

    pub fn with_issue(mut self, issue: FeedbackIssue) -> Self {
        self.issues.push(issue);
        self
    }

    pub fn with_comment(mut self, comment: &str) -> Self {
        self.comment = Some(comment.to_string());
        self
    }

    pub fn for_backend(mut self, backend_id: &str) -> Self {
        self.backend_id = Some(backend_id.to_string());
        self
    }

    pub fn is_accurate(&self) -> bool {
        self.rating >= ACCURATE_RATING
    }

    /// Signed threshold adjustment implied by this feedback.
    ///
    /// Positive for poor ratings, negative for good ones; scaled up when
    /// the user reported terminology or meaning problems.
    pub fn adjustment(&self) -> f64 {
        let base = match self.rating {
            0..=2 => POOR_RATING_ADJUSTMENT,
            3 => NEUTRAL_RATING_ADJUSTMENT,
            rating => -(f64::from(rating) - 3.0) * GOOD_RATING_STEP,
        };

        let mut multiplier = 1.0;
        if self.issues.contains(&FeedbackIssue::Terminology) {
            multiplier *= TERMINOLOGY_MULTIPLIER;
        }
        if self.issues.contains(&FeedbackIssue::Meaning) {
            multiplier *= MEANING_MULTIPLIER;
        }

        base * multiplier
    }
}

/// Audit row for one feedback event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub id: String,
    pub domain: String,
    pub source_language: String,
    pub target_language: String,
    pub level: ConfidenceLevel,
    pub rating: u8,
    pub issues: Vec<FeedbackIssue>,
    pub comment: Option<String>,
    pub backend_id: Option<String>,
    /// Magnitude applied to the domain record (0.0 when nothing moved)
    pub adjustment: f64,
    /// RFC 3339 timestamp
    pub created_at: String,
}

/// Thresholds after a feedback event was applied
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackOutcome {
    pub domain_thresholds: ThresholdSet,
    pub pair_thresholds: ThresholdSet,
    /// Signed adjustment derived from the rating and issues
    pub adjustment: f64,
    /// Whether any stored threshold moved
    pub changed: bool,
}

/// Which thresholds a feedback event moves
#[derive(Debug, Clone, Copy, PartialEq)]
enum Direction {
    Raise(&'static [ConfidenceLevel]),
    Lower(ConfidenceLevel),
    Unchanged,
}

impl Direction {
    fn for_feedback(level: ConfidenceLevel, accurate: bool) -> Self {
        match (level, accurate) {
            (ConfidenceLevel::High, false) => Direction::Raise(&[ConfidenceLevel::High, ConfidenceLevel::Medium]),
            (ConfidenceLevel::Medium, false) => Direction::Raise(&[ConfidenceLevel::Medium]),
            (ConfidenceLevel::Medium, true) => Direction::Lower(ConfidenceLevel::Medium),
            (ConfidenceLevel::Low, true) => Direction::Lower(ConfidenceLevel::Low),
            _ => Direction::Unchanged,
        }
    }

    fn apply(&self, set: &mut ThresholdSet, magnitude: f64) {
        match *self {
            Direction::Raise(levels) => {
                for &level in levels {
                    if let Some(threshold) = set.threshold_mut(level) {
                        *threshold += magnitude;
                    }
                }
            }
            Direction::Lower(level) => {
                if let Some(threshold) = set.threshold_mut(level) {
                    *threshold -= magnitude;
                }
            }
            Direction::Unchanged => {}
        }
        *set = set.normalized();
    }
}

/// Applies user feedback to the stored thresholds
#[derive(Debug, Clone)]
pub struct FeedbackLoop {
    store: Arc<dyn ThresholdStore>,
    thresholds: Arc<AdaptiveThresholds>,
    tracker: Option<Arc<PerformanceTracker>>,
}

impl FeedbackLoop {
    pub fn new(store: Arc<dyn ThresholdStore>, thresholds: Arc<AdaptiveThresholds>) -> Self {
        Self {
            store,
            thresholds,
            tracker: None,
        }
    }

    /// Also record ratings into the performance tracker
    pub fn with_tracker(mut self, tracker: Arc<PerformanceTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// Apply one feedback event; false if it could not be applied or persisted
    pub fn apply_feedback(
        &self,
        domain: &str,
        source_language: &str,
        target_language: &str,
        level: ConfidenceLevel,
        feedback: &UserFeedback,
    ) -> bool {
        match self.apply(domain, source_language, target_language, level, feedback) {
            Ok(outcome) => {
                info!(
                    "Applied rating {} for {} {}->{} at level {}: domain [{}], pair [{}]",
                    feedback.rating,
                    domain,
                    source_language,
                    target_language,
                    level,
                    outcome.domain_thresholds,
                    outcome.pair_thresholds
                );
                true
            }
            Err(e) => {
                error!(
                    "Failed to apply feedback for {} {}->{}: {}",
                    domain, source_language, target_language, e
                );
                false
            }
        }
    }

    /// Apply one feedback event and report the resulting thresholds
    pub fn apply(
        &self,
        domain: &str,
        source_language: &str,
        target_language: &str,
        level: ConfidenceLevel,
        feedback: &UserFeedback,
    ) -> Result<FeedbackOutcome, PersistenceError> {
        if !(MIN_RATING..=MAX_RATING).contains(&feedback.rating) {
            return Err(PersistenceError::InvalidFeedback(format!(
                "rating {} outside {}-{}",
                feedback.rating, MIN_RATING, MAX_RATING
            )));
        }

        let adjustment = feedback.adjustment();
        let magnitude = adjustment.abs();
        let direction = Direction::for_feedback(level, feedback.is_accurate());

        let domain_key = ThresholdKey::domain(domain);
        let pair_key = ThresholdKey::pair(source_language, target_language);
        let domain_seed = self.thresholds.domain_seed(domain);

        // a pair record replaces the domain base in compute, so a new one
        // starts from the domain thresholds the request was judged against
        let (domain_thresholds, pair_thresholds) = if direction == Direction::Unchanged {
            let domain_thresholds = self.store.load(&domain_key)?.unwrap_or(domain_seed);
            (
                domain_thresholds,
                self.store.load(&pair_key)?.unwrap_or(domain_thresholds),
            )
        } else {
            let mut domain_before = domain_seed;
            let domain_thresholds = self.store.update(&domain_key, domain_seed, &mut |set: &mut ThresholdSet| {
                domain_before = *set;
                direction.apply(set, magnitude)
            })?;
            let pair_thresholds = self.store.update(&pair_key, domain_before, &mut |set: &mut ThresholdSet| {
                direction.apply(set, magnitude * PAIR_SHARE)
            })?;
            (domain_thresholds, pair_thresholds)
        };

        if let (Some(tracker), Some(backend_id)) = (&self.tracker, &feedback.backend_id) {
            tracker.record(
                backend_id,
                MetricSample::user_feedback(f64::from(feedback.rating) / f64::from(MAX_RATING)),
            );
        }

        let changed = direction != Direction::Unchanged;
        let record = FeedbackRecord {
            id: Uuid::new_v4().to_string(),
            domain: domain.trim().to_lowercase(),
            source_language: canonical_code(source_language),
            target_language: canonical_code(target_language),
            level,
            rating: feedback.rating,
            issues: feedback.issues.clone(),
            comment: feedback.comment.clone(),
            backend_id: feedback.backend_id.clone(),
            adjustment: if changed { magnitude } else { 0.0 },
            created_at: Utc::now().to_rfc3339(),
        };
        if let Err(e) = self.store.record_feedback(&record) {
            warn!("Thresholds updated but feedback event {} was not recorded: {}", record.id, e);
        }

        Ok(FeedbackOutcome {
            domain_thresholds,
            pair_thresholds,
            adjustment,
            changed,
        })
    }
}
