/*!
 * Per-backend performance tracking.
 *
 * Every backend owns five rolling windows (response time, error outcome,
 * confidence, user feedback, cost) behind its own mutex, so records for
 * different backends never contend. Summaries are computed on demand.
 */

use log::trace;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::window::{DEFAULT_WINDOW_SIZE, RollingWindow};

/// Any subset of the observations made about one backend call
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricSample {
    pub response_time_ms: Option<f64>,
    /// `Some(true)` for a failed call, `Some(false)` for a successful one
    pub error: Option<bool>,
    pub confidence_score: Option<f64>,
    /// Normalized to [0, 1]
    pub user_feedback_score: Option<f64>,
    pub cost_per_call: Option<f64>,
}

impl MetricSample {
    /// A successful call and how long it took
    pub fn success(response_time_ms: f64) -> Self {
        Self {
            response_time_ms: Some(response_time_ms),
            error: Some(false),
            ..Self::default()
        }
    }

    /// A failed call and how long it took
    pub fn failure(response_time_ms: f64) -> Self {
        Self {
            response_time_ms: Some(response_time_ms),
            error: Some(true),
            ..Self::default()
        }
    }

    pub fn confidence(score: f64) -> Self {
        Self {
            confidence_score: Some(score),
            ..Self::default()
        }
    }

    pub fn user_feedback(score: f64) -> Self {
        Self {
            user_feedback_score: Some(score),
            ..Self::default()
        }
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost_per_call = Some(cost);
        self
    }
}

/// Discrete quality band of one metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RatingBand {
    Excellent,
    Good,
    Acceptable,
    Poor,
}

impl RatingBand {
    /// Numeric value used for the composite rating
    pub fn score(&self) -> f64 {
        match self {
            RatingBand::Excellent => 1.0,
            RatingBand::Good => 0.75,
            RatingBand::Acceptable => 0.5,
            RatingBand::Poor => 0.25,
        }
    }

    pub fn for_response_time(avg_ms: f64) -> Self {
        if avg_ms < 1000.0 {
            RatingBand::Excellent
        } else if avg_ms < 3000.0 {
            RatingBand::Good
        } else if avg_ms < 5000.0 {
            RatingBand::Acceptable
        } else {
            RatingBand::Poor
        }
    }

    pub fn for_error_rate(rate: f64) -> Self {
        if rate < 0.01 {
            RatingBand::Excellent
        } else if rate < 0.05 {
            RatingBand::Good
        } else if rate < 0.10 {
            RatingBand::Acceptable
        } else {
            RatingBand::Poor
        }
    }

    pub fn for_confidence(avg: f64) -> Self {
        if avg >= 0.9 {
            RatingBand::Excellent
        } else if avg >= 0.8 {
            RatingBand::Good
        } else if avg >= 0.7 {
            RatingBand::Acceptable
        } else {
            RatingBand::Poor
        }
    }
}

impl fmt::Display for RatingBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RatingBand::Excellent => "excellent",
            RatingBand::Good => "good",
            RatingBand::Acceptable => "acceptable",
            RatingBand::Poor => "poor",
        };
        f.write_str(name)
    }
}

/// Aggregates over the current window of one backend
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceSummary {
    pub backend_id: String,
    /// Calls with a known outcome in the window
    pub calls: usize,
    pub avg_response_time_ms: Option<f64>,
    pub error_rate: Option<f64>,
    pub avg_confidence: Option<f64>,
    pub avg_user_feedback: Option<f64>,
    pub avg_cost_per_call: Option<f64>,
    pub response_time_rating: Option<RatingBand>,
    pub error_rate_rating: Option<RatingBand>,
    pub confidence_rating: Option<RatingBand>,
    /// Mean of the available band scores
    pub performance_rating: Option<f64>,
}

impl PerformanceSummary {
    fn empty(backend_id: &str) -> Self {
        Self {
            backend_id: backend_id.to_string(),
            calls: 0,
            avg_response_time_ms: None,
            error_rate: None,
            avg_confidence: None,
            avg_user_feedback: None,
            avg_cost_per_call: None,
            response_time_rating: None,
            error_rate_rating: None,
            confidence_rating: None,
            performance_rating: None,
        }
    }
}

#[derive(Debug)]
struct BackendMetrics {
    response_times: RollingWindow<f64>,
    errors: RollingWindow<bool>,
    confidence: RollingWindow<f64>,
    user_feedback: RollingWindow<f64>,
    cost: RollingWindow<f64>,
}

impl BackendMetrics {
    fn new(window: usize) -> Self {
        Self {
            response_times: RollingWindow::new(window),
            errors: RollingWindow::new(window),
            confidence: RollingWindow::new(window),
            user_feedback: RollingWindow::new(window),
            cost: RollingWindow::new(window),
        }
    }

    fn push(&mut self, sample: &MetricSample) {
        if let Some(ms) = sample.response_time_ms {
            self.response_times.push(ms);
        }
        if let Some(error) = sample.error {
            self.errors.push(error);
        }
        if let Some(score) = sample.confidence_score {
            self.confidence.push(score);
        }
        if let Some(score) = sample.user_feedback_score {
            self.user_feedback.push(score);
        }
        if let Some(cost) = sample.cost_per_call {
            self.cost.push(cost);
        }
    }

    fn summarize(&self, backend_id: &str) -> PerformanceSummary {
        let avg_response_time_ms = self.response_times.mean();
        let error_rate = self.errors.ratio();
        let avg_confidence = self.confidence.mean();

        let response_time_rating = avg_response_time_ms.map(RatingBand::for_response_time);
        let error_rate_rating = error_rate.map(RatingBand::for_error_rate);
        let confidence_rating = avg_confidence.map(RatingBand::for_confidence);

        let bands: Vec<f64> = [response_time_rating, error_rate_rating, confidence_rating]
            .iter()
            .flatten()
            .map(RatingBand::score)
            .collect();
        let performance_rating = if bands.is_empty() {
            None
        } else {
            Some(bands.iter().sum::<f64>() / bands.len() as f64)
        };

        PerformanceSummary {
            backend_id: backend_id.to_string(),
            calls: self.errors.len(),
            avg_response_time_ms,
            error_rate,
            avg_confidence,
            avg_user_feedback: self.user_feedback.mean(),
            avg_cost_per_call: self.cost.mean(),
            response_time_rating,
            error_rate_rating,
            confidence_rating,
            performance_rating,
        }
    }
}

/// Thread-safe rolling metrics for every backend
#[derive(Debug)]
pub struct PerformanceTracker {
    backends: RwLock<HashMap<String, Arc<Mutex<BackendMetrics>>>>,
    window: usize,
}

impl Default for PerformanceTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl PerformanceTracker {
    pub fn new() -> Self {
        Self::with_window(DEFAULT_WINDOW_SIZE)
    }

    /// Tracker keeping `window` samples per metric stream
    pub fn with_window(window: usize) -> Self {
        Self {
            backends: RwLock::new(HashMap::new()),
            window,
        }
    }

    fn metrics_for(&self, backend_id: &str) -> Arc<Mutex<BackendMetrics>> {
        if let Some(metrics) = self.backends.read().get(backend_id) {
            return Arc::clone(metrics);
        }
        let mut backends = self.backends.write();
        Arc::clone(
            backends
                .entry(backend_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(BackendMetrics::new(self.window)))),
        )
    }

    /// Record one sample for a backend
    pub fn record(&self, backend_id: &str, sample: MetricSample) {
        trace!("Recording {:?} for {}", sample, backend_id);
        self.metrics_for(backend_id).lock().push(&sample);
    }

    /// Summary for one backend; all-`None` when nothing was recorded
    pub fn summarize(&self, backend_id: &str) -> PerformanceSummary {
        let metrics = self.backends.read().get(backend_id).cloned();
        match metrics {
            Some(metrics) => metrics.lock().summarize(backend_id),
            None => PerformanceSummary::empty(backend_id),
        }
    }

    /// Summaries of every tracked backend, sorted by id
    pub fn snapshot(&self) -> Vec<PerformanceSummary> {
        let tracked: Vec<(String, Arc<Mutex<BackendMetrics>>)> = self
            .backends
            .read()
            .iter()
            .map(|(id, metrics)| (id.clone(), Arc::clone(metrics)))
            .collect();

        let mut summaries: Vec<PerformanceSummary> = tracked
            .iter()
            .map(|(id, metrics)| metrics.lock().summarize(id))
            .collect();
        summaries.sort_by(|a, b| a.backend_id.cmp(&b.backend_id));
        summaries
    }

    /// Calls with a known outcome across every backend
    pub fn total_calls(&self) -> usize {
        self.snapshot().iter().map(|summary| summary.calls).sum()
    }
}
