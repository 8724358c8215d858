/*!
 * Rolling performance metrics per backend.
 *
 * The invoker records latency, outcome and cost of every attempt; the
 * feedback loop records user ratings. The resolver reads summaries when
 * performance-based ordering is enabled.
 */

pub mod tracker;
pub mod window;

pub use tracker::{MetricSample, PerformanceSummary, PerformanceTracker, RatingBand};
pub use window::{DEFAULT_WINDOW_SIZE, RollingWindow};
