/*!
 * # medroute - Confidence-aware routing for medical translation
 *
 * A Rust library that routes translation requests across interchangeable
 * language-model backends, scores how far each produced translation can be
 * trusted, and recalibrates its trust thresholds from user feedback.
 *
 * ## Features
 *
 * - Fallback chains built from domain, language-group, cost and performance rules
 * - Per-family prompt construction and response parsing behind one interface
 * - Confidence assessment with auditable factors and adaptive cut points
 * - Feedback-driven threshold updates, persisted in SQLite
 * - Rolling per-backend performance statistics
 * - ISO 639-1 and ISO 639-2 language code support
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `app_controller`: Wires every component together
 * - `providers`: Backend descriptors, families and the transport seam:
 *   - `providers::catalog`: The read-only Provider Catalog
 *   - `providers::strategy`: Per-family request/response dialects
 *   - `providers::mock`: Scripted transport for tests and dry runs
 * - `routing`: Fallback chain resolution and invocation
 * - `confidence`: Confidence assessment and term extraction
 * - `thresholds`: Adaptive thresholds and the feedback loop
 * - `performance`: Rolling per-backend metrics
 * - `database`: SQLite persistence for thresholds and feedback
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the library
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::too_many_arguments)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod confidence;
pub mod database;
pub mod errors;
pub mod language_utils;
pub mod performance;
pub mod providers;
pub mod routing;
pub mod thresholds;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::Controller;
pub use confidence::{ConfidenceAnalyzer, ConfidenceAssessment, ConfidenceFactor};
pub use database::SqliteThresholdStore;
pub use errors::{AnalysisError, ConfigurationError, ExhaustionError, PersistenceError, ProviderError, RouterError};
pub use language_utils::{canonical_code, language_codes_match};
pub use performance::{MetricSample, PerformanceSummary, PerformanceTracker};
pub use providers::{BackendDescriptor, BackendFamily, BackendTransport, CostTier, ProviderCatalog};
pub use routing::{CandidateList, FallbackChainResolver, ResolutionRequest, TranslationInvoker, TranslationOutcome};
pub use thresholds::{
    AdaptiveThresholds, ConfidenceLevel, FeedbackLoop, ThresholdSet, ThresholdStore, UserFeedback,
};
