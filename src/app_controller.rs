use anyhow::{Context, Result};
use log::info;
use std::sync::Arc;

use crate::app_config::Config;
use crate::confidence::{ConfidenceAnalyzer, ConfidenceAssessment, GlossaryTermExtractor, TermExtractor};
use crate::errors::AnalysisError;
use crate::performance::{MetricSample, PerformanceSummary, PerformanceTracker};
use crate::providers::{BackendTransport, ProviderCatalog};
use crate::routing::{CandidateList, FallbackChainResolver, ResolutionRequest, TranslationInvoker};
use crate::thresholds::{
    AdaptiveThresholds, ConfidenceLevel, FeedbackLoop, InMemoryThresholdStore, ThresholdContext, ThresholdSet,
    ThresholdStore, UserFeedback,
};

// @module: Wires the routing core together for callers

/// Entry point of the routing core
///
/// Owns one instance of every component and exposes the operations the
/// request-handling layer calls. Cheap to share behind an `Arc`.
#[derive(Debug)]
pub struct Controller {
    config: Arc<Config>,
    catalog: Arc<ProviderCatalog>,
    tracker: Arc<PerformanceTracker>,
    thresholds: Arc<AdaptiveThresholds>,
    analyzer: Arc<ConfidenceAnalyzer>,
    resolver: Arc<FallbackChainResolver>,
    feedback: FeedbackLoop,
}

impl Controller {
    /// Create a controller with the default term extractor
    pub fn with_config(config: Config, store: Arc<dyn ThresholdStore>) -> Result<Self> {
        let extractor = GlossaryTermExtractor::from_config(&config).context("Failed to build the term extractor")?;
        Self::with_extractor(config, store, Arc::new(extractor))
    }

    /// Create a controller backed by an in-memory threshold store
    pub fn in_memory(config: Config) -> Result<Self> {
        Self::with_config(config, Arc::new(InMemoryThresholdStore::new()))
    }

    // @method: Create a controller with a caller-supplied term extractor
    pub fn with_extractor(
        config: Config,
        store: Arc<dyn ThresholdStore>,
        extractor: Arc<dyn TermExtractor>,
    ) -> Result<Self> {
        config.validate().context("Configuration validation failed")?;

        let config = Arc::new(config);
        let catalog = Arc::new(ProviderCatalog::from_config(&config)?);
        let tracker = Arc::new(PerformanceTracker::new());
        let thresholds = Arc::new(AdaptiveThresholds::new(Arc::clone(&store), Arc::clone(&config)));
        let analyzer = Arc::new(ConfidenceAnalyzer::new(
            Arc::clone(&catalog),
            Arc::clone(&thresholds),
            extractor,
            Arc::clone(&config),
        ));
        let resolver = Arc::new(FallbackChainResolver::new(
            Arc::clone(&catalog),
            Arc::clone(&config),
            Arc::clone(&tracker),
        ));
        let feedback = FeedbackLoop::new(store, Arc::clone(&thresholds)).with_tracker(Arc::clone(&tracker));

        info!(
            "Router ready: {} backends, {} domains, {} language groups",
            catalog.len(),
            config.domains.len(),
            config.language_groups.len()
        );

        Ok(Self {
            config,
            catalog,
            tracker,
            thresholds,
            analyzer,
            resolver,
            feedback,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn catalog(&self) -> &ProviderCatalog {
        &self.catalog
    }

    pub fn tracker(&self) -> Arc<PerformanceTracker> {
        Arc::clone(&self.tracker)
    }

    /// Ordered backends to attempt for a request
    pub fn resolve(&self, request: &ResolutionRequest) -> CandidateList {
        self.resolver.resolve(request)
    }

    /// Thresholds for one request
    pub fn compute_thresholds(
        &self,
        domain: &str,
        source_language: &str,
        target_language: &str,
        source_text: &str,
        context: &ThresholdContext,
    ) -> Result<ThresholdSet, AnalysisError> {
        self.thresholds
            .compute(domain, source_language, target_language, source_text, context)
    }

    /// Score a produced translation; never fails
    pub fn assess(
        &self,
        source_text: &str,
        produced_text: &str,
        source_language: &str,
        target_language: &str,
        domain: &str,
        backend_id: &str,
    ) -> ConfidenceAssessment {
        self.analyzer.assess(
            source_text,
            produced_text,
            source_language,
            target_language,
            domain,
            backend_id,
        )
    }

    /// Fold a user rating into the stored thresholds; false on failure
    pub fn apply_feedback(
        &self,
        domain: &str,
        source_language: &str,
        target_language: &str,
        level: ConfidenceLevel,
        feedback: &UserFeedback,
    ) -> bool {
        self.feedback
            .apply_feedback(domain, source_language, target_language, level, feedback)
    }

    pub fn feedback_loop(&self) -> &FeedbackLoop {
        &self.feedback
    }

    pub fn record(&self, backend_id: &str, sample: MetricSample) {
        self.tracker.record(backend_id, sample);
    }

    pub fn summarize(&self, backend_id: &str) -> PerformanceSummary {
        self.tracker.summarize(backend_id)
    }

    /// Invoker that sends translations through `transport`
    pub fn invoker(&self, transport: Arc<dyn BackendTransport>) -> TranslationInvoker {
        TranslationInvoker::new(
            Arc::clone(&self.resolver),
            Arc::clone(&self.analyzer),
            Arc::clone(&self.tracker),
            transport,
            &self.config,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::mock::MockTransport;
    use crate::thresholds::FeedbackIssue;

    #[test]
    fn test_inMemory_withDefaultConfig_shouldWireEveryComponent() {
        let controller = Controller::in_memory(Config::default()).unwrap();
        assert_eq!(controller.catalog().len(), 7);

        let candidates = controller.resolve(&ResolutionRequest::new("en", "fr", "oncology"));
        assert_eq!(candidates.primary().backend.id, "claude-3-sonnet");
    }

    #[test]
    fn test_withConfig_withInvalidConfig_shouldFail() {
        let mut config = Config::default();
        config.routing.max_attempts = 0;
        assert!(Controller::in_memory(config).is_err());
    }

    #[test]
    fn test_applyFeedback_shouldBeVisibleToCompute() {
        let controller = Controller::in_memory(Config::default()).unwrap();
        let context = ThresholdContext::default();
        let text = "The patient reports chest pain after exercise.";
        let before = controller
            .compute_thresholds("general", "en", "fr", text, &context)
            .unwrap();

        let feedback = UserFeedback::new(1).with_issue(FeedbackIssue::Meaning);
        assert!(controller.apply_feedback("general", "en", "fr", ConfidenceLevel::Medium, &feedback));

        let after = controller
            .compute_thresholds("general", "en", "fr", text, &context)
            .unwrap();
        assert!(after.medium > before.medium);
        assert!(after.is_ordered());
    }

    #[test]
    fn test_applyFeedback_onStricterDomain_shouldTightenComputedThresholds() {
        let controller = Controller::in_memory(Config::default()).unwrap();
        let context = ThresholdContext::default();
        let text = "The patient had an arrhythmia after the heart attack.";
        let before = controller
            .compute_thresholds("cardiology", "en", "es", text, &context)
            .unwrap();

        let feedback = UserFeedback::new(1).with_issue(FeedbackIssue::Terminology);
        assert!(controller.apply_feedback("cardiology", "en", "es", ConfidenceLevel::High, &feedback));

        let after = controller
            .compute_thresholds("cardiology", "en", "es", text, &context)
            .unwrap();
        assert!(after.high > before.high, "{} -> {}", before, after);
        assert!(after.medium > before.medium, "{} -> {}", before, after);
        assert!(after.low >= before.low, "{} -> {}", before, after);
    }

    #[tokio::test]
    async fn test_invoker_shouldShareTheControllerTracker() {
        let controller = Controller::in_memory(Config::default()).unwrap();
        let invoker = controller.invoker(Arc::new(MockTransport::working("Le patient va bien.")));

        let outcome = invoker
            .translate(&ResolutionRequest::new("en", "fr", "general"), "The patient is well.")
            .await
            .unwrap();

        assert_eq!(controller.summarize(&outcome.backend_id).calls, 1);
    }
}
