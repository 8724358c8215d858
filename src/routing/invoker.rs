/*!
 * Translation invoker.
 *
 * Walks the candidate list produced by the resolver, one backend at a time,
 * until a backend returns a usable translation. Each attempt runs in its own
 * task under a per-attempt timeout and records a performance sample whatever
 * the outcome. The first success is scored by the confidence analyzer.
 */

use log::{debug, info, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{FallbackChainResolver, ResolutionRequest};
use crate::app_config::Config;
use crate::confidence::{ConfidenceAnalyzer, ConfidenceAssessment};
use crate::errors::{AttemptFailure, ExhaustionError, ProviderError};
use crate::performance::{MetricSample, PerformanceTracker};
use crate::providers::{BackendDescriptor, BackendFamily, BackendTransport, PromptInput};

/// Rough characters-per-token ratio used to check input limits
const CHARS_PER_TOKEN: usize = 4;

/// Result of a successful translation
#[derive(Debug, Clone)]
pub struct TranslationOutcome {
    /// Translation returned by the backend
    pub translated_text: String,
    /// Backend that produced it
    pub backend_id: String,
    pub family: BackendFamily,
    pub assessment: ConfidenceAssessment,
    /// Candidates that failed before the successful one
    pub failures: Vec<AttemptFailure>,
    /// Number of candidates tried, including the successful one
    pub attempts: usize,
}

impl TranslationOutcome {
    /// Whether a fallback produced the translation
    pub fn used_fallback(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Sends translations through the fallback chain
#[derive(Debug, Clone)]
pub struct TranslationInvoker {
    resolver: Arc<FallbackChainResolver>,
    analyzer: Arc<ConfidenceAnalyzer>,
    tracker: Arc<PerformanceTracker>,
    transport: Arc<dyn BackendTransport>,
    attempt_timeout: Duration,
}

impl TranslationInvoker {
    pub fn new(
        resolver: Arc<FallbackChainResolver>,
        analyzer: Arc<ConfidenceAnalyzer>,
        tracker: Arc<PerformanceTracker>,
        transport: Arc<dyn BackendTransport>,
        config: &Config,
    ) -> Self {
        Self {
            resolver,
            analyzer,
            tracker,
            transport,
            attempt_timeout: Duration::from_secs(config.invoker.attempt_timeout_secs),
        }
    }

    /// Override the per-attempt timeout
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Translate `text`, falling back through the chain on failure
    ///
    /// # Arguments
    /// * `request` - Languages, domain and routing preferences
    /// * `text` - Source text
    ///
    /// # Returns
    /// * `Result<TranslationOutcome, ExhaustionError>` - The first success, or every failure in attempt order
    pub async fn translate(&self, request: &ResolutionRequest, text: &str) -> Result<TranslationOutcome, ExhaustionError> {
        let candidates = self.resolver.resolve(request);
        let mut failures = Vec::new();

        for candidate in &candidates {
            let backend = Arc::clone(&candidate.backend);
            debug!("Attempting {}", candidate);

            match self.attempt(Arc::clone(&backend), request, text).await {
                Ok(translated_text) => {
                    let assessment = self.analyzer.assess(
                        text,
                        &translated_text,
                        &request.source_language,
                        &request.target_language,
                        &request.domain,
                        &backend.id,
                    );
                    self.tracker
                        .record(&backend.id, MetricSample::confidence(assessment.score));

                    if !failures.is_empty() {
                        info!(
                            "{} succeeded after {} failed attempt(s)",
                            backend.id,
                            failures.len()
                        );
                    }

                    return Ok(TranslationOutcome {
                        translated_text,
                        backend_id: backend.id.clone(),
                        family: backend.family,
                        assessment,
                        attempts: failures.len() + 1,
                        failures,
                    });
                }
                Err(reason) => {
                    warn!("Attempt on {} failed: {}", backend.id, reason);
                    failures.push(AttemptFailure {
                        backend_id: backend.id.clone(),
                        reason,
                    });
                }
            }
        }

        let error = ExhaustionError { failures };
        warn!(
            "{} {}->{}: {}",
            request.domain, request.source_language, request.target_language, error
        );
        Err(error)
    }

    async fn attempt(
        &self,
        backend: Arc<BackendDescriptor>,
        request: &ResolutionRequest,
        text: &str,
    ) -> Result<String, ProviderError> {
        let chars = text.chars().count();
        let estimated_tokens = chars / CHARS_PER_TOKEN;
        if estimated_tokens > backend.max_input_tokens as usize {
            return Err(ProviderError::RequestFailed(format!(
                "input of ~{} tokens exceeds the {} token limit",
                estimated_tokens, backend.max_input_tokens
            )));
        }

        let strategy = backend.family.strategy();
        let body = strategy.build_request(&PromptInput {
            text,
            source_language: &request.source_language,
            target_language: &request.target_language,
            domain: &request.domain,
            term_hints: &request.term_hints,
            max_output_tokens: backend.max_output_tokens,
        });

        let transport = Arc::clone(&self.transport);
        let tracker = Arc::clone(&self.tracker);
        let limit = self.attempt_timeout;

        // Detached: the sample is recorded even if the caller stops waiting
        let task = tokio::spawn(async move {
            let started = Instant::now();
            let result = match tokio::time::timeout(limit, transport.send(&backend, body)).await {
                Ok(Ok(response)) => strategy.parse_response(&response),
                Ok(Err(e)) => Err(e),
                Err(_) => Err(ProviderError::Timeout(limit.as_millis() as u64)),
            };
            let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

            let sample = match &result {
                Ok(_) => MetricSample::success(elapsed_ms)
                    .with_cost(backend.cost_tier.relative_cost() * chars as f64 / 1000.0),
                Err(_) => MetricSample::failure(elapsed_ms),
            };
            tracker.record(&backend.id, sample);
            result
        });

        match task.await {
            Ok(result) => result,
            Err(e) => Err(ProviderError::Cancelled(e.to_string())),
        }
    }
}
