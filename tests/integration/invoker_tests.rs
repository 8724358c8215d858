/*!
 * Integration tests for translation through the fallback chain
 */

use std::sync::Arc;
use std::time::Duration;

use medroute::errors::ProviderError;
use medroute::routing::ResolutionRequest;
use medroute::thresholds::ConfidenceLevel;

use crate::common::{self, CARDIOLOGY_FAITHFUL, CARDIOLOGY_SOURCE, MockBehavior, MockTransport};

#[tokio::test]
async fn test_translate_thenFeedback_shouldCloseTheLoop() {
    common::init_logging();
    let controller = common::memory_controller();
    let transport = MockTransport::working(CARDIOLOGY_FAITHFUL);
    let invoker = controller.invoker(Arc::new(transport.clone()));
    let request = ResolutionRequest::new("en", "es", "cardiology").with_term_hints(&["arrhythmia"]);

    let outcome = invoker.translate(&request, CARDIOLOGY_SOURCE).await.unwrap();

    assert_eq!(outcome.backend_id, "claude-3-sonnet");
    assert!(outcome.assessment.factor("critical_terms_preservation").is_none());
    assert!(outcome.assessment.thresholds.is_ordered());

    let feedback = medroute::UserFeedback::new(1).for_backend(&outcome.backend_id);
    assert!(controller.apply_feedback("cardiology", "en", "es", outcome.assessment.level, &feedback));

    let summary = controller.summarize("claude-3-sonnet");
    assert_eq!(summary.calls, 1);
    assert!(summary.avg_confidence.is_some());
    assert!(summary.avg_user_feedback.is_some());
    assert!(summary.avg_cost_per_call.unwrap() > 0.0);
}

#[tokio::test]
async fn test_translate_withEveryBackendDown_shouldSurfaceExhaustion() {
    let controller = common::memory_controller();
    let transport = MockTransport::failing();
    let invoker = controller.invoker(Arc::new(transport.clone()));

    let error = invoker
        .translate(&ResolutionRequest::new("en", "zh", "oncology"), "Metastasis in the liver.")
        .await
        .unwrap_err();

    assert_eq!(error.failures.len(), 2);
    assert!(error.to_string().contains("All 2 candidate backends failed"));
    assert_eq!(transport.request_count(), 2);
    for failure in &error.failures {
        assert!(matches!(failure.reason, ProviderError::RequestFailed(_)));
        assert_eq!(controller.summarize(&failure.backend_id).error_rate, Some(1.0));
    }
}

#[tokio::test]
async fn test_translate_withEmptyTranslation_shouldFallBack() {
    let controller = common::memory_controller();
    let transport = MockTransport::working("La paciente está estable.").with_backend("mistral-large", MockBehavior::Empty);
    let invoker = controller.invoker(Arc::new(transport));

    let outcome = invoker
        .translate(&ResolutionRequest::new("en", "es", "general"), "The patient is stable.")
        .await
        .unwrap();

    assert_eq!(outcome.backend_id, "claude-3-sonnet");
    assert!(outcome.used_fallback());
    assert!(matches!(outcome.failures[0].reason, ProviderError::ParseError(_)));
}

#[tokio::test]
async fn test_translate_whenCallerAbandons_shouldRecordInFlightAttemptOnly() {
    let controller = common::memory_controller();
    let transport = MockTransport::working("Le patient est stable.")
        .with_backend("mistral-large", MockBehavior::Slow { delay_ms: 200 });
    let invoker = controller.invoker(Arc::new(transport.clone()));
    let request = ResolutionRequest::new("en", "fr", "general");

    let abandoned = tokio::time::timeout(
        Duration::from_millis(50),
        invoker.translate(&request, "The patient is stable."),
    )
    .await;
    assert!(abandoned.is_err());

    tokio::time::sleep(Duration::from_millis(400)).await;

    assert_eq!(transport.calls(), vec!["mistral-large".to_string()]);
    let summary = controller.summarize("mistral-large");
    assert_eq!(summary.calls, 1);
    assert_eq!(summary.error_rate, Some(0.0));
}

#[tokio::test]
async fn test_translate_withIntermittentBackend_shouldRecoverOnNextRequest() {
    let controller = common::memory_controller();
    let transport = MockTransport::working("Der Patient ist stabil.")
        .with_backend("titan-text-express", MockBehavior::Intermittent { fail_every: 2 });
    let invoker = controller.invoker(Arc::new(transport.clone()));
    let request = ResolutionRequest::new("en", "de", "general");

    let first = invoker.translate(&request, "The patient is stable.").await.unwrap();
    let second = invoker.translate(&request, "The patient is stable.").await.unwrap();

    assert_eq!(first.backend_id, "titan-text-express");
    assert_eq!(second.backend_id, "claude-3-sonnet");
    assert_eq!(second.failures[0].backend_id, "titan-text-express");
    assert_ne!(second.assessment.level, ConfidenceLevel::Insufficient);
}
