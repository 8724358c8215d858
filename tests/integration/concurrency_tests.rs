/*!
 * Integration tests for concurrent metric recording and feedback
 */

use anyhow::Result;
use futures::future::join_all;
use std::sync::Arc;

use medroute::app_config::Config;
use medroute::performance::{MetricSample, PerformanceTracker};
use medroute::thresholds::{ConfidenceLevel, ThresholdKey, ThresholdStore, UserFeedback};
use medroute::{Controller, SqliteThresholdStore};

use crate::common;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_record_with120ConcurrentCalls_shouldKeepTheNewest100() {
    let tracker = Arc::new(PerformanceTracker::new());

    let tasks = (0..120).map(|i| {
        let tracker = Arc::clone(&tracker);
        tokio::spawn(async move {
            tracker.record("titan-text-express", MetricSample::success(f64::from(i)));
        })
    });
    for joined in join_all(tasks).await {
        joined.unwrap();
    }

    let summary = tracker.summarize("titan-text-express");
    assert_eq!(summary.calls, 100);
    assert_eq!(summary.error_rate, Some(0.0));

    // any 100 of 0..120 average between these bounds
    let mean = summary.avg_response_time_ms.unwrap();
    assert!((49.5..=69.5).contains(&mean), "mean {}", mean);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_record_onDifferentBackends_shouldNotInterfere() {
    let tracker = Arc::new(PerformanceTracker::new());
    let backends = ["claude-3-sonnet", "llama-3-70b", "mistral-7b"];

    let tasks = (0..300).map(|i| {
        let tracker = Arc::clone(&tracker);
        let backend = backends[i % backends.len()];
        tokio::spawn(async move {
            let sample = if backend == "llama-3-70b" {
                MetricSample::failure(4000.0)
            } else {
                MetricSample::success(800.0)
            };
            tracker.record(backend, sample);
        })
    });
    for joined in join_all(tasks).await {
        joined.unwrap();
    }

    assert_eq!(tracker.total_calls(), 300);
    assert_eq!(tracker.summarize("llama-3-70b").error_rate, Some(1.0));
    assert_eq!(tracker.summarize("mistral-7b").error_rate, Some(0.0));
    assert_eq!(tracker.snapshot().len(), 3);
}

#[test]
fn test_applyFeedback_concurrentlyOnOneKey_shouldNotLoseUpdates() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let store = Arc::new(SqliteThresholdStore::open(dir.path().join("medroute.db"))?);
    let controller = Controller::with_config(Config::default(), store.clone())?;
    let feedback = UserFeedback::new(3);

    // rating 3 at medium raises domain medium by 0.01 and pair medium by 0.005;
    // the first event creates both records before the threads race
    assert!(controller.apply_feedback("general", "en", "es", ConfidenceLevel::Medium, &feedback));

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                for _ in 0..5 {
                    assert!(controller.apply_feedback("general", "en", "es", ConfidenceLevel::Medium, &feedback));
                }
            });
        }
    });

    let records = store.records()?;
    let domain = records
        .iter()
        .find(|record| record.key == ThresholdKey::domain("general"))
        .unwrap();
    assert_eq!(domain.update_count, 21);
    // medium stops at 0.95 once high is capped at 1.0
    assert!((domain.thresholds.medium - 0.95).abs() < 1e-9);
    assert!((domain.thresholds.high - 1.0).abs() < 1e-9);

    let pair = store.load(&ThresholdKey::pair("en", "es"))?.unwrap();
    assert!((pair.medium - 0.855).abs() < 1e-9);
    assert_eq!(store.feedback_events(100)?.len(), 21);
    Ok(())
}
