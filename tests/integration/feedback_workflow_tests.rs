/*!
 * Integration tests for feedback persisted through SQLite
 */

use anyhow::Result;
use std::sync::Arc;

use medroute::app_config::Config;
use medroute::thresholds::{ConfidenceLevel, FeedbackIssue, ThresholdContext, ThresholdKey, ThresholdStore, UserFeedback};
use medroute::{Controller, SqliteThresholdStore};

use crate::common;

const TEXT: &str = "Monitor the patient's heart rhythm closely overnight.";

fn close(actual: f64, expected: f64) -> bool {
    (actual - expected).abs() < 1e-9
}

#[test]
fn test_applyFeedback_cardiologyHighRatingOne_shouldRaiseHighAndMedium() -> Result<()> {
    common::init_logging();
    let dir = common::create_temp_dir()?;
    let store = Arc::new(SqliteThresholdStore::open(dir.path().join("medroute.db"))?);
    let controller = Controller::with_config(Config::default(), store.clone())?;

    let neurology_before = controller.compute_thresholds("neurology", "en", "fr", TEXT, &ThresholdContext::default())?;

    let feedback = UserFeedback::new(1)
        .with_issue(FeedbackIssue::Terminology)
        .for_backend("claude-3-sonnet");
    assert!(controller.apply_feedback("cardiology", "en", "es", ConfidenceLevel::High, &feedback));

    let domain = store.load(&ThresholdKey::domain("cardiology"))?.unwrap();
    assert!(close(domain.high, 0.965));
    assert!(close(domain.medium, 0.845));
    assert!(close(domain.low, 0.65));

    // the new pair record starts from the cardiology seed {0.92, 0.80, 0.65}
    let pair = store.load(&ThresholdKey::pair("en", "es"))?.unwrap();
    assert!(close(pair.high, 0.9425));
    assert!(close(pair.medium, 0.8225));
    assert!(close(pair.low, 0.65));

    assert_eq!(store.load(&ThresholdKey::domain("neurology"))?, None);
    let neurology_after = controller.compute_thresholds("neurology", "en", "fr", TEXT, &ThresholdContext::default())?;
    assert_eq!(neurology_before, neurology_after);

    let summary = controller.summarize("claude-3-sonnet");
    assert!(close(summary.avg_user_feedback.unwrap(), 0.2));
    Ok(())
}

#[test]
fn test_applyFeedback_cardiologyHighRatingOne_shouldRaiseComputedThresholds() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let controller = common::sqlite_controller(&dir.path().join("medroute.db"))?;
    let context = ThresholdContext::default();

    let before = controller.compute_thresholds("cardiology", "en", "es", TEXT, &context)?;
    let feedback = UserFeedback::new(1).with_issue(FeedbackIssue::Terminology);
    assert!(controller.apply_feedback("cardiology", "en", "es", ConfidenceLevel::High, &feedback));
    let after = controller.compute_thresholds("cardiology", "en", "es", TEXT, &context)?;

    assert!(after.high > before.high, "{} -> {}", before, after);
    assert!(after.medium > before.medium, "{} -> {}", before, after);
    assert!(after.low >= before.low, "{} -> {}", before, after);
    Ok(())
}

#[test]
fn test_applyFeedback_shouldWriteAuditEvent() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let store = Arc::new(SqliteThresholdStore::open(dir.path().join("medroute.db"))?);
    let controller = Controller::with_config(Config::default(), store.clone())?;

    let feedback = UserFeedback::new(5).with_comment("perfect");
    assert!(controller.apply_feedback("general", "en", "de", ConfidenceLevel::Medium, &feedback));

    let events = store.feedback_events(10)?;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].rating, 5);
    assert_eq!(events[0].level, ConfidenceLevel::Medium);
    assert_eq!(events[0].comment.as_deref(), Some("perfect"));
    assert!(close(events[0].adjustment, 0.02));
    Ok(())
}

#[test]
fn test_feedback_shouldSurviveRestart() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let path = dir.path().join("medroute.db");
    let context = ThresholdContext::default();

    let before = {
        let controller = common::sqlite_controller(&path)?;
        let before = controller.compute_thresholds("oncology", "en", "it", TEXT, &context)?;
        let feedback = UserFeedback::new(2).with_issue(FeedbackIssue::Meaning);
        assert!(controller.apply_feedback("oncology", "en", "it", ConfidenceLevel::Medium, &feedback));
        before
    };

    let store = SqliteThresholdStore::open(&path)?;
    let domain = store.load(&ThresholdKey::domain("oncology"))?.unwrap();
    assert!(close(domain.medium, 0.82 + 0.039));
    let pair = store.load(&ThresholdKey::pair("en", "it"))?.unwrap();
    assert!(close(pair.medium, 0.82 + 0.0195));

    let restarted = common::sqlite_controller(&path)?;
    let after = restarted.compute_thresholds("oncology", "en", "it", TEXT, &context)?;
    assert!(after.medium > before.medium, "{} -> {}", before, after);
    assert!(after.high >= before.high, "{} -> {}", before, after);
    assert!(after.is_ordered());
    Ok(())
}

#[test]
fn test_applyFeedback_withUnchangedDirection_shouldNotWriteThresholds() -> Result<()> {
    let store = Arc::new(SqliteThresholdStore::new_in_memory()?);
    let controller = Controller::with_config(Config::default(), store.clone())?;

    // accurate and already high: nothing to correct
    let outcome = controller.feedback_loop().apply(
        "general",
        "en",
        "es",
        ConfidenceLevel::High,
        &UserFeedback::new(5),
    )?;

    assert!(!outcome.changed);
    assert!(store.records()?.is_empty());
    Ok(())
}

#[test]
fn test_applyFeedback_withInvalidRating_shouldReportFailure() {
    let controller = common::memory_controller();
    assert!(!controller.apply_feedback("general", "en", "es", ConfidenceLevel::Low, &UserFeedback::new(0)));
    assert!(!controller.apply_feedback("general", "en", "es", ConfidenceLevel::Low, &UserFeedback::new(9)));
}
