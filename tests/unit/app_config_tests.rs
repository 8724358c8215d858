/*!
 * Tests for configuration loading and validation
 */

use anyhow::Result;
use std::fs;
use std::path::PathBuf;

use medroute::app_config::{Config, LogLevel};
use medroute::{BackendDescriptor, BackendFamily, CostTier};

use crate::common;

#[test]
fn test_fromFile_withPartialDocument_shouldKeepDefaultsForTheRest() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let path = dir.path().join("conf.json");
    fs::write(
        &path,
        r#"{
            "routing": {"cost_optimization": true, "default_fallback_order": ["glossary", "claude"]},
            "storage": {"database_path": "/tmp/medroute-test.db"}
        }"#,
    )?;

    let config = Config::from_file(&path)?;

    assert!(config.routing.cost_optimization);
    assert_eq!(config.routing.max_attempts, 3);
    assert_eq!(
        config.routing.default_fallback_order,
        vec![BackendFamily::Glossary, BackendFamily::Claude]
    );
    assert_eq!(config.database_path()?, PathBuf::from("/tmp/medroute-test.db"));
    assert_eq!(config.log_level, LogLevel::Info);
    assert!(config.domain_profile("cardiology").is_some());
    Ok(())
}

#[test]
fn test_fromFile_withUnknownFamily_shouldFail() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let path = dir.path().join("conf.json");
    fs::write(&path, r#"{"routing": {"default_family": "gpt"}}"#)?;

    assert!(Config::from_file(&path).is_err());
    Ok(())
}

#[test]
fn test_fromFile_withMissingFile_shouldFail() {
    assert!(Config::from_file("/nonexistent/medroute/conf.json").is_err());
}

#[test]
fn test_validate_withDuplicateBackendIds_shouldFail() {
    let mut config = Config::default();
    config.catalog.push(BackendDescriptor::new(
        "claude-3-haiku",
        BackendFamily::Claude,
        &["en"],
        CostTier::Economy,
    ));
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_withOutOfRangeComplexity_shouldFail() {
    let mut config = Config::default();
    config.domains.get_mut("oncology").unwrap().complexity = 2.5;
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_withEmptyCatalog_shouldFail() {
    let mut config = Config::default();
    config.catalog.clear();
    assert!(config.validate().is_err());
}

#[test]
fn test_save_withCustomDomain_shouldRoundTrip() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let path = dir.path().join("conf.json");

    let mut config = Config::default();
    let mut profile = config.domains["cardiology"].clone();
    profile.critical_terms = vec!["tachycardia".to_string()];
    config.domains.insert("electrophysiology".to_string(), profile);
    config.save(&path)?;

    let loaded = Config::from_file(&path)?;
    let profile = loaded.domain_profile("Electrophysiology").unwrap();
    assert_eq!(profile.critical_terms, vec!["tachycardia".to_string()]);
    assert_eq!(profile.preferred_family, Some(BackendFamily::Claude));
    assert!(loaded.validate().is_ok());
    Ok(())
}

#[test]
fn test_defaultConfig_shouldCoverEveryFamily() {
    let config = Config::default();
    for family in BackendFamily::ALL {
        assert!(
            config.catalog.iter().any(|backend| backend.family == family),
            "no default backend for {}",
            family
        );
    }
}
