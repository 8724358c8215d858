/*!
 * Common test utilities for the medroute test suite
 */

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

use medroute::app_config::Config;
use medroute::{Controller, SqliteThresholdStore};

pub use medroute::providers::mock::{MockBehavior, MockTransport};

/// Cardiology sentence with three critical terms
pub const CARDIOLOGY_SOURCE: &str =
    "The patient had a heart attack, an arrhythmia and high blood pressure last night.";

/// Spanish translation keeping all three critical terms
pub const CARDIOLOGY_FAITHFUL: &str =
    "El paciente tuvo un ataque cardíaco, una arritmia y presión arterial alta anoche.";

/// Spanish translation keeping only "arritmia"
pub const CARDIOLOGY_LOSSY: &str =
    "El paciente tuvo un problema del corazón, una arritmia y tensión alta anoche.";

/// Every language referenced by the default catalog and groups, plus uncovered ones
pub const LANGUAGES: &[&str] = &[
    "en", "es", "fr", "de", "it", "pt", "nl", "ro", "ca", "sv", "da", "ru", "pl", "uk", "cs", "zh", "ja", "ko", "ar",
    "he", "fa", "hi", "bn", "ur", "ta", "sw", "fi",
];

/// Every configured domain plus one unknown domain
pub fn domains(config: &Config) -> Vec<String> {
    let mut domains: Vec<String> = config.domains.keys().cloned().collect();
    domains.sort();
    domains.push("astrology".to_string());
    domains
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Controller over an in-memory threshold store
pub fn memory_controller() -> Controller {
    Controller::in_memory(Config::default()).expect("default configuration should be valid")
}

/// Controller over an SQLite file at `path`
pub fn sqlite_controller(path: &Path) -> Result<Controller> {
    let store = SqliteThresholdStore::open(path)?;
    Controller::with_config(Config::default(), Arc::new(store))
}

/// Enable log output for a test run
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
