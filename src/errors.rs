/*!
 * Error types for the medroute library.
 *
 * This module contains custom error types for the different parts of the
 * routing core, using the thiserror crate for ergonomic error definitions.
 * Only `ExhaustionError` is terminal for a translation request; every other
 * category degrades to a default or is reported as a boolean failure.
 */

use std::fmt;

use thiserror::Error;

/// Errors that can occur when a single backend attempt fails
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// Error when sending the request to the backend fails
    #[error("Backend request failed: {0}")]
    RequestFailed(String),

    /// Error when the backend response does not have the expected shape
    #[error("Failed to parse backend response: {0}")]
    ParseError(String),

    /// The attempt exceeded its per-attempt timeout
    #[error("Backend attempt timed out after {0} ms")]
    Timeout(u64),

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// The attempt task was torn down before it produced a result
    #[error("Backend attempt cancelled: {0}")]
    Cancelled(String),
}

/// Unknown or invalid configuration. Callers degrade to defaults.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    /// No backend with this id in the catalog
    #[error("Unknown backend: {0}")]
    UnknownBackend(String),

    /// No backend family with this name
    #[error("Unknown backend family: {0}")]
    UnknownFamily(String),

    /// No confidence level with this name
    #[error("Unknown confidence level: {0}")]
    UnknownLevel(String),

    /// The catalog has no backends at all
    #[error("Provider catalog is empty")]
    EmptyCatalog,

    /// Any other invalid configuration value
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// A confidence signal could not be computed
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// The term extractor could not process the text
    #[error("Term extractor unavailable: {0}")]
    ExtractorUnavailable(String),

    /// Thresholds could not be read for the request
    #[error("Threshold lookup failed: {0}")]
    Thresholds(String),
}

/// Threshold or feedback persistence failed
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PersistenceError {
    /// The backing store rejected the read or write
    #[error("Storage error: {0}")]
    Storage(String),

    /// A stored record could not be decoded
    #[error("Corrupt record for key {key}: {message}")]
    Corrupt {
        /// Storage key of the record
        key: String,
        /// Decoding failure
        message: String,
    },

    /// The feedback event itself is not applicable
    #[error("Invalid feedback: {0}")]
    InvalidFeedback(String),
}

impl From<rusqlite::Error> for PersistenceError {
    fn from(error: rusqlite::Error) -> Self {
        Self::Storage(error.to_string())
    }
}

impl From<anyhow::Error> for PersistenceError {
    fn from(error: anyhow::Error) -> Self {
        Self::Storage(format!("{:#}", error))
    }
}

/// One failed entry of a fallback chain
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptFailure {
    /// Backend that was attempted
    pub backend_id: String,
    /// Why it failed
    pub reason: ProviderError,
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.backend_id, self.reason)
    }
}

/// Every candidate of the chain failed
#[derive(Error, Debug, Clone, PartialEq)]
#[error("All {} candidate backends failed: [{}]", .failures.len(), join_failures(.failures))]
pub struct ExhaustionError {
    /// Per-candidate failure reasons, in attempt order
    pub failures: Vec<AttemptFailure>,
}

fn join_failures(failures: &[AttemptFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Main error type that wraps all other errors
#[derive(Error, Debug)]
pub enum RouterError {
    /// Configuration problem
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Signal computation problem
    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    /// Persistence problem
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// The fallback chain was exhausted
    #[error("Exhaustion error: {0}")]
    Exhaustion(#[from] ExhaustionError),

    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for RouterError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for RouterError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
