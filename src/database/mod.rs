/*!
 * Database module for persistent storage of confidence thresholds.
 *
 * This module provides SQLite-based persistence for:
 * - Per-domain and per-language-pair threshold sets
 * - The feedback audit trail
 */

pub mod connection;
pub mod repository;
pub mod schema;

// Re-export main types
pub use connection::DatabaseConnection;
pub use repository::{SqliteThresholdStore, ThresholdRecord};
