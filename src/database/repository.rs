/*!
 * Repository layer for threshold persistence.
 *
 * `SqliteThresholdStore` implements `ThresholdStore` on top of the SQLite
 * connection: one `threshold_sets` row per key, read-modify-write inside a
 * transaction, and an append-only `feedback_events` audit table.
 */

use anyhow::{Context, Result};
use chrono::Utc;
use log::{debug, warn};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;

use super::connection::DatabaseConnection;
use crate::errors::PersistenceError;
use crate::thresholds::{ConfidenceLevel, FeedbackRecord, ThresholdKey, ThresholdSet, ThresholdStore};

/// A stored threshold row with its bookkeeping columns
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdRecord {
    pub key: ThresholdKey,
    pub thresholds: ThresholdSet,
    /// Number of feedback updates applied to this row
    pub update_count: i64,
    /// RFC 3339 timestamp of the last write
    pub updated_at: String,
}

/// Durable threshold store backed by SQLite
#[derive(Debug, Clone)]
pub struct SqliteThresholdStore {
    db: DatabaseConnection,
}

impl SqliteThresholdStore {
    /// Create a store over an existing connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Open (or create) the database file at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(DatabaseConnection::new(path)?))
    }

    /// Create a store with an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        Ok(Self::new(DatabaseConnection::new_in_memory()?))
    }

    /// Every threshold row, ordered by key
    pub fn records(&self) -> Result<Vec<ThresholdRecord>> {
        self.db.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT key, high, medium, low, update_count, updated_at FROM threshold_sets ORDER BY key",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    ThresholdSet::new(row.get(1)?, row.get(2)?, row.get(3)?),
                    row.get::<_, i64>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })?;

            let mut records = Vec::new();
            for row in rows {
                let (key, thresholds, update_count, updated_at) = row?;
                match ThresholdKey::from_storage_key(&key) {
                    Some(key) => records.push(ThresholdRecord {
                        key,
                        thresholds,
                        update_count,
                        updated_at,
                    }),
                    None => warn!("Skipping threshold row with unrecognized key {}", key),
                }
            }
            Ok(records)
        })
    }

    /// Most recent feedback events, newest first
    pub fn feedback_events(&self, limit: usize) -> Result<Vec<FeedbackRecord>> {
        self.db.execute(|conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT id, domain, source_language, target_language, level, rating,
                       issues, comment, backend_id, adjustment, created_at
                FROM feedback_events
                ORDER BY created_at DESC, rowid DESC
                LIMIT ?1
                "#,
            )?;
            let rows = stmt.query_map(params![limit as i64], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, u8>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, Option<String>>(7)?,
                    row.get::<_, Option<String>>(8)?,
                    row.get::<_, f64>(9)?,
                    row.get::<_, String>(10)?,
                ))
            })?;

            let mut events = Vec::new();
            for row in rows {
                let (id, domain, source_language, target_language, level, rating, issues, comment, backend_id, adjustment, created_at) =
                    row?;
                let level: ConfidenceLevel = level
                    .parse()
                    .with_context(|| format!("Feedback event {} has an invalid level", id))?;
                let issues = serde_json::from_str(&issues)
                    .with_context(|| format!("Feedback event {} has invalid issues", id))?;
                events.push(FeedbackRecord {
                    id,
                    domain,
                    source_language,
                    target_language,
                    level,
                    rating,
                    issues,
                    comment,
                    backend_id,
                    adjustment,
                    created_at,
                });
            }
            Ok(events)
        })
    }
}

fn select_set(conn: &Connection, storage_key: &str) -> Result<Option<ThresholdSet>> {
    let set = conn
        .query_row(
            "SELECT high, medium, low FROM threshold_sets WHERE key = ?1",
            params![storage_key],
            |row| Ok(ThresholdSet::new(row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()?;
    Ok(set)
}

fn checked(key: &ThresholdKey, set: Option<ThresholdSet>) -> Result<Option<ThresholdSet>, PersistenceError> {
    match set {
        Some(set) if !set.is_ordered() => Err(PersistenceError::Corrupt {
            key: key.storage_key(),
            message: format!("stored thresholds violate ordering: {}", set),
        }),
        other => Ok(other),
    }
}

impl ThresholdStore for SqliteThresholdStore {
    fn load(&self, key: &ThresholdKey) -> Result<Option<ThresholdSet>, PersistenceError> {
        let storage_key = key.storage_key();
        let set = self.db.execute(|conn| select_set(conn, &storage_key))?;
        checked(key, set)
    }

    fn update(
        &self,
        key: &ThresholdKey,
        seed: ThresholdSet,
        apply: &mut dyn FnMut(&mut ThresholdSet),
    ) -> Result<ThresholdSet, PersistenceError> {
        let storage_key = key.storage_key();

        let updated = self.db.transaction(|tx| {
            let mut set = select_set(tx, &storage_key)?.unwrap_or(seed);
            apply(&mut set);

            tx.execute(
                r#"
                INSERT INTO threshold_sets (key, high, medium, low, update_count, updated_at)
                VALUES (?1, ?2, ?3, ?4, 1, ?5)
                ON CONFLICT(key) DO UPDATE SET
                    high = excluded.high,
                    medium = excluded.medium,
                    low = excluded.low,
                    update_count = threshold_sets.update_count + 1,
                    updated_at = excluded.updated_at
                "#,
                params![storage_key, set.high, set.medium, set.low, Utc::now().to_rfc3339()],
            )
            .with_context(|| format!("Failed to write thresholds for {}", storage_key))?;

            Ok(set)
        })?;

        debug!("Stored thresholds for {}: {}", storage_key, updated);
        Ok(updated)
    }

    fn record_feedback(&self, record: &FeedbackRecord) -> Result<(), PersistenceError> {
        let issues = serde_json::to_string(&record.issues).map_err(|e| PersistenceError::Storage(e.to_string()))?;

        self.db.execute(|conn| {
            conn.execute(
                r#"
                INSERT INTO feedback_events (
                    id, domain, source_language, target_language, level, rating,
                    issues, comment, backend_id, adjustment, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                "#,
                params![
                    record.id,
                    record.domain,
                    record.source_language,
                    record.target_language,
                    record.level.as_str(),
                    record.rating,
                    issues,
                    record.comment,
                    record.backend_id,
                    record.adjustment,
                    record.created_at,
                ],
            )?;
            Ok(())
        })?;

        Ok(())
    }

    fn list(&self) -> Result<Vec<(ThresholdKey, ThresholdSet)>, PersistenceError> {
        Ok(self
            .records()?
            .into_iter()
            .map(|record| (record.key, record.thresholds))
            .collect())
    }
}
