// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! SQL dead-letter store.
//!
//! Mutations that exhausted their retries are parked in the
//! `dead_letter_tasks` table until the replay scheduler re-enqueues them.
//! Works against SQLite and MySQL through sqlx's `Any` driver.
//!
//! Schema:
//! ```sql
//! CREATE TABLE dead_letter_tasks (
//!   id          BIGINT PRIMARY KEY AUTO_INCREMENT,
//!   task_id     BIGINT NOT NULL,
//!   payload     TEXT NOT NULL,     -- serialized Task JSON
//!   error_msg   TEXT NOT NULL,     -- last error before dead-lettering
//!   retry_count INT NOT NULL,
//!   failed_at   BIGINT NOT NULL    -- epoch millis, scan ordering key
//! )
//! ```
//!
//! ## sqlx Any Driver Quirks
//!
//! The `Any` driver treats MySQL TEXT columns as BLOB, so reads try
//! `String` first (SQLite) and fall back to `Vec<u8>` (MySQL).

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{any::AnyPoolOptions, AnyPool, Row};
use std::sync::Once;
use std::time::Duration;

use super::traits::{DeadLetterEntry, DeadLetterStore, StorageError};
use crate::resilience::retry::{retry, RetryConfig};

const TABLE_NAME: &str = "dead_letter_tasks";

// SQLx `Any` driver requires runtime installation
static INSTALL_DRIVERS: Once = Once::new();

fn install_drivers() {
    INSTALL_DRIVERS.call_once(|| {
        sqlx::any::install_default_drivers();
    });
}

pub struct SqlDeadLetterStore {
    pool: AnyPool,
    is_sqlite: bool,
}

impl SqlDeadLetterStore {
    /// Create a new store with startup-mode retry (fails fast if the
    /// connection string is wrong).
    pub async fn new(connection_string: &str) -> Result<Self, StorageError> {
        install_drivers();

        let is_sqlite = connection_string.starts_with("sqlite:");

        let pool = retry("dead_letter_connect", &RetryConfig::startup(), || async {
            AnyPoolOptions::new()
                .max_connections(5)
                .acquire_timeout(Duration::from_secs(10))
                .connect(connection_string)
                .await
                .map_err(|e| StorageError::Backend(e.to_string()))
        })
        .await?;

        let store = Self { pool, is_sqlite };

        // WAL mode for SQLite (better concurrency between worker and replay)
        if is_sqlite {
            store.enable_wal_mode().await?;
        }

        store.init_schema().await?;
        Ok(store)
    }

    /// Get a clone of the connection pool.
    pub fn pool(&self) -> AnyPool {
        self.pool.clone()
    }

    async fn enable_wal_mode(&self) -> Result<(), StorageError> {
        sqlx::query("PRAGMA journal_mode = WAL")
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(format!("Failed to enable WAL mode: {}", e)))?;

        sqlx::query("PRAGMA synchronous = NORMAL")
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(format!("Failed to set synchronous mode: {}", e)))?;

        Ok(())
    }

    async fn init_schema(&self) -> Result<(), StorageError> {
        let sql = if self.is_sqlite {
            format!(
                r#"
                CREATE TABLE IF NOT EXISTS {} (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    task_id INTEGER NOT NULL,
                    payload TEXT NOT NULL,
                    error_msg TEXT NOT NULL,
                    retry_count INTEGER NOT NULL,
                    failed_at INTEGER NOT NULL
                )
                "#,
                TABLE_NAME
            )
        } else {
            format!(
                r#"
                CREATE TABLE IF NOT EXISTS {} (
                    id BIGINT PRIMARY KEY AUTO_INCREMENT,
                    task_id BIGINT NOT NULL,
                    payload TEXT NOT NULL,
                    error_msg TEXT NOT NULL,
                    retry_count INT NOT NULL,
                    failed_at BIGINT NOT NULL,
                    INDEX idx_failed_at (failed_at)
                )
                "#,
                TABLE_NAME
            )
        };

        retry("dead_letter_init_schema", &RetryConfig::startup(), || async {
            sqlx::query(&sql)
                .execute(&self.pool)
                .await
                .map_err(|e| StorageError::Backend(e.to_string()))
        })
        .await?;

        Ok(())
    }

    /// Count entries currently parked in the store.
    pub async fn count(&self) -> Result<u64, StorageError> {
        let sql = format!("SELECT COUNT(*) as cnt FROM {}", TABLE_NAME);
        let result = sqlx::query(&sql)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        let count: i64 = result
            .try_get("cnt")
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        Ok(count as u64)
    }
}

/// Read a TEXT column that the Any driver may surface as String (SQLite) or
/// bytes (MySQL).
fn text_column(row: &sqlx::any::AnyRow, column: &str) -> Result<String, StorageError> {
    row.try_get::<String, _>(column)
        .ok()
        .or_else(|| {
            row.try_get::<Vec<u8>, _>(column)
                .ok()
                .and_then(|bytes| String::from_utf8(bytes).ok())
        })
        .ok_or_else(|| StorageError::Backend(format!("unreadable column '{}'", column)))
}

#[async_trait]
impl DeadLetterStore for SqlDeadLetterStore {
    async fn append(
        &self,
        task_id: i64,
        payload: &str,
        error: &str,
        retry_count: u32,
    ) -> Result<i64, StorageError> {
        let sql = format!(
            "INSERT INTO {} (task_id, payload, error_msg, retry_count, failed_at) VALUES (?, ?, ?, ?, ?)",
            TABLE_NAME
        );
        let failed_at = Utc::now().timestamp_millis();

        retry("dead_letter_append", &RetryConfig::query(), || async {
            let result = sqlx::query(&sql)
                .bind(task_id)
                .bind(payload)
                .bind(error)
                .bind(retry_count as i64)
                .bind(failed_at)
                .execute(&self.pool)
                .await
                .map_err(|e| StorageError::Backend(e.to_string()))?;

            Ok(result.last_insert_id().unwrap_or_default())
        })
        .await
    }

    async fn scan(&self, limit: usize) -> Result<Vec<DeadLetterEntry>, StorageError> {
        let sql = format!(
            "SELECT id, task_id, payload, error_msg, retry_count, failed_at FROM {} ORDER BY failed_at ASC, id ASC LIMIT ?",
            TABLE_NAME
        );

        let rows = retry("dead_letter_scan", &RetryConfig::query(), || async {
            sqlx::query(&sql)
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| StorageError::Backend(e.to_string()))
        })
        .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let entry_id: i64 = row
                .try_get("id")
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            let task_id: i64 = row
                .try_get("task_id")
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            let retry_count: i64 = row.try_get("retry_count").unwrap_or(0);
            let failed_at: i64 = row.try_get("failed_at").unwrap_or(0);

            entries.push(DeadLetterEntry {
                entry_id,
                task_id,
                payload: text_column(&row, "payload")?,
                error: text_column(&row, "error_msg")?,
                retry_count: retry_count as u32,
                failed_at,
            });
        }

        Ok(entries)
    }

    async fn delete(&self, entry_id: i64) -> Result<(), StorageError> {
        let sql = format!("DELETE FROM {} WHERE id = ?", TABLE_NAME);

        retry("dead_letter_delete", &RetryConfig::query(), || async {
            // rows_affected 0 means someone else already deleted it; fine
            sqlx::query(&sql)
                .bind(entry_id)
                .execute(&self.pool)
                .await
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            Ok(())
        })
        .await
    }
}
