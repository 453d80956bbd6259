//! # Setting Repository
//!
//! Persisted setting overrides.
//!
//! ## Write-Through
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  config.update("TAX", "MODULE", "tax.modules.percent")                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  registry journal: [Upsert TAX.MODULE = "tax.modules.percent"]        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  write_through(&mut config)                                            │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   SINGLE TRANSACTION                            │   │
//! │  │  Upsert → INSERT .. ON CONFLICT (group_key, key) DO UPDATE     │   │
//! │  │  Delete → DELETE FROM settings WHERE group_key = ? AND key = ? │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  Startup: hydrate(&mut config) loads every row as an override.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::error::DbResult;
use satchmo_core::configuration::{ConfigurationSettings, SettingChange, SettingKey};

#[derive(Debug, sqlx::FromRow)]
struct SettingRow {
    group_key: String,
    key: String,
    value: String,
}

/// Repository for persisted setting overrides.
#[derive(Debug, Clone)]
pub struct SettingRepository {
    pool: SqlitePool,
}

impl SettingRepository {
    /// Creates a new SettingRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SettingRepository { pool }
    }

    /// Every stored override.
    pub async fn load_all(&self) -> DbResult<Vec<(SettingKey, String)>> {
        let rows: Vec<SettingRow> = sqlx::query_as(
            r#"
            SELECT group_key, key, value
            FROM settings
            ORDER BY group_key, key
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| (SettingKey::new(r.group_key, r.key), r.value))
            .collect())
    }

    /// Raw stored value of one setting.
    pub async fn get(&self, group: &str, key: &str) -> DbResult<Option<String>> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM settings WHERE group_key = ?1 AND key = ?2")
                .bind(group)
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        Ok(value)
    }

    /// Loads every stored override into the registry.
    ///
    /// Returns the number of overrides loaded.
    pub async fn hydrate(&self, config: &mut ConfigurationSettings) -> DbResult<usize> {
        let rows = self.load_all().await?;
        let count = rows.len();

        for (key, value) in rows {
            if !config.config_exists(&key.group, &key.key) {
                warn!(setting = %key, "Stored override for unregistered setting");
            }
            config.load_persisted(key, value);
        }

        info!(count, "Setting overrides loaded");
        Ok(count)
    }

    /// Applies journalled changes in one transaction.
    pub async fn persist(&self, changes: &[SettingChange]) -> DbResult<usize> {
        if changes.is_empty() {
            return Ok(0);
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        for change in changes {
            match change {
                SettingChange::Upsert { key, value } => {
                    debug!(setting = %key, "Upserting setting");
                    sqlx::query(
                        r#"
                        INSERT INTO settings (group_key, key, value, updated_at)
                        VALUES (?1, ?2, ?3, ?4)
                        ON CONFLICT (group_key, key) DO UPDATE SET
                            value = excluded.value,
                            updated_at = excluded.updated_at
                        "#,
                    )
                    .bind(&key.group)
                    .bind(&key.key)
                    .bind(value)
                    .bind(now)
                    .execute(&mut *tx)
                    .await?;
                }
                SettingChange::Delete { key } => {
                    debug!(setting = %key, "Deleting setting");
                    sqlx::query("DELETE FROM settings WHERE group_key = ?1 AND key = ?2")
                        .bind(&key.group)
                        .bind(&key.key)
                        .execute(&mut *tx)
                        .await?;
                }
            }
        }

        tx.commit().await?;
        Ok(changes.len())
    }

    /// Drains the registry's journal and persists it.
    ///
    /// If the write fails the changes are put back on the journal, so a
    /// later call retries them.
    pub async fn write_through(&self, config: &mut ConfigurationSettings) -> DbResult<usize> {
        let changes = config.drain_changes();
        match self.persist(&changes).await {
            Ok(count) => Ok(count),
            Err(e) => {
                warn!(error = %e, pending = changes.len(), "Setting write-through failed");
                config.requeue_changes(changes);
                Err(e)
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
