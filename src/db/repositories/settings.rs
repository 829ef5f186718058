//! Settings repository
//!
//! Database operations for the key/value settings table.
//!
//! This module provides:
//! - `SettingsRepository` trait defining the interface for settings
//! - `SqlxSettingsRepository` implementing the trait for SQLite and MySQL
//!
//! Blog configuration is one row per key, so a single key stays
//! independently updatable (`update_key`) while `update_blog` rewrites
//! the cohesive seven-key set inside one transaction. If any statement
//! of the batch fails, a reader observes none of the keys changed.

use crate::config::DatabaseDriver;
use crate::db::error::StoreError;
use crate::db::{tx, DynDatabasePool};
use crate::models::{setting_keys, Setting, SettingKind};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySql, MySqlPool, Row, Sqlite, SqlitePool, Transaction};
use std::sync::Arc;
use uuid::Uuid;

const INSERT_SETTING: &str = "INSERT INTO settings (uuid, `key`, value, type, created_at, \
     created_by, updated_at, updated_by) VALUES (?, ?, ?, ?, ?, ?, ?, ?)";

const UPDATE_SETTING: &str =
    "UPDATE settings SET value = ?, updated_at = ?, updated_by = ? WHERE `key` = ?";

const SELECT_SETTING: &str = "SELECT id, uuid, `key`, value, type, created_at, created_by, \
     updated_at, updated_by FROM settings";

/// The seven blog-configuration values written as one atomic batch.
#[derive(Debug, Clone)]
pub struct BlogSettingsUpdate {
    pub title: String,
    pub description: String,
    pub logo: String,
    pub cover: String,
    pub posts_per_page: i64,
    pub active_theme: String,
    /// Navigation entries already serialised to JSON
    pub navigation: String,
}

impl BlogSettingsUpdate {
    /// The batch as (key, value) pairs, in statement order.
    fn pairs(&self) -> [(&'static str, String); 7] {
        [
            (setting_keys::TITLE, self.title.clone()),
            (setting_keys::DESCRIPTION, self.description.clone()),
            (setting_keys::LOGO, self.logo.clone()),
            (setting_keys::COVER, self.cover.clone()),
            (setting_keys::POSTS_PER_PAGE, self.posts_per_page.to_string()),
            (setting_keys::ACTIVE_THEME, self.active_theme.clone()),
            (setting_keys::NAVIGATION, self.navigation.clone()),
        ]
    }
}

/// Settings repository trait
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// Insert a string-valued setting row; returns the surrogate id.
    async fn insert(
        &self,
        key: &str,
        value: &str,
        kind: SettingKind,
        created_at: DateTime<Utc>,
        created_by: i64,
    ) -> Result<i64, StoreError>;

    /// Insert an integer-valued setting row. Same transaction shape as
    /// the string variant; only the value's semantic type differs.
    async fn insert_number(
        &self,
        key: &str,
        value: i64,
        kind: SettingKind,
        created_at: DateTime<Utc>,
        created_by: i64,
    ) -> Result<i64, StoreError>;

    /// Point-update one key.
    async fn update_key(
        &self,
        key: &str,
        value: &str,
        updated_at: DateTime<Utc>,
        updated_by: i64,
    ) -> Result<(), StoreError>;

    /// Rewrite the seven blog keys inside a single transaction,
    /// all-or-nothing.
    async fn update_blog(
        &self,
        update: &BlogSettingsUpdate,
        updated_at: DateTime<Utc>,
        updated_by: i64,
    ) -> Result<(), StoreError>;

    /// Get one setting row by key
    async fn get(&self, key: &str) -> Result<Option<Setting>, StoreError>;

    /// All setting rows, ordered by key
    async fn get_all(&self) -> Result<Vec<Setting>, StoreError>;
}

/// SQLx-based settings repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxSettingsRepository {
    pool: DynDatabasePool,
}

impl SqlxSettingsRepository {
    /// Create a new SQLx settings repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a shared repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SettingsRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SettingsRepository for SqlxSettingsRepository {
    async fn insert(
        &self,
        key: &str,
        value: &str,
        kind: SettingKind,
        created_at: DateTime<Utc>,
        created_by: i64,
    ) -> Result<i64, StoreError> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                insert_setting_sqlite(
                    self.pool.as_sqlite().unwrap(),
                    key,
                    value,
                    kind,
                    created_at,
                    created_by,
                )
                .await
            }
            DatabaseDriver::Mysql => {
                insert_setting_mysql(
                    self.pool.as_mysql().unwrap(),
                    key,
                    value,
                    kind,
                    created_at,
                    created_by,
                )
                .await
            }
        }
    }

    async fn insert_number(
        &self,
        key: &str,
        value: i64,
        kind: SettingKind,
        created_at: DateTime<Utc>,
        created_by: i64,
    ) -> Result<i64, StoreError> {
        self.insert(key, &value.to_string(), kind, created_at, created_by)
            .await
    }

    async fn update_key(
        &self,
        key: &str,
        value: &str,
        updated_at: DateTime<Utc>,
        updated_by: i64,
    ) -> Result<(), StoreError> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                update_key_sqlite(
                    self.pool.as_sqlite().unwrap(),
                    key,
                    value,
                    updated_at,
                    updated_by,
                )
                .await
            }
            DatabaseDriver::Mysql => {
                update_key_mysql(
                    self.pool.as_mysql().unwrap(),
                    key,
                    value,
                    updated_at,
                    updated_by,
                )
                .await
            }
        }
    }

    async fn update_blog(
        &self,
        update: &BlogSettingsUpdate,
        updated_at: DateTime<Utc>,
        updated_by: i64,
    ) -> Result<(), StoreError> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                update_blog_sqlite(
                    self.pool.as_sqlite().unwrap(),
                    update,
                    updated_at,
                    updated_by,
                )
                .await
            }
            DatabaseDriver::Mysql => {
                update_blog_mysql(self.pool.as_mysql().unwrap(), update, updated_at, updated_by)
                    .await
            }
        }
    }

    async fn get(&self, key: &str) -> Result<Option<Setting>, StoreError> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_setting_sqlite(self.pool.as_sqlite().unwrap(), key).await,
            DatabaseDriver::Mysql => get_setting_mysql(self.pool.as_mysql().unwrap(), key).await,
        }
    }

    async fn get_all(&self) -> Result<Vec<Setting>, StoreError> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_all_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => get_all_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }
}

// SQLite implementations

async fn insert_setting_sqlite(
    pool: &SqlitePool,
    key: &str,
    value: &str,
    kind: SettingKind,
    created_at: DateTime<Utc>,
    created_by: i64,
) -> Result<i64, StoreError> {
    let uuid = Uuid::new_v4().to_string();

    let mut tx = tx::begin_sqlite(pool).await?;
    let outcome = sqlx::query(INSERT_SETTING)
        .bind(&uuid)
        .bind(key)
        .bind(value)
        .bind(kind.as_str())
        .bind(created_at)
        .bind(created_by)
        .bind(created_at)
        .bind(created_by)
        .execute(&mut *tx)
        .await
        .map(|result| result.last_insert_rowid());
    tx::finish_sqlite(tx, outcome).await
}

async fn insert_setting_mysql(
    pool: &MySqlPool,
    key: &str,
    value: &str,
    kind: SettingKind,
    created_at: DateTime<Utc>,
    created_by: i64,
) -> Result<i64, StoreError> {
    let uuid = Uuid::new_v4().to_string();

    let mut tx = tx::begin_mysql(pool).await?;
    let outcome = sqlx::query(INSERT_SETTING)
        .bind(&uuid)
        .bind(key)
        .bind(value)
        .bind(kind.as_str())
        .bind(created_at)
        .bind(created_by)
        .bind(created_at)
        .bind(created_by)
        .execute(&mut *tx)
        .await
        .map(|result| result.last_insert_id() as i64);
    tx::finish_mysql(tx, outcome).await
}

async fn update_key_sqlite(
    pool: &SqlitePool,
    key: &str,
    value: &str,
    updated_at: DateTime<Utc>,
    updated_by: i64,
) -> Result<(), StoreError> {
    let mut tx = tx::begin_sqlite(pool).await?;
    let outcome = apply_key_sqlite(&mut tx, key, value, updated_at, updated_by).await;
    tx::finish_sqlite(tx, outcome).await
}

async fn update_key_mysql(
    pool: &MySqlPool,
    key: &str,
    value: &str,
    updated_at: DateTime<Utc>,
    updated_by: i64,
) -> Result<(), StoreError> {
    let mut tx = tx::begin_mysql(pool).await?;
    let outcome = apply_key_mysql(&mut tx, key, value, updated_at, updated_by).await;
    tx::finish_mysql(tx, outcome).await
}

async fn update_blog_sqlite(
    pool: &SqlitePool,
    update: &BlogSettingsUpdate,
    updated_at: DateTime<Utc>,
    updated_by: i64,
) -> Result<(), StoreError> {
    let mut tx = tx::begin_sqlite(pool).await?;
    let mut outcome = Ok(());
    for (key, value) in update.pairs() {
        outcome = apply_key_sqlite(&mut tx, key, &value, updated_at, updated_by).await;
        if outcome.is_err() {
            break;
        }
    }
    tx::finish_sqlite(tx, outcome).await
}

async fn update_blog_mysql(
    pool: &MySqlPool,
    update: &BlogSettingsUpdate,
    updated_at: DateTime<Utc>,
    updated_by: i64,
) -> Result<(), StoreError> {
    let mut tx = tx::begin_mysql(pool).await?;
    let mut outcome = Ok(());
    for (key, value) in update.pairs() {
        outcome = apply_key_mysql(&mut tx, key, &value, updated_at, updated_by).await;
        if outcome.is_err() {
            break;
        }
    }
    tx::finish_mysql(tx, outcome).await
}

async fn apply_key_sqlite(
    tx: &mut Transaction<'static, Sqlite>,
    key: &str,
    value: &str,
    updated_at: DateTime<Utc>,
    updated_by: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(UPDATE_SETTING)
        .bind(value)
        .bind(updated_at)
        .bind(updated_by)
        .bind(key)
        .execute(&mut **tx)
        .await
        .map(|_| ())
}

async fn apply_key_mysql(
    tx: &mut Transaction<'static, MySql>,
    key: &str,
    value: &str,
    updated_at: DateTime<Utc>,
    updated_by: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(UPDATE_SETTING)
        .bind(value)
        .bind(updated_at)
        .bind(updated_by)
        .bind(key)
        .execute(&mut **tx)
        .await
        .map(|_| ())
}

async fn get_setting_sqlite(pool: &SqlitePool, key: &str) -> Result<Option<Setting>, StoreError> {
    let row = sqlx::query(&format!("{} WHERE `key` = ?", SELECT_SETTING))
        .bind(key)
        .fetch_optional(pool)
        .await
        .map_err(StoreError::Read)?;

    row.map(|row| row_to_setting_sqlite(&row)).transpose()
}

async fn get_setting_mysql(pool: &MySqlPool, key: &str) -> Result<Option<Setting>, StoreError> {
    let row = sqlx::query(&format!("{} WHERE `key` = ?", SELECT_SETTING))
        .bind(key)
        .fetch_optional(pool)
        .await
        .map_err(StoreError::Read)?;

    row.map(|row| row_to_setting_mysql(&row)).transpose()
}

async fn get_all_sqlite(pool: &SqlitePool) -> Result<Vec<Setting>, StoreError> {
    let rows = sqlx::query(&format!("{} ORDER BY `key`", SELECT_SETTING))
        .fetch_all(pool)
        .await
        .map_err(StoreError::Read)?;

    rows.iter().map(row_to_setting_sqlite).collect()
}

async fn get_all_mysql(pool: &MySqlPool) -> Result<Vec<Setting>, StoreError> {
    let rows = sqlx::query(&format!("{} ORDER BY `key`", SELECT_SETTING))
        .fetch_all(pool)
        .await
        .map_err(StoreError::Read)?;

    rows.iter().map(row_to_setting_mysql).collect()
}

fn row_to_setting_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Setting, StoreError> {
    let kind_str: String = row.get("type");
    let kind = SettingKind::from_str(&kind_str)
        .ok_or_else(|| StoreError::Decode(format!("unknown setting type: {}", kind_str)))?;

    Ok(Setting {
        id: row.get("id"),
        uuid: row.get("uuid"),
        key: row.get("key"),
        value: row.get("value"),
        kind,
        created_at: row.get("created_at"),
        created_by: row.get("created_by"),
        updated_at: row.get("updated_at"),
        updated_by: row.get("updated_by"),
    })
}

fn row_to_setting_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Setting, StoreError> {
    let kind_str: String = row.get("type");
    let kind = SettingKind::from_str(&kind_str)
        .ok_or_else(|| StoreError::Decode(format!("unknown setting type: {}", kind_str)))?;

    Ok(Setting {
        id: row.get("id"),
        uuid: row.get("uuid"),
        key: row.get("key"),
        value: row.get("value"),
        kind,
        created_at: row.get("created_at"),
        created_by: row.get("created_by"),
        updated_at: row.get("updated_at"),
        updated_by: row.get("updated_by"),
    })
}
