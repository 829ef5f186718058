//! Tag repository
//!
//! Database operations for tags and the posts_tags association table.
//!
//! This module provides:
//! - `TagRepository` trait defining the interface for tag persistence
//! - `SqlxTagRepository` implementing the trait for SQLite and MySQL
//!
//! Slug uniqueness is not enforced here; callers look up an existing tag
//! by slug and only insert when the lookup comes back empty. Unlinking a
//! post with no associations succeeds with zero rows affected.

use crate::config::DatabaseDriver;
use crate::db::error::StoreError;
use crate::db::{tx, DynDatabasePool};
use crate::models::{Tag, TagDraft};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;
use uuid::Uuid;

const INSERT_TAG: &str = "INSERT INTO tags (uuid, name, slug, created_at, created_by, \
     updated_at, updated_by) VALUES (?, ?, ?, ?, ?, ?, ?)";

const INSERT_POST_TAG: &str = "INSERT INTO posts_tags (post_id, tag_id) VALUES (?, ?)";

const DELETE_POST_TAGS: &str = "DELETE FROM posts_tags WHERE post_id = ?";

const SELECT_TAG: &str =
    "SELECT id, uuid, name, slug, created_at, created_by, updated_at, updated_by FROM tags";

const SELECT_TAGS_FOR_POST: &str = "SELECT t.id, t.uuid, t.name, t.slug, t.created_at, \
     t.created_by, t.updated_at, t.updated_by FROM tags t \
     INNER JOIN posts_tags pt ON pt.tag_id = t.id WHERE pt.post_id = ? ORDER BY pt.id";

/// Tag repository trait
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// Insert a new tag; returns the surrogate id.
    async fn insert(
        &self,
        draft: &TagDraft,
        created_at: DateTime<Utc>,
        created_by: i64,
    ) -> Result<i64, StoreError>;

    /// Get a tag by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Tag>, StoreError>;

    /// Associate a tag with a post. Pure association insert.
    async fn link_post(&self, post_id: i64, tag_id: i64) -> Result<(), StoreError>;

    /// Remove every association row for the given post; returns the
    /// number of rows removed. Zero is a success, not an error.
    async fn unlink_post(&self, post_id: i64) -> Result<u64, StoreError>;

    /// Tags associated with a post, in link order
    async fn tags_for_post(&self, post_id: i64) -> Result<Vec<Tag>, StoreError>;
}

/// SQLx-based tag repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxTagRepository {
    pool: DynDatabasePool,
}

impl SqlxTagRepository {
    /// Create a new SQLx tag repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a shared repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TagRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl TagRepository for SqlxTagRepository {
    async fn insert(
        &self,
        draft: &TagDraft,
        created_at: DateTime<Utc>,
        created_by: i64,
    ) -> Result<i64, StoreError> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                insert_tag_sqlite(self.pool.as_sqlite().unwrap(), draft, created_at, created_by)
                    .await
            }
            DatabaseDriver::Mysql => {
                insert_tag_mysql(self.pool.as_mysql().unwrap(), draft, created_at, created_by)
                    .await
            }
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Tag>, StoreError> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_tag_by_slug_sqlite(self.pool.as_sqlite().unwrap(), slug).await
            }
            DatabaseDriver::Mysql => {
                get_tag_by_slug_mysql(self.pool.as_mysql().unwrap(), slug).await
            }
        }
    }

    async fn link_post(&self, post_id: i64, tag_id: i64) -> Result<(), StoreError> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                link_post_sqlite(self.pool.as_sqlite().unwrap(), post_id, tag_id).await
            }
            DatabaseDriver::Mysql => {
                link_post_mysql(self.pool.as_mysql().unwrap(), post_id, tag_id).await
            }
        }
    }

    async fn unlink_post(&self, post_id: i64) -> Result<u64, StoreError> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                unlink_post_sqlite(self.pool.as_sqlite().unwrap(), post_id).await
            }
            DatabaseDriver::Mysql => unlink_post_mysql(self.pool.as_mysql().unwrap(), post_id).await,
        }
    }

    async fn tags_for_post(&self, post_id: i64) -> Result<Vec<Tag>, StoreError> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                tags_for_post_sqlite(self.pool.as_sqlite().unwrap(), post_id).await
            }
            DatabaseDriver::Mysql => {
                tags_for_post_mysql(self.pool.as_mysql().unwrap(), post_id).await
            }
        }
    }
}

// SQLite implementations

async fn insert_tag_sqlite(
    pool: &SqlitePool,
    draft: &TagDraft,
    created_at: DateTime<Utc>,
    created_by: i64,
) -> Result<i64, StoreError> {
    let uuid = Uuid::new_v4().to_string();

    let mut tx = tx::begin_sqlite(pool).await?;
    let outcome = sqlx::query(INSERT_TAG)
        .bind(&uuid)
        .bind(&draft.name)
        .bind(&draft.slug)
        .bind(created_at)
        .bind(created_by)
        .bind(created_at)
        .bind(created_by)
        .execute(&mut *tx)
        .await
        .map(|result| result.last_insert_rowid());
    tx::finish_sqlite(tx, outcome).await
}

async fn insert_tag_mysql(
    pool: &MySqlPool,
    draft: &TagDraft,
    created_at: DateTime<Utc>,
    created_by: i64,
) -> Result<i64, StoreError> {
    let uuid = Uuid::new_v4().to_string();

    let mut tx = tx::begin_mysql(pool).await?;
    let outcome = sqlx::query(INSERT_TAG)
        .bind(&uuid)
        .bind(&draft.name)
        .bind(&draft.slug)
        .bind(created_at)
        .bind(created_by)
        .bind(created_at)
        .bind(created_by)
        .execute(&mut *tx)
        .await
        .map(|result| result.last_insert_id() as i64);
    tx::finish_mysql(tx, outcome).await
}

async fn link_post_sqlite(pool: &SqlitePool, post_id: i64, tag_id: i64) -> Result<(), StoreError> {
    let mut tx = tx::begin_sqlite(pool).await?;
    let outcome = sqlx::query(INSERT_POST_TAG)
        .bind(post_id)
        .bind(tag_id)
        .execute(&mut *tx)
        .await
        .map(|_| ());
    tx::finish_sqlite(tx, outcome).await
}

async fn link_post_mysql(pool: &MySqlPool, post_id: i64, tag_id: i64) -> Result<(), StoreError> {
    let mut tx = tx::begin_mysql(pool).await?;
    let outcome = sqlx::query(INSERT_POST_TAG)
        .bind(post_id)
        .bind(tag_id)
        .execute(&mut *tx)
        .await
        .map(|_| ());
    tx::finish_mysql(tx, outcome).await
}

async fn unlink_post_sqlite(pool: &SqlitePool, post_id: i64) -> Result<u64, StoreError> {
    let mut tx = tx::begin_sqlite(pool).await?;
    let outcome = sqlx::query(DELETE_POST_TAGS)
        .bind(post_id)
        .execute(&mut *tx)
        .await
        .map(|result| result.rows_affected());
    tx::finish_sqlite(tx, outcome).await
}

async fn unlink_post_mysql(pool: &MySqlPool, post_id: i64) -> Result<u64, StoreError> {
    let mut tx = tx::begin_mysql(pool).await?;
    let outcome = sqlx::query(DELETE_POST_TAGS)
        .bind(post_id)
        .execute(&mut *tx)
        .await
        .map(|result| result.rows_affected());
    tx::finish_mysql(tx, outcome).await
}

async fn get_tag_by_slug_sqlite(pool: &SqlitePool, slug: &str) -> Result<Option<Tag>, StoreError> {
    let row = sqlx::query(&format!("{} WHERE slug = ? ORDER BY id LIMIT 1", SELECT_TAG))
        .bind(slug)
        .fetch_optional(pool)
        .await
        .map_err(StoreError::Read)?;

    Ok(row.map(|row| row_to_tag_sqlite(&row)))
}

async fn get_tag_by_slug_mysql(pool: &MySqlPool, slug: &str) -> Result<Option<Tag>, StoreError> {
    let row = sqlx::query(&format!("{} WHERE slug = ? ORDER BY id LIMIT 1", SELECT_TAG))
        .bind(slug)
        .fetch_optional(pool)
        .await
        .map_err(StoreError::Read)?;

    Ok(row.map(|row| row_to_tag_mysql(&row)))
}

async fn tags_for_post_sqlite(pool: &SqlitePool, post_id: i64) -> Result<Vec<Tag>, StoreError> {
    let rows = sqlx::query(SELECT_TAGS_FOR_POST)
        .bind(post_id)
        .fetch_all(pool)
        .await
        .map_err(StoreError::Read)?;

    Ok(rows.iter().map(row_to_tag_sqlite).collect())
}

async fn tags_for_post_mysql(pool: &MySqlPool, post_id: i64) -> Result<Vec<Tag>, StoreError> {
    let rows = sqlx::query(SELECT_TAGS_FOR_POST)
        .bind(post_id)
        .fetch_all(pool)
        .await
        .map_err(StoreError::Read)?;

    Ok(rows.iter().map(row_to_tag_mysql).collect())
}

fn row_to_tag_sqlite(row: &sqlx::sqlite::SqliteRow) -> Tag {
    Tag {
        id: row.get("id"),
        uuid: row.get("uuid"),
        name: row.get("name"),
        slug: row.get("slug"),
        created_at: row.get("created_at"),
        created_by: row.get("created_by"),
        updated_at: row.get("updated_at"),
        updated_by: row.get("updated_by"),
    }
}

fn row_to_tag_mysql(row: &sqlx::mysql::MySqlRow) -> Tag {
    Tag {
        id: row.get("id"),
        uuid: row.get("uuid"),
        name: row.get("name"),
        slug: row.get("slug"),
        created_at: row.get("created_at"),
        created_by: row.get("created_by"),
        updated_at: row.get("updated_at"),
        updated_by: row.get("updated_by"),
    }
}
