//! Post repository
//!
//! Database operations for posts.
//!
//! This module provides:
//! - `PostRepository` trait defining the interface for post persistence
//! - `SqlxPostRepository` implementing the trait for SQLite and MySQL
//!
//! The update path carries the publish transition rule: a post gets its
//! `published_at`/`published_by` pair stamped on the first transition
//! into the published state and the pair is never rewritten or cleared
//! afterwards. Two statement variants exist so that every other kind of
//! save cannot even touch those columns.

use crate::config::DatabaseDriver;
use crate::db::error::StoreError;
use crate::db::{tx, DynDatabasePool};
use crate::models::{Post, PostInput, PostStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;
use uuid::Uuid;

const INSERT_POST: &str = "INSERT INTO posts (uuid, title, slug, markdown, html, featured, \
     page, status, meta_description, image, author_id, created_at, created_by, updated_at, \
     updated_by, published_at, published_by) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)";

const UPDATE_POST: &str = "UPDATE posts SET title = ?, slug = ?, markdown = ?, html = ?, \
     featured = ?, page = ?, status = ?, meta_description = ?, image = ?, updated_at = ?, \
     updated_by = ? WHERE id = ?";

const UPDATE_POST_PUBLISHED: &str = "UPDATE posts SET title = ?, slug = ?, markdown = ?, \
     html = ?, featured = ?, page = ?, status = ?, meta_description = ?, image = ?, \
     updated_at = ?, updated_by = ?, published_at = ?, published_by = ? WHERE id = ?";

const DELETE_POST: &str = "DELETE FROM posts WHERE id = ?";

const SELECT_POST: &str = "SELECT id, uuid, title, slug, markdown, html, featured, page, \
     status, meta_description, image, author_id, created_at, created_by, updated_at, \
     updated_by, published_at, published_by FROM posts";

/// Post repository trait
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Insert a new post; returns the surrogate id.
    async fn insert(
        &self,
        input: &PostInput,
        created_at: DateTime<Utc>,
        created_by: i64,
    ) -> Result<i64, StoreError>;

    /// Rewrite a post's content columns. Reads the current row first to
    /// evaluate the publish transition; the pre-read happens before any
    /// transaction is opened.
    async fn update(
        &self,
        id: i64,
        input: &PostInput,
        updated_at: DateTime<Utc>,
        updated_by: i64,
    ) -> Result<(), StoreError>;

    /// Delete the post row. Tag associations are the caller's job to
    /// remove first.
    async fn delete(&self, id: i64) -> Result<(), StoreError>;

    /// Get a post by surrogate id
    async fn get_by_id(&self, id: i64) -> Result<Option<Post>, StoreError>;

    /// Page through posts, newest first
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Post>, StoreError>;

    /// Count all posts
    async fn count(&self) -> Result<i64, StoreError>;
}

/// SQLx-based post repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxPostRepository {
    pool: DynDatabasePool,
}

impl SqlxPostRepository {
    /// Create a new SQLx post repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a shared repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn insert(
        &self,
        input: &PostInput,
        created_at: DateTime<Utc>,
        created_by: i64,
    ) -> Result<i64, StoreError> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                insert_post_sqlite(self.pool.as_sqlite().unwrap(), input, created_at, created_by)
                    .await
            }
            DatabaseDriver::Mysql => {
                insert_post_mysql(self.pool.as_mysql().unwrap(), input, created_at, created_by)
                    .await
            }
        }
    }

    async fn update(
        &self,
        id: i64,
        input: &PostInput,
        updated_at: DateTime<Utc>,
        updated_by: i64,
    ) -> Result<(), StoreError> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                update_post_sqlite(
                    self.pool.as_sqlite().unwrap(),
                    id,
                    input,
                    updated_at,
                    updated_by,
                )
                .await
            }
            DatabaseDriver::Mysql => {
                update_post_mysql(
                    self.pool.as_mysql().unwrap(),
                    id,
                    input,
                    updated_at,
                    updated_by,
                )
                .await
            }
        }
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                delete_post_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => delete_post_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>, StoreError> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_post_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => get_post_by_id_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Post>, StoreError> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_posts_sqlite(self.pool.as_sqlite().unwrap(), limit, offset).await
            }
            DatabaseDriver::Mysql => {
                list_posts_mysql(self.pool.as_mysql().unwrap(), limit, offset).await
            }
        }
    }

    async fn count(&self) -> Result<i64, StoreError> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => count_posts_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => count_posts_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }
}

// SQLite implementations

async fn insert_post_sqlite(
    pool: &SqlitePool,
    input: &PostInput,
    created_at: DateTime<Utc>,
    created_by: i64,
) -> Result<i64, StoreError> {
    let uuid = Uuid::new_v4().to_string();
    let status = input.status();
    // Publishing at creation stamps the publication pair with the
    // creation audit values; a draft leaves both columns null.
    let (published_at, published_by) = if input.published {
        (Some(created_at), Some(created_by))
    } else {
        (None, None)
    };

    let mut tx = tx::begin_sqlite(pool).await?;
    let outcome = sqlx::query(INSERT_POST)
        .bind(&uuid)
        .bind(&input.title)
        .bind(&input.slug)
        .bind(&input.markdown)
        .bind(&input.html)
        .bind(input.featured)
        .bind(input.page)
        .bind(status.as_str())
        .bind(&input.meta_description)
        .bind(&input.image)
        .bind(created_by)
        .bind(created_at)
        .bind(created_by)
        .bind(created_at)
        .bind(created_by)
        .bind(published_at)
        .bind(published_by)
        .execute(&mut *tx)
        .await
        .map(|result| result.last_insert_rowid());
    tx::finish_sqlite(tx, outcome).await
}

async fn insert_post_mysql(
    pool: &MySqlPool,
    input: &PostInput,
    created_at: DateTime<Utc>,
    created_by: i64,
) -> Result<i64, StoreError> {
    let uuid = Uuid::new_v4().to_string();
    let status = input.status();
    let (published_at, published_by) = if input.published {
        (Some(created_at), Some(created_by))
    } else {
        (None, None)
    };

    let mut tx = tx::begin_mysql(pool).await?;
    let outcome = sqlx::query(INSERT_POST)
        .bind(&uuid)
        .bind(&input.title)
        .bind(&input.slug)
        .bind(&input.markdown)
        .bind(&input.html)
        .bind(input.featured)
        .bind(input.page)
        .bind(status.as_str())
        .bind(&input.meta_description)
        .bind(&input.image)
        .bind(created_by)
        .bind(created_at)
        .bind(created_by)
        .bind(created_at)
        .bind(created_by)
        .bind(published_at)
        .bind(published_by)
        .execute(&mut *tx)
        .await
        .map(|result| result.last_insert_id() as i64);
    tx::finish_mysql(tx, outcome).await
}

async fn update_post_sqlite(
    pool: &SqlitePool,
    id: i64,
    input: &PostInput,
    updated_at: DateTime<Utc>,
    updated_by: i64,
) -> Result<(), StoreError> {
    // Pre-read outside the transaction; a failure here aborts before
    // anything is opened.
    let current = get_post_by_id_sqlite(pool, id)
        .await?
        .ok_or(StoreError::NotFound {
            entity: "post",
            id,
        })?;

    // First publish means the stamp is absent, not that the status is
    // draft: an unpublished-then-republished post keeps its stamp.
    let stamp_publication = input.published && current.published_at.is_none();
    let status = input.status();

    let mut tx = tx::begin_sqlite(pool).await?;
    let outcome = if stamp_publication {
        sqlx::query(UPDATE_POST_PUBLISHED)
            .bind(&input.title)
            .bind(&input.slug)
            .bind(&input.markdown)
            .bind(&input.html)
            .bind(input.featured)
            .bind(input.page)
            .bind(status.as_str())
            .bind(&input.meta_description)
            .bind(&input.image)
            .bind(updated_at)
            .bind(updated_by)
            .bind(updated_at)
            .bind(updated_by)
            .bind(id)
            .execute(&mut *tx)
            .await
    } else {
        sqlx::query(UPDATE_POST)
            .bind(&input.title)
            .bind(&input.slug)
            .bind(&input.markdown)
            .bind(&input.html)
            .bind(input.featured)
            .bind(input.page)
            .bind(status.as_str())
            .bind(&input.meta_description)
            .bind(&input.image)
            .bind(updated_at)
            .bind(updated_by)
            .bind(id)
            .execute(&mut *tx)
            .await
    }
    .map(|_| ());
    tx::finish_sqlite(tx, outcome).await
}

async fn update_post_mysql(
    pool: &MySqlPool,
    id: i64,
    input: &PostInput,
    updated_at: DateTime<Utc>,
    updated_by: i64,
) -> Result<(), StoreError> {
    let current = get_post_by_id_mysql(pool, id)
        .await?
        .ok_or(StoreError::NotFound {
            entity: "post",
            id,
        })?;

    let stamp_publication = input.published && current.published_at.is_none();
    let status = input.status();

    let mut tx = tx::begin_mysql(pool).await?;
    let outcome = if stamp_publication {
        sqlx::query(UPDATE_POST_PUBLISHED)
            .bind(&input.title)
            .bind(&input.slug)
            .bind(&input.markdown)
            .bind(&input.html)
            .bind(input.featured)
            .bind(input.page)
            .bind(status.as_str())
            .bind(&input.meta_description)
            .bind(&input.image)
            .bind(updated_at)
            .bind(updated_by)
            .bind(updated_at)
            .bind(updated_by)
            .bind(id)
            .execute(&mut *tx)
            .await
    } else {
        sqlx::query(UPDATE_POST)
            .bind(&input.title)
            .bind(&input.slug)
            .bind(&input.markdown)
            .bind(&input.html)
            .bind(input.featured)
            .bind(input.page)
            .bind(status.as_str())
            .bind(&input.meta_description)
            .bind(&input.image)
            .bind(updated_at)
            .bind(updated_by)
            .bind(id)
            .execute(&mut *tx)
            .await
    }
    .map(|_| ());
    tx::finish_mysql(tx, outcome).await
}

async fn delete_post_sqlite(pool: &SqlitePool, id: i64) -> Result<(), StoreError> {
    let mut tx = tx::begin_sqlite(pool).await?;
    let outcome = sqlx::query(DELETE_POST)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map(|_| ());
    tx::finish_sqlite(tx, outcome).await
}

async fn delete_post_mysql(pool: &MySqlPool, id: i64) -> Result<(), StoreError> {
    let mut tx = tx::begin_mysql(pool).await?;
    let outcome = sqlx::query(DELETE_POST)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map(|_| ());
    tx::finish_mysql(tx, outcome).await
}

async fn get_post_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Post>, StoreError> {
    let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_POST))
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(StoreError::Read)?;

    row.map(|row| row_to_post_sqlite(&row)).transpose()
}

async fn get_post_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Post>, StoreError> {
    let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_POST))
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(StoreError::Read)?;

    row.map(|row| row_to_post_mysql(&row)).transpose()
}

async fn list_posts_sqlite(
    pool: &SqlitePool,
    limit: i64,
    offset: i64,
) -> Result<Vec<Post>, StoreError> {
    let rows = sqlx::query(&format!(
        "{} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
        SELECT_POST
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
    .map_err(StoreError::Read)?;

    rows.iter().map(row_to_post_sqlite).collect()
}

async fn list_posts_mysql(
    pool: &MySqlPool,
    limit: i64,
    offset: i64,
) -> Result<Vec<Post>, StoreError> {
    let rows = sqlx::query(&format!(
        "{} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
        SELECT_POST
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
    .map_err(StoreError::Read)?;

    rows.iter().map(row_to_post_mysql).collect()
}

async fn count_posts_sqlite(pool: &SqlitePool) -> Result<i64, StoreError> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM posts")
        .fetch_one(pool)
        .await
        .map_err(StoreError::Read)?;
    Ok(row.get("count"))
}

async fn count_posts_mysql(pool: &MySqlPool) -> Result<i64, StoreError> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM posts")
        .fetch_one(pool)
        .await
        .map_err(StoreError::Read)?;
    Ok(row.get("count"))
}

fn row_to_post_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Post, StoreError> {
    let status_str: String = row.get("status");
    let status = PostStatus::from_str(&status_str)
        .ok_or_else(|| StoreError::Decode(format!("unknown post status: {}", status_str)))?;

    Ok(Post {
        id: row.get("id"),
        uuid: row.get("uuid"),
        title: row.get("title"),
        slug: row.get("slug"),
        markdown: row.get("markdown"),
        html: row.get("html"),
        featured: row.get("featured"),
        page: row.get("page"),
        status,
        meta_description: row.get("meta_description"),
        image: row.get("image"),
        author_id: row.get("author_id"),
        created_at: row.get("created_at"),
        created_by: row.get("created_by"),
        updated_at: row.get("updated_at"),
        updated_by: row.get("updated_by"),
        published_at: row.get("published_at"),
        published_by: row.get("published_by"),
    })
}

fn row_to_post_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Post, StoreError> {
    let status_str: String = row.get("status");
    let status = PostStatus::from_str(&status_str)
        .ok_or_else(|| StoreError::Decode(format!("unknown post status: {}", status_str)))?;

    Ok(Post {
        id: row.get("id"),
        uuid: row.get("uuid"),
        title: row.get("title"),
        slug: row.get("slug"),
        markdown: row.get("markdown"),
        html: row.get("html"),
        featured: row.get("featured"),
        page: row.get("page"),
        status,
        meta_description: row.get("meta_description"),
        image: row.get("image"),
        author_id: row.get("author_id"),
        created_at: row.get("created_at"),
        created_by: row.get("created_by"),
        updated_at: row.get("updated_at"),
        updated_by: row.get("updated_by"),
        published_at: row.get("published_at"),
        published_by: row.get("published_by"),
    })
}
