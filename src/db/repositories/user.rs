//! User repository
//!
//! Database operations for users and their role assignments.
//!
//! This module provides:
//! - `UserRepository` trait defining the interface for user persistence
//! - `SqlxUserRepository` implementing the trait for SQLite and MySQL
//!
//! Profile updates, password changes and login stamps are three separate
//! write paths. The profile statement never touches the password column,
//! so password rotation cannot ride along with an unrelated profile edit,
//! and the login stamp carries no audit-pair semantics because a login is
//! not an edit.

use crate::config::DatabaseDriver;
use crate::db::error::StoreError;
use crate::db::{tx, DynDatabasePool};
use crate::models::{NewUser, User, UserProfile};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;
use uuid::Uuid;

const INSERT_USER: &str = "INSERT INTO users (uuid, name, slug, password, email, image, cover, \
     bio, website, location, created_at, created_by, updated_at, updated_by, last_login) \
     VALUES (?, ?, ?, ?, ?, ?, ?, '', '', '', ?, ?, ?, ?, NULL)";

const INSERT_ROLE_USER: &str = "INSERT INTO roles_users (role_id, user_id) VALUES (?, ?)";

const UPDATE_PROFILE: &str = "UPDATE users SET name = ?, slug = ?, email = ?, image = ?, \
     cover = ?, bio = ?, website = ?, location = ?, updated_at = ?, updated_by = ? WHERE id = ?";

const UPDATE_PASSWORD: &str =
    "UPDATE users SET password = ?, updated_at = ?, updated_by = ? WHERE id = ?";

const UPDATE_LAST_LOGIN: &str = "UPDATE users SET last_login = ? WHERE id = ?";

const SELECT_USER: &str = "SELECT id, uuid, name, slug, password, email, image, cover, bio, \
     website, location, created_at, created_by, updated_at, updated_by, last_login FROM users";

const SELECT_ADMINISTRATOR: &str =
    "SELECT user_id FROM roles_users WHERE role_id = ? ORDER BY id LIMIT 1";

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user; returns the surrogate id.
    async fn insert(
        &self,
        input: &NewUser,
        created_at: DateTime<Utc>,
        created_by: i64,
    ) -> Result<i64, StoreError>;

    /// Link a role to a user. Pure association insert, no generated id
    /// semantics beyond the two foreign keys.
    async fn insert_role(&self, role_id: i64, user_id: i64) -> Result<(), StoreError>;

    /// Rewrite the mutable profile columns plus the audit pair. The
    /// password column is deliberately out of reach of this statement.
    async fn update_profile(
        &self,
        id: i64,
        profile: &UserProfile,
        updated_at: DateTime<Utc>,
        updated_by: i64,
    ) -> Result<(), StoreError>;

    /// Rewrite only the password hash plus the audit pair.
    async fn update_password(
        &self,
        id: i64,
        password_hash: &str,
        updated_at: DateTime<Utc>,
        updated_by: i64,
    ) -> Result<(), StoreError>;

    /// Stamp the last-login timestamp. No audit-pair update.
    async fn update_last_login(&self, id: i64, at: DateTime<Utc>) -> Result<(), StoreError>;

    /// Get a user by surrogate id
    async fn get_by_id(&self, id: i64) -> Result<Option<User>, StoreError>;

    /// Get a user by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<User>, StoreError>;

    /// Count all users
    async fn count(&self) -> Result<i64, StoreError>;

    /// Id of the first user holding the given role, if any. Used to
    /// resolve the administrator of a single-author install.
    async fn find_by_role(&self, role_id: i64) -> Result<Option<i64>, StoreError>;
}

/// SQLx-based user repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    /// Create a new SQLx user repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a shared repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn insert(
        &self,
        input: &NewUser,
        created_at: DateTime<Utc>,
        created_by: i64,
    ) -> Result<i64, StoreError> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                insert_user_sqlite(self.pool.as_sqlite().unwrap(), input, created_at, created_by)
                    .await
            }
            DatabaseDriver::Mysql => {
                insert_user_mysql(self.pool.as_mysql().unwrap(), input, created_at, created_by)
                    .await
            }
        }
    }

    async fn insert_role(&self, role_id: i64, user_id: i64) -> Result<(), StoreError> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                insert_role_sqlite(self.pool.as_sqlite().unwrap(), role_id, user_id).await
            }
            DatabaseDriver::Mysql => {
                insert_role_mysql(self.pool.as_mysql().unwrap(), role_id, user_id).await
            }
        }
    }

    async fn update_profile(
        &self,
        id: i64,
        profile: &UserProfile,
        updated_at: DateTime<Utc>,
        updated_by: i64,
    ) -> Result<(), StoreError> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                update_profile_sqlite(
                    self.pool.as_sqlite().unwrap(),
                    id,
                    profile,
                    updated_at,
                    updated_by,
                )
                .await
            }
            DatabaseDriver::Mysql => {
                update_profile_mysql(
                    self.pool.as_mysql().unwrap(),
                    id,
                    profile,
                    updated_at,
                    updated_by,
                )
                .await
            }
        }
    }

    async fn update_password(
        &self,
        id: i64,
        password_hash: &str,
        updated_at: DateTime<Utc>,
        updated_by: i64,
    ) -> Result<(), StoreError> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                update_password_sqlite(
                    self.pool.as_sqlite().unwrap(),
                    id,
                    password_hash,
                    updated_at,
                    updated_by,
                )
                .await
            }
            DatabaseDriver::Mysql => {
                update_password_mysql(
                    self.pool.as_mysql().unwrap(),
                    id,
                    password_hash,
                    updated_at,
                    updated_by,
                )
                .await
            }
        }
    }

    async fn update_last_login(&self, id: i64, at: DateTime<Utc>) -> Result<(), StoreError> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                update_last_login_sqlite(self.pool.as_sqlite().unwrap(), id, at).await
            }
            DatabaseDriver::Mysql => {
                update_last_login_mysql(self.pool.as_mysql().unwrap(), id, at).await
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_user_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => get_user_by_id_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<User>, StoreError> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_user_by_slug_sqlite(self.pool.as_sqlite().unwrap(), slug).await
            }
            DatabaseDriver::Mysql => {
                get_user_by_slug_mysql(self.pool.as_mysql().unwrap(), slug).await
            }
        }
    }

    async fn count(&self) -> Result<i64, StoreError> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => count_users_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => count_users_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }

    async fn find_by_role(&self, role_id: i64) -> Result<Option<i64>, StoreError> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                find_by_role_sqlite(self.pool.as_sqlite().unwrap(), role_id).await
            }
            DatabaseDriver::Mysql => {
                find_by_role_mysql(self.pool.as_mysql().unwrap(), role_id).await
            }
        }
    }
}

// SQLite implementations

async fn insert_user_sqlite(
    pool: &SqlitePool,
    input: &NewUser,
    created_at: DateTime<Utc>,
    created_by: i64,
) -> Result<i64, StoreError> {
    let uuid = Uuid::new_v4().to_string();

    let mut tx = tx::begin_sqlite(pool).await?;
    let outcome = sqlx::query(INSERT_USER)
        .bind(&uuid)
        .bind(&input.name)
        .bind(&input.slug)
        .bind(&input.password)
        .bind(&input.email)
        .bind(&input.image)
        .bind(&input.cover)
        .bind(created_at)
        .bind(created_by)
        .bind(created_at)
        .bind(created_by)
        .execute(&mut *tx)
        .await
        .map(|result| result.last_insert_rowid());
    tx::finish_sqlite(tx, outcome).await
}

async fn insert_user_mysql(
    pool: &MySqlPool,
    input: &NewUser,
    created_at: DateTime<Utc>,
    created_by: i64,
) -> Result<i64, StoreError> {
    let uuid = Uuid::new_v4().to_string();

    let mut tx = tx::begin_mysql(pool).await?;
    let outcome = sqlx::query(INSERT_USER)
        .bind(&uuid)
        .bind(&input.name)
        .bind(&input.slug)
        .bind(&input.password)
        .bind(&input.email)
        .bind(&input.image)
        .bind(&input.cover)
        .bind(created_at)
        .bind(created_by)
        .bind(created_at)
        .bind(created_by)
        .execute(&mut *tx)
        .await
        .map(|result| result.last_insert_id() as i64);
    tx::finish_mysql(tx, outcome).await
}

async fn insert_role_sqlite(
    pool: &SqlitePool,
    role_id: i64,
    user_id: i64,
) -> Result<(), StoreError> {
    let mut tx = tx::begin_sqlite(pool).await?;
    let outcome = sqlx::query(INSERT_ROLE_USER)
        .bind(role_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map(|_| ());
    tx::finish_sqlite(tx, outcome).await
}

async fn insert_role_mysql(
    pool: &MySqlPool,
    role_id: i64,
    user_id: i64,
) -> Result<(), StoreError> {
    let mut tx = tx::begin_mysql(pool).await?;
    let outcome = sqlx::query(INSERT_ROLE_USER)
        .bind(role_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map(|_| ());
    tx::finish_mysql(tx, outcome).await
}

async fn update_profile_sqlite(
    pool: &SqlitePool,
    id: i64,
    profile: &UserProfile,
    updated_at: DateTime<Utc>,
    updated_by: i64,
) -> Result<(), StoreError> {
    let mut tx = tx::begin_sqlite(pool).await?;
    let outcome = sqlx::query(UPDATE_PROFILE)
        .bind(&profile.name)
        .bind(&profile.slug)
        .bind(&profile.email)
        .bind(&profile.image)
        .bind(&profile.cover)
        .bind(&profile.bio)
        .bind(&profile.website)
        .bind(&profile.location)
        .bind(updated_at)
        .bind(updated_by)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map(|_| ());
    tx::finish_sqlite(tx, outcome).await
}

async fn update_profile_mysql(
    pool: &MySqlPool,
    id: i64,
    profile: &UserProfile,
    updated_at: DateTime<Utc>,
    updated_by: i64,
) -> Result<(), StoreError> {
    let mut tx = tx::begin_mysql(pool).await?;
    let outcome = sqlx::query(UPDATE_PROFILE)
        .bind(&profile.name)
        .bind(&profile.slug)
        .bind(&profile.email)
        .bind(&profile.image)
        .bind(&profile.cover)
        .bind(&profile.bio)
        .bind(&profile.website)
        .bind(&profile.location)
        .bind(updated_at)
        .bind(updated_by)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map(|_| ());
    tx::finish_mysql(tx, outcome).await
}

async fn update_password_sqlite(
    pool: &SqlitePool,
    id: i64,
    password_hash: &str,
    updated_at: DateTime<Utc>,
    updated_by: i64,
) -> Result<(), StoreError> {
    let mut tx = tx::begin_sqlite(pool).await?;
    let outcome = sqlx::query(UPDATE_PASSWORD)
        .bind(password_hash)
        .bind(updated_at)
        .bind(updated_by)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map(|_| ());
    tx::finish_sqlite(tx, outcome).await
}

async fn update_password_mysql(
    pool: &MySqlPool,
    id: i64,
    password_hash: &str,
    updated_at: DateTime<Utc>,
    updated_by: i64,
) -> Result<(), StoreError> {
    let mut tx = tx::begin_mysql(pool).await?;
    let outcome = sqlx::query(UPDATE_PASSWORD)
        .bind(password_hash)
        .bind(updated_at)
        .bind(updated_by)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map(|_| ());
    tx::finish_mysql(tx, outcome).await
}

async fn update_last_login_sqlite(
    pool: &SqlitePool,
    id: i64,
    at: DateTime<Utc>,
) -> Result<(), StoreError> {
    let mut tx = tx::begin_sqlite(pool).await?;
    let outcome = sqlx::query(UPDATE_LAST_LOGIN)
        .bind(at)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map(|_| ());
    tx::finish_sqlite(tx, outcome).await
}

async fn update_last_login_mysql(
    pool: &MySqlPool,
    id: i64,
    at: DateTime<Utc>,
) -> Result<(), StoreError> {
    let mut tx = tx::begin_mysql(pool).await?;
    let outcome = sqlx::query(UPDATE_LAST_LOGIN)
        .bind(at)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map(|_| ());
    tx::finish_mysql(tx, outcome).await
}

async fn get_user_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<User>, StoreError> {
    let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_USER))
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(StoreError::Read)?;

    Ok(row.map(|row| row_to_user_sqlite(&row)))
}

async fn get_user_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<User>, StoreError> {
    let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_USER))
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(StoreError::Read)?;

    Ok(row.map(|row| row_to_user_mysql(&row)))
}

async fn get_user_by_slug_sqlite(
    pool: &SqlitePool,
    slug: &str,
) -> Result<Option<User>, StoreError> {
    let row = sqlx::query(&format!("{} WHERE slug = ?", SELECT_USER))
        .bind(slug)
        .fetch_optional(pool)
        .await
        .map_err(StoreError::Read)?;

    Ok(row.map(|row| row_to_user_sqlite(&row)))
}

async fn get_user_by_slug_mysql(pool: &MySqlPool, slug: &str) -> Result<Option<User>, StoreError> {
    let row = sqlx::query(&format!("{} WHERE slug = ?", SELECT_USER))
        .bind(slug)
        .fetch_optional(pool)
        .await
        .map_err(StoreError::Read)?;

    Ok(row.map(|row| row_to_user_mysql(&row)))
}

async fn count_users_sqlite(pool: &SqlitePool) -> Result<i64, StoreError> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM users")
        .fetch_one(pool)
        .await
        .map_err(StoreError::Read)?;
    Ok(row.get("count"))
}

async fn count_users_mysql(pool: &MySqlPool) -> Result<i64, StoreError> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM users")
        .fetch_one(pool)
        .await
        .map_err(StoreError::Read)?;
    Ok(row.get("count"))
}

async fn find_by_role_sqlite(pool: &SqlitePool, role_id: i64) -> Result<Option<i64>, StoreError> {
    let row = sqlx::query(SELECT_ADMINISTRATOR)
        .bind(role_id)
        .fetch_optional(pool)
        .await
        .map_err(StoreError::Read)?;
    Ok(row.map(|r| r.get("user_id")))
}

async fn find_by_role_mysql(pool: &MySqlPool, role_id: i64) -> Result<Option<i64>, StoreError> {
    let row = sqlx::query(SELECT_ADMINISTRATOR)
        .bind(role_id)
        .fetch_optional(pool)
        .await
        .map_err(StoreError::Read)?;
    Ok(row.map(|r| r.get("user_id")))
}

fn row_to_user_sqlite(row: &sqlx::sqlite::SqliteRow) -> User {
    User {
        id: row.get("id"),
        uuid: row.get("uuid"),
        name: row.get("name"),
        slug: row.get("slug"),
        password: row.get("password"),
        email: row.get("email"),
        image: row.get("image"),
        cover: row.get("cover"),
        bio: row.get("bio"),
        website: row.get("website"),
        location: row.get("location"),
        created_at: row.get("created_at"),
        created_by: row.get("created_by"),
        updated_at: row.get("updated_at"),
        updated_by: row.get("updated_by"),
        last_login: row.get("last_login"),
    }
}

fn row_to_user_mysql(row: &sqlx::mysql::MySqlRow) -> User {
    User {
        id: row.get("id"),
        uuid: row.get("uuid"),
        name: row.get("name"),
        slug: row.get("slug"),
        password: row.get("password"),
        email: row.get("email"),
        image: row.get("image"),
        cover: row.get("cover"),
        bio: row.get("bio"),
        website: row.get("website"),
        location: row.get("location"),
        created_at: row.get("created_at"),
        created_by: row.get("created_by"),
        updated_at: row.get("updated_at"),
        updated_by: row.get("updated_by"),
        last_login: row.get("last_login"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, schema};
    use crate::models::roles;
    use chrono::TimeZone;

    async fn setup_test_repo() -> SqlxUserRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        schema::ensure_schema(&pool)
            .await
            .expect("Failed to ensure schema");
        SqlxUserRepository::new(pool)
    }

    fn test_user(slug: &str) -> NewUser {
        NewUser {
            name: format!("User {}", slug),
            slug: slug.to_string(),
            password: "$argon2id$fake$hash".to_string(),
            email: format!("{}@example.com", slug),
            image: String::new(),
            cover: String::new(),
        }
    }

    fn profile_of(user: &User) -> UserProfile {
        UserProfile {
            name: user.name.clone(),
            slug: user.slug.clone(),
            email: user.email.clone(),
            image: user.image.clone(),
            cover: user.cover.clone(),
            bio: user.bio.clone(),
            website: user.website.clone(),
            location: user.location.clone(),
        }
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 2, hour, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let repo = setup_test_repo().await;

        let id = repo.insert(&test_user("ada"), at(8), 1).await.expect("insert");
        assert!(id > 0);

        let user = repo.get_by_id(id).await.expect("get").expect("exists");
        assert_eq!(user.name, "User ada");
        assert_eq!(user.email, "ada@example.com");
        assert!(user.bio.is_empty());
        assert!(user.last_login.is_none());
        assert_eq!(user.created_at, at(8));
        assert_eq!(user.updated_at, at(8));

        let by_slug = repo.get_by_slug("ada").await.expect("get").expect("exists");
        assert_eq!(by_slug.id, id);
        assert!(repo.get_by_slug("nobody").await.expect("get").is_none());
    }

    #[tokio::test]
    async fn test_profile_update_leaves_password_alone() {
        let repo = setup_test_repo().await;
        let id = repo.insert(&test_user("ada"), at(8), 1).await.expect("insert");
        let before = repo.get_by_id(id).await.expect("get").expect("exists");

        let mut profile = profile_of(&before);
        profile.bio = "Wrote the first program".to_string();
        profile.website = "https://ada.example".to_string();
        repo.update_profile(id, &profile, at(9), id)
            .await
            .expect("update");

        let after = repo.get_by_id(id).await.expect("get").expect("exists");
        assert_eq!(after.bio, "Wrote the first program");
        assert_eq!(after.website, "https://ada.example");
        assert_eq!(after.password, before.password);
        assert_eq!(after.updated_at, at(9));
    }

    #[tokio::test]
    async fn test_password_update_is_narrow() {
        let repo = setup_test_repo().await;
        let id = repo.insert(&test_user("ada"), at(8), 1).await.expect("insert");

        repo.update_password(id, "$argon2id$new$hash", at(10), id)
            .await
            .expect("update password");

        let user = repo.get_by_id(id).await.expect("get").expect("exists");
        assert_eq!(user.password, "$argon2id$new$hash");
        assert_eq!(user.updated_at, at(10));
        // Profile columns untouched.
        assert_eq!(user.name, "User ada");
        assert_eq!(user.email, "ada@example.com");
    }

    #[tokio::test]
    async fn test_last_login_skips_audit_pair() {
        let repo = setup_test_repo().await;
        let id = repo.insert(&test_user("ada"), at(8), 1).await.expect("insert");

        repo.update_last_login(id, at(11)).await.expect("stamp");

        let user = repo.get_by_id(id).await.expect("get").expect("exists");
        assert_eq!(user.last_login, Some(at(11)));
        // A login is not an edit.
        assert_eq!(user.updated_at, at(8));
    }

    #[tokio::test]
    async fn test_role_assignment_and_lookup() {
        let repo = setup_test_repo().await;
        let id = repo.insert(&test_user("ada"), at(8), 1).await.expect("insert");

        assert!(repo
            .find_by_role(roles::ADMINISTRATOR)
            .await
            .expect("find")
            .is_none());

        repo.insert_role(roles::ADMINISTRATOR, id)
            .await
            .expect("assign");
        assert_eq!(
            repo.find_by_role(roles::ADMINISTRATOR).await.expect("find"),
            Some(id)
        );
    }

    #[tokio::test]
    async fn test_count_users() {
        let repo = setup_test_repo().await;
        assert_eq!(repo.count().await.expect("count"), 0);

        repo.insert(&test_user("ada"), at(8), 1).await.expect("insert");
        repo.insert(&test_user("grace"), at(9), 1).await.expect("insert");
        assert_eq!(repo.count().await.expect("count"), 2);
    }

    #[tokio::test]
    async fn test_concurrent_profile_updates_last_writer_wins() {
        let repo = setup_test_repo().await;
        let id = repo.insert(&test_user("ada"), at(8), 1).await.expect("insert");
        let base = repo.get_by_id(id).await.expect("get").expect("exists");

        let mut first = profile_of(&base);
        first.bio = "first".to_string();
        let mut second = profile_of(&base);
        second.bio = "second".to_string();

        // No version check exists, so both commits succeed and whichever
        // lands later owns the row.
        let (a, b) = tokio::join!(
            repo.update_profile(id, &first, at(9), id),
            repo.update_profile(id, &second, at(9), id),
        );
        a.expect("first update");
        b.expect("second update");

        let user = repo.get_by_id(id).await.expect("get").expect("exists");
        assert!(user.bio == "first" || user.bio == "second");
    }
}
