//! User service
//!
//! Registration, login verification and the two separate mutation
//! paths (profile vs password). A gazette install is single-author:
//! registration only succeeds while the users table is empty, and the
//! one registered user holds the administrator role.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::db::repositories::UserRepository;
use crate::models::{roles, NewUser, User, UserProfile};
use crate::services::password::{hash_password, verify_password};
use crate::services::tag::generate_slug;

/// User orchestration service
pub struct UserService {
    users: Arc<dyn UserRepository>,
}

impl UserService {
    /// Create a new user service
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    /// Register the blog's author.
    ///
    /// Refused once any user exists. The new user is recorded as created
    /// by itself (there is nobody else to attribute) and immediately
    /// assigned the administrator role.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<i64> {
        let count = self.users.count().await.context("Failed to count users")?;
        if count > 0 {
            bail!("Registration is closed: a user already exists");
        }

        let hash = hash_password(password)?;
        let user = NewUser {
            name: name.to_string(),
            slug: generate_slug(name),
            password: hash,
            email: email.to_string(),
            image: String::new(),
            cover: String::new(),
        };

        // The first row in an empty table gets id 1 on both backends.
        let user_id = self
            .users
            .insert(&user, now, 1)
            .await
            .context("Failed to insert user")?;
        self.users
            .insert_role(roles::ADMINISTRATOR, user_id)
            .await
            .context("Failed to assign administrator role")?;

        Ok(user_id)
    }

    /// Verify a login attempt by user slug; stamps last_login on
    /// success.
    pub async fn verify_login(
        &self,
        slug: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>> {
        let user = match self
            .users
            .get_by_slug(slug)
            .await
            .context("Failed to read user")?
        {
            Some(user) => user,
            None => return Ok(None),
        };

        if !verify_password(password, &user.password)? {
            return Ok(None);
        }

        self.users
            .update_last_login(user.id, now)
            .await
            .context("Failed to stamp last login")?;
        Ok(Some(user))
    }

    /// Rewrite the profile columns. Never touches the password.
    pub async fn update_profile(
        &self,
        id: i64,
        profile: &UserProfile,
        now: DateTime<Utc>,
        updated_by: i64,
    ) -> Result<()> {
        self.users
            .update_profile(id, profile, now, updated_by)
            .await
            .context("Failed to update profile")
    }

    /// Hash and store a new password. Separate from profile updates so
    /// rotation cannot happen as a side effect of an unrelated edit.
    pub async fn change_password(
        &self,
        id: i64,
        new_password: &str,
        now: DateTime<Utc>,
        updated_by: i64,
    ) -> Result<()> {
        let hash = hash_password(new_password)?;
        self.users
            .update_password(id, &hash, now, updated_by)
            .await
            .context("Failed to update password")
    }

    /// Get a user by surrogate id
    pub async fn get(&self, id: i64) -> Result<Option<User>> {
        self.users.get_by_id(id).await.context("Failed to read user")
    }

    /// The administrator's user id, if the blog has been set up.
    pub async fn administrator_id(&self) -> Result<Option<i64>> {
        self.users
            .find_by_role(roles::ADMINISTRATOR)
            .await
            .context("Failed to resolve administrator")
    }

    /// Whether any user has been registered yet
    pub async fn is_set_up(&self) -> Result<bool> {
        Ok(self.users.count().await.context("Failed to count users")? > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxUserRepository;
    use crate::db::{create_test_pool, schema};
    use chrono::TimeZone;

    async fn setup_service() -> UserService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        schema::ensure_schema(&pool)
            .await
            .expect("Failed to ensure schema");
        UserService::new(SqlxUserRepository::boxed(pool))
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 7, hour, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_register_first_user_becomes_administrator() {
        let service = setup_service().await;
        assert!(!service.is_set_up().await.expect("setup check"));

        let id = service
            .register("Ada Lovelace", "ada@example.com", "difference engine", at(8))
            .await
            .expect("register");

        assert!(service.is_set_up().await.expect("setup check"));
        assert_eq!(service.administrator_id().await.expect("admin"), Some(id));

        let user = service.get(id).await.expect("get").expect("exists");
        assert_eq!(user.slug, "ada-lovelace");
        assert!(user.password.starts_with("$argon2id$"));
        assert!(user.last_login.is_none());
    }

    #[tokio::test]
    async fn test_register_is_refused_once_set_up() {
        let service = setup_service().await;
        service
            .register("Ada", "ada@example.com", "pw", at(8))
            .await
            .expect("register");

        let err = service
            .register("Eve", "eve@example.com", "pw", at(9))
            .await
            .expect_err("must fail");
        assert!(err.to_string().contains("Registration is closed"));
    }

    #[tokio::test]
    async fn test_verify_login_paths() {
        let service = setup_service().await;
        let id = service
            .register("Ada", "ada@example.com", "secret", at(8))
            .await
            .expect("register");

        // Wrong slug, wrong password, then success.
        assert!(service
            .verify_login("nobody", "secret", at(9))
            .await
            .expect("login")
            .is_none());
        assert!(service
            .verify_login("ada", "wrong", at(9))
            .await
            .expect("login")
            .is_none());

        let user = service
            .verify_login("ada", "secret", at(9))
            .await
            .expect("login")
            .expect("accepted");
        assert_eq!(user.id, id);

        let user = service.get(id).await.expect("get").expect("exists");
        assert_eq!(user.last_login, Some(at(9)));
    }

    #[tokio::test]
    async fn test_change_password_rotates_hash_only() {
        let service = setup_service().await;
        let id = service
            .register("Ada", "ada@example.com", "old", at(8))
            .await
            .expect("register");
        let before = service.get(id).await.expect("get").expect("exists");

        service
            .change_password(id, "new", at(9), id)
            .await
            .expect("change");

        let after = service.get(id).await.expect("get").expect("exists");
        assert_ne!(after.password, before.password);
        assert_eq!(after.name, before.name);

        assert!(service
            .verify_login("ada", "old", at(10))
            .await
            .expect("login")
            .is_none());
        assert!(service
            .verify_login("ada", "new", at(10))
            .await
            .expect("login")
            .is_some());
    }
}
