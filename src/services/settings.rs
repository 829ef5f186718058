//! Settings service
//!
//! Assembles the blog configuration view from settings rows and runs
//! the batch update. The batch assumes every key row already exists, so
//! `ensure_defaults` is called once at startup to backfill any missing
//! rows before the admin API goes live.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::db::repositories::{BlogSettingsUpdate, SettingsRepository};
use crate::models::{setting_keys, Blog, Navigation, SettingKind};

/// Default values written for missing keys at startup.
const DEFAULT_TITLE: &str = "Gazette";
const DEFAULT_DESCRIPTION: &str = "Just a blog";
const DEFAULT_POSTS_PER_PAGE: i64 = 5;
const DEFAULT_THEME: &str = "promenade";

/// The editable portion of the blog configuration, as submitted by the
/// admin client.
#[derive(Debug, Clone)]
pub struct BlogUpdate {
    pub title: String,
    pub description: String,
    pub logo: String,
    pub cover: String,
    pub posts_per_page: i64,
    pub active_theme: String,
    pub navigation: Vec<Navigation>,
}

/// Settings orchestration service
pub struct SettingsService {
    repo: Arc<dyn SettingsRepository>,
    /// Public base URL from configuration, not from the settings table
    blog_url: String,
}

impl SettingsService {
    /// Create a new settings service
    pub fn new(repo: Arc<dyn SettingsRepository>, blog_url: impl Into<String>) -> Self {
        Self {
            repo,
            blog_url: blog_url.into(),
        }
    }

    /// Insert any missing blog/theme key rows with their defaults.
    ///
    /// Existing rows are left untouched, so this is safe on every
    /// startup.
    pub async fn ensure_defaults(&self, now: DateTime<Utc>, user_id: i64) -> Result<()> {
        let string_defaults: [(&str, &str, SettingKind); 5] = [
            (setting_keys::TITLE, DEFAULT_TITLE, SettingKind::Blog),
            (
                setting_keys::DESCRIPTION,
                DEFAULT_DESCRIPTION,
                SettingKind::Blog,
            ),
            (setting_keys::LOGO, "", SettingKind::Blog),
            (setting_keys::COVER, "", SettingKind::Blog),
            (setting_keys::ACTIVE_THEME, DEFAULT_THEME, SettingKind::Theme),
        ];

        for (key, value, kind) in string_defaults {
            if self.missing(key).await? {
                self.repo
                    .insert(key, value, kind, now, user_id)
                    .await
                    .with_context(|| format!("Failed to seed setting '{}'", key))?;
            }
        }

        if self.missing(setting_keys::POSTS_PER_PAGE).await? {
            self.repo
                .insert_number(
                    setting_keys::POSTS_PER_PAGE,
                    DEFAULT_POSTS_PER_PAGE,
                    SettingKind::Blog,
                    now,
                    user_id,
                )
                .await
                .context("Failed to seed postsPerPage")?;
        }

        if self.missing(setting_keys::NAVIGATION).await? {
            let nav = serde_json::to_string(&[Navigation {
                label: "Home".to_string(),
                url: "/".to_string(),
            }])
            .context("Failed to serialise default navigation")?;
            self.repo
                .insert(setting_keys::NAVIGATION, &nav, SettingKind::Blog, now, user_id)
                .await
                .context("Failed to seed navigation")?;
        }

        Ok(())
    }

    /// Assemble the blog view from the settings rows.
    pub async fn blog(&self) -> Result<Blog> {
        let rows = self
            .repo
            .get_all()
            .await
            .context("Failed to read settings")?;

        let mut blog = Blog {
            url: self.blog_url.clone(),
            title: DEFAULT_TITLE.to_string(),
            description: DEFAULT_DESCRIPTION.to_string(),
            logo: String::new(),
            cover: String::new(),
            posts_per_page: DEFAULT_POSTS_PER_PAGE,
            active_theme: DEFAULT_THEME.to_string(),
            navigation: Vec::new(),
        };

        for row in rows {
            match row.key.as_str() {
                setting_keys::TITLE => blog.title = row.value,
                setting_keys::DESCRIPTION => blog.description = row.value,
                setting_keys::LOGO => blog.logo = row.value,
                setting_keys::COVER => blog.cover = row.value,
                setting_keys::POSTS_PER_PAGE => {
                    blog.posts_per_page = row
                        .value
                        .parse()
                        .unwrap_or(DEFAULT_POSTS_PER_PAGE)
                }
                setting_keys::ACTIVE_THEME => blog.active_theme = row.value,
                setting_keys::NAVIGATION => {
                    blog.navigation = serde_json::from_str(&row.value).unwrap_or_default()
                }
                _ => {}
            }
        }

        Ok(blog)
    }

    /// Run the seven-key batch update.
    pub async fn update_blog(
        &self,
        update: &BlogUpdate,
        now: DateTime<Utc>,
        user_id: i64,
    ) -> Result<()> {
        let navigation = serde_json::to_string(&update.navigation)
            .context("Failed to serialise navigation")?;

        let batch = BlogSettingsUpdate {
            title: update.title.clone(),
            description: update.description.clone(),
            logo: update.logo.clone(),
            cover: update.cover.clone(),
            posts_per_page: update.posts_per_page,
            active_theme: update.active_theme.clone(),
            navigation,
        };

        self.repo
            .update_blog(&batch, now, user_id)
            .await
            .context("Failed to update blog settings")
    }

    /// Single-key form: switch the active theme.
    pub async fn update_active_theme(
        &self,
        theme: &str,
        now: DateTime<Utc>,
        user_id: i64,
    ) -> Result<()> {
        self.repo
            .update_key(setting_keys::ACTIVE_THEME, theme, now, user_id)
            .await
            .context("Failed to update active theme")
    }

    async fn missing(&self, key: &str) -> Result<bool> {
        Ok(self
            .repo
            .get(key)
            .await
            .with_context(|| format!("Failed to read setting '{}'", key))?
            .is_none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxSettingsRepository;
    use crate::db::{create_test_pool, schema};
    use chrono::TimeZone;

    async fn setup_service() -> SettingsService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        schema::ensure_schema(&pool)
            .await
            .expect("Failed to ensure schema");
        SettingsService::new(
            SqlxSettingsRepository::boxed(pool),
            "http://blog.example",
        )
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 6, hour, 0, 0).unwrap()
    }

    fn sample_update() -> BlogUpdate {
        BlogUpdate {
            title: "My Gazette".to_string(),
            description: "Notes and essays".to_string(),
            logo: "/content/logo.png".to_string(),
            cover: String::new(),
            posts_per_page: 8,
            active_theme: "casper".to_string(),
            navigation: vec![
                Navigation {
                    label: "Home".to_string(),
                    url: "/".to_string(),
                },
                Navigation {
                    label: "About".to_string(),
                    url: "/about".to_string(),
                },
            ],
        }
    }

    #[tokio::test]
    async fn test_defaults_then_view() {
        let service = setup_service().await;
        service.ensure_defaults(at(8), 1).await.expect("defaults");

        let blog = service.blog().await.expect("blog");
        assert_eq!(blog.url, "http://blog.example");
        assert_eq!(blog.title, "Gazette");
        assert_eq!(blog.posts_per_page, 5);
        assert_eq!(blog.active_theme, "promenade");
        assert_eq!(blog.navigation.len(), 1);
        assert_eq!(blog.navigation[0].url, "/");
    }

    #[tokio::test]
    async fn test_ensure_defaults_is_idempotent_and_non_destructive() {
        let service = setup_service().await;
        service.ensure_defaults(at(8), 1).await.expect("defaults");

        service
            .update_active_theme("casper", at(9), 1)
            .await
            .expect("theme");

        // A second startup must not reset the edited value.
        service.ensure_defaults(at(10), 1).await.expect("defaults");
        let blog = service.blog().await.expect("blog");
        assert_eq!(blog.active_theme, "casper");
    }

    #[tokio::test]
    async fn test_batch_update_roundtrips_through_view() {
        let service = setup_service().await;
        service.ensure_defaults(at(8), 1).await.expect("defaults");

        service
            .update_blog(&sample_update(), at(9), 2)
            .await
            .expect("update");

        let blog = service.blog().await.expect("blog");
        assert_eq!(blog.title, "My Gazette");
        assert_eq!(blog.posts_per_page, 8);
        assert_eq!(blog.active_theme, "casper");
        assert_eq!(blog.navigation.len(), 2);
        assert_eq!(blog.navigation[1].label, "About");
    }

    #[tokio::test]
    async fn test_unparsable_stored_values_fall_back() {
        let service = setup_service().await;
        service.ensure_defaults(at(8), 1).await.expect("defaults");

        service
            .repo
            .update_key(setting_keys::POSTS_PER_PAGE, "many", at(9), 1)
            .await
            .expect("corrupt");
        service
            .repo
            .update_key(setting_keys::NAVIGATION, "not json", at(9), 1)
            .await
            .expect("corrupt");

        let blog = service.blog().await.expect("blog");
        assert_eq!(blog.posts_per_page, 5);
        assert!(blog.navigation.is_empty());
    }
}
