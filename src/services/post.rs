//! Post service
//!
//! Orchestrates post writes together with their tag associations. The
//! repositories stay single-purpose; the sequencing contracts live here:
//! tag links are dropped and rebuilt on every save, and on deletion the
//! association rows go before the post row. Nothing in the database
//! enforces that ordering, so this service is the place that preserves
//! it.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::db::repositories::{PostRepository, TagRepository};
use crate::models::{Post, PostInput, Tag, TagDraft};

/// Clamp raw pagination parameters to the range the listing serves:
/// page 1 and up, 1 to 100 rows per page.
pub fn clamp_page(page: i64, per_page: i64) -> (i64, i64) {
    (page.max(1), per_page.clamp(1, 100))
}

/// Post orchestration service
pub struct PostService {
    posts: Arc<dyn PostRepository>,
    tags: Arc<dyn TagRepository>,
}

impl PostService {
    /// Create a new post service
    pub fn new(posts: Arc<dyn PostRepository>, tags: Arc<dyn TagRepository>) -> Self {
        Self { posts, tags }
    }

    /// Create a post and link its tags; returns the new surrogate id.
    pub async fn create(
        &self,
        input: &PostInput,
        tag_drafts: &[TagDraft],
        now: DateTime<Utc>,
        user_id: i64,
    ) -> Result<i64> {
        let post_id = self
            .posts
            .insert(input, now, user_id)
            .await
            .context("Failed to insert post")?;

        self.link_tags(post_id, tag_drafts, now, user_id).await?;
        Ok(post_id)
    }

    /// Update a post and rebuild its tag associations.
    pub async fn update(
        &self,
        id: i64,
        input: &PostInput,
        tag_drafts: &[TagDraft],
        now: DateTime<Utc>,
        user_id: i64,
    ) -> Result<()> {
        self.posts
            .update(id, input, now, user_id)
            .await
            .context("Failed to update post")?;

        // Simplest correct sync: drop every link and relink the new set.
        self.tags
            .unlink_post(id)
            .await
            .context("Failed to clear tag links")?;
        self.link_tags(id, tag_drafts, now, user_id).await?;
        Ok(())
    }

    /// Delete a post. Association rows go first; the schema has no
    /// cascade to fall back on.
    pub async fn delete(&self, id: i64) -> Result<()> {
        self.tags
            .unlink_post(id)
            .await
            .context("Failed to delete tag links")?;
        self.posts
            .delete(id)
            .await
            .context("Failed to delete post")?;
        Ok(())
    }

    /// Get a post with its tags
    pub async fn get(&self, id: i64) -> Result<Option<(Post, Vec<Tag>)>> {
        let post = self
            .posts
            .get_by_id(id)
            .await
            .context("Failed to read post")?;

        match post {
            Some(post) => {
                let tags = self
                    .tags
                    .tags_for_post(post.id)
                    .await
                    .context("Failed to read post tags")?;
                Ok(Some((post, tags)))
            }
            None => Ok(None),
        }
    }

    /// Page through posts, newest first; returns the page and the total
    /// post count.
    pub async fn list(&self, page: i64, per_page: i64) -> Result<(Vec<Post>, i64)> {
        let (page, per_page) = clamp_page(page, per_page);
        let offset = (page - 1) * per_page;

        let posts = self
            .posts
            .list(per_page, offset)
            .await
            .context("Failed to list posts")?;
        let total = self.posts.count().await.context("Failed to count posts")?;
        Ok((posts, total))
    }

    /// Find-or-insert each draft and link it to the post.
    async fn link_tags(
        &self,
        post_id: i64,
        drafts: &[TagDraft],
        now: DateTime<Utc>,
        user_id: i64,
    ) -> Result<()> {
        for draft in drafts {
            let tag_id = match self
                .tags
                .get_by_slug(&draft.slug)
                .await
                .context("Failed to look up tag")?
            {
                Some(tag) => tag.id,
                None => self
                    .tags
                    .insert(draft, now, user_id)
                    .await
                    .context("Failed to insert tag")?,
            };
            self.tags
                .link_post(post_id, tag_id)
                .await
                .context("Failed to link tag")?;
        }
        Ok(())
    }
}
