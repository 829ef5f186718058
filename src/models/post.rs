//! Post model
//!
//! This module provides:
//! - `Post` entity representing a stored post or static page
//! - `PostStatus` enum for publication states
//! - `PostInput`, the full field set written by both insert and update

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Post entity
///
/// Covers both dated entries and static pages (the `page` flag). The
/// `published_at`/`published_by` pair is present iff the post has been
/// published at least once; it is stamped on the first draft→published
/// transition and never rewritten afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    /// Surrogate key assigned by the database
    pub id: i64,
    /// Externally visible identifier (canonical UUID string)
    pub uuid: String,
    /// Post title
    pub title: String,
    /// URL-friendly slug
    pub slug: String,
    /// Markdown source
    pub markdown: String,
    /// Rendered HTML
    pub html: String,
    /// Whether the post is featured
    pub featured: bool,
    /// Whether the post is a static page rather than a dated entry
    pub page: bool,
    /// Publication status
    pub status: PostStatus,
    /// Meta description for search engines
    pub meta_description: String,
    /// Header image reference
    pub image: String,
    /// Authoring user ID
    pub author_id: i64,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Creating user ID
    pub created_by: i64,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
    /// Last updating user ID
    pub updated_by: i64,
    /// First publication timestamp
    pub published_at: Option<DateTime<Utc>>,
    /// Publishing user ID
    pub published_by: Option<i64>,
}

impl Post {
    /// Whether the post is currently visible to the public
    pub fn is_published(&self) -> bool {
        self.status == PostStatus::Published
    }
}

/// Post publication status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    /// Draft - not visible to public
    Draft,
    /// Published - visible to public
    Published,
}

impl Default for PostStatus {
    fn default() -> Self {
        Self::Draft
    }
}

impl PostStatus {
    /// Convert status to database string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
        }
    }

    /// Parse status from database string representation
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "draft" => Some(PostStatus::Draft),
            "published" => Some(PostStatus::Published),
            _ => None,
        }
    }
}

impl std::fmt::Display for PostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Field set written by post insert and update
///
/// Both operations rewrite the same content columns in full; there are no
/// per-field patch semantics. Slug and HTML arrive already computed, the
/// store does not validate or render.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostInput {
    /// Post title
    pub title: String,
    /// URL-friendly slug, assumed unique
    pub slug: String,
    /// Markdown source
    pub markdown: String,
    /// Rendered HTML
    pub html: String,
    /// Whether the post is featured
    #[serde(default)]
    pub featured: bool,
    /// Whether the post is a static page
    #[serde(default)]
    pub page: bool,
    /// Requested publication state
    #[serde(default)]
    pub published: bool,
    /// Meta description for search engines
    #[serde(default)]
    pub meta_description: String,
    /// Header image reference
    #[serde(default)]
    pub image: String,
}

impl PostInput {
    /// Status derived from the `published` flag
    pub fn status(&self) -> PostStatus {
        if self.published {
            PostStatus::Published
        } else {
            PostStatus::Draft
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_as_str() {
        assert_eq!(PostStatus::Draft.as_str(), "draft");
        assert_eq!(PostStatus::Published.as_str(), "published");
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!(PostStatus::from_str("draft"), Some(PostStatus::Draft));
        assert_eq!(PostStatus::from_str("PUBLISHED"), Some(PostStatus::Published));
        assert_eq!(PostStatus::from_str("archived"), None);
    }

    #[test]
    fn test_status_default_is_draft() {
        assert_eq!(PostStatus::default(), PostStatus::Draft);
    }

    #[test]
    fn test_input_status_derivation() {
        let mut input = PostInput {
            title: "t".to_string(),
            slug: "t".to_string(),
            markdown: String::new(),
            html: String::new(),
            featured: false,
            page: false,
            published: false,
            meta_description: String::new(),
            image: String::new(),
        };
        assert_eq!(input.status(), PostStatus::Draft);
        input.published = true;
        assert_eq!(input.status(), PostStatus::Published);
    }
}
