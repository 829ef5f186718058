//! Tag model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tag entity
///
/// Tags relate to posts many-to-many through the posts_tags association
/// table; the tag row itself carries no post references.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tag {
    /// Surrogate key assigned by the database
    pub id: i64,
    /// Externally visible identifier (canonical UUID string)
    pub uuid: String,
    /// Tag name as entered
    pub name: String,
    /// URL-friendly slug
    pub slug: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Creating user ID
    pub created_by: i64,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
    /// Last updating user ID
    pub updated_by: i64,
}

/// A tag that has been parsed from input but not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagDraft {
    pub name: String,
    pub slug: String,
}
