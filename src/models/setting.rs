//! Setting model
//!
//! Site configuration is stored as one row per key rather than a single
//! blob, so individual keys stay independently updatable while a caller
//! can still rewrite the cohesive blog set in one transaction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Setting keys used by the blog configuration.
///
/// Key spelling is part of the persisted format and must not change.
pub mod keys {
    pub const TITLE: &str = "title";
    pub const DESCRIPTION: &str = "description";
    pub const LOGO: &str = "logo";
    pub const COVER: &str = "cover";
    pub const POSTS_PER_PAGE: &str = "postsPerPage";
    pub const ACTIVE_THEME: &str = "activeTheme";
    pub const NAVIGATION: &str = "navigation";
}

/// Setting entity: one key/value row.
///
/// The value column is positional: integer-valued keys (postsPerPage)
/// store their decimal rendering in the same column as string keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Setting {
    /// Surrogate key assigned by the database
    pub id: i64,
    /// Externally visible identifier (canonical UUID string)
    pub uuid: String,
    /// Unique setting key
    pub key: String,
    /// Stored value
    pub value: String,
    /// Which subsystem owns the key
    pub kind: SettingKind,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Creating user ID
    pub created_by: i64,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
    /// Last updating user ID
    pub updated_by: i64,
}

/// Owner tag for a setting row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingKind {
    /// General blog configuration
    Blog,
    /// Theme selection
    Theme,
}

impl SettingKind {
    /// Convert kind to database string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKind::Blog => "blog",
            SettingKind::Theme => "theme",
        }
    }

    /// Parse kind from database string representation
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "blog" => Some(SettingKind::Blog),
            "theme" => Some(SettingKind::Theme),
            _ => None,
        }
    }
}

impl std::fmt::Display for SettingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
