//! User model
//!
//! This module defines the User entity and the input shapes used by the
//! user store. Profile updates and password changes are separate paths,
//! so each has its own input type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role identifiers seeded in the roles table.
///
/// A single-author install only ever assigns `ADMINISTRATOR`, the other
/// rows exist to keep role ids stable if assignment widens later.
pub mod roles {
    pub const ADMINISTRATOR: i64 = 1;
    pub const EDITOR: i64 = 2;
    pub const AUTHOR: i64 = 3;
    pub const OWNER: i64 = 4;
}

/// User entity representing a registered author.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Surrogate key assigned by the database
    pub id: i64,
    /// Externally visible identifier (canonical UUID string)
    pub uuid: String,
    /// Display name
    pub name: String,
    /// URL-friendly slug (unique)
    pub slug: String,
    /// Password hash (argon2, PHC string)
    #[serde(skip_serializing)]
    pub password: String,
    /// Email address
    pub email: String,
    /// Avatar image reference
    pub image: String,
    /// Cover image reference
    pub cover: String,
    /// Short biography
    pub bio: String,
    /// Personal website URL
    pub website: String,
    /// Location
    pub location: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Creating user ID
    pub created_by: i64,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
    /// Last updating user ID
    pub updated_by: i64,
    /// Last login timestamp, null until the first login
    pub last_login: Option<DateTime<Utc>>,
}

/// Field set for creating a user.
///
/// The password arrives already hashed; bio, website and location start
/// empty and are only written through profile updates.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub slug: String,
    pub password: String,
    pub email: String,
    pub image: String,
    pub cover: String,
}

/// Mutable profile columns rewritten by a profile update.
///
/// The password is deliberately absent; rotation goes through its own
/// narrow operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub slug: String,
    pub email: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub cover: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub location: String,
}
