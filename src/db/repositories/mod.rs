//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles the persistence operations for one entity.

pub mod post;
pub mod settings;
pub mod tag;
pub mod user;

pub use post::{PostRepository, SqlxPostRepository};
pub use settings::{BlogSettingsUpdate, SettingsRepository, SqlxSettingsRepository};
pub use tag::{SqlxTagRepository, TagRepository};
pub use user::{SqlxUserRepository, UserRepository};
