//! Data models
//!
//! This module contains the data structures used throughout gazette.
//! Models represent:
//! - Database entities (Post, User, Tag, Setting)
//! - Store input shapes (PostInput, NewUser, UserProfile, TagDraft)
//! - The assembled Blog configuration view

mod blog;
mod post;
mod setting;
mod tag;
mod user;

pub use blog::{Blog, Navigation};
pub use post::{Post, PostInput, PostStatus};
pub use setting::{keys as setting_keys, Setting, SettingKind};
pub use tag::{Tag, TagDraft};
pub use user::{roles, NewUser, User, UserProfile};
