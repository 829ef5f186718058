//! Services layer - Business logic
//!
//! This module contains the orchestration logic that sits between the
//! HTTP handlers and the repositories. Services are responsible for:
//! - Sequencing multi-step persistence operations (post + tag links)
//! - Hashing and verifying passwords
//! - Assembling the blog configuration view from settings rows
//!
//! Timestamps and acting user ids always arrive from the caller; no
//! service consults the clock itself.

pub mod password;
pub mod post;
pub mod settings;
pub mod tag;
pub mod user;

pub use password::{hash_password, verify_password};
pub use post::{clamp_page, PostService};
pub use settings::SettingsService;
pub use tag::{generate_slug, parse_tag_list};
pub use user::UserService;
