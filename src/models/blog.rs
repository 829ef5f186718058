//! Blog view model
//!
//! Passive shape assembled from the settings rows plus the configured
//! site URL. Holds no behavior; the settings service builds and persists
//! it.

use serde::{Deserialize, Serialize};

/// One entry in the site navigation menu, stored as JSON under the
/// `navigation` settings key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Navigation {
    pub label: String,
    pub url: String,
}

/// Assembled blog configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Blog {
    /// Public base URL, from configuration rather than the settings table
    pub url: String,
    /// Blog title
    pub title: String,
    /// Blog description
    pub description: String,
    /// Logo image reference
    pub logo: String,
    /// Cover image reference
    pub cover: String,
    /// Posts shown per index page
    pub posts_per_page: i64,
    /// Name of the active theme
    pub active_theme: String,
    /// Navigation menu entries
    pub navigation: Vec<Navigation>,
}
