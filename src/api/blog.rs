//! Blog settings API endpoints
//!
//! - GET /api/blog - Read the assembled blog configuration
//! - PUT /api/blog - Rewrite the seven-key settings batch
//! - PUT /api/blog/theme - Switch the active theme (single-key form)

use axum::{extract::State, Json};
use chrono::Utc;
use serde::Deserialize;

use crate::api::posts::acting_user;
use crate::api::{ApiError, AppState};
use crate::models::{Blog, Navigation};
use crate::services::settings::BlogUpdate;

/// Request body for the settings batch
#[derive(Debug, Deserialize)]
pub struct BlogPayload {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub logo: String,
    #[serde(default)]
    pub cover: String,
    #[serde(default = "default_posts_per_page")]
    pub posts_per_page: i64,
    pub active_theme: String,
    #[serde(default)]
    pub navigation: Vec<Navigation>,
}

fn default_posts_per_page() -> i64 {
    5
}

/// Request body for the theme switch
#[derive(Debug, Deserialize)]
pub struct ThemePayload {
    pub active_theme: String,
}

/// GET /api/blog
pub async fn get_blog_handler(State(state): State<AppState>) -> Result<Json<Blog>, ApiError> {
    let blog = state.settings.blog().await.map_err(ApiError::from_service)?;
    Ok(Json(blog))
}

/// PUT /api/blog
pub async fn update_blog_handler(
    State(state): State<AppState>,
    Json(payload): Json<BlogPayload>,
) -> Result<Json<Blog>, ApiError> {
    if payload.title.trim().is_empty() {
        return Err(ApiError::validation_error("title is required"));
    }
    if payload.posts_per_page < 1 {
        return Err(ApiError::validation_error("posts_per_page must be positive"));
    }

    let actor = acting_user(&state).await?;
    let update = BlogUpdate {
        title: payload.title,
        description: payload.description,
        logo: payload.logo,
        cover: payload.cover,
        posts_per_page: payload.posts_per_page,
        active_theme: payload.active_theme,
        navigation: payload.navigation,
    };

    state
        .settings
        .update_blog(&update, Utc::now(), actor)
        .await
        .map_err(ApiError::from_service)?;

    let blog = state.settings.blog().await.map_err(ApiError::from_service)?;
    Ok(Json(blog))
}

/// PUT /api/blog/theme
pub async fn update_theme_handler(
    State(state): State<AppState>,
    Json(payload): Json<ThemePayload>,
) -> Result<Json<Blog>, ApiError> {
    if payload.active_theme.trim().is_empty() {
        return Err(ApiError::validation_error("active_theme is required"));
    }

    let actor = acting_user(&state).await?;
    state
        .settings
        .update_active_theme(&payload.active_theme, Utc::now(), actor)
        .await
        .map_err(ApiError::from_service)?;

    let blog = state.settings.blog().await.map_err(ApiError::from_service)?;
    Ok(Json(blog))
}
